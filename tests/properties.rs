//! Properties of deduplication and CSR encoding over arbitrary edge lists.

use std::collections::BTreeSet;

use gcsr_core::{compact, csr::CSR, Edge};
use proptest::prelude::*;

fn prop_edge_list(len: std::ops::Range<usize>, max_vertex: u32) -> impl Strategy<Value = Vec<Edge>>
{
    prop::collection::vec((0..max_vertex, 0..max_vertex), len)
        .prop_map(|pairs| pairs.into_iter().map(Edge::from).collect())
}

fn sorted(mut edges: Vec<Edge>) -> Vec<Edge>
{
    edges.sort_unstable();
    edges
}

fn pool(num_threads: usize) -> rayon::ThreadPool
{
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_dedup_keeps_distinct_in_order(edges in prop_edge_list(0..400, 30)) {
        let edges = sorted(edges);
        let deduped = compact::dedup(&edges);

        let distinct: BTreeSet<Edge> = edges.iter().copied().collect();
        prop_assert_eq!(distinct.len(), deduped.len());
        prop_assert!(deduped.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(distinct.into_iter().collect::<Vec<_>>(), deduped);
    }

    #[test]
    fn prop_dedup_is_idempotent(edges in prop_edge_list(0..400, 30)) {
        let once = compact::dedup(&sorted(edges));
        prop_assert_eq!(&once, &compact::dedup(&once));
    }

    #[test]
    fn prop_csr_round_trip(edges in prop_edge_list(0..400, 50)) {
        let deduped = compact::dedup(&sorted(edges));
        let csr = CSR::encode(&deduped).unwrap();

        let mut rebuilt = Vec::with_capacity(deduped.len());
        for (k, &u) in csr.row().iter().enumerate() {
            for &v in &csr.col()[csr.ptr()[k] as usize..csr.ptr()[k + 1] as usize] {
                rebuilt.push(Edge(u, v));
            }
        }
        prop_assert_eq!(&deduped, &rebuilt);
        prop_assert_eq!(deduped, csr.edges().collect::<Vec<_>>());
    }

    #[test]
    fn prop_ptr_invariants(edges in prop_edge_list(0..400, 50)) {
        let csr = CSR::from_edges(edges).unwrap();
        let ptr = csr.ptr();

        prop_assert_eq!(csr.row().len() + 1, ptr.len());
        prop_assert_eq!(0, ptr[0]);
        prop_assert!(ptr.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(csr.col().len(), ptr[csr.row().len()] as usize);
        prop_assert!(csr.row().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_neighbors_match_edges(edges in prop_edge_list(1..200, 20)) {
        let csr = CSR::from_edges(edges.clone()).unwrap();
        for u in 0..20u32 {
            let expected: BTreeSet<u32> =
                edges.iter().filter(|e| e.src() == u).map(|e| e.dst()).collect();
            prop_assert_eq!(expected.into_iter().collect::<Vec<_>>(), csr.neighbors(u).to_vec());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_thread_count_does_not_change_output(edges in prop_edge_list(0..30_000, 2_000)) {
        let one = pool(1).install(|| CSR::from_edges(edges.clone())).unwrap();
        let many = pool(5).install(|| CSR::from_edges(edges)).unwrap();
        prop_assert_eq!(one, many);
    }
}

#[test]
fn scenario()
{
    let edges = vec![Edge(1, 2), Edge(1, 2), Edge(1, 3), Edge(2, 1)];
    let deduped = compact::dedup(&edges);
    assert_eq!(vec![Edge(1, 2), Edge(1, 3), Edge(2, 1)], deduped);

    let csr = CSR::encode(&deduped).unwrap();
    assert_eq!(&[1, 2], csr.row());
    assert_eq!(&[0, 2, 3], csr.ptr());
    assert_eq!(&[2, 3, 1], csr.col());
}

#[test]
fn boundaries()
{
    let empty = CSR::encode(&[]).unwrap();
    assert!(empty.row().is_empty());
    assert_eq!(&[0], empty.ptr());
    assert!(empty.col().is_empty());

    let single = CSR::encode(&[Edge(4, 9)]).unwrap();
    assert_eq!(&[4], single.row());
    assert_eq!(&[0, 1], single.ptr());
    assert_eq!(&[9], single.col());
}

/// Large enough to be split into many blocks, so every scatter crosses
/// window boundaries; the window checks would panic on a bad offset.
#[test]
fn scatter_stays_in_bounds_on_large_input()
{
    let edges: Vec<Edge> = (0..400_000u32)
        .map(|i| Edge(i.wrapping_mul(2_654_435_761) % 5_000, i % 97))
        .collect();

    let csr = pool(7).install(|| CSR::from_edges(edges.clone())).unwrap();
    let expected: BTreeSet<Edge> = edges.into_iter().collect();
    assert_eq!(expected.len(), csr.size());
    assert!(csr.edges().eq(expected.into_iter()));
}

#[test]
fn byte_identical_files_for_any_thread_count()
{
    let edges: Vec<Edge> = (0..100_000u32).map(|i| Edge(i % 1_013, i % 89)).collect();
    let io = gcsr_core::io::ChunkedIo::new(4096);
    let dir = tempfile::tempdir().unwrap();

    for threads in [1, 2, 8] {
        let csr = pool(threads).install(|| CSR::from_edges(edges.clone())).unwrap();
        csr.write(dir.path().join(format!("t{}", threads)), &io).unwrap();
    }

    for ext in ["row", "ptr", "col"] {
        let one = std::fs::read(dir.path().join(format!("t1.{}", ext))).unwrap();
        for threads in [2, 8] {
            let other = std::fs::read(dir.path().join(format!("t{}.{}", threads, ext))).unwrap();
            assert_eq!(one, other, "{} differs with {} threads", ext, threads);
        }
    }
}
