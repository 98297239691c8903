use bytemuck::{Pod, Zeroable};

/// A directed edge `(src, dst)`.
///
/// The derived ordering is lexicographic on `(src, dst)`, which is the order
/// every compaction stage expects its input in. The layout is two native
/// endian `u32`s so a slice of edges is exactly the on-disk record format.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct Edge(pub u32, pub u32);

impl Edge
{
    #[inline]
    pub fn src(&self) -> u32
    {
        self.0
    }

    #[inline]
    pub fn dst(&self) -> u32
    {
        self.1
    }
}

impl<T: Into<u32> + Copy> From<[T; 2]> for Edge
{
    fn from(arr: [T; 2]) -> Self
    {
        Self(arr[0].into(), arr[1].into())
    }
}

impl<T: Into<u32> + Copy> From<(T, T)> for Edge
{
    fn from(tup: (T, T)) -> Self
    {
        Self(tup.0.into(), tup.1.into())
    }
}

impl From<Edge> for [u32; 2]
{
    fn from(edge: Edge) -> Self
    {
        [edge.0, edge.1]
    }
}
