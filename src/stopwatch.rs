use std::time::{Duration, Instant};

/// Run `f` and log how long it took under `label`.
///
/// ```
/// use gcsr_core::stopwatch::stopwatch;
///
/// assert_eq!(4, stopwatch("add", || 2 + 2));
/// ```
pub fn stopwatch<T, F>(label: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let (out, elapsed) = timed(f);
    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", label);
    out
}

/// Run `f` and return its result together with its running time.
pub fn timed<T, F>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn measures_the_closure()
    {
        let (out, elapsed) = timed(|| {
            std::thread::sleep(Duration::from_millis(5));
            "done"
        });
        assert_eq!("done", out);
        assert!(elapsed >= Duration::from_millis(5));
    }
}
