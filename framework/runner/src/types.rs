/// Recommended error type for a scenario's `main` function and for custom business logic helpers.
/// Any error can be propagated into it with `?`.
pub type BenchResult<T> = anyhow::Result<T>;
