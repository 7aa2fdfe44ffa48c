//! Ordered candidate resolution
//!
//! Several upstreams are reachable under more than one URL or name
//! variant. Candidates are tried strictly in order until one succeeds;
//! when all fail the caller gets a single aggregate error carrying the
//! last underlying failure. No backoff, no reordering.

use std::future::Future;
use thiserror::Error;

/// All candidates for a request failed.
#[derive(Debug, Error)]
#[error("all {attempts} candidates failed, last error: {last}")]
pub struct Exhausted<E: std::error::Error + 'static> {
    /// How many candidates were tried
    pub attempts: usize,
    /// The error from the final attempt
    #[source]
    pub last: E,
}

/// Tries `attempt` against each candidate in order, returning the first
/// success. Candidates are consumed by value so the attempt future owns
/// what it needs across its awaits. An empty candidate list surfaces as
/// an `Exhausted` built from `empty_error`.
pub async fn resolve_candidates<C, T, E, F, Fut>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: F,
    empty_error: impl FnOnce() -> E,
) -> Result<T, Exhausted<E>>
where
    E: std::error::Error + 'static,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0;
    let mut last: Option<E> = None;
    for candidate in candidates {
        attempts += 1;
        match attempt(candidate).await {
            Ok(value) => return Ok(value),
            Err(e) => last = Some(e),
        }
    }
    Err(Exhausted {
        attempts,
        last: last.unwrap_or_else(empty_error),
    })
}
