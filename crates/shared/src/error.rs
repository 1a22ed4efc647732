use thiserror::Error;

/// Failures surfaced by the historical-fetch collaborator.
///
/// Cache-only operations never produce these; a cache miss or a short batch
/// is an ordinary result, not an error. A failure applies to the batch
/// request that triggered it and is not retried by this crate.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("history transport failed: {0}")]
    Network(String),
    #[error("history source cannot resolve anchor {anchor}")]
    InvalidAnchor { anchor: i64 },
    #[error("history source rejected the request with status {0}")]
    Status(u16),
    #[error("no history source configured")]
    Unavailable,
}
