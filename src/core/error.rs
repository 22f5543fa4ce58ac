//! Defines the custom error type for the `core` module.

use thiserror::Error;

/// The primary error type for the `core` module.
///
/// The filter pipeline recovers I/O problems locally (missing roots yield
/// empty results, unreadable entries are marked on the output), so the only
/// variant that crosses a public contract is `Cancelled`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents a user-initiated cancellation of an operation.
    #[error("Operation was cancelled by the user")]
    Cancelled,
}
