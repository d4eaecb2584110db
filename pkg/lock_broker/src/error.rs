use std::time::Duration;

/// Errors that the broker reports synchronously to a caller.
///
/// These are strictly usage errors or cancellation signals. A conflicting
/// lock is never represented here, since `try_*` treats "unavailable" as a
/// normal outcome rather than a failure (see [`crate::TryAcquireOutcome`]).
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// `release()` was called on a permit issued by a different broker
    /// instance than the one it was passed to.
    #[error("permit was issued by a different broker instance")]
    ForeignIssuer,

    /// A range-read token was submitted without an operator. Writes are the
    /// only range tokens allowed to omit one.
    #[error("range read token is missing an operator")]
    OperatorMissingOnRangeRead,

    /// The broker has been shut down and is rejecting new acquisitions.
    #[error("broker has been shut down")]
    ShutDown,

    /// A blocking acquire did not complete within its deadline.
    #[error("acquire timed out after {0:?}")]
    TimedOut(Duration),

    /// A blocking acquire was interrupted via its cancellation token.
    #[error("acquire was interrupted")]
    Interrupted,
}

pub type Result<T, E = BrokerError> = std::result::Result<T, E>;
