//! Error types of the window server core.
//!
//! Nothing here is fatal to the process: every variant maps to an early
//! return with either an explicit reply to the client or a silent deferral.

use thiserror::Error;

use crate::shared::WindowId;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The client asked to begin an update that was never requested.
    #[error("window {0}: BEGIN_UPDATE without a pending update request")]
    UpdateNotRequested(WindowId),

    /// Too many scratch regions are out; the operation can be retried.
    #[error("region pool exhausted (limit {limit})")]
    RegionPoolExhausted { limit: usize },

    /// The client's message queue is full or the client went away.
    #[error("client of window {0} is unreachable")]
    ClientUnreachable(WindowId),

    /// The desktop does not (or no longer) manage this window.
    #[error("window {0} is not managed by the desktop")]
    UnknownWindow(WindowId),

    #[error(transparent)]
    Protocol(#[from] area_ipc::ProtocolError),
}

impl ServerError {
    /// Whether a later pass may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServerError::RegionPoolExhausted { .. } | ServerError::ClientUnreachable(_)
        )
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
