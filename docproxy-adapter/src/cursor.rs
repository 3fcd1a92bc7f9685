use docproxy_core::error::{DocError, DocResult};

/// Lifecycle of an adapted cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CursorState {
    Open,
    /// The terminal outcome, reported again on every later advance.
    Finished(DocError),
    Closed,
}

impl CursorState {
    /// Fails with the latched outcome unless the cursor is still open.
    pub(crate) fn check(&self) -> DocResult<()> {
        match self {
            CursorState::Open => Ok(()),
            CursorState::Finished(outcome) => Err(outcome.clone()),
            CursorState::Closed => Err(DocError::CursorClosed),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        matches!(self, CursorState::Open)
    }
}
