//! Row cursor adapter.
//!
//! Turns a pull-based [`ResultRows`] stream ("advance, then read fields") into a
//! push-style [`DriverRows`] cursor ("fill this row, or report the end").

use async_trait::async_trait;
use serde_json::value::RawValue;
use tracing::{debug, warn};

use docproxy_core::{
    client::ResultRows,
    driver::{DriverRows, Row},
    error::{DocError, DocResult},
};

use crate::cursor::CursorState;

/// Adapts a client row stream to the driver row cursor contract.
///
/// At most one row is materialized at a time: each call to
/// [`next`](DriverRows::next) advances the wrapped stream once and copies the
/// current row into the caller's record.
///
/// Once the stream ends, either normally or with an error, that outcome is
/// returned by every later call and the wrapped stream is released.
pub struct RowsAdapter<R: ResultRows> {
    rows: R,
    state: CursorState,
}

impl<R: ResultRows> RowsAdapter<R> {
    pub fn new(rows: R) -> Self {
        Self {
            rows,
            state: CursorState::Open,
        }
    }

    /// Latches `outcome`, releases the wrapped stream and returns the outcome.
    async fn finish(&mut self, outcome: DocError) -> DocError {
        if let Err(err) = self.rows.close().await {
            warn!(error = %err, "failed to release exhausted row stream");
        }

        debug!(outcome = %outcome, "row cursor finished");
        self.state = CursorState::Finished(outcome.clone());

        outcome
    }
}

#[async_trait]
impl<R> DriverRows for RowsAdapter<R>
where
    R: ResultRows + 'static,
{
    async fn next(&mut self, row: &mut Row) -> DocResult<()> {
        self.state.check()?;

        if !self.rows.next().await {
            let outcome = self.rows.err().unwrap_or(DocError::EndOfStream);
            return Err(self.finish(outcome).await);
        }

        // Extract everything before touching the caller's row, so a malformed
        // payload leaves it as it was. A `null` value is still a value; only an
        // absent doc is `None`.
        let value = self.rows.scan_value::<Box<RawValue>>()?;
        let doc = self.rows.scan_doc::<Option<Box<RawValue>>>()?;

        row.id = self.rows.id().to_string();
        row.key = self.rows.key().map(ToOwned::to_owned);
        row.value = Some(value);
        row.doc = doc;

        Ok(())
    }

    async fn close(&mut self) -> DocResult<()> {
        if !self.state.is_open() {
            self.state = CursorState::Closed;
            return Ok(());
        }

        self.state = CursorState::Closed;
        debug!("row cursor closed by caller");

        self.rows.close().await
    }

    fn offset(&self) -> i64 {
        self.rows.offset()
    }

    fn total_rows(&self) -> i64 {
        self.rows.total_rows()
    }

    fn update_seq(&self) -> String {
        self.rows.update_seq().to_string()
    }
}
