//! `futures::Stream` views over driver cursors.
//!
//! The driver contract is push-style; these helpers turn a cursor into a stream
//! so callers can use `StreamExt`/`TryStreamExt`. A stream ends when its cursor
//! reports [`DocError::EndOfStream`]. After the first error the cursor is closed
//! and the stream ends.

use futures::stream::{self, Stream};
use tracing::warn;

use crate::{
    driver::{Attachment, DriverAttachments, DriverRows, Row},
    error::{DocError, DocResult},
};

/// Streams the rows of a driver cursor.
pub fn rows_stream(rows: Box<dyn DriverRows>) -> impl Stream<Item = DocResult<Row>> + Send {
    stream::unfold(Some(rows), |state| async move {
        let mut rows = state?;
        let mut row = Row::default();

        match rows.next(&mut row).await {
            Ok(()) => Some((Ok(row), Some(rows))),
            Err(DocError::EndOfStream) => None,
            Err(err) => {
                if let Err(close_err) = rows.close().await {
                    warn!(error = %close_err, "failed to release failed row cursor");
                }
                Some((Err(err), None))
            }
        }
    })
}

/// Streams the records of an attachment cursor.
pub fn attachments_stream(
    attachments: Box<dyn DriverAttachments>,
) -> impl Stream<Item = DocResult<Attachment>> + Send {
    stream::unfold(Some(attachments), |state| async move {
        let mut attachments = state?;
        let mut attachment = Attachment::default();

        match attachments.next(&mut attachment).await {
            Ok(()) => Some((Ok(attachment), Some(attachments))),
            Err(DocError::EndOfStream) => None,
            Err(err) => {
                if let Err(close_err) = attachments.close().await {
                    warn!(error = %close_err, "failed to release failed attachment cursor");
                }
                Some((Err(err), None))
            }
        }
    })
}
