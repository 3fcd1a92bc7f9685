//! Attachment cursor adapter.

use async_trait::async_trait;
use tracing::{debug, warn};

use docproxy_core::{
    client::AttachmentStream,
    driver::{Attachment, DriverAttachments},
    error::{DocError, DocResult},
};

use crate::{cursor::CursorState, reshape};

/// Adapts a client attachment stream to the driver attachment cursor contract.
///
/// Stream errors are passed through as they are. The end of the stream is latched:
/// once reported, every later call reports it again.
pub struct AttachmentsAdapter<A: AttachmentStream> {
    attachments: A,
    state: CursorState,
}

impl<A: AttachmentStream> AttachmentsAdapter<A> {
    pub fn new(attachments: A) -> Self {
        Self {
            attachments,
            state: CursorState::Open,
        }
    }
}

#[async_trait]
impl<A> DriverAttachments for AttachmentsAdapter<A>
where
    A: AttachmentStream + 'static,
{
    async fn next(&mut self, attachment: &mut Attachment) -> DocResult<()> {
        self.state.check()?;

        match self.attachments.next().await? {
            Some(meta) => {
                *attachment = reshape::attachment(meta);
                Ok(())
            }
            None => {
                if let Err(err) = self.attachments.close().await {
                    warn!(error = %err, "failed to release exhausted attachment stream");
                }

                debug!("attachment cursor finished");
                self.state = CursorState::Finished(DocError::EndOfStream);

                Err(DocError::EndOfStream)
            }
        }
    }

    async fn close(&mut self) -> DocResult<()> {
        let was_open = self.state.is_open();
        self.state = CursorState::Closed;

        if was_open {
            self.attachments.close().await
        } else {
            Ok(())
        }
    }
}
