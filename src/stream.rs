//! Streaming extraction API: observe the response as it arrives.
//!
//! Large documents take a while to generate. A stream-based API lets
//! callers display partial text immediately or wire up progress UI
//! instead of staring at a silent await.
//!
//! Unlike the eager [`crate::extract::extract`], which returns only
//! when the document is validated, [`extract_stream`] yields every
//! partial chunk as an event and finishes with the validated result.
//! The event sequence per call is fixed: zero or more
//! [`ExtractEvent::Chunk`] items in arrival order, then exactly one
//! terminal [`ExtractEvent::Completed`]. On failure the stream ends
//! with an `Err` instead of `Completed`.

use std::pin::Pin;

use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::error::PdftomdError;
use crate::extract::run_structured;
use crate::input::PdfInput;
use crate::output::Extraction;

/// One event in a streaming extraction.
#[derive(Debug, Clone)]
pub enum ExtractEvent {
    /// A partial text chunk, forwarded in arrival order.
    Chunk(String),
    /// The terminal event: the fully validated extraction.
    Completed(Box<Extraction>),
}

/// A boxed stream of extraction events.
pub type ExtractStream = Pin<Box<dyn Stream<Item = Result<ExtractEvent, PdftomdError>> + Send>>;

/// Extract a document, streaming partial chunks as they arrive.
///
/// Must be called within a Tokio runtime: the extraction runs on a
/// spawned task feeding the returned stream. Dropping the stream
/// cancels the extraction cooperatively at its next chunk.
pub fn extract_stream(input: impl Into<PdfInput>, config: &ExtractionConfig) -> ExtractStream {
    let input = input.into();
    let config = config.clone();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        let chunk_tx = tx.clone();
        let mut forward = move |chunk: &str| -> Result<(), crate::extract::CallbackError> {
            chunk_tx
                .send(Ok(ExtractEvent::Chunk(chunk.to_string())))
                .map_err(|_| "stream receiver dropped".into())
        };

        let result = run_structured(&input, &config, Some(&mut forward)).await;
        match result {
            Ok(extraction) => {
                debug!("streaming extraction completed");
                let _ = tx.send(Ok(ExtractEvent::Completed(Box::new(extraction))));
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
    });

    Box::pin(UnboundedReceiverStream::new(rx))
}
