//! Training-progress stream.
//!
//! [`ProgressStream`] reads the backend's server-sent event stream for
//! one training job and hands out in-progress updates one at a time.
//! The stream ends after exactly one terminal outcome:
//!
//! * `None` from [`ProgressStream::next`] once training completed,
//! * a single `Some(Err(..))` for a backend error, a lost connection or
//!   cancellation, followed by `None`.
//!
//! The HTTP connection is dropped before the terminal outcome is returned.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use shadematch_core::types::DbId;
use tokio_util::sync::CancellationToken;

use crate::api::ShadeMatchApi;
use crate::messages::{parse_progress, ProgressStatus, TrainingProgress};
use crate::sse::{SseDecoder, SseEvent};

/// Message reported once training completes.
pub const TRAINING_COMPLETE: &str = "Training complete!";

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, BoxError>> + Send>>;

/// Terminal failures of a training stream.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    /// The backend reported an `error` event.
    #[error("{0}")]
    Failed(String),

    /// The connection could not be opened, broke, or ended early.
    #[error("Connection to training server lost")]
    ConnectionLost,

    /// The caller cancelled the stream.
    #[error("Training progress stream cancelled")]
    Cancelled,
}

/// Successful end of a training job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingComplete {
    pub color_id: DbId,
    pub message: String,
}

enum Step {
    Yield(TrainingProgress),
    Skip,
    Complete,
    Fail(TrainingError),
}

enum Read {
    Cancelled,
    Chunk(Option<Result<Vec<u8>, BoxError>>),
}

/// Lazily consumed progress updates for one training job.
pub struct ProgressStream {
    color_id: DbId,
    body: Option<ChunkStream>,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    cancel: CancellationToken,
    completed: bool,
}

impl ShadeMatchApi {
    /// `GET /train/{id}/stream`. Opens the progress stream for a colour.
    pub async fn stream_training(&self, color_id: DbId) -> Result<ProgressStream, TrainingError> {
        ProgressStream::connect(self, color_id).await
    }
}

impl ProgressStream {
    /// Open the event stream for `color_id`.
    ///
    /// Any failure to connect, including a non-success status, is
    /// reported as [`TrainingError::ConnectionLost`].
    pub async fn connect(api: &ShadeMatchApi, color_id: DbId) -> Result<Self, TrainingError> {
        let url = api.url(&format!("/train/{color_id}/stream"));

        let response = api
            .http()
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(color_id, error = %e, "Failed to open training stream");
                TrainingError::ConnectionLost
            })?;

        let response = ShadeMatchApi::ensure_success(response).await.map_err(|e| {
            tracing::error!(color_id, error = %e, "Training stream rejected");
            TrainingError::ConnectionLost
        })?;

        tracing::info!(color_id, "Training stream opened");

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()));
        Ok(Self::from_chunks(color_id, chunks))
    }

    /// Build a stream over raw event-stream bytes from any source.
    pub fn from_chunks<S, E>(color_id: DbId, chunks: S) -> Self
    where
        S: Stream<Item = Result<Vec<u8>, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            color_id,
            body: Some(Box::pin(chunks.map(|chunk| chunk.map_err(Into::into)))),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            cancel: CancellationToken::new(),
            completed: false,
        }
    }

    pub fn color_id(&self) -> DbId {
        self.color_id
    }

    /// Token that force-closes the stream when cancelled.
    ///
    /// The next call to [`next`](Self::next) then yields
    /// [`TrainingError::Cancelled`].
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// `true` once the backend reported `complete`.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// `true` once the connection has been closed for any reason.
    pub fn is_closed(&self) -> bool {
        self.body.is_none()
    }

    /// Wait for the next in-progress update.
    ///
    /// Returns `None` after successful completion and on every call after
    /// the terminal outcome has been delivered.
    pub async fn next(&mut self) -> Option<Result<TrainingProgress, TrainingError>> {
        if self.is_closed() {
            return None;
        }
        if self.cancel.is_cancelled() {
            return self.fail(TrainingError::Cancelled);
        }

        loop {
            while let Some(event) = self.pending.pop_front() {
                match self.handle_event(event) {
                    Step::Yield(progress) => return Some(Ok(progress)),
                    Step::Skip => {}
                    Step::Complete => {
                        self.close();
                        self.completed = true;
                        tracing::info!(color_id = self.color_id, "Training complete");
                        return None;
                    }
                    Step::Fail(err) => return self.fail(err),
                }
            }

            let read = {
                let body = self.body.as_mut()?;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Read::Cancelled,
                    chunk = body.next() => Read::Chunk(chunk),
                }
            };

            match read {
                Read::Cancelled => {
                    tracing::info!(color_id = self.color_id, "Training stream cancelled");
                    return self.fail(TrainingError::Cancelled);
                }
                Read::Chunk(Some(Ok(bytes))) => match self.decoder.push(&bytes) {
                    Ok(events) => self.pending.extend(events),
                    Err(e) => {
                        tracing::error!(color_id = self.color_id, error = %e, "Malformed event stream");
                        return self.fail(TrainingError::ConnectionLost);
                    }
                },
                Read::Chunk(Some(Err(e))) => {
                    tracing::error!(color_id = self.color_id, error = %e, "Training stream receive error");
                    return self.fail(TrainingError::ConnectionLost);
                }
                Read::Chunk(None) => {
                    tracing::warn!(color_id = self.color_id, "Training stream ended before completion");
                    return self.fail(TrainingError::ConnectionLost);
                }
            }
        }
    }

    /// Drive the stream to its end, passing each update to `on_progress`.
    pub async fn run<F>(mut self, mut on_progress: F) -> Result<TrainingComplete, TrainingError>
    where
        F: FnMut(&TrainingProgress),
    {
        while let Some(update) = self.next().await {
            on_progress(&update?);
        }
        Ok(TrainingComplete {
            color_id: self.color_id,
            message: TRAINING_COMPLETE.to_string(),
        })
    }

    /// Adapt into a [`futures::Stream`] of updates.
    pub fn into_stream(self) -> impl Stream<Item = Result<TrainingProgress, TrainingError>> {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next().await.map(|item| (item, stream))
        })
    }

    // ---- private helpers ----

    fn handle_event(&self, event: SseEvent) -> Step {
        if !event.is_message() {
            tracing::debug!(color_id = self.color_id, event = ?event.event, "Ignoring named event");
            return Step::Skip;
        }

        match parse_progress(&event.data) {
            Ok(progress) => match progress.kind() {
                ProgressStatus::Complete => Step::Complete,
                ProgressStatus::Error => {
                    Step::Fail(TrainingError::Failed(progress.error_message().to_string()))
                }
                ProgressStatus::InProgress => {
                    tracing::debug!(
                        color_id = self.color_id,
                        status = %progress.status,
                        percentage = ?progress.percentage,
                        "Training progress",
                    );
                    Step::Yield(progress)
                }
            },
            Err(e) => {
                tracing::warn!(
                    color_id = self.color_id,
                    error = %e,
                    raw_message = %event.data,
                    "Failed to parse training progress event",
                );
                Step::Skip
            }
        }
    }

    fn close(&mut self) {
        self.body = None;
        self.pending.clear();
        tracing::debug!(color_id = self.color_id, "Training stream closed");
    }

    fn fail(&mut self, err: TrainingError) -> Option<Result<TrainingProgress, TrainingError>> {
        self.close();
        Some(Err(err))
    }
}
