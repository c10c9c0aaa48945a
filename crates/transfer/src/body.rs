use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use tokio::time::Instant;
use tokio_util::io::ReaderStream;

use crate::STREAM_CHUNK_SIZE;
use crate::progress::ProgressReporter;
use crate::source::SourceReader;

/// Time of the last chunk a body stream handed to the transport.
///
/// Clones share one clock. A transfer is stalled once the clock goes
/// unchanged for longer than the configured timeout, whether the source
/// stopped producing, the peer stopped reading or no response arrived.
#[derive(Debug, Clone)]
pub struct LastActivity(Arc<Mutex<Instant>>);

impl LastActivity {
    /// Starts the clock now.
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    pub fn touch(&self) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    /// Time since the last [`touch`](Self::touch).
    pub fn idle_for(&self) -> Duration {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).elapsed()
    }

    /// Resolves once the clock has gone `limit` without a touch.
    pub async fn stalled(&self, limit: Duration) {
        loop {
            let idle = self.idle_for();
            if idle >= limit {
                return;
            }
            tokio::time::sleep(limit - idle).await;
        }
    }
}

impl Default for LastActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Streams a source as a request body of exactly `expected` bytes.
///
/// A source that runs long is cut off with an `InvalidData` error as soon
/// as the first surplus chunk arrives; one that ends early fails with
/// `UnexpectedEof`. Either way the request is aborted instead of storing a
/// truncated or padded object.
pub struct SizedBodyStream {
    inner: ReaderStream<SourceReader>,
    expected: u64,
    sent: u64,
    reporter: ProgressReporter,
    activity: Option<LastActivity>,
    finished: bool,
}

impl SizedBodyStream {
    pub fn new(reader: SourceReader, expected: u64, reporter: ProgressReporter) -> Self {
        Self {
            inner: ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE),
            expected,
            sent: 0,
            reporter,
            activity: None,
            finished: false,
        }
    }

    /// Touches `activity` for every chunk handed out and at the end of the body.
    pub fn with_activity(mut self, activity: LastActivity) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Bytes handed to the transport so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    fn touch(&self) {
        if let Some(activity) = &self.activity {
            activity.touch();
        }
    }

    fn fail(&mut self, err: io::Error) -> Poll<Option<io::Result<Bytes>>> {
        self.finished = true;
        Poll::Ready(Some(Err(err)))
    }
}

impl Stream for SizedBodyStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => {
                let sent = this.sent + chunk.len() as u64;
                if sent > this.expected {
                    let expected = this.expected;
                    return this.fail(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("source produced more than the declared {expected} bytes"),
                    ));
                }
                this.sent = sent;
                this.reporter.record(chunk.len());
                this.touch();
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => this.fail(err),
            Poll::Ready(None) => {
                if this.sent < this.expected {
                    let (sent, expected) = (this.sent, this.expected);
                    return this.fail(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("source ended after {sent} of {expected} bytes"),
                    ));
                }
                this.finished = true;
                this.touch();
                Poll::Ready(None)
            }
        }
    }
}

impl std::fmt::Debug for SizedBodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizedBodyStream")
            .field("expected", &self.expected)
            .field("sent", &self.sent)
            .field("finished", &self.finished)
            .finish()
    }
}
