//! Unbuffered byte relay from an upstream body to the client.
//!
//! Upstream data frames are pushed into a small bounded channel whose
//! receiving end is the downstream response body. The channel bound gives
//! backpressure: a slow client stalls the relay instead of growing a buffer.
//! When the server drops the response body (client gone), the channel closes
//! and the relay notices even while upstream is idle.

use std::io;

use axum::body::Body as DownstreamBody;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::stream::error::BoxError;

/// Chunks buffered between upstream and the client connection.
pub const RELAY_BUFFER_CHUNKS: usize = 8;

/// One item of the downstream body.
pub type RelayChunk = Result<Bytes, io::Error>;

/// How a relay loop ended.
#[derive(Debug)]
pub enum RelayOutcome {
    /// Upstream ended its body.
    Completed,
    /// The client went away. Not an error.
    DownstreamDisconnected,
    /// Reading from upstream failed mid-stream.
    Failed(BoxError),
}

impl RelayOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::DownstreamDisconnected => "client_disconnected",
            Self::Failed(_) => "relay_failed",
        }
    }
}

/// Counters for one relay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub chunks: u64,
    pub bytes: u64,
}

impl RelayStats {
    pub fn record(&mut self, len: usize) {
        self.chunks += 1;
        self.bytes += len as u64;
    }
}

/// Create the channel feeding a streaming response body.
pub fn downstream_channel() -> (mpsc::Sender<RelayChunk>, DownstreamBody) {
    let (tx, rx) = mpsc::channel(RELAY_BUFFER_CHUNKS);
    (tx, DownstreamBody::from_stream(ReceiverStream::new(rx)))
}

/// Wait for the first non-empty data frame.
///
/// Used before the response is committed so that an early upstream failure
/// can still become an error status. `Ok(None)` means upstream ended with no
/// data.
pub async fn first_chunk<B>(upstream: &mut B) -> Result<Option<Bytes>, BoxError>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    while let Some(frame) = upstream.frame().await {
        let frame = frame.map_err(Into::<BoxError>::into)?;
        if let Ok(data) = frame.into_data() {
            if !data.is_empty() {
                return Ok(Some(data));
            }
        }
    }
    Ok(None)
}

/// Copy `upstream` into `downstream` until either side ends.
///
/// Non-data frames (trailers) are dropped. On an upstream error the error is
/// forwarded into the body so the server aborts the response instead of
/// terminating it cleanly.
pub async fn relay<B>(
    mut upstream: B,
    downstream: mpsc::Sender<RelayChunk>,
    stats: &mut RelayStats,
) -> RelayOutcome
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = downstream.closed() => return RelayOutcome::DownstreamDisconnected,
            frame = upstream.frame() => frame,
        };

        let data = match frame {
            None => return RelayOutcome::Completed,
            Some(Err(e)) => {
                let cause: BoxError = e.into();
                let _ = downstream.send(Err(io::Error::other(cause.to_string()))).await;
                return RelayOutcome::Failed(cause);
            }
            Some(Ok(frame)) => match frame.into_data() {
                Ok(data) if !data.is_empty() => data,
                _ => continue,
            },
        };

        let len = data.len();
        if downstream.send(Ok(data)).await.is_err() {
            return RelayOutcome::DownstreamDisconnected;
        }
        stats.record(len);
    }
}
