//! [`Transport`] over an axum [`WebSocket`].

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use duplex_connection::{Transport, TransportError};
use duplex_settings::FrameKind;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One upgraded WebSocket, split so receive and send never contend.
///
/// Each text or binary message is one payload. Ping and pong frames are
/// handled by axum and skipped here. `close` aborts any pending receive or
/// send; the TCP socket itself is released only when the transport is
/// dropped, i.e. once the session and the registry have let go of every
/// `Connection` clone.
pub struct WsTransport {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
    frame_kind: FrameKind,
    closed: CancellationToken,
}

impl WsTransport {
    /// Wrap an upgraded socket.
    pub fn new(socket: WebSocket, frame_kind: FrameKind) -> Self {
        let (sink, stream) = socket.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            frame_kind,
            closed: CancellationToken::new(),
        }
    }

    fn encode(&self, payload: Bytes) -> Message {
        match self.frame_kind {
            FrameKind::Binary => Message::Binary(payload),
            FrameKind::Text => match std::str::from_utf8(&payload) {
                Ok(text) => Message::Text(text.to_owned().into()),
                Err(_) => Message::Binary(payload),
            },
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn receive(&self) -> Result<Bytes, TransportError> {
        let mut stream = tokio::select! {
            biased;
            () = self.closed.cancelled() => return Err(TransportError::Closed),
            guard = self.stream.lock() => guard,
        };

        loop {
            let next = tokio::select! {
                biased;
                () = self.closed.cancelled() => return Err(TransportError::Closed),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Bytes::copy_from_slice(text.as_str().as_bytes()));
                }
                Some(Ok(Message::Binary(data))) => return Ok(data),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    trace!("control frame skipped");
                }
                Some(Ok(Message::Close(frame))) => {
                    trace!(?frame, "close frame received");
                    return Err(TransportError::PeerClosed);
                }
                Some(Err(err)) => return Err(TransportError::Io(err.to_string())),
                None => return Err(TransportError::PeerClosed),
            }
        }
    }

    async fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        let message = self.encode(payload);

        let mut sink = tokio::select! {
            biased;
            () = self.closed.cancelled() => return Err(TransportError::Closed),
            guard = self.sink.lock() => guard,
        };

        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(TransportError::Closed),
            sent = sink.send(message) => sent.map_err(|err| TransportError::Io(err.to_string())),
        }
    }

    fn close(&self) {
        self.closed.cancel();
    }
}
