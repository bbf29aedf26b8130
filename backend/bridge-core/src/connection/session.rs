//! Socket tasks for one open connection.
//!
//! A session owns the two halves of the WebSocket: a writer task draining an
//! ordered outbound channel and a reader task forwarding frames to the state
//! machine. Everything they report is tagged with the session id so the state
//! machine can ignore a session it has already abandoned.

use super::command::{Command, InboundFrame};
use crate::error::ConnectionError;

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Dial `url` in the background and report back as `Opened`/`OpenFailed`.
pub(crate) fn dial(url: String, session: u64, commands: UnboundedSender<Command>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Connecting to {url}");
        let result = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str())).await;

        let command = match result {
            Ok(Ok((stream, _response))) => Command::Opened {
                session,
                stream: Box::new(stream),
            },
            Ok(Err(e)) => Command::OpenFailed {
                session,
                error: ConnectionError::open(&url, e.to_string()),
            },
            Err(_) => Command::OpenFailed {
                session,
                error: ConnectionError::open(
                    &url,
                    format!("timed out after {}s", CONNECT_TIMEOUT.as_secs()),
                ),
            },
        };

        // Receiver gone means the connector was dropped while dialing.
        let _ = commands.send(command);
    })
}

pub(crate) struct Session {
    id: u64,
    outbound: UnboundedSender<Message>,
    reader: JoinHandle<()>,
}

impl Session {
    /// Split `stream` and spawn its reader and writer.
    pub(crate) fn start(id: u64, stream: WsStream, commands: UnboundedSender<Command>) -> Self {
        let (sink, stream) = stream.split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(id, sink, outbound_rx, commands.clone()));
        let reader = tokio::spawn(read_loop(id, stream, commands));

        Self {
            id,
            outbound,
            reader,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Queue a text frame. Frames go out in the order they were queued.
    pub(crate) fn send_text(&self, text: String) -> Result<(), ConnectionError> {
        self.outbound
            .send(Message::Text(text.into()))
            .map_err(|_| ConnectionError::not_connected("socket writer has stopped"))
    }

    /// Send a close frame and stop reading. The writer exits once the frame
    /// is flushed.
    pub(crate) fn close(self) {
        let _ = self.outbound.send(Message::Close(None));
        self.reader.abort();
    }

    /// The socket already failed; just stop the tasks.
    pub(crate) fn abandon(self) {
        self.reader.abort();
    }
}

async fn write_loop(
    session: u64,
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: UnboundedReceiver<Message>,
    commands: UnboundedSender<Command>,
) {
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));

        if let Err(e) = sink.send(message).await {
            if !closing {
                warn!("Session {session}: write failed: {e}");
                let _ = commands.send(Command::Closed {
                    session,
                    error: Some(ConnectionError::from(e)),
                });
            }
            return;
        }

        if closing {
            debug!("Session {session}: close frame sent");
            break;
        }
    }

    let _ = sink.close().await;
    trace!("Session {session}: writer finished");
}

async fn read_loop(
    session: u64,
    mut stream: SplitStream<WsStream>,
    commands: UnboundedSender<Command>,
) {
    let error = loop {
        let frame = match stream.next().await {
            Some(Ok(Message::Text(text))) => InboundFrame::Text(text.as_str().to_owned()),
            Some(Ok(Message::Binary(data))) => InboundFrame::Binary(data.to_vec()),
            Some(Ok(Message::Close(frame))) => {
                debug!("Session {session}: peer closed ({frame:?})");
                break None;
            }
            // Control frames are answered by tungstenite itself.
            Some(Ok(_)) => continue,
            Some(Err(e)) => break Some(ConnectionError::read(e.to_string())),
            None => break None,
        };

        if commands.send(Command::Inbound { session, frame }).is_err() {
            return;
        }
    };

    let _ = commands.send(Command::Closed { session, error });
}
