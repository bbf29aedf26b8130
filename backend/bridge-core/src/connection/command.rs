//! Messages processed by the state machine task.
//!
//! Caller requests and socket/timer events share one channel, so the state
//! machine handles them strictly one at a time in arrival order.

use super::session::WsStream;
use super::{ConnectOutcome, ConnectorStatus, SendOutcome};
use crate::error::ConnectionError;
use crate::queue::PendingRequest;

use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Command {
    // Caller requests
    Connect {
        reply: Reply<Result<ConnectOutcome, ConnectionError>>,
    },
    Disconnect {
        reply: Reply<()>,
    },
    Send {
        request: PendingRequest,
        reply: Reply<Result<SendOutcome, ConnectionError>>,
    },
    Status {
        reply: Reply<ConnectorStatus>,
    },
    /// Last caller handle dropped.
    Shutdown,

    // Socket and timer events, tagged with the id they belong to
    Opened {
        session: u64,
        stream: Box<WsStream>,
    },
    OpenFailed {
        session: u64,
        error: ConnectionError,
    },
    Inbound {
        session: u64,
        frame: InboundFrame,
    },
    Closed {
        session: u64,
        error: Option<ConnectionError>,
    },
    HeartbeatTick {
        session: u64,
    },
    ReconnectDue {
        timer: u64,
    },
}

pub(crate) enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}
