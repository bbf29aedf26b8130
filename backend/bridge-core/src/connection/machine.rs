//! The connection state machine task.
//!
//! One task per connector owns the socket, the outbound queue, the heartbeat
//! and reconnect timers, and the lifecycle [`ConnectionState`]. Caller
//! requests and socket/timer events arrive on a single channel and are
//! handled one at a time, so no two handlers ever interleave.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Authenticated
//!       ^              |            |              |
//!       |              +------------+--------------+--> Disconnected
//!       |                                                   |
//!       +---------------- Reconnecting <--------------------+ (auto-reconnect)
//! ```

use super::command::{Command, InboundFrame, Reply};
use super::heartbeat::HeartbeatMonitor;
use super::reconnect::ReconnectPolicy;
use super::session::{self, Session, WsStream};
use super::state::{ConnectionState, Phase};
use super::{ConnectOutcome, ConnectorStatus, SendOutcome};
use crate::config::BridgeConfig;
use crate::dispatcher::EventDispatcher;
use crate::error::{CodecError, ConnectionError};
use crate::event::payload::{
    AnnounceData, AuthResult, AuthenticateData, ChatData, HeartbeatData, SpeakData,
};
use crate::event::{Envelope, EventCodec, Frame, HeartbeatKind, notifications, types};
use crate::identity::Identity;
use crate::queue::{OutboundQueue, PendingRequest};

use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

pub(crate) struct StateMachine {
    config: BridgeConfig,
    identity: Identity,
    codec: EventCodec,
    policy: ReconnectPolicy,
    dispatcher: Arc<EventDispatcher>,
    commands: UnboundedSender<Command>,

    state: ConnectionState,
    queue: OutboundQueue,
    heartbeat: HeartbeatMonitor,
    session: Option<Session>,
    dial: Option<JoinHandle<()>>,
    pending_connect: Option<Reply<Result<ConnectOutcome, ConnectionError>>>,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl StateMachine {
    pub(crate) fn new(
        config: BridgeConfig,
        identity: Identity,
        policy: ReconnectPolicy,
        dispatcher: Arc<EventDispatcher>,
        commands: UnboundedSender<Command>,
    ) -> Self {
        let codec = EventCodec::new(config.airi.connection.wire_format);
        let heartbeat = HeartbeatMonitor::new(config.heartbeat_interval());
        let state = ConnectionState::new(config.airi.connection.auto_reconnect);

        Self {
            config,
            identity,
            codec,
            policy,
            dispatcher,
            commands,
            state,
            queue: OutboundQueue::new(),
            heartbeat,
            session: None,
            dial: None,
            pending_connect: None,
            reconnect_timer: None,
        }
    }

    /// Process commands until shutdown or until every sender is gone.
    pub(crate) async fn run(mut self, mut inbox: UnboundedReceiver<Command>) {
        debug!("Connection state machine started for {}", self.config.url());

        while let Some(command) = inbox.recv().await {
            if !self.handle(command) {
                break;
            }
        }

        self.teardown();
        debug!("Connection state machine stopped");
    }

    /// Returns false when the loop should stop.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Connect { reply } => self.handle_connect(Some(reply)),
            Command::Disconnect { reply } => {
                self.handle_disconnect();
                let _ = reply.send(());
            }
            Command::Send { request, reply } => {
                let outcome = self.handle_send(request);
                let _ = reply.send(outcome);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown => return false,
            Command::Opened { session, stream } => self.handle_opened(session, *stream),
            Command::OpenFailed { session, error } => self.handle_open_failed(session, error),
            Command::Inbound { session, frame } => self.handle_inbound(session, frame),
            Command::Closed { session, error } => self.handle_closed(session, error),
            Command::HeartbeatTick { session } => self.handle_heartbeat_tick(session),
            Command::ReconnectDue { timer } => self.handle_reconnect_due(timer),
        }
        true
    }

    // ============================================
    // CALLER REQUESTS
    // ============================================

    /// `reply` is `Some` for caller-initiated connects and `None` for
    /// reconnect attempts.
    fn handle_connect(&mut self, reply: Option<Reply<Result<ConnectOutcome, ConnectionError>>>) {
        let phase = self.state.phase();
        if phase.is_active() {
            debug!("Connect requested while {phase:?}, ignoring");
            if let Some(reply) = reply {
                let outcome = if phase == Phase::Connecting {
                    ConnectOutcome::AlreadyConnecting
                } else {
                    ConnectOutcome::AlreadyConnected
                };
                let _ = reply.send(Ok(outcome));
            }
            return;
        }

        if reply.is_some() {
            // An explicit connect restarts the reconnect budget and re-arms
            // auto-reconnect after a previous disconnect().
            self.cancel_reconnect_timer();
            self.state.reset_attempts();
            self.state
                .set_auto_reconnect(self.config.airi.connection.auto_reconnect);
        }

        let session = self.state.begin_dial();
        self.pending_connect = reply;
        self.dial = Some(session::dial(
            self.config.url().to_string(),
            session,
            self.commands.clone(),
        ));
    }

    fn handle_disconnect(&mut self) {
        let was_active = self.state.phase().is_active();

        self.state.set_auto_reconnect(false);
        self.cancel_reconnect_timer();
        self.heartbeat.stop();
        self.abort_dial();

        if let Some(reply) = self.pending_connect.take() {
            let _ = reply.send(Err(ConnectionError::not_connected(
                "disconnect requested before the socket opened",
            )));
        }
        if let Some(session) = self.session.take() {
            session.close();
        }

        self.state.mark_disconnected();
        let dropped = self.queue.clear();
        if dropped > 0 {
            warn!("Dropped {dropped} queued requests on disconnect");
        }

        info!("Disconnected from {}", self.config.url());
        if was_active {
            self.emit(notifications::DISCONNECTED, &Value::Null);
        }
    }

    fn handle_send(&mut self, request: PendingRequest) -> Result<SendOutcome, ConnectionError> {
        if !self.state.phase().is_authenticated() {
            debug!("Not authenticated, queueing request");
            let queue_length = self.queue.enqueue(request);
            return Ok(SendOutcome::Queued { queue_length });
        }
        self.transmit_request(request)
    }

    fn status(&self) -> ConnectorStatus {
        let phase = self.state.phase();
        ConnectorStatus {
            connected: phase.is_connected(),
            authenticated: phase.is_authenticated(),
            phase,
            url: self.config.url().to_string(),
            identity: self.identity.clone(),
            queue_length: self.queue.len(),
            reconnect_attempts: self.state.reconnect_attempts(),
        }
    }

    // ============================================
    // SOCKET EVENTS
    // ============================================

    fn handle_opened(&mut self, session: u64, stream: WsStream) {
        if !self.state.mark_open(session) {
            debug!("Dropping socket {session}: no longer wanted");
            return;
        }
        self.dial = None;

        info!("WebSocket connected to {}", self.config.url());
        self.session = Some(Session::start(session, stream, self.commands.clone()));
        self.heartbeat.start(session, self.commands.clone());

        if let Some(reply) = self.pending_connect.take() {
            let _ = reply.send(Ok(ConnectOutcome::Opened));
        }
        self.emit(notifications::CONNECTED, &json!({ "url": self.config.url() }));

        self.authenticate();
    }

    fn handle_open_failed(&mut self, session: u64, error: ConnectionError) {
        if !self.state.is_current(session) {
            return;
        }
        self.dial = None;

        error!("WebSocket connection failed: {error}");
        let message = error.to_string();
        if let Some(reply) = self.pending_connect.take() {
            let _ = reply.send(Err(error));
        }
        self.emit(notifications::ERROR, &json!({ "message": message }));

        self.on_socket_gone();
    }

    fn handle_closed(&mut self, session: u64, error: Option<ConnectionError>) {
        if !self.state.is_current(session) {
            trace!("Ignoring close of stale socket {session}");
            return;
        }

        if let Some(session) = self.session.take() {
            session.abandon();
        }

        match error {
            Some(error) => {
                error!("WebSocket error: {error}");
                self.emit(notifications::ERROR, &json!({ "message": error.to_string() }));
            }
            None => info!("WebSocket closed"),
        }

        self.on_socket_gone();
    }

    /// Shared tail of every unplanned socket loss.
    fn on_socket_gone(&mut self) {
        self.state.mark_disconnected();
        self.heartbeat.stop();
        self.emit(notifications::DISCONNECTED, &Value::Null);

        if self.state.auto_reconnect() {
            self.schedule_reconnect();
        }
    }

    fn handle_inbound(&mut self, session: u64, frame: InboundFrame) {
        if !self.state.is_current(session) {
            return;
        }

        let decoded = match &frame {
            InboundFrame::Text(text) => self.codec.decode(text),
            InboundFrame::Binary(bytes) => self.codec.decode_bytes(bytes),
        };

        match decoded {
            Ok(Frame::Event(envelope)) => self.route(envelope),
            Ok(Frame::KeepAlive) => trace!("Keep-alive frame"),
            Err(e) => warn!("Discarding inbound frame: {e}"),
        }
    }

    fn route(&mut self, envelope: Envelope) {
        let event_type = envelope.event_type().to_string();
        debug!("Received: {event_type}");

        match event_type.as_str() {
            types::AUTHENTICATED => self.handle_auth_result(envelope.into_data()),
            types::CHAT_MESSAGE => {
                if let Some(content) = envelope.data().pointer("/message/content") {
                    debug!("AI response: {content}");
                }
                self.emit(notifications::MESSAGE, envelope.data());
            }
            types::CHAT_COMPLETE => self.emit(notifications::COMPLETE, envelope.data()),
            types::HEARTBEAT => self.handle_peer_heartbeat(envelope.data()),
            types::ERROR => {
                let message = envelope
                    .data()
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("(no message)");
                error!("Peer reported error: {message}");
                self.emit(notifications::ERROR, envelope.data());
            }
            other => {
                debug!("Unhandled event: {other}");
                self.emit(other, envelope.data());
            }
        }
    }

    fn handle_auth_result(&mut self, data: Value) {
        let result: AuthResult = serde_json::from_value(data.clone()).unwrap_or_default();

        if !result.authenticated {
            error!(
                "Authentication failed: {}",
                result.message.as_deref().unwrap_or("(no reason given)")
            );
            self.state.mark_unauthenticated();
            self.emit(notifications::AUTH_FAILED, &data);
            return;
        }

        if !self.state.mark_authenticated() {
            warn!("Authentication result arrived without an open socket");
            return;
        }

        info!("Authenticated with {}", self.config.url());
        self.announce();
        self.emit(notifications::AUTHENTICATED, &data);
        self.drain_queue();
    }

    fn handle_peer_heartbeat(&mut self, data: &Value) {
        match serde_json::from_value::<HeartbeatData>(data.clone()) {
            Ok(heartbeat) => {
                if heartbeat.kind == HeartbeatKind::Pong {
                    self.heartbeat.record_pong();
                }
                if let Some(reply) = HeartbeatMonitor::reply_to(heartbeat.kind) {
                    self.send_heartbeat(reply);
                }
            }
            Err(e) => debug!("Heartbeat with unexpected payload: {e}"),
        }
        self.emit(notifications::HEARTBEAT, data);
    }

    // ============================================
    // TIMERS
    // ============================================

    fn handle_heartbeat_tick(&mut self, session: u64) {
        if !self.state.is_current(session) || !self.state.phase().is_connected() {
            return;
        }
        self.heartbeat.record_ping_sent();
        self.send_heartbeat(HeartbeatKind::Ping);
    }

    fn schedule_reconnect(&mut self) {
        let attempts = self.state.reconnect_attempts();

        if self.policy.is_exhausted(attempts) {
            let error = ConnectionError::reconnect_exhausted(attempts);
            error!("Max reconnect attempts reached: {error}");
            self.emit(
                notifications::RECONNECT_EXHAUSTED,
                &json!({ "attempts": attempts, "message": error.to_string() }),
            );
            return;
        }

        let delay = self.policy.delay_for_attempt(attempts);
        let timer = self.state.begin_reconnect();
        info!(
            "Reconnecting in {}ms (attempt {})",
            delay.as_millis(),
            attempts + 1
        );

        let commands = self.commands.clone();
        self.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(Command::ReconnectDue { timer });
        }));

        self.emit(
            notifications::RECONNECTING,
            &json!({ "attempt": attempts + 1, "delayMs": delay.as_millis() as u64 }),
        );
    }

    fn handle_reconnect_due(&mut self, timer: u64) {
        if !self.state.take_reconnect(timer) {
            trace!("Ignoring cancelled reconnect timer {timer}");
            return;
        }
        self.reconnect_timer = None;
        self.handle_connect(None);
    }

    // ============================================
    // OUTBOUND
    // ============================================

    fn authenticate(&self) {
        let data = AuthenticateData {
            token: self.config.token().map(|t| t.as_str()),
            identity: &self.identity,
        };
        info!("Sending authentication");
        self.send_event(types::AUTHENTICATE, &data);
    }

    fn announce(&self) {
        let data = AnnounceData::for_identity(&self.identity);
        info!("Announcing plugin");
        self.send_event(types::ANNOUNCE, &data);
    }

    fn send_heartbeat(&self, kind: HeartbeatKind) {
        trace!("Sending heartbeat {kind:?}");
        self.send_event(types::HEARTBEAT, &HeartbeatData { kind });
    }

    /// Send a protocol event whose failure is logged rather than returned.
    fn send_event<T: Serialize>(&self, event_type: &str, data: &T) {
        let result = serde_json::to_value(data)
            .map_err(|e| {
                ConnectionError::from(CodecError::encode(format!(
                    "Failed to encode {event_type} payload: {e}"
                )))
            })
            .and_then(|data| self.transmit(Envelope::new(event_type, &self.identity, data)));

        if let Err(e) = result {
            error!("Failed to send {event_type}: {e}");
        }
    }

    fn drain_queue(&mut self) {
        let mut queue = std::mem::take(&mut self.queue);
        if queue.is_empty() {
            return;
        }

        info!("Sending {} queued requests", queue.len());
        queue.drain_into(|request| {
            if let Err(e) = self.transmit_request(request) {
                error!("Failed to send queued request: {e}");
            }
        });
    }

    fn transmit_request(&self, request: PendingRequest) -> Result<SendOutcome, ConnectionError> {
        let default_source = self.identity.plugin_id().unwrap_or(self.identity.id.as_str());

        match request {
            PendingRequest::Chat { text, options } => {
                let data = ChatData::user(&text, options, default_source);
                let message_id = data.message.id.clone();
                let data = serde_json::to_value(&data).map_err(|e| {
                    CodecError::encode(format!("Failed to encode chat payload: {e}"))
                })?;

                info!("Sending message: {}", preview(&text));
                self.transmit(Envelope::new(types::CHAT, &self.identity, data))?;
                Ok(SendOutcome::Sent { message_id })
            }
            PendingRequest::Speak { text, options } => {
                let data = serde_json::to_value(SpeakData::new(&text, options)).map_err(|e| {
                    CodecError::encode(format!("Failed to encode speak payload: {e}"))
                })?;
                let envelope = Envelope::new(types::SPEAK, &self.identity, data);
                let message_id = envelope.id().to_string();

                info!("Sending speak: {}", preview(&text));
                self.transmit(envelope)?;
                Ok(SendOutcome::Sent { message_id })
            }
        }
    }

    fn transmit(&self, envelope: Envelope) -> Result<(), ConnectionError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| ConnectionError::not_connected("WebSocket is not open"))?;

        let text = self.codec.encode(&envelope)?;
        trace!("Session {}: sending {}", session.id(), envelope.event_type());
        session.send_text(text)
    }

    // ============================================
    // HELPERS
    // ============================================

    fn emit(&self, event: &str, payload: &Value) {
        let report = self.dispatcher.emit(event, payload);
        if report.failed > 0 {
            warn!(
                "{} of {} handlers for '{event}' failed",
                report.failed,
                report.failed + report.delivered
            );
        }
    }

    fn cancel_reconnect_timer(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        self.state.cancel_reconnect();
    }

    fn abort_dial(&mut self) {
        if let Some(dial) = self.dial.take() {
            dial.abort();
        }
    }

    fn teardown(&mut self) {
        self.state.set_auto_reconnect(false);
        self.cancel_reconnect_timer();
        self.heartbeat.stop();
        self.abort_dial();
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.state.mark_disconnected();
    }
}

const PREVIEW_CHARS: usize = 50;

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
