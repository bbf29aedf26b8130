//! Lifecycle bookkeeping for one connector.
//!
//! Only the state machine task holds a [`ConnectionState`]; everything else
//! sees it through [`ConnectorStatus`](super::ConnectorStatus) snapshots.

use serde::Serialize;

/// Where the connection is in its lifecycle.
///
/// `Authenticated` is a refinement of `Connected`: the socket is open and the
/// peer accepted our credential. There is no representable state where the
/// socket is gone but authentication survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Disconnected,
    /// Disconnected with a reconnect attempt scheduled.
    Reconnecting,
    Connecting,
    Connected,
    Authenticated,
}

impl Phase {
    /// Socket open, authenticated or not.
    pub fn is_connected(self) -> bool {
        matches!(self, Phase::Connected | Phase::Authenticated)
    }

    pub fn is_authenticated(self) -> bool {
        matches!(self, Phase::Authenticated)
    }

    /// Dialing or open: a new `connect` must not open another socket.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Connecting | Phase::Connected | Phase::Authenticated)
    }
}

pub(crate) struct ConnectionState {
    phase: Phase,
    reconnect_attempts: u32,
    auto_reconnect: bool,
    /// Id of the socket currently dialing or open.
    session: Option<u64>,
    /// Id of the scheduled reconnect timer.
    pending_reconnect: Option<u64>,
    next_id: u64,
}

impl ConnectionState {
    pub(crate) fn new(auto_reconnect: bool) -> Self {
        Self {
            phase: Phase::Disconnected,
            reconnect_attempts: 0,
            auto_reconnect,
            session: None,
            pending_reconnect: None,
            next_id: 0,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub(crate) fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    pub(crate) fn set_auto_reconnect(&mut self, enabled: bool) {
        self.auto_reconnect = enabled;
    }

    /// Allocate an id for a new socket and enter `Connecting`.
    pub(crate) fn begin_dial(&mut self) -> u64 {
        let id = self.allocate_id();
        self.session = Some(id);
        self.pending_reconnect = None;
        self.phase = Phase::Connecting;
        id
    }

    /// Socket `id` opened. Returns false if `id` is stale.
    pub(crate) fn mark_open(&mut self, id: u64) -> bool {
        if !self.is_current(id) || self.phase != Phase::Connecting {
            return false;
        }
        self.phase = Phase::Connected;
        self.reconnect_attempts = 0;
        true
    }

    pub(crate) fn mark_authenticated(&mut self) -> bool {
        if !self.phase.is_connected() {
            return false;
        }
        self.phase = Phase::Authenticated;
        true
    }

    /// Peer rejected or revoked authentication; the socket stays open.
    pub(crate) fn mark_unauthenticated(&mut self) {
        if self.phase == Phase::Authenticated {
            self.phase = Phase::Connected;
        }
    }

    /// Drop the current socket. Authentication goes with it.
    pub(crate) fn mark_disconnected(&mut self) {
        self.phase = Phase::Disconnected;
        self.session = None;
    }

    /// Schedule a reconnect: counts the attempt and returns the timer id.
    pub(crate) fn begin_reconnect(&mut self) -> u64 {
        let id = self.allocate_id();
        self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);
        self.pending_reconnect = Some(id);
        self.phase = Phase::Reconnecting;
        id
    }

    /// Claim the reconnect timer `id`. Returns false if it was cancelled or superseded.
    pub(crate) fn take_reconnect(&mut self, id: u64) -> bool {
        if self.pending_reconnect == Some(id) && self.phase == Phase::Reconnecting {
            self.pending_reconnect = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn cancel_reconnect(&mut self) {
        self.pending_reconnect = None;
        if self.phase == Phase::Reconnecting {
            self.phase = Phase::Disconnected;
        }
    }

    pub(crate) fn reset_attempts(&mut self) {
        self.reconnect_attempts = 0;
    }

    pub(crate) fn is_current(&self, id: u64) -> bool {
        self.session == Some(id)
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }
}
