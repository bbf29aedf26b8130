//! Requests submitted before the peer accepted our credential.
//!
//! The queue is plain FIFO storage owned by the connection state machine.
//! It never blocks and never refuses an entry; growth is unbounded, so a
//! caller that submits forever against a peer that never authenticates will
//! grow it forever. Contents are dropped on an explicit disconnect and kept
//! across transport drops so they replay after reconnecting.

use crate::event::{ChatOptions, SpeakOptions};

use std::collections::VecDeque;

use log::debug;

/// A send request waiting for authentication.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingRequest {
    Chat { text: String, options: ChatOptions },
    Speak { text: String, options: SpeakOptions },
}

impl PendingRequest {
    pub fn text(&self) -> &str {
        match self {
            PendingRequest::Chat { text, .. } | PendingRequest::Speak { text, .. } => text,
        }
    }
}

#[derive(Debug, Default)]
pub struct OutboundQueue {
    entries: VecDeque<PendingRequest>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request. Returns the queue length after the push.
    pub fn enqueue(&mut self, request: PendingRequest) -> usize {
        self.entries.push_back(request);
        debug!("Queued request, {} pending", self.entries.len());
        self.entries.len()
    }

    /// Hand every entry to `send`, oldest first, leaving the queue empty.
    ///
    /// Entries are removed before `send` sees them, so a failing sender
    /// cannot cause a replay of the same entry. Returns how many were drained.
    pub fn drain_into<F>(&mut self, mut send: F) -> usize
    where
        F: FnMut(PendingRequest),
    {
        let mut drained = 0;
        while let Some(request) = self.entries.pop_front() {
            send(request);
            drained += 1;
        }
        drained
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
