//! Periodic liveness pings while a socket is open.
//!
//! The monitor only schedules ticks; the state machine turns each tick into a
//! `ping` envelope so that every write goes through the same ordered path.
//! A peer that stops answering is not declared dead here: a missing `pong`
//! is logged at debug level and nothing else happens.

use super::command::Command;
use crate::event::HeartbeatKind;

use std::time::{Duration, Instant};

use log::{debug, trace};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};

pub(crate) struct HeartbeatMonitor {
    interval: Duration,
    task: Option<JoinHandle<()>>,
    pings_sent: u64,
    last_pong: Option<Instant>,
}

impl HeartbeatMonitor {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
            pings_sent: 0,
            last_pong: None,
        }
    }

    /// Start ticking for socket `session`, replacing any previous timer.
    pub(crate) fn start(&mut self, session: u64, commands: UnboundedSender<Command>) {
        self.stop();
        self.pings_sent = 0;
        self.last_pong = None;

        let period = self.interval;
        debug!("Heartbeat started every {period:?}");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if commands.send(Command::HeartbeatTick { session }).is_err() {
                    break;
                }
            }
        }));
    }

    /// Cancel the timer. No tick is produced after this returns.
    pub(crate) fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Heartbeat stopped");
        }
    }

    pub(crate) fn record_ping_sent(&mut self) {
        if self.pings_sent > 0 && self.last_pong.is_none() {
            debug!("No pong received yet after {} pings", self.pings_sent);
        }
        self.pings_sent += 1;
    }

    pub(crate) fn record_pong(&mut self) {
        trace!("Pong received");
        self.last_pong = Some(Instant::now());
    }

    /// What to send back for an inbound liveness event.
    pub(crate) fn reply_to(kind: HeartbeatKind) -> Option<HeartbeatKind> {
        match kind {
            HeartbeatKind::Ping => Some(HeartbeatKind::Pong),
            HeartbeatKind::Pong => None,
        }
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
