//! Channel-backed sink and receiver handle.
//!
//! A [`ChannelSink`] fans each notification out to every open
//! [`NotificationStream`], so other threads can observe a tracker without
//! registering handlers on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

use crate::error::SinkError;

use super::{Notification, NotificationKind, NotificationSink};

/// Sink that forwards notifications to [`NotificationStream`] receivers.
///
/// Sends never block and never fail the publisher. A notification that a
/// receiver cannot take (dropped receiver, or full queue on a bounded sink)
/// is counted in [`ChannelSink::dropped`].
#[derive(Debug, Default)]
pub struct ChannelSink {
    senders: Vec<Sender<Notification>>,
    capacity: Option<usize>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    /// Sink whose receivers queue without limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose receivers each queue at most `capacity` notifications.
    /// Publishing to a full receiver drops the notification for it.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    /// Opens a new receiver. It sees every notification published after
    /// this call.
    pub fn subscribe(&mut self) -> NotificationStream {
        let (tx, rx) = match self.capacity {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        self.senders.push(tx);
        NotificationStream { rx }
    }

    /// Notifications that could not be delivered: the receiver was dropped
    /// or its bounded queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Receivers still connected.
    #[must_use]
    pub fn receivers(&self) -> usize {
        self.senders.len()
    }
}

impl NotificationSink for ChannelSink {
    fn publish(&mut self, notification: &Notification) -> Result<(), SinkError> {
        let dropped = &self.dropped;
        self.senders.retain(|tx| match tx.try_send(notification.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        });
        Ok(())
    }
}

/// Receiving end of a [`ChannelSink`] subscription.
#[derive(Debug, Clone)]
pub struct NotificationStream {
    rx: Receiver<Notification>,
}

impl NotificationStream {
    /// Receive the next notification (blocking).
    pub fn recv(&self) -> Result<Notification, SinkError> {
        self.rx.recv().map_err(|_| disconnected())
    }

    /// Receive the next notification if one is queued.
    pub fn try_recv(&self) -> Result<Option<Notification>, SinkError> {
        match self.rx.try_recv() {
            Ok(n) => Ok(Some(n)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(disconnected()),
        }
    }

    /// Receive the next notification, giving up after `timeout`.
    /// Returns `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Notification>, SinkError> {
        match self.rx.recv_timeout(timeout) {
            Ok(n) => Ok(Some(n)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(disconnected()),
        }
    }

    /// Drains notifications until the completion notification arrives or
    /// `timeout` elapses. Returns `Ok(None)` on timeout. A timeout too large
    /// to represent as a deadline waits without limit.
    pub fn wait_for_complete(&self, timeout: Duration) -> Result<Option<Notification>, SinkError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            loop {
                let n = self.recv()?;
                if n.kind() == NotificationKind::Complete {
                    return Ok(Some(n));
                }
            }
        };
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv_timeout(remaining)? {
                Some(n) if n.kind() == NotificationKind::Complete => return Ok(Some(n)),
                Some(_) => {}
                None => return Ok(None),
            }
        }
    }

    /// Notifications currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

fn disconnected() -> SinkError {
    SinkError::Disconnected {
        path: "notification_stream".to_string(),
    }
}
