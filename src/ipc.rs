use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex as RawMutex, channel::Channel};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{NOTIFY_CHANNEL_SIZE, PAYLOAD_MAX};
use crate::telemetry::{ChannelKey, NotificationChannel, Payload};

/// Peer-link flag: written by the BLE connection callbacks, polled by both samplers.
///
/// A single word with no compound invariant, so relaxed loads and stores are enough. A
/// connect/disconnect racing a cycle costs at most one stale or skipped publish.
pub struct ConnectionState {
    connected: AtomicBool,
}

impl ConnectionState {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

pub static CONNECTION: ConnectionState = ConnectionState::new();

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Notification {
    pub key: ChannelKey,
    pub payload: Payload,
}

pub type NotifyQueue = Channel<RawMutex, Notification, NOTIFY_CHANNEL_SIZE>;

/*  telemetry channel: samplers -> BLE connection loop */
pub static NOTIFY_CH: NotifyQueue = Channel::new();

/// [`NotificationChannel`] backed by a bounded queue drained by the BLE side.
///
/// `publish` never waits: when the queue is full the value is dropped.
pub struct QueuedNotifier<'a> {
    queue: &'a NotifyQueue,
    dropped: AtomicU32,
}

impl<'a> QueuedNotifier<'a> {
    pub const fn new(queue: &'a NotifyQueue) -> Self {
        Self {
            queue,
            dropped: AtomicU32::new(0),
        }
    }

    /// Notifications lost to a full queue since start-up.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl NotificationChannel for QueuedNotifier<'_> {
    fn publish(&self, key: ChannelKey, payload: &[u8]) {
        let Ok(text) = core::str::from_utf8(payload) else {
            warn!("non-UTF-8 payload for {:?}, dropping", key);
            return;
        };
        let mut value = Payload::new();
        if value.push_str(text).is_err() {
            warn!("payload for {:?} exceeds {} bytes, dropping", key, PAYLOAD_MAX);
            return;
        }

        if self.queue.try_send(Notification { key, payload: value }).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            // Log only the first drop of each burst of 100
            if dropped % 100 == 1 {
                warn!("notify queue full, dropped {} so far", dropped);
            }
        }
    }
}

pub static NOTIFIER: QueuedNotifier<'static> = QueuedNotifier::new(&NOTIFY_CH);
