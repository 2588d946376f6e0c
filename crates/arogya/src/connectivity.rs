//! Network connectivity tracking.
//!
//! The host reports what its network stack believes; the monitor turns those
//! level reports into edge events. Only an actual transition produces an
//! event, so a host that reports "online" every few seconds does not trigger
//! a flush each time.

use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

/// Capacity of the event channel. Edges are rare; a slow subscriber that lags
/// this far behind only loses stale transitions.
const EVENT_CAPACITY: usize = 16;

/// Whether the host currently has a network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityState {
    /// Network reachable.
    Online,
    /// No network.
    Offline,
}

impl ConnectivityState {
    /// Map a host boolean to a state.
    #[must_use]
    pub fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    /// Whether this is [`ConnectivityState::Online`].
    #[must_use]
    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// A state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityEvent {
    /// `Offline -> Online`.
    Reconnected,
    /// `Online -> Offline`.
    Disconnected,
}

/// Owns the connectivity state and fans transitions out to subscribers.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: watch::Sender<ConnectivityState>,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityMonitor {
    /// Create a monitor seeded with the state the host reports at startup.
    #[must_use]
    pub fn new(initial: ConnectivityState) -> Self {
        let (state, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { state, events }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    /// Whether the current state is online.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state().is_online()
    }

    /// Subscribe to transition events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// Observe the level state.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Feed a host network report into the monitor.
    ///
    /// Returns the event fired, or `None` if the report matched the current
    /// state.
    pub fn report(&self, online: bool) -> Option<ConnectivityEvent> {
        let next = ConnectivityState::from_online(online);
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if !changed {
            debug!(state = %next, "Duplicate connectivity report ignored");
            return None;
        }

        let event = match next {
            ConnectivityState::Online => ConnectivityEvent::Reconnected,
            ConnectivityState::Offline => ConnectivityEvent::Disconnected,
        };
        info!(state = %next, "Connectivity changed");

        if self.events.send(event).is_err() {
            debug!(?event, "No connectivity subscribers");
        }
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_initial_state() {
        let monitor = ConnectivityMonitor::new(ConnectivityState::Offline);
        assert_eq!(monitor.state(), ConnectivityState::Offline);
        assert!(!monitor.is_online());
    }

    #[test]
    fn test_offline_to_online_fires_reconnected_once() {
        let monitor = ConnectivityMonitor::new(ConnectivityState::Offline);
        let mut rx = monitor.subscribe();

        assert_eq!(monitor.report(true), Some(ConnectivityEvent::Reconnected));
        assert_eq!(monitor.report(true), None);

        assert_eq!(rx.try_recv().unwrap(), ConnectivityEvent::Reconnected);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(monitor.is_online());
    }

    #[test]
    fn test_online_to_offline_fires_disconnected() {
        let monitor = ConnectivityMonitor::new(ConnectivityState::Online);
        let mut rx = monitor.subscribe();

        assert_eq!(monitor.report(false), Some(ConnectivityEvent::Disconnected));
        assert_eq!(rx.try_recv().unwrap(), ConnectivityEvent::Disconnected);
    }

    #[test]
    fn test_duplicate_reports_fire_nothing() {
        let monitor = ConnectivityMonitor::new(ConnectivityState::Online);
        let mut rx = monitor.subscribe();

        assert!(monitor.report(true).is_none());
        assert!(monitor.report(true).is_none());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_report_without_subscribers() {
        let monitor = ConnectivityMonitor::new(ConnectivityState::Offline);
        assert_eq!(monitor.report(true), Some(ConnectivityEvent::Reconnected));
    }

    #[test]
    fn test_flapping_sequence() {
        let monitor = ConnectivityMonitor::new(ConnectivityState::Offline);
        let mut rx = monitor.subscribe();

        for online in [true, false, false, true] {
            monitor.report(online);
        }

        assert_eq!(rx.try_recv().unwrap(), ConnectivityEvent::Reconnected);
        assert_eq!(rx.try_recv().unwrap(), ConnectivityEvent::Disconnected);
        assert_eq!(rx.try_recv().unwrap(), ConnectivityEvent::Reconnected);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_watch_sees_latest_state() {
        let monitor = ConnectivityMonitor::new(ConnectivityState::Offline);
        let mut watch = monitor.watch();

        monitor.report(true);
        watch.changed().await.unwrap();
        assert_eq!(*watch.borrow(), ConnectivityState::Online);
    }
}
