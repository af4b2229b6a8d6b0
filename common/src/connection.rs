//! Station link bring-up.
//!
//! The link layer reports three events from its own callback context. Each
//! event is folded into a [`Machine`] by a pure transition function. The
//! resulting [`Action`] is carried out by the [`ConnectionManager`], which
//! also wakes the single startup waiter once a terminal state is reached.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{error, info, warn};

use crate::error::StartupError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Connected | Self::Failed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    LinkStarted,
    LinkLost,
    AddressAcquired,
}

/// Side effect requested by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    None,
    /// First connect attempt after the link came up.
    Connect,
    /// Reconnect attempt number `n` since the last acquired address.
    Retry(u8),
    /// The retry budget is spent, stop trying.
    GiveUp,
    /// An address was acquired, release the waiter.
    Signal,
}

/// Connection state plus the retry counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Machine {
    pub state: ConnectionState,
    pub retries: u8,
    pub retry_limit: u8,
}

impl Machine {
    pub const fn new(retry_limit: u8) -> Self {
        Self {
            state: ConnectionState::Idle,
            retries: 0,
            retry_limit,
        }
    }

    /// Pure transition over `(state, event)`.
    ///
    /// `Failed` absorbs every event. A lost link bumps the retry counter and
    /// reconnects until the counter reaches the limit. An acquired address
    /// resets the counter.
    pub fn on_event(self, event: LinkEvent) -> (Self, Action) {
        use ConnectionState::*;

        if self.state == Failed {
            return (self, Action::None);
        }

        match event {
            LinkEvent::LinkStarted => match self.state {
                Idle | Connecting => (
                    Self {
                        state: Connecting,
                        ..self
                    },
                    Action::Connect,
                ),
                _ => (self, Action::None),
            },
            LinkEvent::LinkLost => {
                let retries = self.retries.saturating_add(1);
                if retries >= self.retry_limit {
                    (
                        Self {
                            state: Failed,
                            retries: self.retry_limit,
                            ..self
                        },
                        Action::GiveUp,
                    )
                } else {
                    (
                        Self {
                            state: Connecting,
                            retries,
                            ..self
                        },
                        Action::Retry(retries),
                    )
                }
            }
            LinkEvent::AddressAcquired => (
                Self {
                    state: Connected,
                    retries: 0,
                    ..self
                },
                Action::Signal,
            ),
        }
    }
}

/// Issues connect requests to the link layer.
pub trait LinkControl {
    type Error: core::fmt::Debug;

    fn connect(&mut self) -> Result<(), Self::Error>;
}

struct Shared<L> {
    machine: Machine,
    link: L,
}

struct Inner<L> {
    ssid: String,
    shared: Mutex<Shared<L>>,
    terminal: Condvar,
}

/// Clonable handle to the connection state machine.
///
/// One clone goes into the link-layer event callbacks, which are the only
/// writers. The other stays with startup, which waits once for a terminal
/// state.
pub struct ConnectionManager<L> {
    inner: Arc<Inner<L>>,
}

impl<L> Clone for ConnectionManager<L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<L: LinkControl> ConnectionManager<L> {
    pub fn new(ssid: impl Into<String>, retry_limit: u8, link: L) -> Self {
        Self {
            inner: Arc::new(Inner {
                ssid: ssid.into(),
                shared: Mutex::new(Shared {
                    machine: Machine::new(retry_limit),
                    link,
                }),
                terminal: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared<L>> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Feeds one link-layer event into the state machine and performs the
    /// resulting action. Returns the action for logging and tests.
    pub fn handle_event(&self, event: LinkEvent) -> Action {
        let mut shared = self.lock();
        let (machine, action) = shared.machine.on_event(event);
        shared.machine = machine;

        match action {
            Action::Connect => {
                if let Err(e) = shared.link.connect() {
                    error!("wifi connect: {e:?}");
                }
            }
            Action::Retry(n) => {
                warn!("retry wifi connection ({n}/{})", machine.retry_limit);
                if let Err(e) = shared.link.connect() {
                    error!("wifi connect: {e:?}");
                }
            }
            Action::GiveUp => {
                error!("failed to connect to {}", self.inner.ssid);
            }
            Action::Signal => {
                info!("connected to {}", self.inner.ssid);
            }
            Action::None => {}
        }

        if machine.state.is_terminal() {
            self.inner.terminal.notify_all();
        }

        action
    }

    /// Copy of the current machine.
    pub fn snapshot(&self) -> Machine {
        self.lock().machine
    }

    pub fn ssid(&self) -> &str {
        &self.inner.ssid
    }

    /// Blocks until the link is `Connected` or `Failed`.
    ///
    /// With `timeout == None` this waits indefinitely.
    pub fn wait_terminal(&self, timeout: Option<Duration>) -> Result<ConnectionState, StartupError> {
        let guard = self.lock();
        let pending = |shared: &mut Shared<L>| !shared.machine.state.is_terminal();

        let guard = match timeout {
            None => self
                .inner
                .terminal
                .wait_while(guard, pending)
                .unwrap_or_else(PoisonError::into_inner),
            Some(limit) => {
                let (guard, result) = self
                    .inner
                    .terminal
                    .wait_timeout_while(guard, limit, pending)
                    .unwrap_or_else(PoisonError::into_inner);
                if result.timed_out() && !guard.machine.state.is_terminal() {
                    return Err(StartupError::ConnectTimeout(limit));
                }
                guard
            }
        };

        Ok(guard.machine.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Clone, Default)]
    struct CountingLink(Arc<AtomicUsize>);

    impl CountingLink {
        fn attempts(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl LinkControl for CountingLink {
        type Error = ();

        fn connect(&mut self) -> Result<(), ()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn manager() -> (ConnectionManager<CountingLink>, CountingLink) {
        let link = CountingLink::default();
        (ConnectionManager::new("test-ssid", 5, link.clone()), link)
    }

    #[test]
    fn test_link_started_connects() {
        let (manager, link) = manager();

        assert_eq!(manager.handle_event(LinkEvent::LinkStarted), Action::Connect);
        assert_eq!(manager.snapshot().state, ConnectionState::Connecting);
        assert_eq!(link.attempts(), 1);
    }

    #[test]
    fn test_retry_bound_reaches_failed() {
        let (manager, link) = manager();
        manager.handle_event(LinkEvent::LinkStarted);

        for n in 1..5 {
            assert_eq!(manager.handle_event(LinkEvent::LinkLost), Action::Retry(n));
        }
        assert_eq!(manager.handle_event(LinkEvent::LinkLost), Action::GiveUp);

        let machine = manager.snapshot();
        assert_eq!(machine.state, ConnectionState::Failed);
        assert_eq!(machine.retries, 5);
        // Initial connect plus four retries, never a sixth attempt.
        assert_eq!(link.attempts(), 5);
    }

    #[test]
    fn test_failed_is_absorbing() {
        let (manager, link) = manager();
        for _ in 0..5 {
            manager.handle_event(LinkEvent::LinkLost);
        }
        let attempts = link.attempts();
        assert_eq!(manager.snapshot().state, ConnectionState::Failed);

        for event in [
            LinkEvent::LinkLost,
            LinkEvent::LinkStarted,
            LinkEvent::AddressAcquired,
            LinkEvent::LinkLost,
        ] {
            assert_eq!(manager.handle_event(event), Action::None);
            assert_eq!(manager.snapshot().state, ConnectionState::Failed);
        }
        assert_eq!(link.attempts(), attempts);
    }

    #[test]
    fn test_address_resets_retry_counter() {
        let (manager, _) = manager();
        manager.handle_event(LinkEvent::LinkStarted);
        for _ in 0..3 {
            manager.handle_event(LinkEvent::LinkLost);
        }
        assert_eq!(manager.snapshot().retries, 3);

        assert_eq!(manager.handle_event(LinkEvent::AddressAcquired), Action::Signal);
        let machine = manager.snapshot();
        assert_eq!(machine.state, ConnectionState::Connected);
        assert_eq!(machine.retries, 0);

        assert_eq!(manager.handle_event(LinkEvent::LinkLost), Action::Retry(1));
        assert_eq!(manager.snapshot().retries, 1);
    }

    #[test]
    fn test_pure_transitions() {
        let machine = Machine::new(5);
        let (machine, action) = machine.on_event(LinkEvent::LinkStarted);
        assert_eq!(action, Action::Connect);
        assert_eq!(machine.state, ConnectionState::Connecting);

        let (connected, action) = machine.on_event(LinkEvent::AddressAcquired);
        assert_eq!(action, Action::Signal);
        assert_eq!(connected.on_event(LinkEvent::LinkStarted), (connected, Action::None));
    }

    #[test]
    fn test_wait_returns_connected_from_other_thread() {
        let (manager, _) = manager();
        let events = manager.clone();

        let handle = thread::spawn(move || {
            events.handle_event(LinkEvent::LinkStarted);
            events.handle_event(LinkEvent::LinkLost);
            events.handle_event(LinkEvent::AddressAcquired);
        });

        assert_eq!(manager.wait_terminal(None), Ok(ConnectionState::Connected));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_returns_failed() {
        let (manager, _) = manager();
        let events = manager.clone();

        let handle = thread::spawn(move || {
            events.handle_event(LinkEvent::LinkStarted);
            for _ in 0..5 {
                events.handle_event(LinkEvent::LinkLost);
            }
        });

        assert_eq!(
            manager.wait_terminal(Some(Duration::from_secs(10))),
            Ok(ConnectionState::Failed)
        );
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_times_out() {
        let (manager, _) = manager();
        manager.handle_event(LinkEvent::LinkStarted);

        let timeout = Duration::from_millis(20);
        assert_eq!(
            manager.wait_terminal(Some(timeout)),
            Err(StartupError::ConnectTimeout(timeout))
        );
    }
}
