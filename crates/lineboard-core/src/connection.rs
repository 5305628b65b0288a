use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Push,
    Pull,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Push => "push",
            TransportMode::Pull => "pull",
        }
    }
}

/// Next step for the driver loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenPush,
    Poll,
    SchedulePoll(Duration),
    AwaitReconnect(Instant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectTimer {
    Scheduled(Instant),
    /// A timer was already pending; its deadline is unchanged.
    AlreadyPending(Instant),
}

impl ReconnectTimer {
    pub fn deadline(&self) -> Instant {
        match self {
            ReconnectTimer::Scheduled(deadline) | ReconnectTimer::AlreadyPending(deadline) => {
                *deadline
            }
        }
    }
}

/// Transport selection and reconnect bookkeeping, without any I/O.
///
/// Delays are constant and retries are unbounded. Invariant: at most one
/// reconnect deadline is pending at any time.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    state: ConnectionState,
    mode: TransportMode,
    reconnect_deadline: Option<Instant>,
    poll_interval: Duration,
    reconnect_delay: Duration,
}

impl ConnectionManager {
    pub fn new(push_supported: bool, poll_interval: Duration, reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            mode: if push_supported {
                TransportMode::Push
            } else {
                TransportMode::Pull
            },
            reconnect_deadline: None,
            poll_interval,
            reconnect_delay,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_deadline.is_some()
    }

    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_deadline
    }

    pub fn connect(&mut self) -> Action {
        self.state = ConnectionState::Connecting;
        match self.mode {
            TransportMode::Push => Action::OpenPush,
            TransportMode::Pull => Action::Poll,
        }
    }

    pub fn push_opened(&mut self) {
        self.state = ConnectionState::Connected;
    }

    pub fn poll_succeeded(&mut self) -> Action {
        self.state = ConnectionState::Connected;
        Action::SchedulePoll(self.poll_interval)
    }

    pub fn poll_due(&mut self) -> Action {
        Action::Poll
    }

    /// Enters `Reconnecting`. Idempotent while a timer is pending.
    pub fn transport_failed(&mut self, now: Instant) -> ReconnectTimer {
        self.state = ConnectionState::Reconnecting;
        match self.reconnect_deadline {
            Some(deadline) => ReconnectTimer::AlreadyPending(deadline),
            None => {
                let deadline = now + self.reconnect_delay;
                self.reconnect_deadline = Some(deadline);
                ReconnectTimer::Scheduled(deadline)
            }
        }
    }

    pub fn reconnect_fired(&mut self) -> Action {
        self.reconnect_deadline = None;
        self.connect()
    }
}
