use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of a reading source. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    NotStarted,
    Running,
    Stopped,
}

impl MonitorState {
    fn as_u8(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Running => 1,
            Self::Stopped => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::NotStarted,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug, Default)]
pub struct MonitorStats {
    valid: AtomicU64,
    invalid: AtomicU64,
    state: AtomicU8,
}

impl MonitorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_valid(&self) {
        self.valid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn valid(&self) -> u64 {
        self.valid.load(Ordering::Relaxed)
    }

    pub fn invalid(&self) -> u64 {
        self.invalid.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> MonitorState {
        MonitorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves the state forward; attempts to go backwards are ignored.
    pub fn advance(&self, to: MonitorState) {
        self.state.fetch_max(to.as_u8(), Ordering::AcqRel);
    }

    pub fn is_running(&self) -> bool {
        self.state() == MonitorState::Running
    }
}
