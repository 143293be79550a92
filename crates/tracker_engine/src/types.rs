use std::fmt;
use std::time::Duration;

/// Sequence number of a dispatched save, unique per coordinator.
pub type DispatchId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    Started {
        dispatch_id: DispatchId,
    },
    Succeeded {
        dispatch_id: DispatchId,
        elapsed: Duration,
    },
    Failed {
        dispatch_id: DispatchId,
        error: SaveError,
    },
}

impl SaveEvent {
    pub fn dispatch_id(&self) -> DispatchId {
        match self {
            SaveEvent::Started { dispatch_id }
            | SaveEvent::Succeeded { dispatch_id, .. }
            | SaveEvent::Failed { dispatch_id, .. } => *dispatch_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveError {
    pub kind: SaveFailureKind,
    pub message: String,
}

impl SaveError {
    pub fn new(kind: SaveFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(SaveFailureKind::Rejected, message)
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for SaveError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveFailureKind {
    /// The operation itself refused the payload.
    Rejected,
    /// The record to update does not exist.
    NotFound,
    Serialization,
    Io,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The operation panicked instead of returning.
    Panicked,
}

impl fmt::Display for SaveFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveFailureKind::Rejected => write!(f, "rejected"),
            SaveFailureKind::NotFound => write!(f, "record not found"),
            SaveFailureKind::Serialization => write!(f, "serialization error"),
            SaveFailureKind::Io => write!(f, "io error"),
            SaveFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            SaveFailureKind::Timeout => write!(f, "timeout"),
            SaveFailureKind::Network => write!(f, "network error"),
            SaveFailureKind::Panicked => write!(f, "save operation panicked"),
        }
    }
}
