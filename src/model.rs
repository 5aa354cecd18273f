use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::time::Duration;

use crate::error::SetVarError;

/// A non-blank, non-comment line of an env file, already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanLine {
    /// 1-based line number in the source file.
    pub line: u32,
    pub text: String,
}

/// A parsed `KEY=VALUE` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub line: u32,
}

/// Contiguous `[start, end)` range of the filtered line sequence handled by
/// one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Identity of an apply worker, 1-based in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(usize);

impl WorkerId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Display for WorkerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker {}", self.0)
    }
}

/// Diagnostic produced during a run.
///
/// Workers emit `ApplyFailed` per rejected assignment and exactly one
/// `Complete` at the end of their chunk; a worker's own messages always
/// arrive in that order. Ordering across workers is unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    ApplyFailed { worker: WorkerId, error: SetVarError },
    Complete {
        worker: WorkerId,
        loaded: usize,
        failed: usize,
    },
    WorkerPanicked { worker: WorkerId },
    NoEntries,
}

impl StatusMessage {
    pub fn worker(&self) -> Option<WorkerId> {
        match self {
            Self::ApplyFailed { worker, .. }
            | Self::Complete { worker, .. }
            | Self::WorkerPanicked { worker } => Some(*worker),
            Self::NoEntries => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

impl Display for StatusMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApplyFailed { worker, error } => {
                write!(f, "{worker}: error setting {}: {}", error.key, error.kind)
            }
            Self::Complete {
                worker,
                loaded,
                failed,
            } => write!(f, "{worker} complete ({loaded} loaded, {failed} failed)"),
            Self::WorkerPanicked { worker } => write!(f, "{worker}: panicked before completion"),
            Self::NoEntries => write!(f, "No valid environment variables found."),
        }
    }
}

/// Summary of a load run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Clean lines dispatched to workers, after duplicate keys were folded.
    pub lines: usize,
    pub workers: usize,
    pub loaded: usize,
    pub failed: usize,
    pub skipped_existing: usize,
    pub elapsed: Duration,
    /// Drained channel contents in arrival order.
    pub messages: Vec<StatusMessage>,
}
