//! Progress events emitted by a run.

/// What a progress event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProgressKind {
    /// End of an iteration.
    Iteration,
    /// Refinement notices and the final stop message.
    Status,
    /// The run failed; the message carries the diagnostic.
    Error,
}

/// One progress event. Parameter snapshots are copies, never live state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Progress {
    /// Completion in percent, `0..=100`.
    pub percent: u8,
    pub message: String,
    /// Global best parameters; only attached every tenth iteration.
    pub params: Option<Vec<f64>>,
    pub kind: ProgressKind,
}

impl Progress {
    pub fn iteration(percent: u8, message: String, params: Option<Vec<f64>>) -> Self {
        Self {
            percent,
            message,
            params,
            kind: ProgressKind::Iteration,
        }
    }

    pub fn status(percent: u8, message: String) -> Self {
        Self {
            percent,
            message,
            params: None,
            kind: ProgressKind::Status,
        }
    }

    pub fn error(percent: u8, message: String) -> Self {
        Self {
            percent,
            message,
            params: None,
            kind: ProgressKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == ProgressKind::Error
    }
}

/// Receiver of progress events, living on the optimizer's thread only.
pub type ProgressSink = Box<dyn FnMut(Progress) + Send>;

/// `iteration * 100 / max_iter`, saturated at 100.
pub(crate) fn percent(iteration: usize, max_iter: usize) -> u8 {
    (iteration.saturating_mul(100) / max_iter.max(1)).min(100) as u8
}
