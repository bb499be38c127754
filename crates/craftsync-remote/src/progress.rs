//! Progress and result types for sync operations.

use std::sync::Arc;

/// Progress snapshot emitted as the sync advances.
///
/// In parallel uploads the completed count is monotonic but not ordered by
/// the input enumeration.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    /// Description of the work item that just advanced
    pub current_task: String,

    /// Items finished so far
    pub completed_tasks: usize,

    /// Total items in this phase
    pub total_tasks: usize,
}

impl SyncProgress {
    pub fn new(current_task: impl Into<String>, completed_tasks: usize, total_tasks: usize) -> Self {
        Self {
            current_task: current_task.into(),
            completed_tasks,
            total_tasks,
        }
    }

    /// Completion percentage, 0 when the total is unknown.
    pub fn percentage(&self) -> usize {
        if self.total_tasks == 0 {
            0
        } else {
            self.completed_tasks * 100 / self.total_tasks
        }
    }
}

/// Outcome of a sync or lifecycle operation.
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// Whether the operation succeeded overall
    pub success: bool,

    /// Human-readable outcome message
    pub message: String,
}

impl SyncResult {
    /// A successful result.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed result.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Callback invoked with progress updates. Shared across worker threads.
pub type ProgressCallback = Arc<dyn Fn(SyncProgress) + Send + Sync>;
