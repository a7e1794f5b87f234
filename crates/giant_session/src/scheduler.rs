//! Per-tick deferred work.
//!
//! Anything that has to wait (session objects not visible yet, balance not
//! resolved yet, several invalidations in the same tick) is expressed as a
//! named task that runs on the next tick and reports whether it wants to run
//! again. Scheduling a task that is already pending is a no-op, which is what
//! coalesces a burst of promotions into one name-table refresh.

/// The kinds of deferred work a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Replica: wait for the session, then request current state.
    Bootstrap,
    /// Authority: rebuild the name table and push changes.
    RefreshNames,
    /// Replica: rebuild the local name table from the pushed id list.
    ApplyReplica,
}

/// What a task wants after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Run again next tick.
    Continue,
    /// Finished.
    Done,
}

/// Pending tasks for the next tick, in scheduling order.
#[derive(Debug, Default)]
pub struct TaskScheduler {
    pending: Vec<TaskKind>,
}

impl TaskScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` for the next tick.
    ///
    /// Returns `false` if it was already pending.
    pub fn schedule(&mut self, task: TaskKind) -> bool {
        if self.pending.contains(&task) {
            return false;
        }
        self.pending.push(task);
        true
    }

    /// Whether `task` is pending.
    #[must_use]
    pub fn is_scheduled(&self, task: TaskKind) -> bool {
        self.pending.contains(&task)
    }

    /// Removes and returns every pending task.
    ///
    /// Tasks scheduled while these run land in the next batch.
    pub fn take_due(&mut self) -> Vec<TaskKind> {
        std::mem::take(&mut self.pending)
    }

    /// Drops every pending task.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
