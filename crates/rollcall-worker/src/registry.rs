//! In-memory task registry.
//!
//! One lock guards both the task map and the link index, so checking for an
//! active task and inserting a new one happen in a single critical section.
//! Snapshots are never mutated in place: a transition clones the current
//! snapshot, applies the change and swaps the result in.

use chrono::{DateTime, Local, Utc};
use rollcall_core::models::{SubmissionTask, TaskStatus, TransitionError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown task {0}")]
    UnknownTask(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Result of [`TaskRegistry::claim`].
#[derive(Debug, Clone)]
pub enum Claim {
    /// The task was registered and must be run by the caller.
    Scheduled(SubmissionTask),
    /// Another task for the same link is still pending or running.
    Attached(SubmissionTask),
    /// The latest task for the link already succeeded for the same module today.
    Completed(SubmissionTask),
}

#[derive(Default)]
struct RegistryState {
    tasks: HashMap<Uuid, SubmissionTask>,
    /// Converted link -> most recent task for it.
    by_link: HashMap<String, Uuid>,
}

impl RegistryState {
    fn latest_for(&self, link: &str) -> Option<&SubmissionTask> {
        self.by_link.get(link).and_then(|id| self.tasks.get(id))
    }
}

#[derive(Default)]
pub struct TaskRegistry {
    state: Mutex<RegistryState>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-applied transition
    // behind, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `task` unless its converted link already has an active task
    /// or a task that succeeded today for the same module.
    pub fn claim(&self, task: SubmissionTask) -> Claim {
        let mut state = self.lock();
        let link = task.converted_link().raw().to_string();

        if let Some(existing) = state.latest_for(&link) {
            if !existing.status().is_terminal() {
                return Claim::Attached(existing.clone());
            }
            if succeeded_today(existing, task.module_name()) {
                return Claim::Completed(existing.clone());
            }
        }

        state.by_link.insert(link, task.task_id());
        state.tasks.insert(task.task_id(), task.clone());
        Claim::Scheduled(task)
    }

    /// Register an already-terminal task so it can be polled.
    pub fn insert_terminal(&self, task: SubmissionTask) {
        let mut state = self.lock();
        let link = task.converted_link().raw().to_string();
        let link_is_active = state
            .latest_for(&link)
            .is_some_and(|t| !t.status().is_terminal());
        if !link_is_active {
            state.by_link.insert(link, task.task_id());
        }
        state.tasks.insert(task.task_id(), task);
    }

    /// Forget a task that was claimed but never dispatched.
    pub fn discard(&self, task_id: Uuid) -> Option<SubmissionTask> {
        let mut state = self.lock();
        let task = state.tasks.remove(&task_id)?;
        let link = task.converted_link().raw();
        if state.by_link.get(link) == Some(&task_id) {
            state.by_link.remove(link);
        }
        Some(task)
    }

    /// Pending or running task for a converted link.
    pub fn active_for(&self, converted_link: &str) -> Option<SubmissionTask> {
        self.lock()
            .latest_for(converted_link)
            .filter(|t| !t.status().is_terminal())
            .cloned()
    }

    pub fn snapshot(&self, task_id: Uuid) -> Option<SubmissionTask> {
        self.lock().tasks.get(&task_id).cloned()
    }

    /// Apply `transition` to a copy of the task and publish the copy.
    /// On error the published snapshot is left untouched.
    pub fn update<F>(&self, task_id: Uuid, transition: F) -> Result<SubmissionTask, RegistryError>
    where
        F: FnOnce(&mut SubmissionTask) -> Result<(), TransitionError>,
    {
        let mut state = self.lock();
        let mut next = state
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(RegistryError::UnknownTask(task_id))?;
        transition(&mut next)?;
        state.tasks.insert(task_id, next.clone());
        Ok(next)
    }

    /// Drop terminal tasks completed before `cutoff`. Returns how many went.
    pub fn prune(&self, cutoff: DateTime<Utc>) -> usize {
        let mut state = self.lock();
        let before = state.tasks.len();
        state.tasks.retain(|_, task| {
            !task.status().is_terminal() || task.completed_at().is_some_and(|at| at >= cutoff)
        });

        let RegistryState { tasks, by_link } = &mut *state;
        by_link.retain(|_, id| tasks.contains_key(id));

        before - state.tasks.len()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn succeeded_today(task: &SubmissionTask, module_name: &str) -> bool {
    task.status() == TaskStatus::Succeeded
        && task.module_name() == module_name
        && task
            .completed_at()
            .is_some_and(|at| at.with_timezone(&Local).date_naive() == Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::models::{Completion, ConversionMode, SubmissionError};
    use rollcall_core::LinkCodec;
    use std::sync::Arc;

    fn task(module: &str, suffix: &str) -> SubmissionTask {
        let link = LinkCodec::default().link("52202002751", suffix).unwrap();
        SubmissionTask::pending(
            module,
            ConversionMode::ExpiredConversion,
            "https://students.nsbm.ac.lk/attendence/index.php?id=52202002751_1",
            link,
            "qr/qr_code.png",
        )
    }

    #[test]
    fn test_second_claim_attaches_to_active_task() {
        let registry = TaskRegistry::new();
        let first = match registry.claim(task("Networks", "90017")) {
            Claim::Scheduled(t) => t,
            other => panic!("unexpected claim: {:?}", other),
        };

        match registry.claim(task("Networks", "90017")) {
            Claim::Attached(t) => assert_eq!(t.task_id(), first.task_id()),
            other => panic!("unexpected claim: {:?}", other),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_claims_schedule_exactly_one() {
        let registry = Arc::new(TaskRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.claim(task("Networks", "90017")))
            })
            .collect();

        let scheduled = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|c| matches!(c, Claim::Scheduled(_)))
            .count();
        assert_eq!(scheduled, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failed_task_allows_new_claim() {
        let registry = TaskRegistry::new();
        let Claim::Scheduled(first) = registry.claim(task("Networks", "90017")) else {
            panic!("expected first claim to schedule");
        };
        registry.update(first.task_id(), SubmissionTask::start).unwrap();
        registry
            .update(first.task_id(), |t| {
                t.fail(
                    SubmissionError::ConfirmationTimeout { waited_secs: 20 },
                    Completion::default(),
                )
            })
            .unwrap();

        assert!(registry.active_for(first.converted_link().raw()).is_none());
        assert!(matches!(
            registry.claim(task("Networks", "90017")),
            Claim::Scheduled(_)
        ));
    }

    #[test]
    fn test_succeeded_task_completes_same_module_only() {
        let registry = TaskRegistry::new();
        let Claim::Scheduled(first) = registry.claim(task("Networks", "90017")) else {
            panic!("expected first claim to schedule");
        };
        registry.update(first.task_id(), SubmissionTask::start).unwrap();
        registry
            .update(first.task_id(), |t| t.succeed(Completion::default()))
            .unwrap();

        match registry.claim(task("Networks", "90017")) {
            Claim::Completed(t) => assert_eq!(t.task_id(), first.task_id()),
            other => panic!("unexpected claim: {:?}", other),
        }
        assert!(matches!(
            registry.claim(task("Databases", "90017")),
            Claim::Scheduled(_)
        ));
    }

    #[test]
    fn test_rejected_transition_keeps_snapshot() {
        let registry = TaskRegistry::new();
        let Claim::Scheduled(first) = registry.claim(task("Networks", "90017")) else {
            panic!("expected first claim to schedule");
        };

        let err = registry
            .update(first.task_id(), |t| t.succeed(Completion::default()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Transition(_)));
        assert_eq!(
            registry.snapshot(first.task_id()).unwrap().status(),
            TaskStatus::Pending
        );
        assert!(matches!(
            registry.update(Uuid::new_v4(), SubmissionTask::start),
            Err(RegistryError::UnknownTask(_))
        ));
    }

    #[test]
    fn test_discarded_claim_frees_the_link() {
        let registry = TaskRegistry::new();
        let Claim::Scheduled(first) = registry.claim(task("Networks", "90017")) else {
            panic!("expected first claim to schedule");
        };

        let removed = registry.discard(first.task_id()).unwrap();
        assert_eq!(removed.task_id(), first.task_id());
        assert!(registry.snapshot(first.task_id()).is_none());
        assert!(registry.active_for(first.converted_link().raw()).is_none());
        assert!(registry.discard(first.task_id()).is_none());
        assert!(matches!(
            registry.claim(task("Networks", "90017")),
            Claim::Scheduled(_)
        ));
    }

    #[test]
    fn test_prune_keeps_active_and_recent_tasks() {
        let registry = TaskRegistry::new();
        let Claim::Scheduled(done) = registry.claim(task("Networks", "1")) else {
            panic!("expected claim to schedule");
        };
        registry.update(done.task_id(), SubmissionTask::start).unwrap();
        registry
            .update(done.task_id(), |t| t.succeed(Completion::default()))
            .unwrap();
        let Claim::Scheduled(active) = registry.claim(task("Networks", "2")) else {
            panic!("expected claim to schedule");
        };

        assert_eq!(registry.prune(Utc::now() - chrono::Duration::hours(1)), 0);
        assert_eq!(registry.prune(Utc::now() + chrono::Duration::hours(1)), 1);
        assert!(registry.snapshot(done.task_id()).is_none());
        assert!(registry.snapshot(active.task_id()).is_some());
        assert!(registry.active_for(active.converted_link().raw()).is_some());
    }
}
