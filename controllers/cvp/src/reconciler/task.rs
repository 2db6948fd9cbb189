//! Task reconciler
//!
//! Executes or cancels tasks by id. Executed tasks are polled with a
//! Fibonacci back-off until they finish or the task timeout runs out.

use super::{ManagerResult, Reconciler};
use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use cvp_client::TaskStatus;
use cvp_state::TaskState;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

pub const MANAGER: &str = "tasks";

impl Reconciler {
    pub async fn reconcile_tasks(&self, ids: &[String], target: TaskState) -> Result<ManagerResult, ControllerError> {
        info!("Reconciling {} tasks (target: {})", ids.len(), target);
        let mut result = ManagerResult::new(MANAGER);
        let mut started = Vec::new();

        for id in ids {
            let Some(task) = self.client.get_task_by_id(id).await? else {
                result.fail(format!("Task {} does not exist", id));
                continue;
            };
            let status = task.status();
            if status.is_final() {
                debug!("Task {} already {}", id, task.work_order_user_defined_status);
                continue;
            }

            match (target, self.options.dry_run) {
                (TaskState::Executed, true) => info!("[dry run] Would execute task {}", id),
                (TaskState::Cancelled, true) => info!("[dry run] Would cancel task {}", id),
                (TaskState::Executed, false) => {
                    self.client.execute_task(id).await?;
                    info!("Executed task {} ({})", id, task.description);
                    started.push(id.clone());
                }
                (TaskState::Cancelled, false) => {
                    self.client.cancel_task(id).await?;
                    info!("Cancelled task {} ({})", id, task.description);
                }
            }
            result.record(id.clone());
        }

        if !started.is_empty() && !self.options.task_timeout.is_zero() {
            self.wait_for_tasks(&started, &mut result).await?;
        }
        Ok(result)
    }

    /// Poll until every task reaches a final state
    async fn wait_for_tasks(&self, ids: &[String], result: &mut ManagerResult) -> Result<(), ControllerError> {
        let deadline = Instant::now() + self.options.task_timeout;
        let mut backoff = FibonacciBackoff::default();
        let mut pending: Vec<String> = ids.to_vec();

        loop {
            let mut still_pending = Vec::new();
            for id in &pending {
                match self.client.get_task_by_id(id).await?.map(|t| t.status()) {
                    Some(TaskStatus::Completed) => debug!("Task {} completed", id),
                    Some(TaskStatus::Failed) => result.fail(format!("Task {} failed", id)),
                    Some(TaskStatus::Cancelled) => {
                        warn!("Task {} was cancelled while waiting", id);
                        result.message(format!("Task {} was cancelled", id));
                    }
                    Some(_) => still_pending.push(id.clone()),
                    None => result.fail(format!("Task {} disappeared while waiting", id)),
                }
            }

            if still_pending.is_empty() {
                return Ok(());
            }
            if still_pending.len() < pending.len() {
                backoff.reset();
            }
            pending = still_pending;

            let now = Instant::now();
            if now >= deadline {
                return Err(ControllerError::TaskTimeout(pending.join(", ")));
            }
            let delay = backoff.next_backoff().min(deadline - now);
            debug!("{} tasks still running, polling again in {:?}", pending.len(), delay);
            sleep(delay).await;
        }
    }
}
