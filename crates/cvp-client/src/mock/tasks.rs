//! Task operations for MockCvpClient
//!
//! Executing a task completes it immediately; there is no in-progress phase.

use super::helpers::window;
use super::MockCvpClient;
use crate::error::CvpError;
use crate::models::*;

pub async fn get_tasks_page(client: &MockCvpClient, start: u64, end: u64) -> Result<Page<Task>, CvpError> {
    client.record_page("tasks", start, end)?;
    let tasks = client.tasks.lock().unwrap();
    Ok(window(tasks.as_slice(), start, end))
}

pub async fn get_task_by_id(client: &MockCvpClient, id: &str) -> Result<Option<Task>, CvpError> {
    client.record(format!("get_task_by_id:{}", id))?;
    Ok(client.task(id))
}

pub async fn execute_task(client: &MockCvpClient, id: &str) -> Result<(), CvpError> {
    client.record(format!("execute_task:{}", id))?;
    set_status(client, id, "Completed")
}

pub async fn cancel_task(client: &MockCvpClient, id: &str) -> Result<(), CvpError> {
    client.record(format!("cancel_task:{}", id))?;
    set_status(client, id, "Cancelled")
}

fn set_status(client: &MockCvpClient, id: &str, status: &str) -> Result<(), CvpError> {
    let mut tasks = client.tasks.lock().unwrap();
    let task = tasks
        .iter_mut()
        .find(|t| t.work_order_id == id)
        .ok_or_else(|| CvpError::NotFound(format!("Task {} does not exist", id)))?;
    if task.status().is_final() {
        return Err(CvpError::Api(format!(
            "Task {} is already {}",
            id, task.work_order_user_defined_status
        )));
    }
    task.work_order_user_defined_status = status.to_string();
    Ok(())
}
