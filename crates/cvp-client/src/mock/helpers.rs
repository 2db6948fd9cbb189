//! Helper functions shared by the mock domain modules

use super::MockCvpClient;
use crate::models::*;

/// Generate a CVP-style key such as `configlet_6f1c...`
pub fn new_key(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Slice a list the way CVP list endpoints do; `end == 0` means "to the end"
pub fn window<T: Clone>(items: &[T], start: u64, end: u64) -> Page<T> {
    let total = items.len() as u64;
    let end = if end == 0 { total } else { end.min(total) };
    let start = start.min(end);
    Page::new(total, items[start as usize..end as usize].to_vec())
}

/// Create a pending task for a device and return its id
pub fn create_task(client: &MockCvpClient, hostname: &str, description: &str) -> String {
    let id = {
        let mut next = client.next_task_id.lock().unwrap();
        let current = *next;
        *next += 1;
        current.to_string()
    };
    client.tasks.lock().unwrap().push(Task {
        work_order_id: id.clone(),
        work_order_user_defined_status: "Pending".to_string(),
        description: description.to_string(),
        hostname: hostname.to_string(),
        created_on: chrono::Utc::now().timestamp_millis(),
    });
    id
}

/// Successful provisioning response carrying `task_ids`
pub fn task_response(task_ids: Vec<String>) -> TaskResponse {
    TaskResponse {
        status: "success".to_string(),
        task_ids,
    }
}
