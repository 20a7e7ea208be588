//! Task entity type - a customer order

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{not_available, Record};
use crate::core::record_key::RecordKey;

/// Order progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    /// Open or in progress
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Open | TaskStatus::InProgress)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Open => write!(f, "open"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "open" => Ok(TaskStatus::Open),
            "in_progress" | "started" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            _ => Err(format!(
                "Unknown status: {} (use open/in_progress/done/cancelled)",
                s
            )),
        }
    }
}

fn one() -> u32 {
    1
}

/// A customer order, optionally for one of the library's items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default = "not_available")]
    pub name: String,

    /// The item being ordered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<RecordKey>,

    #[serde(default = "one")]
    pub quantity: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,

    #[serde(default)]
    pub status: TaskStatus,

    /// Agreed price for the whole order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default = "not_available")]
    pub ad_info: String,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Record for Task {
    const SECTION: &'static str = "Tasks";
    const LABEL: &'static str = "task";

    fn name(&self) -> &str {
        &self.name
    }
}

impl Task {
    pub fn from_draft(draft: TaskDraft) -> Self {
        Task {
            name: draft.name,
            item: draft.item,
            quantity: draft.quantity.unwrap_or(1),
            customer: draft.customer,
            deadline: draft.deadline,
            status: draft.status.unwrap_or_default(),
            price: draft.price,
            ad_info: draft.ad_info.unwrap_or_else(not_available),
            created: Utc::now(),
        }
    }

    /// Apply a patch; `None` fields keep their stored value, `Some(None)` clears one
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.item {
            self.item = v;
        }
        if let Some(v) = patch.quantity {
            self.quantity = v;
        }
        if let Some(v) = patch.customer {
            self.customer = v;
        }
        if let Some(v) = patch.deadline {
            self.deadline = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.price {
            self.price = v;
        }
        if let Some(v) = patch.ad_info {
            self.ad_info = v;
        }
    }

    /// Active and past its deadline on `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_active() && self.deadline.is_some_and(|d| d < today)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub name: String,
    pub item: Option<RecordKey>,
    pub quantity: Option<u32>,
    pub customer: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
    pub price: Option<f64>,
    pub ad_info: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub item: Option<Option<RecordKey>>,
    pub quantity: Option<u32>,
    pub customer: Option<Option<String>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub status: Option<TaskStatus>,
    pub price: Option<Option<f64>>,
    pub ad_info: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.item.is_none()
            && self.quantity.is_none()
            && self.customer.is_none()
            && self.deadline.is_none()
            && self.status.is_none()
            && self.price.is_none()
            && self.ad_info.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("Canceled".parse::<TaskStatus>().unwrap(), TaskStatus::Cancelled);
        assert!("finished".parse::<TaskStatus>().is_err());
        assert_eq!(TaskStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn test_minimal_task_deserializes() {
        let task: Task = serde_json::from_str(r#"{"name": "Chairs for cafe"}"#).unwrap();
        assert_eq!(task.quantity, 1);
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.ad_info, "N/A");
        assert!(task.item.is_none());

        let unnamed: Task = serde_json::from_str(r#"{"quantity": 2}"#).unwrap();
        assert_eq!(unnamed.name, "N/A");
    }

    #[test]
    fn test_patch_clears_optional_fields() {
        let mut task = Task::from_draft(TaskDraft {
            name: "Shelf".to_string(),
            item: Some(RecordKey::new(2)),
            customer: Some("Nowak".to_string()),
            deadline: NaiveDate::from_ymd_opt(2024, 6, 1),
            price: Some(450.0),
            ..Default::default()
        });

        task.apply(TaskPatch {
            item: Some(None),
            deadline: Some(None),
            ..Default::default()
        });
        assert_eq!(task.item, None);
        assert_eq!(task.deadline, None);
        assert_eq!(task.customer.as_deref(), Some("Nowak"));
        assert_eq!(task.price, Some(450.0));

        task.apply(TaskPatch {
            customer: Some(None),
            price: Some(None),
            ..Default::default()
        });
        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("customer").is_none());
        assert!(value.get("price").is_none());
        assert!(value.get("item").is_none());
    }

    #[test]
    fn test_item_reference_serializes_as_key() {
        let task = Task::from_draft(TaskDraft {
            name: "Order".to_string(),
            item: Some(RecordKey::new(3)),
            ..Default::default()
        });
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["item"], "id_3");
        assert!(value.get("customer").is_none());
        assert_eq!(task.field("status").as_deref(), Some("open"));
    }

    #[test]
    fn test_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut task = Task::from_draft(TaskDraft {
            name: "Late".to_string(),
            deadline: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..Default::default()
        });
        assert!(task.is_overdue(today));
        task.apply(TaskPatch {
            status: Some(TaskStatus::Done),
            ..Default::default()
        });
        assert!(!task.is_overdue(today));
    }
}
