//! Correlation chains and the task trees rebuilt from them.
//!
//! Every task writes JSON log entries tagged with its correlation list: the
//! root task's id first, then one generated id per level of spawning. Grouping
//! entries by that list rebuilds who-launched-whom as a tree.

use crate::errors::{ConfigError, DomainError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationChain(Vec<String>);

impl CorrelationChain {
    pub fn root() -> Self {
        Self(vec![Uuid::new_v4().to_string()])
    }

    pub fn from_ids(ids: Vec<String>) -> Self {
        Self(ids)
    }

    /// A copy of this chain extended by one fresh id.
    pub fn child(&self) -> Self {
        let mut ids = self.0.clone();
        ids.push(Uuid::new_v4().to_string());
        Self(ids)
    }

    pub fn root_id(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "STARTED")]
    Started,
    #[serde(rename = "COMPLETED:IGNORED")]
    CompletedIgnored,
    #[serde(rename = "COMPLETED:SUCCEEDED")]
    CompletedSucceeded,
    #[serde(rename = "COMPLETED:FAILED")]
    CompletedFailed,
    #[serde(rename = "LAUNCHED:SUCCEEDED")]
    LaunchedSucceeded,
    #[serde(rename = "LAUNCHED:FAILED")]
    LaunchedFailed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Unknown => "UNKNOWN",
            TaskStatus::Started => "STARTED",
            TaskStatus::CompletedIgnored => "COMPLETED:IGNORED",
            TaskStatus::CompletedSucceeded => "COMPLETED:SUCCEEDED",
            TaskStatus::CompletedFailed => "COMPLETED:FAILED",
            TaskStatus::LaunchedSucceeded => "LAUNCHED:SUCCEEDED",
            TaskStatus::LaunchedFailed => "LAUNCHED:FAILED",
        }
    }

    pub fn is_launch(&self) -> bool {
        matches!(self, TaskStatus::LaunchedSucceeded | TaskStatus::LaunchedFailed)
    }

    pub fn is_started(&self) -> bool {
        matches!(self, TaskStatus::Started)
    }

    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            TaskStatus::CompletedIgnored | TaskStatus::CompletedSucceeded | TaskStatus::CompletedFailed
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskStatus::CompletedFailed | TaskStatus::LaunchedFailed)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, TaskStatus::CompletedSucceeded)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One structured log line written by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub task_name: String,
    pub task_id: Option<String>,
    pub correlation_list: CorrelationChain,
    pub status: TaskStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskEntry {
    pub fn new(
        task_name: impl Into<String>,
        task_id: Option<String>,
        correlation_list: CorrelationChain,
        status: TaskStatus,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            task_id,
            correlation_list,
            status,
            timestamp: Utc::now(),
            extra: Map::new(),
        }
    }

    pub fn to_json_line(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    fn summary(&self, detail: u8) -> Value {
        match detail {
            0 | 1 => Value::String(self.task_name.clone()),
            2 => json!({
                "status": self.status.as_str(),
                "task_id": self.task_id,
                "task_name": self.task_name,
                "timestamp": self.timestamp.to_rfc3339(),
            }),
            _ => serde_json::to_value(self).unwrap_or(Value::Null),
        }
    }
}

/// Reads newline-delimited task entries; blank lines are skipped.
pub fn parse_task_log(text: &str) -> Result<Vec<TaskEntry>, ConfigError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(ConfigError::from))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskTree {
    pub key: String,
    pub children: Vec<TaskTree>,
    pub events: Vec<TaskEntry>,
}

impl TaskTree {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            children: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Files `element` under the node reached by walking `key_path`, creating
    /// nodes as needed. Children keep first-seen order.
    pub fn add_element(&mut self, key_path: &[String], element: TaskEntry) {
        let Some((head, tail)) = key_path.split_first() else {
            self.events.push(element);
            return;
        };
        let idx = match self.children.iter().position(|c| &c.key == head) {
            Some(idx) => idx,
            None => {
                self.children.push(TaskTree::new(head.clone()));
                self.children.len() - 1
            }
        };
        self.children[idx].add_element(tail, element);
    }

    fn events_where(&self, pred: impl Fn(&TaskStatus) -> bool) -> Vec<&TaskEntry> {
        self.events.iter().filter(|e| pred(&e.status)).collect()
    }

    pub fn launch_events(&self) -> Vec<&TaskEntry> {
        self.events_where(TaskStatus::is_launch)
    }

    pub fn started_events(&self) -> Vec<&TaskEntry> {
        self.events_where(TaskStatus::is_started)
    }

    pub fn completed_events(&self) -> Vec<&TaskEntry> {
        self.events_where(TaskStatus::is_completed)
    }

    pub fn failed_events(&self) -> Vec<&TaskEntry> {
        self.events_where(TaskStatus::is_failed)
    }

    pub fn succeeded_events(&self) -> Vec<&TaskEntry> {
        self.events_where(TaskStatus::is_succeeded)
    }

    /// The furthest stage this node reached: its completions, else its
    /// starts, else its launches.
    pub fn last_events(&self) -> Vec<&TaskEntry> {
        let completed = self.completed_events();
        if !completed.is_empty() {
            return completed;
        }
        let started = self.started_events();
        if !started.is_empty() {
            return started;
        }
        self.launch_events()
    }

    pub fn tree_failed_events(&self) -> Vec<&TaskEntry> {
        let mut events = self.failed_events();
        for child in &self.children {
            events.extend(child.tree_failed_events());
        }
        events
    }

    pub fn tree_succeeded_events(&self) -> Vec<&TaskEntry> {
        let mut events = self.succeeded_events();
        for child in &self.children {
            events.extend(child.tree_succeeded_events());
        }
        events
    }

    /// Last events of every node that never completed, children first.
    pub fn tree_incomplete_events(&self) -> Vec<&TaskEntry> {
        let mut events: Vec<&TaskEntry> = self
            .children
            .iter()
            .flat_map(|c| c.tree_incomplete_events())
            .collect();
        if self.completed_events().is_empty() {
            events.extend(self.last_events());
        }
        events
    }

    fn all_timestamps(&self) -> Vec<DateTime<Utc>> {
        let mut stamps: Vec<DateTime<Utc>> = self.events.iter().map(|e| e.timestamp).collect();
        for child in &self.children {
            stamps.extend(child.all_timestamps());
        }
        stamps
    }

    /// Milliseconds between the earliest and latest entry anywhere in the
    /// tree; `None` for a tree without entries.
    pub fn time_elapsed_ms(&self) -> Option<i64> {
        let stamps = self.all_timestamps();
        let min = stamps.iter().min()?;
        let max = stamps.iter().max()?;
        Some((*max - *min).num_milliseconds())
    }

    /// Nested view of the tree. Detail 1 lists task names of each node's last
    /// events, detail 2 lists every event with status and id, detail 3 adds
    /// whole entries and node keys.
    pub fn summary(&self, detail: u8) -> Value {
        let events: Vec<Value> = if detail <= 1 {
            self.last_events().iter().map(|e| e.summary(detail)).collect()
        } else {
            self.events.iter().map(|e| e.summary(detail)).collect()
        };
        let mut node = Map::new();
        node.insert("events".into(), Value::Array(events));
        node.insert(
            "children".into(),
            Value::Array(self.children.iter().map(|c| c.summary(detail)).collect()),
        );
        if detail > 2 {
            node.insert("key".into(), Value::String(self.key.clone()));
        }
        Value::Object(node)
    }

    pub fn failure_summary(&self, detail: u8) -> Value {
        let render = |events: Vec<&TaskEntry>| -> Value {
            Value::Array(events.iter().map(|e| e.summary(detail)).collect())
        };
        json!({
            "failed_tasks": render(self.tree_failed_events()),
            "incomplete_tasks": render(self.tree_incomplete_events()),
            "succeeded_tasks": render(self.tree_succeeded_events()),
            "time_elapsed_in_ms": self.time_elapsed_ms(),
        })
    }
}

/// Builds the tree rooted at the single correlation root shared by all
/// entries.
pub fn build_task_tree(entries: Vec<TaskEntry>) -> Result<TaskTree, DomainError> {
    if entries.is_empty() {
        return Err(DomainError::EmptyTaskLog);
    }

    let mut holder = TaskTree::new("");
    for entry in entries {
        if entry.correlation_list.depth() == 0 {
            return Err(DomainError::EmptyCorrelationList(entry.task_name));
        }
        let path = entry.correlation_list.ids().to_vec();
        holder.add_element(&path, entry);
    }

    if holder.children.len() != 1 {
        return Err(DomainError::MultipleTaskRoots(
            holder.children.iter().map(|c| c.key.clone()).collect(),
        ));
    }
    holder
        .children
        .pop()
        .ok_or(DomainError::EmptyTaskLog)
}
