//! Tasks: ordered behaviour sequences with backlog metadata.

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use agv_core::{PoiId, RobotId, TaskId};

use crate::behaviour::{Behaviour, BehaviourKind};
use crate::error::{TaskError, TaskResult};

/// Backlog priority scale.  Higher is more important.
pub const PRIORITY_LOW: i32 = 1;
pub const PRIORITY_NORMAL: i32 = 2;
/// Charging runs and similar needs-it-soon work.
pub const PRIORITY_HIGH: i32 = 3;
/// Operator-ordered actions.
pub const PRIORITY_VERY_HIGH: i32 = 4;

/// Priority assigned when the backlog record omits one.
pub const DEFAULT_PRIORITY: i32 = PRIORITY_HIGH;

/// Wire timestamp format of `start_time`.
const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── TaskStatus ────────────────────────────────────────────────────────────────

/// Lifecycle status of a task.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TaskStatus {
    ToDo,
    Assign,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn from_wire(s: &str) -> Option<TaskStatus> {
        match s {
            "To Do" => Some(TaskStatus::ToDo),
            "ASSIGN" => Some(TaskStatus::Assign),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "COMPLETED" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    pub fn wire(self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::Assign => "ASSIGN",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "COMPLETED",
        }
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A validated backlog task.
#[derive(Clone, Debug)]
pub struct Task {
    pub id: TaskId,
    /// Robot this task is pinned to; `None` for tasks the dispatcher may
    /// hand to anyone.
    pub robot: Option<RobotId>,
    /// Arrival time; the secondary ordering key after priority.
    pub start_time: NaiveDateTime,
    pub status: TaskStatus,
    /// Index of the behaviour being executed; -1 before the task starts.
    pub current_behaviour_index: i32,
    /// Higher is more important.  Preserved through ordering.
    pub priority: i32,
    pub behaviours: Vec<Behaviour>,
    /// Ordering weight computed by the registry (max priority − priority);
    /// callers read `priority`, not this.
    pub weight: i32,
}

impl Task {
    /// Validate a raw backlog record eagerly.
    pub fn from_value(value: &Value) -> TaskResult<Task> {
        let record: TaskRecord = serde_json::from_value(value.clone())?;
        Self::from_record(record)
    }

    fn from_record(record: TaskRecord) -> TaskResult<Task> {
        if record.id.is_empty() {
            return Err(TaskError::EmptyId);
        }
        let id = TaskId(record.id);

        let robot = match record.robot {
            Some(r) if !r.is_empty() => Some(RobotId(r)),
            _ => None,
        };

        let status = TaskStatus::from_wire(&record.status).ok_or_else(|| TaskError::BadStatus {
            task: id.clone(),
            status: record.status.clone(),
        })?;

        let start_time = NaiveDateTime::parse_from_str(&record.start_time, START_TIME_FORMAT)
            .map_err(|_| TaskError::BadTimestamp {
                task: id.clone(),
                value: record.start_time.clone(),
            })?;

        let behaviours: Vec<Behaviour> = record
            .behaviours
            .iter()
            .map(Behaviour::from_value)
            .collect::<Result<_, _>>()
            .map_err(|source| TaskError::Behaviour {
                task: id.clone(),
                source,
            })?;
        if behaviours.is_empty() {
            return Err(TaskError::NoBehaviours { task: id });
        }

        let max = behaviours.len() as i32 - 1;
        if record.current_behaviour_index < -1 || record.current_behaviour_index > max {
            return Err(TaskError::BadIndex {
                task: id,
                index: record.current_behaviour_index,
                max,
            });
        }

        if status != TaskStatus::ToDo && robot.is_none() {
            return Err(TaskError::MissingRobot {
                task: id,
                status: record.status,
            });
        }

        Ok(Task {
            id,
            robot,
            start_time,
            status,
            current_behaviour_index: record.current_behaviour_index,
            priority: record.priority,
            behaviours,
            weight: 0,
        })
    }

    /// The task has left the backlog: a robot is executing (or resuming) it.
    pub fn started(&self) -> bool {
        self.status != TaskStatus::ToDo
    }

    /// The behaviour being executed; the first one for unstarted tasks.
    pub fn current_behaviour(&self) -> &Behaviour {
        let idx = self.current_behaviour_index.max(0) as usize;
        &self.behaviours[idx]
    }

    /// The POI the robot is headed to for this task: the current behaviour's
    /// POI if it is a GO_TO, otherwise the POI of the most recent preceding
    /// GO_TO.  This is the authoritative routing destination.
    pub fn poi_goal(&self) -> Option<&PoiId> {
        let idx = self.current_behaviour_index.max(0) as usize;
        self.behaviours[..=idx]
            .iter()
            .rev()
            .find_map(|b| b.kind.poi())
    }

    /// The first GO_TO destination in the behaviour list; used for free-slot
    /// accounting of not-yet-started tasks.
    pub fn first_goal(&self) -> Option<&PoiId> {
        self.behaviours.iter().find_map(|b| b.kind.poi())
    }

    /// `true` when the current behaviour is a GO_TO.
    pub fn en_route(&self) -> bool {
        matches!(self.current_behaviour().kind, BehaviourKind::GoTo(_))
    }
}

// ── Wire record ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TaskRecord {
    id: String,
    #[serde(default)]
    robot: Option<String>,
    start_time: String,
    #[serde(default = "default_index")]
    current_behaviour_index: i32,
    status: String,
    #[serde(default = "default_priority")]
    priority: i32,
    behaviours: Vec<Value>,
}

fn default_index() -> i32 {
    -1
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// Parse and validate a whole backlog payload (a JSON array of task records).
pub fn tasks_from_json(json: &str) -> TaskResult<Vec<Task>> {
    let values: Vec<Value> = serde_json::from_str(json)?;
    values.iter().map(Task::from_value).collect()
}
