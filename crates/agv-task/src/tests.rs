//! Unit tests for agv-task.

#[cfg(test)]
mod helpers {
    use serde_json::{Value, json};

    use crate::Task;

    pub fn go_to(id: &str, poi: &str) -> Value {
        json!({ "id": id, "parameters": { "name": "GO_TO", "to": poi } })
    }

    pub fn plain(id: &str, name: &str) -> Value {
        json!({ "id": id, "parameters": { "name": name } })
    }

    pub fn task(id: &str, priority: i32, start: &str, behaviours: Vec<Value>) -> Task {
        Task::from_value(&json!({
            "id": id,
            "robot": "",
            "start_time": start,
            "current_behaviour_index": -1,
            "status": "To Do",
            "priority": priority,
            "behaviours": behaviours,
        }))
        .unwrap()
    }
}

// ── Behaviour validation ──────────────────────────────────────────────────────

#[cfg(test)]
mod behaviour {
    use serde_json::json;

    use agv_core::{EdgeAction, PoiId};

    use crate::behaviour::{Behaviour, BehaviourKind};
    use crate::error::BehaviourError;

    #[test]
    fn go_to_carries_destination() {
        let b = Behaviour::from_value(&super::helpers::go_to("b1", "L1")).unwrap();
        assert_eq!(b.id, "b1");
        assert_eq!(b.kind, BehaviourKind::GoTo(PoiId::from("L1")));
        assert!(b.kind.is_go_to());
        assert_eq!(b.kind.poi(), Some(&PoiId::from("L1")));
    }

    #[test]
    fn not_an_object() {
        let err = Behaviour::from_value(&json!("GO_TO")).unwrap_err();
        assert!(matches!(err, BehaviourError::NotARecord));
    }

    #[test]
    fn missing_keys() {
        let err = Behaviour::from_value(&json!({ "parameters": { "name": "DOCK" } })).unwrap_err();
        assert!(matches!(err, BehaviourError::MissingField("id")));

        let err = Behaviour::from_value(&json!({ "id": "b1" })).unwrap_err();
        assert!(matches!(err, BehaviourError::MissingField("parameters")));

        let err = Behaviour::from_value(&json!({ "id": "b1", "parameters": {} })).unwrap_err();
        assert!(matches!(err, BehaviourError::MissingField("parameters.name")));
    }

    #[test]
    fn mistyped_fields() {
        let err =
            Behaviour::from_value(&json!({ "id": true, "parameters": { "name": "DOCK" } }))
                .unwrap_err();
        assert!(matches!(err, BehaviourError::WrongFieldType("id")));

        let err = Behaviour::from_value(&json!({ "id": "b1", "parameters": [] })).unwrap_err();
        assert!(matches!(err, BehaviourError::WrongFieldType("parameters")));
    }

    #[test]
    fn unknown_name() {
        let err = Behaviour::from_value(&super::helpers::plain("b1", "FLY_TO")).unwrap_err();
        assert!(matches!(err, BehaviourError::UnknownName { name, .. } if name == "FLY_TO"));
    }

    #[test]
    fn go_to_without_destination() {
        let err = Behaviour::from_value(&super::helpers::plain("b9", "GO_TO")).unwrap_err();
        assert!(matches!(err, BehaviourError::MissingGoal { id } if id == "b9"));
    }

    #[test]
    fn legacy_numeric_wait() {
        // The backend still sends the numeric wait code, as string or number.
        let b = Behaviour::from_value(&super::helpers::plain("b1", "3")).unwrap();
        assert_eq!(b.kind, BehaviourKind::Wait);
        let b =
            Behaviour::from_value(&json!({ "id": 7, "parameters": { "name": 3 } })).unwrap();
        assert_eq!(b.id, "7");
        assert_eq!(b.kind, BehaviourKind::Wait);
    }

    #[test]
    fn battery_exchange_plans_like_wait() {
        let b = Behaviour::from_value(&super::helpers::plain("b1", "BAT_EX")).unwrap();
        assert_eq!(b.kind, BehaviourKind::BatEx);
        assert_eq!(b.kind.edge_action(), EdgeAction::Wait);
        assert_eq!(b.kind.poi(), None);
    }
}

// ── Task validation ───────────────────────────────────────────────────────────

#[cfg(test)]
mod task {
    use serde_json::json;

    use agv_core::{PoiId, RobotId};

    use crate::error::TaskError;
    use crate::task::{Task, TaskStatus};

    use super::helpers::{go_to, plain};

    #[test]
    fn full_record_round_trip() {
        let task = Task::from_value(&json!({
            "id": "t1",
            "robot": "r1",
            "start_time": "2024-03-01 08:15:00",
            "current_behaviour_index": 1,
            "status": "IN_PROGRESS",
            "priority": 4,
            "behaviours": [go_to("1", "C1"), plain("2", "DOCK"), plain("3", "WAIT"),
                           plain("4", "UNDOCK")],
        }))
        .unwrap();
        assert_eq!(task.robot, Some(RobotId::from("r1")));
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, 4);
        assert!(task.started());
    }

    #[test]
    fn unknown_status() {
        let err = Task::from_value(&json!({
            "id": "t1", "start_time": "2024-03-01 08:15:00",
            "status": "PAUSED", "behaviours": [go_to("1", "L1")],
        }))
        .unwrap_err();
        assert!(matches!(err, TaskError::BadStatus { status, .. } if status == "PAUSED"));
    }

    #[test]
    fn bad_timestamp() {
        let err = Task::from_value(&json!({
            "id": "t1", "start_time": "01.03.2024 08:15",
            "status": "To Do", "behaviours": [go_to("1", "L1")],
        }))
        .unwrap_err();
        assert!(matches!(err, TaskError::BadTimestamp { .. }));
    }

    #[test]
    fn index_out_of_range() {
        for index in [-2, 1] {
            let err = Task::from_value(&json!({
                "id": "t1", "start_time": "2024-03-01 08:15:00",
                "current_behaviour_index": index,
                "status": "To Do", "behaviours": [go_to("1", "L1")],
            }))
            .unwrap_err();
            assert!(matches!(err, TaskError::BadIndex { max: 0, .. }));
        }
    }

    #[test]
    fn started_task_requires_robot() {
        let err = Task::from_value(&json!({
            "id": "t1", "robot": "", "start_time": "2024-03-01 08:15:00",
            "current_behaviour_index": 0,
            "status": "IN_PROGRESS", "behaviours": [go_to("1", "L1")],
        }))
        .unwrap_err();
        assert!(matches!(err, TaskError::MissingRobot { .. }));
    }

    #[test]
    fn behaviour_failure_carries_task_context() {
        let err = Task::from_value(&json!({
            "id": "t7", "start_time": "2024-03-01 08:15:00",
            "status": "To Do", "behaviours": [plain("1", "FLY_TO")],
        }))
        .unwrap_err();
        assert!(matches!(err, TaskError::Behaviour { task, .. } if task.as_str() == "t7"));
    }

    #[test]
    fn poi_goal_follows_current_go_to() {
        let task = Task::from_value(&json!({
            "id": "t1", "robot": "r1", "start_time": "2024-03-01 08:15:00",
            "current_behaviour_index": 0,
            "status": "IN_PROGRESS",
            "behaviours": [go_to("1", "C1"), plain("2", "DOCK"), plain("3", "WAIT"),
                           plain("4", "UNDOCK"), go_to("5", "P1")],
        }))
        .unwrap();
        assert_eq!(task.poi_goal(), Some(&PoiId::from("C1")));
        assert!(task.en_route());
    }

    #[test]
    fn poi_goal_falls_back_to_last_go_to() {
        let mut task = Task::from_value(&json!({
            "id": "t1", "robot": "r1", "start_time": "2024-03-01 08:15:00",
            "current_behaviour_index": 2,
            "status": "IN_PROGRESS",
            "behaviours": [go_to("1", "C1"), plain("2", "DOCK"), plain("3", "WAIT"),
                           plain("4", "UNDOCK"), go_to("5", "P1")],
        }))
        .unwrap();
        // Mid-chain at the charger: destination is still the charger.
        assert_eq!(task.poi_goal(), Some(&PoiId::from("C1")));
        assert!(!task.en_route());
        // After advancing onto the final GO_TO the goal switches.
        task.current_behaviour_index = 4;
        assert_eq!(task.poi_goal(), Some(&PoiId::from("P1")));
    }

    #[test]
    fn current_behaviour_clamps_unstarted() {
        let task = Task::from_value(&json!({
            "id": "t1", "start_time": "2024-03-01 08:15:00",
            "current_behaviour_index": -1,
            "status": "To Do", "behaviours": [go_to("1", "L1")],
        }))
        .unwrap();
        assert_eq!(task.current_behaviour().id, "1");
        assert_eq!(task.first_goal(), Some(&PoiId::from("L1")));
    }
}

// ── Registry ordering ─────────────────────────────────────────────────────────

#[cfg(test)]
mod registry {
    use agv_core::TaskId;

    use crate::registry::TaskRegistry;

    use super::helpers::{go_to, task};

    #[test]
    fn priority_then_arrival() {
        use crate::{PRIORITY_LOW, PRIORITY_NORMAL, PRIORITY_VERY_HIGH};

        let registry = TaskRegistry::new(vec![
            task("old-low", PRIORITY_LOW, "2024-03-01 08:00:00", vec![go_to("1", "L1")]),
            task("new-high", PRIORITY_VERY_HIGH, "2024-03-01 09:00:00", vec![go_to("1", "L1")]),
            task("old-high", PRIORITY_VERY_HIGH, "2024-03-01 08:00:00", vec![go_to("1", "L1")]),
            task("mid", PRIORITY_NORMAL, "2024-03-01 07:00:00", vec![go_to("1", "L1")]),
        ]);
        let order: Vec<&str> = registry.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, ["old-high", "new-high", "mid", "old-low"]);
    }

    #[test]
    fn stable_for_full_ties() {
        let registry = TaskRegistry::new(vec![
            task("first", 3, "2024-03-01 08:00:00", vec![go_to("1", "L1")]),
            task("second", 3, "2024-03-01 08:00:00", vec![go_to("1", "L1")]),
        ]);
        let order: Vec<&str> = registry.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, ["first", "second"]);
    }

    #[test]
    fn priorities_survive_ordering() {
        let registry = TaskRegistry::new(vec![
            task("a", 1, "2024-03-01 08:00:00", vec![go_to("1", "L1")]),
            task("b", 4, "2024-03-01 08:00:00", vec![go_to("1", "L1")]),
        ]);
        assert!(registry.tasks().iter().any(|t| t.priority == 1));
        assert!(registry.tasks().iter().any(|t| t.priority == 4));
    }

    #[test]
    fn take_and_remove() {
        let mut registry = TaskRegistry::new(vec![
            task("a", 3, "2024-03-01 08:00:00", vec![go_to("1", "L1")]),
            task("b", 3, "2024-03-01 08:01:00", vec![go_to("1", "L1")]),
            task("c", 3, "2024-03-01 08:02:00", vec![go_to("1", "L1")]),
        ]);
        let taken = registry.take(&TaskId::from("b")).unwrap();
        assert_eq!(taken.id.as_str(), "b");
        assert!(registry.take(&TaskId::from("b")).is_none());

        registry.remove_by_id(&[TaskId::from("a"), TaskId::from("c")]);
        assert!(registry.is_empty());
    }

    #[test]
    fn unassigned_unstarted_filter() {
        let mut pinned = task("pinned", 3, "2024-03-01 08:00:00", vec![go_to("1", "L1")]);
        pinned.robot = Some("r1".into());
        let free = task("free", 3, "2024-03-01 08:01:00", vec![go_to("1", "L1")]);
        let registry = TaskRegistry::new(vec![pinned, free]);
        let ids: Vec<&str> = registry
            .unassigned_unstarted()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["free"]);
    }
}
