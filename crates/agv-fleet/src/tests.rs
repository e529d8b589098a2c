//! Unit tests for agv-fleet.

#[cfg(test)]
mod helpers {
    use rustc_hash::FxHashMap;
    use serde_json::json;

    use agv_core::{NodeId, PoiId};
    use agv_task::Task;

    pub fn base_edges() -> FxHashMap<PoiId, (NodeId, NodeId)> {
        let mut base = FxHashMap::default();
        base.insert(PoiId::from("P1"), (NodeId(10), NodeId(11)));
        base
    }

    pub fn go_to_task(id: &str, robot: Option<&str>, poi: &str) -> Task {
        Task::from_value(&json!({
            "id": id,
            "robot": robot.unwrap_or(""),
            "start_time": "2024-03-01 08:00:00",
            "current_behaviour_index": -1,
            "status": "To Do",
            "behaviours": [{ "id": "1", "parameters": { "name": "GO_TO", "to": poi } }],
        }))
        .unwrap()
    }
}

// ── Robot record validation ───────────────────────────────────────────────────

#[cfg(test)]
mod robot {
    use agv_core::{NodeId, PoiId};

    use crate::error::RobotError;
    use crate::robot::robots_from_json;

    #[test]
    fn snapshot_round_trip() {
        let robots = robots_from_json(
            r#"{
                "r1": { "edge": [4, 7], "poiId": "0", "planningOn": true,
                        "isFree": true, "timeRemaining": 0.0 },
                "r2": { "edge": null, "poiId": "P1", "planningOn": false,
                        "isFree": false }
            }"#,
        )
        .unwrap();
        assert_eq!(robots.len(), 2);

        let r1 = robots.iter().find(|r| r.id.as_str() == "r1").unwrap();
        assert_eq!(r1.edge, Some((NodeId(4), NodeId(7))));
        assert_eq!(r1.poi, None);
        assert!(r1.planning_on && r1.is_free);

        let r2 = robots.iter().find(|r| r.id.as_str() == "r2").unwrap();
        assert_eq!(r2.edge, None);
        assert_eq!(r2.poi, Some(PoiId::from("P1")));
        assert!(!r2.planning_on);
    }

    #[test]
    fn unplaceable_robot_rejected() {
        let err = robots_from_json(
            r#"{ "r1": { "edge": null, "poiId": "0", "planningOn": true, "isFree": true } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, RobotError::Unplaceable(id) if id.as_str() == "r1"));
    }

    #[test]
    fn malformed_snapshot_rejected() {
        assert!(matches!(
            robots_from_json(r#"{ "r1": { "planningOn": "yes" } }"#),
            Err(RobotError::Parse(_))
        ));
    }
}

// ── FleetPlan ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod plan {
    use agv_core::{NodeId, PoiId, RobotId};

    use crate::error::FleetError;
    use crate::plan::FleetPlan;
    use crate::robot::Robot;

    use super::helpers::{base_edges, go_to_task};

    #[test]
    fn filters_planning_disabled() {
        let mut off = Robot::new("off", (NodeId(1), NodeId(2)));
        off.planning_on = false;
        let plan = FleetPlan::new(
            vec![Robot::new("on", (NodeId(1), NodeId(2))), off],
            &base_edges(),
        )
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.contains(&RobotId::from("on")));
        assert!(!plan.contains(&RobotId::from("off")));
    }

    #[test]
    fn poi_position_normalizes_to_base_edge() {
        let plan = FleetPlan::new(vec![Robot::at_poi("r1", "P1")], &base_edges()).unwrap();
        let r1 = plan.get(&RobotId::from("r1")).unwrap();
        assert_eq!(r1.edge, (NodeId(10), NodeId(11)));
        assert_eq!(r1.node(), NodeId(11));
    }

    #[test]
    fn unknown_poi_is_an_error() {
        let err = FleetPlan::new(vec![Robot::at_poi("r1", "nowhere")], &base_edges()).unwrap_err();
        assert!(matches!(err, FleetError::UnknownPoi(r, p)
            if r.as_str() == "r1" && p.as_str() == "nowhere"));
    }

    #[test]
    fn setter_ordering_contract() {
        let mut plan =
            FleetPlan::new(vec![Robot::new("r1", (NodeId(1), NodeId(2)))], &base_edges()).unwrap();
        let r1 = RobotId::from("r1");

        // Next edge and end-beh both require a task first.
        assert!(matches!(
            plan.set_next_edge(&r1, (NodeId(2), NodeId(3))),
            Err(FleetError::NoTask(_))
        ));

        plan.set_task(&r1, go_to_task("t1", None, "L1")).unwrap();
        assert!(matches!(
            plan.set_end_beh(&r1, true),
            Err(FleetError::NoEdge(_))
        ));

        plan.set_next_edge(&r1, (NodeId(2), NodeId(3))).unwrap();
        plan.set_end_beh(&r1, true).unwrap();
        let planned = plan.get(&r1).unwrap();
        assert_eq!(planned.next_edge, Some((NodeId(2), NodeId(3))));
        assert_eq!(planned.end_beh, Some(true));
    }

    #[test]
    fn task_pinned_to_other_robot_rejected() {
        let mut plan =
            FleetPlan::new(vec![Robot::new("r1", (NodeId(1), NodeId(2)))], &base_edges()).unwrap();
        let err = plan
            .set_task(&RobotId::from("r1"), go_to_task("t1", Some("r9"), "L1"))
            .unwrap_err();
        assert!(matches!(err, FleetError::TaskConflict { .. }));
    }

    #[test]
    fn unknown_robot_rejected() {
        let mut plan = FleetPlan::new(vec![], &base_edges()).unwrap();
        let err = plan
            .set_task(&RobotId::from("ghost"), go_to_task("t1", None, "L1"))
            .unwrap_err();
        assert!(matches!(err, FleetError::UnknownRobot(_)));
    }

    #[test]
    fn partitions_and_goal_map() {
        let mut plan = FleetPlan::new(
            vec![
                Robot::new("busy", (NodeId(1), NodeId(2))),
                Robot::new("idle", (NodeId(3), NodeId(4))),
            ],
            &base_edges(),
        )
        .unwrap();
        plan.set_task(&RobotId::from("busy"), go_to_task("t1", None, "L1"))
            .unwrap();

        let busy: Vec<&str> = plan.busy_robots().map(|r| r.robot.id.as_str()).collect();
        let free: Vec<&str> = plan.free_robots().map(|r| r.robot.id.as_str()).collect();
        assert_eq!(busy, ["busy"]);
        assert_eq!(free, ["idle"]);

        let goals = plan.current_goals();
        assert_eq!(goals.get(&RobotId::from("busy")), Some(&PoiId::from("L1")));
        assert!(!goals.contains_key(&RobotId::from("idle")));
    }

    #[test]
    fn edge_membership_queries() {
        let mut plan = FleetPlan::new(
            vec![
                Robot::new("r1", (NodeId(1), NodeId(2))),
                Robot::new("r2", (NodeId(3), NodeId(4))),
            ],
            &base_edges(),
        )
        .unwrap();
        plan.set_task(&RobotId::from("r2"), go_to_task("t1", None, "L1"))
            .unwrap();
        plan.set_next_edge(&RobotId::from("r2"), (NodeId(4), NodeId(5)))
            .unwrap();

        let here = plan.robots_on_edges(&[(NodeId(1), NodeId(2))]);
        assert_eq!(here, [RobotId::from("r1")]);

        let future = plan.robots_on_future_edges(&[(NodeId(4), NodeId(5))]);
        assert_eq!(future, [RobotId::from("r2")]);
        assert!(plan.robots_on_future_edges(&[(NodeId(1), NodeId(2))]).is_empty());
    }
}
