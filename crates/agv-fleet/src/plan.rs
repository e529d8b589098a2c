//! Per-tick robot plan state.
//!
//! `FleetPlan` tracks, for the current dispatch tick only, which task each
//! robot holds and which edge it was told to traverse next.  Setters enforce
//! their ordering contract — a next edge requires a task, an end-of-behaviour
//! flag requires a next edge — so a phase bug surfaces as an error instead of
//! a silently inconsistent plan.

use rustc_hash::FxHashMap;

use agv_core::{NodeId, PoiId, RobotId};
use agv_task::Task;

use crate::error::{FleetError, FleetResult};
use crate::robot::Robot;

// ── PlannedRobot ──────────────────────────────────────────────────────────────

/// One robot's state within the tick.
#[derive(Clone, Debug)]
pub struct PlannedRobot {
    pub robot: Robot,
    /// The robot's position, normalized to a concrete graph edge (POI
    /// reports resolved through the canonical base edges).
    pub edge: (NodeId, NodeId),
    /// Task assigned this tick, if any.
    pub task: Option<Task>,
    /// Edge the robot should traverse next; empty when the robot holds a
    /// task but no edge could be committed.
    pub next_edge: Option<(NodeId, NodeId)>,
    /// Whether traversing `next_edge` completes the task's current
    /// behaviour.
    pub end_beh: Option<bool>,
}

impl PlannedRobot {
    /// Node the robot currently stands at (the end of its edge).
    #[inline]
    pub fn node(&self) -> NodeId {
        self.edge.1
    }
}

// ── FleetPlan ─────────────────────────────────────────────────────────────────

/// All planning-enabled robots and their per-tick assignments.
#[derive(Debug)]
pub struct FleetPlan {
    robots: Vec<PlannedRobot>,
    index: FxHashMap<RobotId, usize>,
}

impl FleetPlan {
    /// Build the tick's plan state from the fleet snapshot.
    ///
    /// Robots with planning disabled are dropped.  A robot reporting a POI
    /// instead of an edge is placed on that POI's canonical base edge; an
    /// unknown POI is an error.
    pub fn new(
        robots: Vec<Robot>,
        base_poi_edges: &FxHashMap<PoiId, (NodeId, NodeId)>,
    ) -> FleetResult<Self> {
        let mut planned = Vec::with_capacity(robots.len());
        let mut index = FxHashMap::default();
        for robot in robots {
            if !robot.planning_on {
                continue;
            }
            let edge = match (robot.edge, &robot.poi) {
                (Some(edge), _) => edge,
                (None, Some(poi)) => *base_poi_edges.get(poi).ok_or_else(|| {
                    FleetError::UnknownPoi(robot.id.clone(), poi.clone())
                })?,
                (None, None) => return Err(FleetError::Robot(
                    crate::error::RobotError::Unplaceable(robot.id.clone()),
                )),
            };
            index.insert(robot.id.clone(), planned.len());
            planned.push(PlannedRobot {
                robot,
                edge,
                task: None,
                next_edge: None,
                end_beh: None,
            });
        }
        Ok(Self {
            robots: planned,
            index,
        })
    }

    // ── Access ────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    pub fn get(&self, id: &RobotId) -> Option<&PlannedRobot> {
        self.index.get(id).map(|&i| &self.robots[i])
    }

    pub fn contains(&self, id: &RobotId) -> bool {
        self.index.contains_key(id)
    }

    pub fn robots(&self) -> impl Iterator<Item = &PlannedRobot> {
        self.robots.iter()
    }

    fn get_mut(&mut self, id: &RobotId) -> FleetResult<&mut PlannedRobot> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| FleetError::UnknownRobot(id.clone()))?;
        Ok(&mut self.robots[idx])
    }

    // ── Per-tick assignment setters ───────────────────────────────────────

    /// Assign `task` to the robot.  Fails for robots outside the plan and for
    /// tasks already pinned to a different robot.
    pub fn set_task(&mut self, id: &RobotId, task: Task) -> FleetResult<()> {
        if let Some(assigned) = &task.robot
            && assigned != id
        {
            return Err(FleetError::TaskConflict {
                task: task.id.clone(),
                assigned: assigned.clone(),
                robot: id.clone(),
            });
        }
        let planned = self.get_mut(id)?;
        planned.task = Some(task);
        Ok(())
    }

    /// Commit the robot's next edge.  Requires a task.
    pub fn set_next_edge(&mut self, id: &RobotId, edge: (NodeId, NodeId)) -> FleetResult<()> {
        let planned = self.get_mut(id)?;
        if planned.task.is_none() {
            return Err(FleetError::NoTask(id.clone()));
        }
        planned.next_edge = Some(edge);
        Ok(())
    }

    /// Set the end-of-behaviour flag.  Requires a task and a committed edge.
    pub fn set_end_beh(&mut self, id: &RobotId, flag: bool) -> FleetResult<()> {
        let planned = self.get_mut(id)?;
        if planned.task.is_none() {
            return Err(FleetError::NoTask(id.clone()));
        }
        if planned.next_edge.is_none() {
            return Err(FleetError::NoEdge(id.clone()));
        }
        planned.end_beh = Some(flag);
        Ok(())
    }

    // ── Partitions & lookups ──────────────────────────────────────────────

    /// Robots without a task in this tick's plan.
    pub fn free_robots(&self) -> impl Iterator<Item = &PlannedRobot> {
        self.robots.iter().filter(|r| r.task.is_none())
    }

    /// Robots holding a task in this tick's plan.
    pub fn busy_robots(&self) -> impl Iterator<Item = &PlannedRobot> {
        self.robots.iter().filter(|r| r.task.is_some())
    }

    /// Ids of robots whose current edge is one of `edges`.
    pub fn robots_on_edges(&self, edges: &[(NodeId, NodeId)]) -> Vec<RobotId> {
        self.robots
            .iter()
            .filter(|r| edges.contains(&r.edge))
            .map(|r| r.robot.id.clone())
            .collect()
    }

    /// Ids of robots whose committed next edge is one of `edges`.
    pub fn robots_on_future_edges(&self, edges: &[(NodeId, NodeId)]) -> Vec<RobotId> {
        self.robots
            .iter()
            .filter(|r| r.next_edge.is_some_and(|e| edges.contains(&e)))
            .map(|r| r.robot.id.clone())
            .collect()
    }

    /// `robotId → destination POI` for every busy robot whose task names one.
    pub fn current_goals(&self) -> FxHashMap<RobotId, PoiId> {
        self.busy_robots()
            .filter_map(|r| {
                let goal = r.task.as_ref()?.poi_goal()?;
                Some((r.robot.id.clone(), goal.clone()))
            })
            .collect()
    }

    /// `(robotId, edge)` placements for rewriting graph occupancy.
    pub fn placements(&self) -> impl Iterator<Item = (RobotId, (NodeId, NodeId))> + '_ {
        self.robots.iter().map(|r| (r.robot.id.clone(), r.edge))
    }
}
