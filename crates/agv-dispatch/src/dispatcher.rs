//! The dispatcher: four ordered assignment phases plus per-robot edge
//! commitment.

use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use agv_core::{DispatchConfig, EdgeAction, EdgeId, NodeId, PoiId, PoiKind, RobotId, TaskId};
use agv_fleet::{FleetError, FleetPlan, Robot};
use agv_graph::{PlanningError, PlanningGraph};
use agv_task::{Task, TaskRegistry};

use crate::error::{DispatchError, DispatchResult};

// ── Plan output ───────────────────────────────────────────────────────────────

/// One robot's marching orders for this tick.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PlanEntry {
    pub task: TaskId,
    pub next_edge: (NodeId, NodeId),
    /// Traversing `next_edge` completes the task's current behaviour.
    pub end_beh: bool,
}

/// The tick's full output.  Robots without a committed edge are absent.
pub type Plan = FxHashMap<RobotId, PlanEntry>;

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// The assignment engine.  Stateless between ticks; all tick state lives in
/// the [`FleetPlan`] and [`TaskRegistry`] built per call.
pub struct Dispatcher {
    cfg: DispatchConfig,
}

impl Dispatcher {
    pub fn new(cfg: DispatchConfig) -> Self {
        Self { cfg }
    }

    // ── Entry points ──────────────────────────────────────────────────────

    /// Run one tick and return next-edge commands for every robot that got
    /// one.
    pub fn plan_all_free_robots(
        &self,
        graph: &mut PlanningGraph,
        robots: Vec<Robot>,
        tasks: Vec<Task>,
    ) -> DispatchResult<Plan> {
        let fleet = self.set_plan(graph, robots, tasks)?;
        Ok(fleet
            .robots()
            .filter_map(|r| {
                let task = r.task.as_ref()?;
                let next_edge = r.next_edge?;
                Some((
                    r.robot.id.clone(),
                    PlanEntry {
                        task: task.id.clone(),
                        next_edge,
                        end_beh: r.end_beh.unwrap_or(false),
                    },
                ))
            })
            .collect())
    }

    /// Run one tick and return the single robot's command, or `None` when no
    /// edge could be committed for it.
    pub fn plan_selected_robot(
        &self,
        graph: &mut PlanningGraph,
        robots: Vec<Robot>,
        tasks: Vec<Task>,
        robot: &RobotId,
    ) -> DispatchResult<Option<PlanEntry>> {
        let fleet = self.set_plan(graph, robots, tasks)?;
        Ok(fleet.get(robot).and_then(|r| {
            let task = r.task.as_ref()?;
            let next_edge = r.next_edge?;
            Some(PlanEntry {
                task: task.id.clone(),
                next_edge,
                end_beh: r.end_beh.unwrap_or(false),
            })
        }))
    }

    // ── Tick driver ───────────────────────────────────────────────────────

    fn set_plan(
        &self,
        graph: &mut PlanningGraph,
        robots: Vec<Robot>,
        tasks: Vec<Task>,
    ) -> DispatchResult<FleetPlan> {
        let base_edges = graph.base_poi_edges();
        let mut fleet = FleetPlan::new(robots, &base_edges)?;

        // Occupancy is snapshot truth, never history.
        let placements: Vec<_> = fleet.placements().collect();
        graph.set_robots_on_edges(placements)?;
        let graph: &PlanningGraph = graph;

        let mut registry = TaskRegistry::new(tasks);

        self.phase_continue_at_poi(graph, &mut fleet, &mut registry)?;
        self.phase_continue_en_route(graph, &mut fleet, &mut registry)?;
        self.phase_pinned_new_tasks(graph, &mut fleet, &mut registry)?;
        self.phase_assign_remaining(graph, &mut fleet, &mut registry)?;

        Ok(fleet)
    }

    // ── Phase 1: continue in-place ────────────────────────────────────────

    /// Robots already at a POI mid-chain (dock/wait/undock) resume their own
    /// started task.
    fn phase_continue_at_poi(
        &self,
        graph: &PlanningGraph,
        fleet: &mut FleetPlan,
        registry: &mut TaskRegistry,
    ) -> DispatchResult<()> {
        let resumable: Vec<(TaskId, RobotId)> = registry
            .tasks()
            .iter()
            .filter(|t| t.started() && !t.en_route())
            .filter_map(|t| {
                let robot = t.robot.as_ref()?;
                let planned = fleet.get(robot)?;
                planned.task.is_none().then(|| (t.id.clone(), robot.clone()))
            })
            .collect();

        debug!(count = resumable.len(), "phase 1: tasks resuming in-place");
        for (task_id, robot) in resumable {
            let Some(task) = registry.take(&task_id) else { continue };
            fleet.set_task(&robot, task)?;
            self.set_task_edge(graph, fleet, &robot)?;
        }
        Ok(())
    }

    // ── Phase 2: continue en-route ────────────────────────────────────────

    /// Robots with a started GO_TO resume driving.  A robot sitting at a POI
    /// other than its goal keeps the task but only gets an edge while the
    /// goal POI has room; otherwise it holds in place this tick.
    fn phase_continue_en_route(
        &self,
        graph: &PlanningGraph,
        fleet: &mut FleetPlan,
        registry: &mut TaskRegistry,
    ) -> DispatchResult<()> {
        let resumable: Vec<(TaskId, RobotId)> = registry
            .tasks()
            .iter()
            .filter(|t| t.started() && t.en_route())
            .filter_map(|t| {
                let robot = t.robot.as_ref()?;
                let planned = fleet.get(robot)?;
                planned.task.is_none().then(|| (t.id.clone(), robot.clone()))
            })
            .collect();

        debug!(count = resumable.len(), "phase 2: tasks resuming en-route");
        let mut slots = self.free_slots(graph, fleet);
        for (task_id, robot) in resumable {
            let Some(task) = registry.take(&task_id) else { continue };
            let Some(planned) = fleet.get(&robot) else { continue };
            let here = graph.node(planned.node()).poi.clone();
            let goal = task.poi_goal().cloned();
            fleet.set_task(&robot, task)?;

            let detoured = match &goal {
                Some(goal) => here.is_some() && *goal != here,
                None => false,
            };
            if !detoured {
                self.set_task_edge(graph, fleet, &robot)?;
                continue;
            }
            // At the wrong POI: only leave it when the goal has a free seat.
            let Some(goal) = goal else { continue };
            let free = slots.get(&goal).copied().unwrap_or(0);
            if free > 0 && self.set_task_edge(graph, fleet, &robot)? {
                slots.insert(goal, free - 1);
            }
        }
        Ok(())
    }

    // ── Phase 3: pick up pre-assigned new tasks ───────────────────────────

    /// TO_DO tasks already pinned to a robot by the backend.
    fn phase_pinned_new_tasks(
        &self,
        graph: &PlanningGraph,
        fleet: &mut FleetPlan,
        registry: &mut TaskRegistry,
    ) -> DispatchResult<()> {
        let pinned: Vec<(TaskId, RobotId)> = registry
            .tasks()
            .iter()
            .filter(|t| !t.started())
            .filter_map(|t| {
                let robot = t.robot.as_ref()?;
                let planned = fleet.get(robot)?;
                planned.task.is_none().then(|| (t.id.clone(), robot.clone()))
            })
            .collect();

        debug!(count = pinned.len(), "phase 3: pinned new tasks");
        for (task_id, robot) in pinned {
            let Some(task) = registry.take(&task_id) else { continue };
            fleet.set_task(&robot, task)?;
            self.set_task_edge(graph, fleet, &robot)?;
        }
        Ok(())
    }

    // ── Phase 4: assign the remaining tasks ───────────────────────────────

    /// Hand out unowned tasks, preferring robots that idle inside a POI some
    /// busy robot is heading for.  Loops until every free robot is served or
    /// nothing assignable remains; bounded by the planning deadline.
    fn phase_assign_remaining(
        &self,
        graph: &PlanningGraph,
        fleet: &mut FleetPlan,
        registry: &mut TaskRegistry,
    ) -> DispatchResult<()> {
        let deadline = Instant::now() + self.cfg.planning_deadline;
        let mut fuel = self.cfg.planning_fuel;

        loop {
            if Instant::now() >= deadline {
                return Err(DispatchError::PlanningTimeout(self.cfg.planning_deadline));
            }
            if let Some(f) = fuel.as_mut() {
                if *f == 0 {
                    return Err(DispatchError::PlanningTimeout(self.cfg.planning_deadline));
                }
                *f -= 1;
            }

            let free: Vec<RobotId> = fleet.free_robots().map(|r| r.robot.id.clone()).collect();
            let blocking = self.blocking_robots(graph, fleet);
            let candidates = self.candidate_tasks(graph, fleet, registry, free.len());
            let blocking_candidates =
                self.candidate_tasks(graph, fleet, registry, blocking.len());
            debug!(
                free = free.len(),
                blocking = blocking.len(),
                candidates = candidates.len(),
                "phase 4: assignment round"
            );

            if !candidates.is_empty() && candidates.len() == free.len() {
                // Enough work for everyone: serve the whole pool and finish.
                self.greedy_assign(graph, fleet, registry, candidates, free)?;
                break;
            } else if !blocking.is_empty() && blocking_candidates.len() == blocking.len() {
                // A task for every blocking robot: serve them ahead of the
                // rest.  A shorter supply goes to the general pool instead.
                self.greedy_assign(graph, fleet, registry, blocking_candidates, blocking)?;
            } else if !free.is_empty() && !candidates.is_empty() {
                self.greedy_assign(graph, fleet, registry, candidates, free)?;
            } else {
                if !blocking.is_empty() {
                    self.send_free_robots_to_parking(&blocking);
                }
                break;
            }
        }
        Ok(())
    }

    /// Free robots idling inside a non-queue POI that some busy robot's task
    /// targets.
    fn blocking_robots(&self, graph: &PlanningGraph, fleet: &FleetPlan) -> Vec<RobotId> {
        let sitters: Vec<(RobotId, PoiId)> = fleet
            .free_robots()
            .filter_map(|r| {
                let poi = &graph.node(r.node()).poi;
                (poi.is_some() && graph.poi_kind(poi) != Some(PoiKind::Queue))
                    .then(|| (r.robot.id.clone(), poi.clone()))
            })
            .collect();
        let wanted: FxHashSet<PoiId> = fleet.current_goals().into_values().collect();
        sitters
            .into_iter()
            .filter(|(_, poi)| wanted.contains(poi))
            .map(|(robot, _)| robot)
            .collect()
    }

    /// Remaining per-POI seats: capacity minus robots already destined there
    /// minus task-less robots already sitting there.
    fn free_slots(&self, graph: &PlanningGraph, fleet: &FleetPlan) -> FxHashMap<PoiId, u32> {
        let mut used: FxHashMap<PoiId, u32> = FxHashMap::default();
        for goal in fleet.current_goals().into_values() {
            *used.entry(goal).or_insert(0) += 1;
        }
        for r in fleet.free_robots() {
            let poi = &graph.node(r.node()).poi;
            if poi.is_some() {
                *used.entry(poi.clone()).or_insert(0) += 1;
            }
        }
        graph
            .max_allowed_robots_using_pois()
            .into_iter()
            .map(|(poi, cap)| {
                let in_use = used.get(&poi).copied().unwrap_or(0);
                (poi, cap.saturating_sub(in_use))
            })
            .collect()
    }

    /// Up to `want` unowned TO_DO tasks, in priority order, whose first goal
    /// POI still has a free seat (seats are consumed as tasks are picked).
    fn candidate_tasks(
        &self,
        graph: &PlanningGraph,
        fleet: &FleetPlan,
        registry: &TaskRegistry,
        want: usize,
    ) -> Vec<TaskId> {
        if want == 0 {
            return Vec::new();
        }
        let mut slots = self.free_slots(graph, fleet);
        let mut picked = Vec::new();
        for task in registry.unassigned_unstarted() {
            let Some(goal) = task.first_goal() else {
                continue;
            };
            match slots.get_mut(goal) {
                Some(free) if *free > 0 => {
                    *free -= 1;
                    picked.push(task.id.clone());
                    if picked.len() == want {
                        break;
                    }
                }
                Some(_) => {}
                None => {
                    warn!(task = %task.id, poi = %goal, "task targets a POI absent from the graph");
                }
            }
        }
        picked
    }

    /// Assign each task (already in priority order) to the pool robot with
    /// the shortest masked path to the task's target node; first-seen order
    /// breaks ties.  Robots that cannot reach the target are skipped.
    fn greedy_assign(
        &self,
        graph: &PlanningGraph,
        fleet: &mut FleetPlan,
        registry: &mut TaskRegistry,
        tasks: Vec<TaskId>,
        mut pool: Vec<RobotId>,
    ) -> DispatchResult<()> {
        for task_id in tasks {
            let Some(task) = registry.get(&task_id) else { continue };
            let target = self.undone_behaviour_node(graph, task)?;

            let mut best: Option<(u32, usize)> = None;
            for (i, robot) in pool.iter().enumerate() {
                let Some(planned) = fleet.get(robot) else { continue };
                match graph.path_length(planned.node(), target) {
                    Ok(len) => {
                        if best.is_none_or(|(b, _)| len < b) {
                            best = Some((len, i));
                        }
                    }
                    Err(PlanningError::NoRoute { .. }) => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            let Some((_, idx)) = best else {
                warn!(task = %task_id, "no pooled robot can reach the task target");
                continue;
            };

            let Some(task) = registry.take(&task_id) else { continue };
            let robot = pool.remove(idx);
            fleet.set_task(&robot, task)?;
            self.set_task_edge(graph, fleet, &robot)?;
            if pool.is_empty() {
                break;
            }
        }
        Ok(())
    }

    // ── Per-robot edge commitment ─────────────────────────────────────────

    /// Commit the next edge for a robot with a task assigned this tick.
    ///
    /// Returns `true` when an edge was committed; `false` when the robot is
    /// busy/unplanned or the POI/edge availability checks declined — the
    /// robot then holds its task with no movement this tick.
    fn set_task_edge(
        &self,
        graph: &PlanningGraph,
        fleet: &mut FleetPlan,
        robot: &RobotId,
    ) -> DispatchResult<bool> {
        let planned = fleet
            .get(robot)
            .ok_or_else(|| FleetError::UnknownRobot(robot.clone()))?;
        if !(planned.robot.planning_on && planned.robot.is_free) {
            return Ok(false);
        }
        let task = planned
            .task
            .clone()
            .ok_or_else(|| FleetError::NoTask(robot.clone()))?;
        let current_edge = planned.edge;
        let start = planned.node();

        let target = self.undone_behaviour_node(graph, &task)?;
        let path = graph.path(start, target)?;
        let next = (path[0], path[1]);
        let next_id = graph.require_edge(next.0, next.1)?;

        let goal = task.poi_goal().cloned();
        let poi_available = match &goal {
            None => true,
            Some(goal) => self.poi_available(graph, fleet, robot, goal, current_edge),
        };
        let edge_available = self.edge_available(graph, fleet, robot, next, next_id);

        if !(poi_available && edge_available) {
            debug!(
                robot = %robot,
                poi_available,
                edge_available,
                "edge commitment declined"
            );
            return Ok(false);
        }

        fleet.set_next_edge(robot, next)?;
        // DOCK/WAIT/UNDOCK are single-edge behaviours; a GO_TO completes only
        // when one edge remains.
        let end_beh = !task.current_behaviour().kind.is_go_to() || path.len() == 2;
        fleet.set_end_beh(robot, end_beh)?;
        Ok(true)
    }

    /// The destination POI can take this robot: it has a free seat beyond
    /// its current users, or the robot is already inside the POI's exclusion
    /// group, or the robot is on the open road (outside every POI group), or
    /// the robot is itself one of the POI's counted users within quota.
    fn poi_available(
        &self,
        graph: &PlanningGraph,
        fleet: &FleetPlan,
        robot: &RobotId,
        goal: &PoiId,
        current_edge: (NodeId, NodeId),
    ) -> bool {
        let capacity = graph
            .max_allowed_robots_using_pois()
            .get(goal)
            .copied()
            .unwrap_or(0);
        let users = self.poi_users(graph, fleet, goal);
        if (users.len() as u32) < capacity {
            return true;
        }
        let current_group = graph
            .edge_between(current_edge.0, current_edge.1)
            .map(|e| graph.edge(e).group);
        if let Some(group) = current_group {
            if graph.poi_group(goal) == Some(group) {
                return true;
            }
            if group.is_none() || !graph.is_poi_group(group) {
                return true;
            }
        }
        users.contains(robot) && users.len() as u32 <= capacity
    }

    /// Robots counted against a POI's quota: busy robots destined there plus
    /// task-less robots already sitting there.
    fn poi_users(&self, graph: &PlanningGraph, fleet: &FleetPlan, poi: &PoiId) -> Vec<RobotId> {
        let mut users: Vec<RobotId> = fleet
            .current_goals()
            .into_iter()
            .filter(|(_, goal)| goal == poi)
            .map(|(robot, _)| robot)
            .collect();
        for r in fleet.free_robots() {
            if graph.node(r.node()).poi == *poi && !users.contains(&r.robot.id) {
                users.push(r.robot.id.clone());
            }
        }
        users
    }

    /// The next edge has room once every current occupant, every robot
    /// already promised the edge this tick, and (for grouped edges) every
    /// occupant anywhere in the group is counted — the robot itself excluded.
    fn edge_available(
        &self,
        graph: &PlanningGraph,
        fleet: &FleetPlan,
        robot: &RobotId,
        next: (NodeId, NodeId),
        next_id: EdgeId,
    ) -> bool {
        let mut conflicting: FxHashSet<RobotId> =
            graph.edge(next_id).robots.iter().cloned().collect();
        conflicting.extend(fleet.robots_on_future_edges(&[next]));

        let group = graph.edge(next_id).group;
        if !group.is_none() {
            let members: Vec<(NodeId, NodeId)> = graph
                .edges_by_group(group)
                .iter()
                .map(|e| {
                    let edge = graph.edge(*e);
                    (edge.from, edge.to)
                })
                .collect();
            for member in graph.edges_by_group(group) {
                conflicting.extend(graph.edge(*member).robots.iter().cloned());
            }
            conflicting.extend(fleet.robots_on_future_edges(&members));
        }

        conflicting.remove(robot);
        (conflicting.len() as u32) < graph.max_allowed_robots(next_id)
    }

    /// Target node of the task's current behaviour, per the expansion rules.
    fn undone_behaviour_node(
        &self,
        graph: &PlanningGraph,
        task: &Task,
    ) -> DispatchResult<NodeId> {
        let poi = task
            .poi_goal()
            .ok_or_else(|| DispatchError::NoGoal(task.id.clone()))?;
        let node = match task.current_behaviour().kind.edge_action() {
            EdgeAction::GoTo => graph.end_go_to_node(poi)?,
            EdgeAction::Dock => graph.end_docking_node(poi)?,
            EdgeAction::Wait => graph.end_wait_node(poi)?,
            EdgeAction::Undock => graph.end_undocking_node(poi)?,
        };
        Ok(node)
    }

    // ── Parking hooks ─────────────────────────────────────────────────────

    /// Reserved hook: evacuate task-less robots that keep blocking POIs.
    /// Intentionally a no-op until the product defines the behaviour.
    fn send_free_robots_to_parking(&self, blocking: &[RobotId]) {
        debug!(count = blocking.len(), "blocking robots left unassigned; parking hook is a no-op");
    }

    /// Reserved hook: divert busy robots to parking.  Intentionally a no-op
    /// until the product defines the behaviour.
    #[allow(dead_code)]
    fn send_busy_robots_to_parking(&self, blocking: &[RobotId]) {
        debug!(count = blocking.len(), "busy-robot parking hook is a no-op");
    }
}
