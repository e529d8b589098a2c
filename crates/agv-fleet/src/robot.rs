//! Fleet robots as reported by the supervisor.
//!
//! # Wire format
//!
//! A map `robotId → record`:
//!
//! ```json
//! {
//!   "r1": { "edge": [4, 7], "poiId": "0", "planningOn": true,
//!           "isFree": true, "timeRemaining": 0.0 },
//!   "r2": { "edge": null, "poiId": "P1", "planningOn": true,
//!           "isFree": true, "timeRemaining": 12.5 }
//! }
//! ```
//!
//! A robot standing inside a POI may report only the POI id; the plan layer
//! resolves it to the POI's canonical base edge.

use std::collections::BTreeMap;

use serde::Deserialize;

use agv_core::{NodeId, PoiId, RobotId};

use crate::error::RobotError;

/// One fleet member, validated.
#[derive(Clone, Debug)]
pub struct Robot {
    pub id: RobotId,
    /// Planning-graph edge the robot occupies; if free, it stands at the
    /// edge's end node.
    pub edge: Option<(NodeId, NodeId)>,
    /// POI the robot stands at, when no concrete edge is reported.
    pub poi: Option<PoiId>,
    /// Autonomous mode: the dispatcher ignores robots with this off.
    pub planning_on: bool,
    /// The previous behaviour step is complete; the robot awaits its next
    /// edge.
    pub is_free: bool,
    /// Seconds left in the running behaviour; informational.
    pub time_remaining: f64,
}

impl Robot {
    pub fn new(id: impl Into<RobotId>, edge: (NodeId, NodeId)) -> Self {
        Self {
            id: id.into(),
            edge: Some(edge),
            poi: None,
            planning_on: true,
            is_free: true,
            time_remaining: 0.0,
        }
    }

    /// A robot placed by POI instead of by edge.
    pub fn at_poi(id: impl Into<RobotId>, poi: impl Into<PoiId>) -> Self {
        Self {
            id: id.into(),
            edge: None,
            poi: Some(poi.into()),
            planning_on: true,
            is_free: true,
            time_remaining: 0.0,
        }
    }

    fn from_record(id: RobotId, record: RobotRecord) -> Result<Robot, RobotError> {
        if id.as_str().is_empty() {
            return Err(RobotError::EmptyId);
        }
        let edge = record.edge.map(|(a, b)| (NodeId(a), NodeId(b)));
        let poi = match record.poi {
            Some(p) if p != PoiId::NONE_STR && !p.is_empty() => Some(PoiId(p)),
            _ => None,
        };
        if edge.is_none() && poi.is_none() {
            return Err(RobotError::Unplaceable(id));
        }
        Ok(Robot {
            id,
            edge,
            poi,
            planning_on: record.planning_on,
            is_free: record.is_free,
            time_remaining: record.time_remaining,
        })
    }
}

// ── Wire record ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RobotRecord {
    #[serde(default)]
    edge: Option<(u32, u32)>,
    #[serde(rename = "poiId", default)]
    poi: Option<String>,
    #[serde(rename = "planningOn")]
    planning_on: bool,
    #[serde(rename = "isFree")]
    is_free: bool,
    #[serde(rename = "timeRemaining", default)]
    time_remaining: f64,
}

/// Parse and validate a whole fleet snapshot payload.
pub fn robots_from_json(json: &str) -> Result<Vec<Robot>, RobotError> {
    let records: BTreeMap<String, RobotRecord> = serde_json::from_str(json)?;
    records
        .into_iter()
        .map(|(id, record)| Robot::from_record(RobotId(id), record))
        .collect()
}
