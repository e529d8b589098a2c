//! Behaviours: the atomic actions a task is made of.
//!
//! # Wire format
//!
//! ```json
//! { "id": "b1", "parameters": { "name": "GO_TO", "to": "L1" } }
//! { "id": "b2", "parameters": { "name": "DOCK" } }
//! { "id": "b3", "parameters": { "name": "3" } }
//! ```
//!
//! `name` is one of `GO_TO`, `DOCK`, `WAIT`, `BAT_EX`, `UNDOCK`; the wait
//! action also arrives as the legacy numeric code `3` (string or number).
//! Only `GO_TO` carries a destination POI — every other behaviour implicitly
//! targets the POI reached by the most recent preceding `GO_TO`.

use serde_json::Value;

use agv_core::{EdgeAction, PoiId};

use crate::error::BehaviourError;

// ── BehaviourKind ─────────────────────────────────────────────────────────────

/// The action a behaviour performs.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BehaviourKind {
    GoTo(PoiId),
    Dock,
    Wait,
    /// Battery exchange; plans exactly like [`BehaviourKind::Wait`].
    BatEx,
    Undock,
}

impl BehaviourKind {
    /// The planning-graph edge label this behaviour travels over.
    pub fn edge_action(&self) -> EdgeAction {
        match self {
            BehaviourKind::GoTo(_) => EdgeAction::GoTo,
            BehaviourKind::Dock => EdgeAction::Dock,
            BehaviourKind::Wait | BehaviourKind::BatEx => EdgeAction::Wait,
            BehaviourKind::Undock => EdgeAction::Undock,
        }
    }

    pub fn is_go_to(&self) -> bool {
        matches!(self, BehaviourKind::GoTo(_))
    }

    /// Destination POI; only `GO_TO` carries one.
    pub fn poi(&self) -> Option<&PoiId> {
        match self {
            BehaviourKind::GoTo(poi) => Some(poi),
            _ => None,
        }
    }
}

// ── Behaviour ─────────────────────────────────────────────────────────────────

/// One validated step of a task.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Behaviour {
    /// Stable id within the task.
    pub id: String,
    pub kind: BehaviourKind,
}

impl Behaviour {
    /// Validate a raw behaviour record eagerly.
    ///
    /// Fails when the record is not an object, when `id`, `parameters` or
    /// `parameters.name` is missing or mistyped, when the name is not an
    /// enumerated behaviour, or when a `GO_TO` lacks its `to` POI.
    pub fn from_value(value: &Value) -> Result<Behaviour, BehaviourError> {
        let record = value.as_object().ok_or(BehaviourError::NotARecord)?;

        let id = match record.get("id") {
            None => return Err(BehaviourError::MissingField("id")),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(BehaviourError::WrongFieldType("id")),
        };

        let parameters = record
            .get("parameters")
            .ok_or(BehaviourError::MissingField("parameters"))?
            .as_object()
            .ok_or(BehaviourError::WrongFieldType("parameters"))?;

        let name = match parameters.get("name") {
            None => return Err(BehaviourError::MissingField("parameters.name")),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(BehaviourError::WrongFieldType("parameters.name")),
        };

        let kind = match name.as_str() {
            "GO_TO" => {
                let to = match parameters.get("to") {
                    Some(Value::String(s)) if !s.is_empty() => PoiId(s.clone()),
                    Some(Value::Number(n)) => PoiId(n.to_string()),
                    Some(_) => return Err(BehaviourError::WrongFieldType("parameters.to")),
                    None => return Err(BehaviourError::MissingGoal { id }),
                };
                BehaviourKind::GoTo(to)
            }
            "DOCK" => BehaviourKind::Dock,
            // "3" is the legacy numeric wait code.
            "WAIT" | "3" => BehaviourKind::Wait,
            "BAT_EX" => BehaviourKind::BatEx,
            "UNDOCK" => BehaviourKind::Undock,
            _ => return Err(BehaviourError::UnknownName { id, name }),
        };

        Ok(Behaviour { id, kind })
    }
}
