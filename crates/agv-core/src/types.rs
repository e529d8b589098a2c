//! Domain enums shared across the workspace.
//!
//! The backend encodes all of these as small integers; the `from_code` /
//! `code` pairs are the single place those wire values are interpreted.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── WayType ───────────────────────────────────────────────────────────────────

/// Direction and width class of a source-graph edge.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum WayType {
    /// Bidirectional, wide enough for robots to pass each other.
    TwoWay,
    /// Bidirectional but single-lane: the two orientations exclude each other.
    NarrowTwoWay,
    /// Single direction only.
    OneWay,
}

impl WayType {
    pub fn from_code(code: u8) -> Option<WayType> {
        match code {
            1 => Some(WayType::TwoWay),
            2 => Some(WayType::NarrowTwoWay),
            3 => Some(WayType::OneWay),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            WayType::TwoWay => 1,
            WayType::NarrowTwoWay => 2,
            WayType::OneWay => 3,
        }
    }

    /// Both orientations of the source edge exist in the expanded edge set.
    pub fn is_bidirectional(self) -> bool {
        matches!(self, WayType::TwoWay | WayType::NarrowTwoWay)
    }
}

impl TryFrom<u8> for WayType {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self, CoreError> {
        WayType::from_code(code).ok_or(CoreError::UnknownCode {
            what: "way type",
            code,
        })
    }
}

// ── SectionKind ───────────────────────────────────────────────────────────────

/// How the supervisor-graph builder expands a source node.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SectionKind {
    /// Split into a dock → wait → undock → end chain.
    DockWaitUndock,
    /// Split into a wait → end chain.
    WaitPoi,
    /// Copied through as a single node.
    NoChanges,
    /// Geometric waypoint; collapsed away before expansion.
    Normal,
    /// Split into one `in` half per incoming direction and one `out` half
    /// per outgoing direction, fully cross-connected.
    Intersection,
}

impl SectionKind {
    pub fn from_code(code: u8) -> Option<SectionKind> {
        match code {
            1 => Some(SectionKind::DockWaitUndock),
            2 => Some(SectionKind::WaitPoi),
            3 => Some(SectionKind::NoChanges),
            4 => Some(SectionKind::Normal),
            5 => Some(SectionKind::Intersection),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            SectionKind::DockWaitUndock => 1,
            SectionKind::WaitPoi => 2,
            SectionKind::NoChanges => 3,
            SectionKind::Normal => 4,
            SectionKind::Intersection => 5,
        }
    }
}

// ── PoiKind ───────────────────────────────────────────────────────────────────

/// Semantic role of a source node.
///
/// The numeric codes are the backend's; [`PoiKind::section`] is the fixed
/// role → expansion-rule mapping.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PoiKind {
    Charger,
    Load,
    Unload,
    LoadUnload,
    LoadDock,
    UnloadDock,
    LoadUnloadDock,
    Waiting,
    Departure,
    WaitingDeparture,
    Parking,
    Queue,
    Normal,
    Intersection,
}

impl PoiKind {
    pub fn from_code(code: u8) -> Option<PoiKind> {
        match code {
            1 => Some(PoiKind::Charger),
            2 => Some(PoiKind::Load),
            3 => Some(PoiKind::Unload),
            4 => Some(PoiKind::LoadUnload),
            5 => Some(PoiKind::LoadDock),
            6 => Some(PoiKind::UnloadDock),
            7 => Some(PoiKind::LoadUnloadDock),
            8 => Some(PoiKind::Waiting),
            9 => Some(PoiKind::Departure),
            10 => Some(PoiKind::WaitingDeparture),
            11 => Some(PoiKind::Parking),
            12 => Some(PoiKind::Queue),
            13 => Some(PoiKind::Normal),
            14 => Some(PoiKind::Intersection),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            PoiKind::Charger => 1,
            PoiKind::Load => 2,
            PoiKind::Unload => 3,
            PoiKind::LoadUnload => 4,
            PoiKind::LoadDock => 5,
            PoiKind::UnloadDock => 6,
            PoiKind::LoadUnloadDock => 7,
            PoiKind::Waiting => 8,
            PoiKind::Departure => 9,
            PoiKind::WaitingDeparture => 10,
            PoiKind::Parking => 11,
            PoiKind::Queue => 12,
            PoiKind::Normal => 13,
            PoiKind::Intersection => 14,
        }
    }

    /// The expansion rule this role follows in the supervisor graph.
    pub fn section(self) -> SectionKind {
        match self {
            PoiKind::Charger
            | PoiKind::LoadDock
            | PoiKind::UnloadDock
            | PoiKind::LoadUnloadDock => SectionKind::DockWaitUndock,

            PoiKind::Load | PoiKind::Unload | PoiKind::LoadUnload => SectionKind::WaitPoi,

            PoiKind::Waiting | PoiKind::Departure | PoiKind::Parking | PoiKind::Queue => {
                SectionKind::NoChanges
            }

            PoiKind::Normal => SectionKind::Normal,

            PoiKind::WaitingDeparture | PoiKind::Intersection => SectionKind::Intersection,
        }
    }

    /// A POI where robots are serviced (docking stations and wait stations).
    pub fn is_operational(self) -> bool {
        matches!(
            self.section(),
            SectionKind::DockWaitUndock | SectionKind::WaitPoi
        )
    }
}

impl TryFrom<u8> for PoiKind {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self, CoreError> {
        PoiKind::from_code(code).ok_or(CoreError::UnknownCode {
            what: "node role",
            code,
        })
    }
}

// ── EdgeAction ────────────────────────────────────────────────────────────────

/// The single robot action a planning-graph edge represents.
///
/// Task behaviours map onto these labels; battery exchange shares the `Wait`
/// label since it routes and weighs identically.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EdgeAction {
    GoTo,
    Dock,
    Wait,
    Undock,
}
