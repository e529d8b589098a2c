//! Strongly typed identifier wrappers.
//!
//! Two families live here.  Planning-graph nodes and edges are dense `u32`
//! indices into the graph's internal vectors, so they get zero-cost `Copy`
//! wrappers.  Everything that originates in the backend database — source
//! nodes, source edges, POIs, robots, tasks — is identified by an opaque
//! string and gets a `String`-backed newtype instead.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(Serialize, Deserialize)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to `u32::MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_id! {
    /// Index of a planning-graph node.
    pub struct NodeId(u32);
}

typed_id! {
    /// Index of a directed planning-graph edge.
    pub struct EdgeId(u32);
}

// ── GroupId ───────────────────────────────────────────────────────────────────

/// Mutual-exclusion group of planning-graph edges.
///
/// Group 0 is the "no group" sentinel: the edge is independent and its own
/// `max_robots` applies.  Any non-zero group admits at most one robot across
/// all of its member edges at a time.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[derive(Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl GroupId {
    pub const NONE: GroupId = GroupId(0);

    /// `true` if the edge belongs to no exclusion group.
    #[inline(always)]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

/// Generate a `String`-backed ID wrapper for backend-assigned identifiers.
macro_rules! string_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
        #[derive(Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub String);

        impl $name {
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Identifier of a node in the compact source graph.
    pub struct SourceNodeId;
}

string_id! {
    /// Identifier of an edge in the compact source graph.
    pub struct SourceEdgeId;
}

string_id! {
    /// Identifier of a fleet robot.
    pub struct RobotId;
}

string_id! {
    /// Identifier of a task in the backlog.
    pub struct TaskId;
}

string_id! {
    /// Identifier of a Point of Interest.
    ///
    /// The backend uses the literal string `"0"` (in some payloads the
    /// integer `0`) for "no POI".  Ingestion normalizes both spellings to
    /// [`PoiId::none`]; downstream code only ever checks [`PoiId::is_none`].
    pub struct PoiId;
}

impl PoiId {
    pub const NONE_STR: &'static str = "0";

    /// The normalized "no POI" sentinel.
    #[inline]
    pub fn none() -> Self {
        PoiId(Self::NONE_STR.to_owned())
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.0 == Self::NONE_STR
    }

    #[inline]
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }
}
