//! Fundamental identifier types used across the engine.
//!
//! All handles are monotonically increasing and never reused, so a handle
//! that no longer resolves in its owning map is known to be dead. This is
//! what lets cross-links (report ↔ hypothesis ↔ group hypothesis) survive
//! subtree removal in any order.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifier types — newtype wrappers so handles are never confused
// ---------------------------------------------------------------------------

/// Identifies one track tree (and the committed track grown from it).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TrackId(pub u64);

/// Handle to a track hypothesis node in the arena.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct HypoId(pub u64);

/// Handle to a measurement report.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ReportId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Display for HypoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Scan counter. Fresh tree roots are stamped one scan in the past, hence
/// signed.
pub type ScanStamp = i64;
