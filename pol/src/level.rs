//! Display levels derived from loyalty points.
//!
//! Every surface that shows a level (RPC, CLI) goes through [`level`] so the
//! mapping cannot drift between them.

use crate::ledger::MAX_POINTS;

/// Highest display level.
pub const MAX_LEVEL: u8 = 12;

/// Level for a tag: 0 if unseen or without points, otherwise
/// `ceil(points / 2)` clamped to `1..=12` (1-2 points -> 1, ..., 23-24 -> 12).
pub fn level(seen: bool, points: u8) -> u8 {
    if !seen || points == 0 {
        return 0;
    }
    let points = points.min(MAX_POINTS);
    points.div_ceil(2).clamp(1, MAX_LEVEL)
}

/// Human-readable label for a level.
pub fn level_label(level: u8) -> String {
    if level == 0 {
        "No level".to_string()
    } else {
        format!("Level {level}")
    }
}
