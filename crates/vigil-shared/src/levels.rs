//! Level system.
//!
//! Fixed-cost leveling: every level costs the same `XP_PER_LEVEL`.
//!
//! - Level 1: 0-99 XP
//! - Level 2: 100-199 XP
//! - Level 10: 900-999 XP
//!
//! This is the only place a level is computed. Records store the level for
//! display convenience but it is always overwritten from XP.

use serde::{Deserialize, Serialize};

/// XP cost of every level
pub const XP_PER_LEVEL: u64 = 100;

/// Position of a player on the level curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub level: u64,
    pub xp_into_level: u64,
    pub xp_to_next_level: u64,
    /// Progress within the current level (0-99)
    pub progress_percent: u8,
}

/// Map cumulative XP to a level
pub fn level_for_xp(xp: u64) -> LevelInfo {
    let xp_into_level = xp % XP_PER_LEVEL;
    LevelInfo {
        level: xp / XP_PER_LEVEL + 1,
        xp_into_level,
        xp_to_next_level: XP_PER_LEVEL - xp_into_level,
        progress_percent: (xp_into_level * 100 / XP_PER_LEVEL) as u8,
    }
}

impl std::fmt::Display for LevelInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Level {} ({}/{} XP, {} to next)",
            self.level, self.xp_into_level, XP_PER_LEVEL, self.xp_to_next_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_xp() {
        assert_eq!(level_for_xp(0).level, 1);
        assert_eq!(level_for_xp(99).level, 1);
        assert_eq!(level_for_xp(100).level, 2);
        assert_eq!(level_for_xp(101).level, 2);
        assert_eq!(level_for_xp(500).level, 6);
    }

    #[test]
    fn test_level_boundary() {
        let info = level_for_xp(300);
        assert_eq!(info.level, 4);
        assert_eq!(info.xp_into_level, 0);
        assert_eq!(info.xp_to_next_level, 100);
        assert_eq!(info.progress_percent, 0);
    }

    #[test]
    fn test_progress_within_level() {
        let info = level_for_xp(142);
        assert_eq!(info.level, 2);
        assert_eq!(info.xp_into_level, 42);
        assert_eq!(info.xp_to_next_level, 58);
        assert_eq!(info.progress_percent, 42);
    }

    #[test]
    fn test_level_formula_holds_across_range() {
        for xp in (0..5_000u64).step_by(7) {
            let info = level_for_xp(xp);
            assert_eq!(info.level, xp / 100 + 1);
            assert_eq!(info.xp_into_level + info.xp_to_next_level, 100);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            level_for_xp(142).to_string(),
            "Level 2 (42/100 XP, 58 to next)"
        );
    }
}
