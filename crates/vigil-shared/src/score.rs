//! Score rules: raw activity outcome to XP, vigilance and streak changes.
//!
//! Vigilance is an exponential smoothing of the current value (70%) and
//! the raw score (30%), so it moves gradually in either direction.

use serde::{Deserialize, Serialize};

/// Minimum raw score that extends the streak
pub const STREAK_THRESHOLD: u8 = 80;

/// Highest accepted raw score
pub const MAX_RAW_SCORE: u8 = 100;

/// Kind of finished activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Scenario,
    Game,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Scenario => "scenario",
            ActivityKind::Game => "game",
        }
    }

    /// Raw score points per XP point
    fn xp_divisor(&self) -> u64 {
        match self {
            ActivityKind::Scenario => 10,
            ActivityKind::Game => 20,
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scenario" => Ok(ActivityKind::Scenario),
            "game" => Ok(ActivityKind::Game),
            other => Err(format!("unknown activity kind '{}'", other)),
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changes produced by a single activity outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDelta {
    pub xp_delta: u64,
    pub vigilance_delta: i16,
    pub new_vigilance: u8,
    pub streak_increment: bool,
}

/// Score one outcome against the current vigilance.
///
/// Callers validate `raw_score <= 100` first; out-of-range values are
/// clamped here so the vigilance invariant holds regardless.
pub fn score_activity(current_vigilance: u8, raw_score: u8, kind: ActivityKind) -> ScoreDelta {
    let raw = raw_score.min(MAX_RAW_SCORE);
    let current = current_vigilance.min(100);
    let new_vigilance = smooth_vigilance(current, raw);

    ScoreDelta {
        xp_delta: round_div(raw as u64, kind.xp_divisor()),
        vigilance_delta: new_vigilance as i16 - current as i16,
        new_vigilance,
        streak_increment: raw >= STREAK_THRESHOLD,
    }
}

/// round(current * 0.7 + raw * 0.3), clamped to 0-100.
///
/// Integer form avoids float artifacts on .5 boundaries.
pub fn smooth_vigilance(current: u8, raw_score: u8) -> u8 {
    let weighted = 7 * current as u32 + 3 * raw_score as u32;
    ((weighted + 5) / 10).min(100) as u8
}

/// Round half up
fn round_div(value: u64, divisor: u64) -> u64 {
    (value + divisor / 2) / divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_xp() {
        assert_eq!(score_activity(50, 90, ActivityKind::Scenario).xp_delta, 9);
        assert_eq!(score_activity(50, 85, ActivityKind::Scenario).xp_delta, 9);
        assert_eq!(score_activity(50, 84, ActivityKind::Scenario).xp_delta, 8);
        assert_eq!(score_activity(50, 100, ActivityKind::Scenario).xp_delta, 10);
        assert_eq!(score_activity(50, 0, ActivityKind::Scenario).xp_delta, 0);
    }

    #[test]
    fn test_game_xp() {
        assert_eq!(score_activity(50, 100, ActivityKind::Game).xp_delta, 5);
        assert_eq!(score_activity(50, 50, ActivityKind::Game).xp_delta, 3);
        assert_eq!(score_activity(50, 49, ActivityKind::Game).xp_delta, 2);
        assert_eq!(score_activity(50, 9, ActivityKind::Game).xp_delta, 0);
    }

    #[test]
    fn test_vigilance_smoothing() {
        assert_eq!(smooth_vigilance(50, 100), 65);
        assert_eq!(smooth_vigilance(50, 0), 35);
        assert_eq!(smooth_vigilance(50, 90), 62);
        assert_eq!(smooth_vigilance(100, 100), 100);
        assert_eq!(smooth_vigilance(0, 0), 0);
    }

    #[test]
    fn test_vigilance_half_rounds_up() {
        // 55 * 0.7 + 0 * 0.3 = 38.5
        assert_eq!(smooth_vigilance(55, 0), 39);
    }

    #[test]
    fn test_vigilance_delta_sign() {
        let up = score_activity(50, 100, ActivityKind::Scenario);
        assert_eq!(up.vigilance_delta, 15);
        let down = score_activity(50, 0, ActivityKind::Scenario);
        assert_eq!(down.vigilance_delta, -15);
        assert_eq!(down.new_vigilance, 35);
    }

    #[test]
    fn test_vigilance_always_in_range() {
        for current in 0..=100u8 {
            for raw in 0..=100u8 {
                let v = smooth_vigilance(current, raw);
                assert!(v <= 100);
            }
        }
    }

    #[test]
    fn test_streak_threshold() {
        assert!(score_activity(50, 80, ActivityKind::Game).streak_increment);
        assert!(!score_activity(50, 79, ActivityKind::Game).streak_increment);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("Scenario".parse::<ActivityKind>(), Ok(ActivityKind::Scenario));
        assert_eq!("game".parse::<ActivityKind>(), Ok(ActivityKind::Game));
        assert!("quiz".parse::<ActivityKind>().is_err());
    }
}
