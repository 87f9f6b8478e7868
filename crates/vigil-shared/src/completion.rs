//! Completion pipeline.
//!
//! A finished scenario or game round becomes a new `UserProgress` in one
//! pure step: validate, score, apply the delta, recompute the level,
//! evaluate badges. The input record is never touched; an invalid event
//! produces an error and no record at all.

use crate::badges::{newly_unlocked, BadgeId};
use crate::catalog::ActivityCatalog;
use crate::error::{ProgressionError, Result};
use crate::progress::UserProgress;
use crate::score::{score_activity, ActivityKind, ScoreDelta, MAX_RAW_SCORE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One finished activity as reported by the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    /// Scenario or game id
    pub activity_id: String,
    /// 0-100
    pub raw_score: u8,
    #[serde(default)]
    pub time_spent_secs: u32,
    /// Only meaningful for games
    #[serde(default)]
    pub hints_used: u32,
    pub kind: ActivityKind,
}

impl CompletionEvent {
    pub fn scenario(id: &str, raw_score: u8) -> Self {
        Self {
            activity_id: id.to_string(),
            raw_score,
            time_spent_secs: 0,
            hints_used: 0,
            kind: ActivityKind::Scenario,
        }
    }

    pub fn game(id: &str, raw_score: u8) -> Self {
        Self {
            kind: ActivityKind::Game,
            ..Self::scenario(id, raw_score)
        }
    }

    pub fn with_time(mut self, secs: u32) -> Self {
        self.time_spent_secs = secs;
        self
    }

    pub fn with_hints(mut self, hints: u32) -> Self {
        self.hints_used = hints;
        self
    }

    /// Reject events that must not touch a record
    pub fn validate(&self, catalog: &ActivityCatalog) -> Result<()> {
        if self.raw_score > MAX_RAW_SCORE {
            return Err(ProgressionError::InvalidEvent(format!(
                "raw score {} is outside 0-{}",
                self.raw_score, MAX_RAW_SCORE
            )));
        }
        if self.activity_id.trim().is_empty() {
            return Err(ProgressionError::InvalidEvent("missing activity id".to_string()));
        }
        if !catalog.contains(self.kind, &self.activity_id) {
            return Err(ProgressionError::InvalidEvent(format!(
                "unknown {} '{}'",
                self.kind, self.activity_id
            )));
        }
        Ok(())
    }
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub progress: UserProgress,
    pub score: ScoreDelta,
    pub unlocked: BTreeSet<BadgeId>,
    pub level_before: u64,
    pub level_after: u64,
}

impl CompletionOutcome {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// Apply a completion event to `current`, returning the new record.
pub fn apply_completion(
    current: &UserProgress,
    event: &CompletionEvent,
    catalog: &ActivityCatalog,
    at: DateTime<Utc>,
) -> Result<CompletionOutcome> {
    event.validate(catalog)?;

    let score = score_activity(current.vigilance_score, event.raw_score, event.kind);
    let mut next = current.clone();

    next.xp = next.xp.saturating_add(score.xp_delta);
    next.vigilance_score = score.new_vigilance;
    next.consecutive_correct = if score.streak_increment {
        next.consecutive_correct.saturating_add(1)
    } else {
        0
    };
    match event.kind {
        ActivityKind::Scenario => {
            next.completed_scenarios.insert(event.activity_id.clone());
        }
        ActivityKind::Game => {
            next.games_played = next.games_played.saturating_add(1);
        }
    }
    next.last_played = Some(at);
    next.recompute_level();

    let unlocked = newly_unlocked(&next, event.raw_score);
    next.badges.extend(unlocked.iter().copied());

    Ok(CompletionOutcome {
        level_before: current.level(),
        level_after: next.level(),
        progress: next,
        score,
        unlocked,
    })
}
