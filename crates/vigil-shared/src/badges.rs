//! Badge catalog and unlock rules.
//!
//! Badges are permanent: once in a record they are only removed by a full
//! reset. Each rule is an independent predicate over the post-update
//! record (plus the raw score of the triggering activity), so evaluation
//! order does not matter and re-running the engine on an unchanged record
//! unlocks nothing.
//!
//! Wire ids are stable. New badges may be appended; existing ids are never
//! repurposed.

use crate::progress::UserProgress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bumped whenever a badge is appended to the catalog
pub const BADGE_CATALOG_VERSION: u32 = 1;

/// Closed set of badge ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeId {
    Starter,
    Learner,
    ScenarioMaster,
    ScenarioExpert,
    Consistent,
    PerfectStreak,
    Vigilant,
    SecurityExpert,
    CyberMaster,
    PerfectScore,
}

impl BadgeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeId::Starter => "starter",
            BadgeId::Learner => "learner",
            BadgeId::ScenarioMaster => "scenario-master",
            BadgeId::ScenarioExpert => "scenario-expert",
            BadgeId::Consistent => "consistent",
            BadgeId::PerfectStreak => "perfect-streak",
            BadgeId::Vigilant => "vigilant",
            BadgeId::SecurityExpert => "security-expert",
            BadgeId::CyberMaster => "cyber-master",
            BadgeId::PerfectScore => "perfect-score",
        }
    }

    pub fn rule(&self) -> &'static BadgeRule {
        // Positions in BADGE_RULES
        let index = match self {
            BadgeId::Starter => 0,
            BadgeId::Learner => 1,
            BadgeId::ScenarioMaster => 2,
            BadgeId::ScenarioExpert => 3,
            BadgeId::Consistent => 4,
            BadgeId::PerfectStreak => 5,
            BadgeId::Vigilant => 6,
            BadgeId::SecurityExpert => 7,
            BadgeId::CyberMaster => 8,
            BadgeId::PerfectScore => 9,
        };
        &BADGE_RULES[index]
    }
}

impl std::fmt::Display for BadgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the rule table
pub struct BadgeRule {
    pub id: BadgeId,
    /// ASCII badge symbol
    pub symbol: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Evaluated against the record after the activity was applied
    pub unlocked: fn(&UserProgress, u8) -> bool,
}

/// All badges with their unlock predicates
pub const BADGE_RULES: &[BadgeRule] = &[
    BadgeRule {
        id: BadgeId::Starter,
        symbol: "[*]",
        name: "Starter",
        description: "Begin your training",
        unlocked: |_, _| true,
    },
    // Scenario milestones
    BadgeRule {
        id: BadgeId::Learner,
        symbol: "[3]",
        name: "Learner",
        description: "Complete 3 different scenarios",
        unlocked: |p, _| p.completed_scenarios.len() >= 3,
    },
    BadgeRule {
        id: BadgeId::ScenarioMaster,
        symbol: "[5]",
        name: "Scenario Master",
        description: "Complete 5 different scenarios",
        unlocked: |p, _| p.completed_scenarios.len() >= 5,
    },
    BadgeRule {
        id: BadgeId::ScenarioExpert,
        symbol: "[10]",
        name: "Scenario Expert",
        description: "Complete 10 different scenarios",
        unlocked: |p, _| p.completed_scenarios.len() >= 10,
    },
    // Streaks
    BadgeRule {
        id: BadgeId::Consistent,
        symbol: "<3>",
        name: "Consistent",
        description: "Score 80+ three times in a row",
        unlocked: |p, _| p.consecutive_correct >= 3,
    },
    BadgeRule {
        id: BadgeId::PerfectStreak,
        symbol: "<5>",
        name: "Perfect Streak",
        description: "Score 80+ five times in a row",
        unlocked: |p, _| p.consecutive_correct >= 5,
    },
    // Vigilance
    BadgeRule {
        id: BadgeId::Vigilant,
        symbol: "(80)",
        name: "Vigilant",
        description: "Reach a vigilance score of 80",
        unlocked: |p, _| p.vigilance_score >= 80,
    },
    BadgeRule {
        id: BadgeId::SecurityExpert,
        symbol: "(90)",
        name: "Security Expert",
        description: "Reach a vigilance score of 90",
        unlocked: |p, _| p.vigilance_score >= 90,
    },
    BadgeRule {
        id: BadgeId::CyberMaster,
        symbol: "(95)",
        name: "Cyber Master",
        description: "Reach a vigilance score of 95",
        unlocked: |p, _| p.vigilance_score >= 95,
    },
    BadgeRule {
        id: BadgeId::PerfectScore,
        symbol: "{100}",
        name: "Perfect Score",
        description: "Score 100 on any activity",
        unlocked: |_, raw| raw == 100,
    },
];

/// Badges whose rule holds for `progress` but that it does not hold yet
pub fn newly_unlocked(progress: &UserProgress, raw_score: u8) -> BTreeSet<BadgeId> {
    BADGE_RULES
        .iter()
        .filter(|rule| !progress.has_badge(rule.id))
        .filter(|rule| (rule.unlocked)(progress, raw_score))
        .map(|rule| rule.id)
        .collect()
}

/// Format held badges for a status line (ASCII style)
pub fn format_badges(badges: &BTreeSet<BadgeId>, max_display: usize) -> String {
    if badges.is_empty() {
        return String::new();
    }

    let symbols: Vec<_> = badges
        .iter()
        .take(max_display)
        .map(|b| b.rule().symbol)
        .collect();
    let shown = symbols.join(" ");

    if badges.len() > max_display {
        format!("{} +{} more", shown, badges.len() - max_display)
    } else {
        shown
    }
}

/// Format a single unlock for notification
pub fn format_unlock(badge: BadgeId) -> String {
    let rule = badge.rule();
    format!("{} Badge unlocked: {} - {}", rule.symbol, rule.name, rule.description)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_with(completed: usize, streak: u32, vigilance: u8) -> UserProgress {
        let mut p = UserProgress::default();
        for i in 0..completed {
            p.completed_scenarios.insert(format!("scenario-{}", i));
        }
        p.consecutive_correct = streak;
        p.vigilance_score = vigilance;
        p
    }

    #[test]
    fn test_rule_table_covers_every_badge_once() {
        assert_eq!(BADGE_RULES.len(), 10);
        let ids: BTreeSet<_> = BADGE_RULES.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), BADGE_RULES.len());
        for rule in BADGE_RULES {
            assert_eq!(rule.id.rule().id, rule.id);
        }
    }

    #[test]
    fn test_every_badge_resolves_to_its_own_rule() {
        let all = [
            BadgeId::Starter,
            BadgeId::Learner,
            BadgeId::ScenarioMaster,
            BadgeId::ScenarioExpert,
            BadgeId::Consistent,
            BadgeId::PerfectStreak,
            BadgeId::Vigilant,
            BadgeId::SecurityExpert,
            BadgeId::CyberMaster,
            BadgeId::PerfectScore,
        ];
        assert_eq!(all.len(), BADGE_RULES.len());
        for badge in all {
            assert_eq!(badge.rule().id, badge, "rule table out of order at {}", badge);
        }
        assert_eq!(BadgeId::PerfectScore.rule().symbol, "{100}");
    }

    #[test]
    fn test_default_record_unlocks_nothing() {
        let p = UserProgress::default();
        assert!(newly_unlocked(&p, 50).is_empty());
    }

    #[test]
    fn test_scenario_thresholds() {
        let unlocked = newly_unlocked(&progress_with(2, 0, 50), 50);
        assert!(unlocked.is_empty());

        let unlocked = newly_unlocked(&progress_with(3, 0, 50), 50);
        assert_eq!(unlocked, BTreeSet::from([BadgeId::Learner]));

        let unlocked = newly_unlocked(&progress_with(10, 0, 50), 50);
        assert!(unlocked.contains(&BadgeId::Learner));
        assert!(unlocked.contains(&BadgeId::ScenarioMaster));
        assert!(unlocked.contains(&BadgeId::ScenarioExpert));
    }

    #[test]
    fn test_streak_and_vigilance_unlock_together() {
        let unlocked = newly_unlocked(&progress_with(0, 5, 96), 85);
        assert_eq!(
            unlocked,
            BTreeSet::from([
                BadgeId::Consistent,
                BadgeId::PerfectStreak,
                BadgeId::Vigilant,
                BadgeId::SecurityExpert,
                BadgeId::CyberMaster,
            ])
        );
    }

    #[test]
    fn test_perfect_score_depends_on_trigger() {
        let p = UserProgress::default();
        assert_eq!(newly_unlocked(&p, 100), BTreeSet::from([BadgeId::PerfectScore]));
        assert!(newly_unlocked(&p, 99).is_empty());
    }

    #[test]
    fn test_idempotent_once_applied() {
        let mut p = progress_with(5, 3, 91);
        let first = newly_unlocked(&p, 100);
        assert!(!first.is_empty());
        p.badges.extend(first);
        assert!(newly_unlocked(&p, 100).is_empty());
    }

    #[test]
    fn test_wire_ids() {
        for rule in BADGE_RULES {
            let json = serde_json::to_string(&rule.id).unwrap();
            assert_eq!(json, format!("\"{}\"", rule.id.as_str()));
        }
    }

    #[test]
    fn test_format_badges_ascii() {
        let badges = BTreeSet::from([BadgeId::Starter, BadgeId::Learner, BadgeId::Vigilant]);
        assert_eq!(format_badges(&badges, 5), "[*] [3] (80)");
        assert_eq!(format_badges(&badges, 2), "[*] [3] +1 more");
        assert_eq!(format_badges(&BTreeSet::new(), 5), "");
    }

    #[test]
    fn test_format_unlock() {
        let msg = format_unlock(BadgeId::Learner);
        assert_eq!(msg, "[3] Badge unlocked: Learner - Complete 3 different scenarios");
    }
}
