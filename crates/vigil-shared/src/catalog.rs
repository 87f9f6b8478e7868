//! Known activity ids.
//!
//! Scenario and game content is defined elsewhere; the engine only needs
//! to know which ids exist so it can reject events for unknown activities.

use crate::score::ActivityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Scenarios shipped with the training content
pub const BUILTIN_SCENARIOS: &[&str] = &[
    "bank-phishing-email",
    "ceo-fraud-call",
    "parcel-delivery-sms",
    "fake-it-support-call",
    "restaurant-qr-code",
    "password-reset-email",
    "invoice-fraud",
    "social-media-giveaway",
    "usb-drop",
    "public-wifi-portal",
    "tax-refund-email",
    "romance-scam-chat",
];

/// Mini-games shipped with the training content
pub const BUILTIN_GAMES: &[&str] = &[
    "spot-the-phish",
    "url-detective",
    "qr-inspector",
    "password-forge",
    "caller-id-quiz",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCatalog {
    pub scenarios: BTreeSet<String>,
    pub games: BTreeSet<String>,
}

impl Default for ActivityCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ActivityCatalog {
    pub fn new<S, G>(scenarios: S, games: G) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        Self {
            scenarios: scenarios.into_iter().map(Into::into).collect(),
            games: games.into_iter().map(Into::into).collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_SCENARIOS.iter().copied(), BUILTIN_GAMES.iter().copied())
    }

    pub fn contains(&self, kind: ActivityKind, id: &str) -> bool {
        match kind {
            ActivityKind::Scenario => self.scenarios.contains(id),
            ActivityKind::Game => self.games.contains(id),
        }
    }

    pub fn len(&self) -> usize {
        self.scenarios.len() + self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty() && self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = ActivityCatalog::builtin();
        assert_eq!(catalog.len(), BUILTIN_SCENARIOS.len() + BUILTIN_GAMES.len());
        assert!(catalog.contains(ActivityKind::Scenario, "ceo-fraud-call"));
        assert!(catalog.contains(ActivityKind::Game, "url-detective"));
    }

    #[test]
    fn test_kind_matters() {
        let catalog = ActivityCatalog::new(["a"], ["b"]);
        assert!(catalog.contains(ActivityKind::Scenario, "a"));
        assert!(!catalog.contains(ActivityKind::Game, "a"));
        assert!(!catalog.contains(ActivityKind::Scenario, "b"));
    }
}
