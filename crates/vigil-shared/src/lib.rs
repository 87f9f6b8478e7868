//! Shared types and pure scoring logic for Vigil components.
//!
//! Everything in this crate is deterministic and free of I/O: the
//! progression record, the scoring and leveling formulas, the badge rule
//! table and the export document format. Persistence lives in
//! `vigil_common`.

pub mod badges;
pub mod catalog;
pub mod completion;
pub mod error;
pub mod export;
pub mod levels;
pub mod progress;
pub mod score;

pub use badges::{newly_unlocked, BadgeId, BadgeRule, BADGE_CATALOG_VERSION, BADGE_RULES};
pub use catalog::ActivityCatalog;
pub use completion::{apply_completion, CompletionEvent, CompletionOutcome};
pub use error::{ProgressionError, Result};
pub use export::{export_progress, import_progress, ProgressExport};
pub use levels::{level_for_xp, LevelInfo, XP_PER_LEVEL};
pub use progress::{Identity, UserProgress, UserId, GUEST_TAG};
pub use score::{score_activity, ActivityKind, ScoreDelta, STREAK_THRESHOLD};
