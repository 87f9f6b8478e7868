//! Command execution.
//!
//! Each command returns the text to print so the binary stays a thin
//! shell around `run`.

use crate::cli::Commands;
use crate::session::SessionFile;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;
use vigil_common::{
    Authority, CompletionEvent, Identity, ReconciliationService, Recorded, ResetConfirmation,
    SignInOutcome, SyncState, UserId, UserProgress,
};
use vigil_shared::badges::{format_badges, format_unlock, BADGE_RULES};

const UNSYNCED_NOTE: &str =
    "Remote store unavailable: progress saved locally as unsynced. Run `vigilctl sync` later.";

pub fn run(command: Commands, service: &mut ReconciliationService, session_path: &Path) -> Result<String> {
    debug!("Running {:?} as {}", command, service.session());
    match command {
        Commands::Status { json } => status(service, json),
        Commands::Complete {
            id,
            kind,
            score,
            time,
            hints,
        } => {
            let event = CompletionEvent {
                activity_id: id,
                raw_score: score,
                time_spent_secs: time,
                hints_used: hints,
                kind,
            };
            complete(service, &event)
        }
        Commands::Login { user } => login(service, &user, session_path),
        Commands::Logout => logout(service, session_path),
        Commands::Sync => sync(service),
        Commands::Reset { yes } => reset(service, yes),
        Commands::Export { out } => export(service, out.as_deref()),
        Commands::Import { file } => import(service, &file),
        Commands::Badges => badges(service),
    }
}

fn status(service: &ReconciliationService, json: bool) -> Result<String> {
    let loaded = service.load()?;
    if json {
        return Ok(serde_json::to_string_pretty(&loaded.progress)?);
    }

    let mut out = String::new();
    let source = match service.authority() {
        Authority::GuestLocal => "local",
        Authority::Remote(_) => "remote",
    };
    writeln!(out, "Identity: {} ({})", service.session(), source)?;
    out.push_str(&render_progress(&loaded.progress));
    if loaded.sync == SyncState::CachedLocally {
        writeln!(out, "{}", UNSYNCED_NOTE)?;
    }
    Ok(out)
}

fn render_progress(progress: &UserProgress) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", progress.level_info());
    let _ = writeln!(out, "Vigilance: {}/100", progress.vigilance_score);
    let _ = writeln!(out, "Scenarios completed: {}", progress.completed_scenarios.len());
    let _ = writeln!(out, "Games played: {}", progress.games_played);
    let _ = writeln!(out, "Streak: {}", progress.consecutive_correct);
    let _ = writeln!(out, "Badges: {}", format_badges(&progress.badges, 10));
    if let Some(at) = progress.last_played {
        let _ = writeln!(out, "Last played: {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    out
}

fn complete(service: &ReconciliationService, event: &CompletionEvent) -> Result<String> {
    let mut live = service.load()?.progress;
    let Recorded { outcome, sync } = service.record_completion(&mut live, event)?;

    let mut out = String::new();
    let score = outcome.score;
    writeln!(
        out,
        "+{} XP ({} '{}', score {})",
        score.xp_delta, event.kind, event.activity_id, event.raw_score
    )?;
    writeln!(
        out,
        "Vigilance: {} -> {} ({:+})",
        i16::from(score.new_vigilance) - score.vigilance_delta,
        score.new_vigilance,
        score.vigilance_delta
    )?;
    if outcome.leveled_up() {
        writeln!(out, "Level up! Now level {}", outcome.level_after)?;
    }
    for badge in &outcome.unlocked {
        writeln!(out, "{}", format_unlock(*badge))?;
    }
    if sync == SyncState::CachedLocally {
        writeln!(out, "{}", UNSYNCED_NOTE)?;
    }
    Ok(out)
}

fn login(service: &mut ReconciliationService, user: &str, session_path: &Path) -> Result<String> {
    let user_id = UserId::new(user)?;
    let outcome = service.sign_in(user_id.clone())?;
    SessionFile::new(Identity::User(user_id.clone())).save(session_path)?;

    let mut out = String::new();
    match &outcome {
        SignInOutcome::RemoteKept {
            progress,
            guest_snapshot,
        } => {
            writeln!(out, "Signed in as '{}'. Account progress loaded ({} XP).", user_id, progress.xp)?;
            if let Some(guest) = guest_snapshot {
                writeln!(
                    out,
                    "Guest progress ({} XP) was not merged and is still stored locally.",
                    guest.xp
                )?;
                writeln!(out, "Use `vigilctl logout` then `vigilctl export` to keep a copy.")?;
            }
        }
        SignInOutcome::SeededFromGuest(progress) => {
            writeln!(
                out,
                "Signed in as '{}'. Guest progress ({} XP) moved to the new account.",
                user_id, progress.xp
            )?;
        }
        SignInOutcome::Fresh(_) => {
            writeln!(out, "Signed in as '{}'. Starting fresh.", user_id)?;
        }
    }
    Ok(out)
}

fn logout(service: &mut ReconciliationService, session_path: &Path) -> Result<String> {
    let was = service.session().clone();
    service.sign_out();
    SessionFile::new(Identity::Guest).save(session_path)?;
    Ok(match was {
        Identity::Guest => "Already in guest mode.\n".to_string(),
        Identity::User(id) => format!("Signed out '{}'. Now in guest mode.\n", id),
    })
}

fn sync(service: &ReconciliationService) -> Result<String> {
    if service.session().is_guest() {
        return Ok("Guest progress is local only; nothing to sync.\n".to_string());
    }
    Ok(match service.flush_pending()? {
        Some(progress) => format!("Synced cached progress ({} XP).\n", progress.xp),
        None => "Nothing to sync.\n".to_string(),
    })
}

fn reset(service: &ReconciliationService, yes: bool) -> Result<String> {
    let confirmation = ResetConfirmation::from_flag(yes)
        .ok_or_else(|| anyhow!("Reset erases all progress for {}; pass --yes to confirm", service.session()))?;
    service.reset(confirmation)?;
    Ok(format!("Progress for {} was reset.\n", service.session()))
}

fn export(service: &ReconciliationService, out: Option<&Path>) -> Result<String> {
    let json = service.export(Utc::now())?;
    match out {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(format!("Exported progress to {}\n", path.display()))
        }
        None => Ok(json + "\n"),
    }
}

fn import(service: &ReconciliationService, file: &Path) -> Result<String> {
    let json = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let (progress, sync) = service.import(&json)?;

    let mut out = format!(
        "Imported progress for {}: {} XP, level {}.\n",
        service.session(),
        progress.xp,
        progress.level()
    );
    if sync == SyncState::CachedLocally {
        out.push_str(UNSYNCED_NOTE);
        out.push('\n');
    }
    Ok(out)
}

fn badges(service: &ReconciliationService) -> Result<String> {
    let progress = service.load()?.progress;
    let mut out = String::new();
    for rule in BADGE_RULES {
        let mark = if progress.has_badge(rule.id) { "x" } else { " " };
        writeln!(out, "[{}] {:5} {} - {}", mark, rule.symbol, rule.name, rule.description)?;
    }
    writeln!(out, "{}/{} earned", progress.badges.len(), BADGE_RULES.len())?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use vigil_common::{ActivityCatalog, ActivityKind, MemoryStore, PendingCache, RetryPolicy};

    fn service() -> (ReconciliationService, TempDir) {
        let dir = tempdir().unwrap();
        let service = ReconciliationService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            PendingCache::new(dir.path().join("pending")),
            ActivityCatalog::builtin(),
        )
        .with_retry(RetryPolicy::none());
        (service, dir)
    }

    fn complete_cmd(id: &str, score: u8) -> Commands {
        Commands::Complete {
            id: id.to_string(),
            kind: ActivityKind::Scenario,
            score,
            time: 120,
            hints: 0,
        }
    }

    #[test]
    fn test_complete_reports_xp_and_badges() {
        let (mut service, dir) = service();
        let session = dir.path().join("session.json");

        let out = run(complete_cmd("usb-drop", 100), &mut service, &session).unwrap();
        assert!(out.contains("+10 XP"));
        assert!(out.contains("Vigilance: 50 -> 65 (+15)"));
        assert!(out.contains("Badge unlocked: Perfect Score"));

        let status = run(Commands::Status { json: false }, &mut service, &session).unwrap();
        assert!(status.contains("Identity: guest (local)"));
        assert!(status.contains("Level 1 (10/100 XP, 90 to next)"));
        assert!(status.contains("Scenarios completed: 1"));
    }

    #[test]
    fn test_unknown_activity_is_an_error() {
        let (mut service, dir) = service();
        let err = run(complete_cmd("no-such-scenario", 90), &mut service, &dir.path().join("s.json"))
            .unwrap_err();
        assert!(err.to_string().contains("unknown scenario"));
    }

    #[test]
    fn test_reset_refuses_without_yes() {
        let (mut service, dir) = service();
        let session = dir.path().join("session.json");
        run(complete_cmd("usb-drop", 90), &mut service, &session).unwrap();

        assert!(run(Commands::Reset { yes: false }, &mut service, &session).is_err());
        let json = run(Commands::Status { json: true }, &mut service, &session).unwrap();
        let progress: UserProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(progress.xp, 9);

        run(Commands::Reset { yes: true }, &mut service, &session).unwrap();
        let json = run(Commands::Status { json: true }, &mut service, &session).unwrap();
        let progress: UserProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(progress, UserProgress::default());
    }

    #[test]
    fn test_login_logout_persist_session() {
        let (mut service, dir) = service();
        let session = dir.path().join("session.json");
        run(complete_cmd("usb-drop", 90), &mut service, &session).unwrap();

        let out = run(Commands::Login { user: "ada".into() }, &mut service, &session).unwrap();
        assert!(out.contains("moved to the new account"));
        assert!(!SessionFile::load(&session).unwrap().identity.is_guest());

        let out = run(Commands::Logout, &mut service, &session).unwrap();
        assert!(out.contains("Signed out 'ada'"));
        assert!(SessionFile::load(&session).unwrap().identity.is_guest());
    }

    #[test]
    fn test_export_import_file() {
        let (mut service, dir) = service();
        let session = dir.path().join("session.json");
        let file = dir.path().join("export.json");
        run(complete_cmd("usb-drop", 90), &mut service, &session).unwrap();
        run(Commands::Export { out: Some(file.clone()) }, &mut service, &session).unwrap();

        run(Commands::Reset { yes: true }, &mut service, &session).unwrap();
        let out = run(Commands::Import { file }, &mut service, &session).unwrap();
        assert!(out.contains("9 XP, level 1"));
    }

    #[test]
    fn test_badges_listing() {
        let (mut service, dir) = service();
        let out = run(Commands::Badges, &mut service, &dir.path().join("s.json")).unwrap();
        assert!(out.contains("[x] [*]"));
        assert!(out.contains("1/10 earned"));
    }
}
