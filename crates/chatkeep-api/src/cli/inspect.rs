//! Inspect stored users and sessions.
//!
//! Reads straight from the repository, so it works without an API key.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Serialize;

use chatkeep_core::chat::repository::SessionRepository;
use chatkeep_types::session::{ChatSession, SessionSummary, User, decode_history};

/// Session row for `--json` output.
#[derive(Debug, Serialize)]
struct SessionView {
    #[serde(flatten)]
    summary: SessionSummary,
    history_turns: usize,
}

fn history_turns(session: &ChatSession) -> usize {
    decode_history(&session.history_json)
        .map(|turns| turns.len())
        .unwrap_or(0)
}

/// Print users and their sessions, most recently active first.
///
/// # Examples
///
/// ```bash
/// chatkeep inspect
/// chatkeep inspect --user steve --json
/// ```
pub async fn inspect<R: SessionRepository>(
    repo: &R,
    user: Option<&str>,
    limit: i64,
    json: bool,
) -> Result<()> {
    let users: Vec<User> = match user {
        Some(name) => vec![User {
            name: name.to_string(),
        }],
        None => repo.list_users().await?,
    };
    let sessions = repo.list_sessions(user, Some(limit)).await?;

    if json {
        let views: Vec<SessionView> = sessions
            .iter()
            .map(|s| SessionView {
                summary: s.summary(),
                history_turns: history_turns(s),
            })
            .collect();
        let out = serde_json::json!({ "users": users, "sessions": views });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} user(s), {} session(s)",
        style("i").blue().bold(),
        users.len(),
        sessions.len()
    );
    println!();

    if sessions.is_empty() {
        println!("  No sessions stored yet.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Session").fg(Color::White),
        Cell::new("User").fg(Color::White),
        Cell::new("Last active").fg(Color::White),
        Cell::new("Tokens").fg(Color::White),
        Cell::new("Turns").fg(Color::White),
        Cell::new("Version").fg(Color::White),
    ]);

    for session in &sessions {
        table.add_row(vec![
            Cell::new(&session.session_id).fg(Color::Cyan),
            Cell::new(&session.user_name),
            Cell::new(session.last_active.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(session.token_count),
            Cell::new(history_turns(session)),
            Cell::new(session.version).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!();
    Ok(())
}
