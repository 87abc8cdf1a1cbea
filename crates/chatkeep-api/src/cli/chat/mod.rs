//! Interactive chat REPL and one-off generation.

pub mod input;

use std::io::Write;

use anyhow::Result;
use console::style;

use chatkeep_types::error::ChatError;

use crate::state::AppState;

use input::{ChatInput, InputEvent};

/// Whether an input line ends the REPL.
fn is_exit_command(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit")
}

/// Run an interactive chat loop for `user`.
///
/// After the first answer the session id is pinned, so the rest of the
/// REPL stays in one session even across expiry (an expired pinned
/// session restarts in place).
pub async fn run_chat(
    state: &AppState,
    user: &str,
    session: Option<String>,
    json: bool,
) -> Result<()> {
    let mut pinned = session;
    let prompt = if json {
        String::new()
    } else {
        format!("{} ", style("you>").green().bold())
    };
    let (mut input, mut out) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("interactive chat needs a terminal: {e}"))?;

    if !json {
        writeln!(
            out,
            "\n  {} Chatting as {} (type {} or press Ctrl+D to leave)\n",
            style(">").green().bold(),
            style(user).cyan(),
            style("exit").yellow()
        )?;
    }

    loop {
        let prompt = match input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                if !json {
                    writeln!(out, "  {}", style("Press Ctrl+D to exit, or keep chatting.").dim())?;
                }
                continue;
            }
            InputEvent::Message(text) => text,
        };
        if prompt.is_empty() {
            continue;
        }
        if is_exit_command(&prompt) {
            break;
        }

        match state
            .chat_service
            .chat(user, &prompt, pinned.as_deref())
            .await
        {
            Ok(outcome) => {
                if json {
                    let line = serde_json::json!({
                        "response": outcome.response,
                        "session_id": outcome.session_id,
                    });
                    writeln!(out, "{line}")?;
                } else {
                    writeln!(out, "{} {}\n", style("bot>").magenta().bold(), outcome.response)?;
                }
                pinned = Some(outcome.session_id);
            }
            Err(e) => {
                writeln!(out, "{}", format_chat_error(&e, json))?;
                // A pinned id that is gone or not ours will never work again.
                if matches!(e, ChatError::NotFound(_) | ChatError::Forbidden(_)) {
                    return Err(e.into());
                }
            }
        }
    }

    if !json {
        writeln!(out, "  Goodbye.")?;
    }
    Ok(())
}

/// Generate a single answer with no session.
pub async fn ask(state: &AppState, prompt: &str, json: bool) -> Result<()> {
    let text = state.chat_service.generate_content(prompt).await?;
    if json {
        println!("{}", serde_json::json!({ "response": text }));
    } else {
        println!("{text}");
    }
    Ok(())
}

fn format_chat_error(e: &ChatError, json: bool) -> String {
    if json {
        return serde_json::json!({ "error": e.to_string() }).to_string();
    }
    let hint = match e {
        ChatError::QuotaExceeded { .. } => " The session starts over once it has been idle past the timeout.",
        ChatError::ServiceUnavailable => " Try again shortly.",
        _ => "",
    };
    format!("  {} {e}.{hint}", style("!").red().bold())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands_are_case_insensitive() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("  QUIT "));
        assert!(!is_exit_command("exit please"));
        assert!(!is_exit_command("hello"));
    }

    #[test]
    fn json_errors_are_one_object() {
        let line = format_chat_error(&ChatError::ServiceUnavailable, true);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["error"], "service unavailable");
    }

    #[test]
    fn quota_error_explains_reset() {
        let line = format_chat_error(&ChatError::QuotaExceeded { used: 120, limit: 100 }, false);
        assert!(line.contains("120 of 100"));
        assert!(line.contains("idle past the timeout"));
    }
}
