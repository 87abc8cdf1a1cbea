//! CLI command definitions for the `chatkeep` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod inspect;

use clap::{Parser, Subcommand};

/// Session-aware chat over Gemini, with a REST API.
#[derive(Parser)]
#[command(name = "chatkeep", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter implied by `-v`/`--quiet`, if any.
    pub fn log_filter(&self) -> Option<&'static str> {
        match self.verbose {
            0 if self.quiet => Some("error"),
            0 => None,
            1 => Some("info,chatkeep=debug"),
            _ => Some("trace"),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(long, short, default_value = "8000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Chat interactively as a user (type `exit` or `quit` to leave).
    Chat {
        /// User name to chat as.
        #[arg(long, short)]
        user: String,

        /// Continue a specific session instead of the most recent one.
        #[arg(long, short)]
        session: Option<String>,
    },

    /// One-off generation without any session state.
    Ask {
        /// The prompt to send.
        prompt: String,
    },

    /// Show stored users and sessions.
    Inspect {
        /// Only show this user's sessions.
        #[arg(long, short)]
        user: Option<String>,

        /// Maximum number of sessions to list.
        #[arg(long, default_value = "50")]
        limit: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_with_pinned_session() {
        let cli = Cli::try_parse_from(["chatkeep", "chat", "--user", "steve", "--session", "abc"])
            .unwrap();
        match cli.command {
            Commands::Chat { user, session } => {
                assert_eq!(user, "steve");
                assert_eq!(session.as_deref(), Some("abc"));
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["chatkeep", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, 8000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn chat_requires_user() {
        assert!(Cli::try_parse_from(["chatkeep", "chat"]).is_err());
    }

    #[test]
    fn verbosity_maps_to_filter() {
        let quiet = Cli::try_parse_from(["chatkeep", "--quiet", "ask", "hi"]).unwrap();
        assert_eq!(quiet.log_filter(), Some("error"));

        let default = Cli::try_parse_from(["chatkeep", "ask", "hi"]).unwrap();
        assert_eq!(default.log_filter(), None);

        let debug = Cli::try_parse_from(["chatkeep", "ask", "hi", "-v"]).unwrap();
        assert_eq!(debug.log_filter(), Some("info,chatkeep=debug"));

        let trace = Cli::try_parse_from(["chatkeep", "-vv", "inspect", "--json"]).unwrap();
        assert_eq!(trace.log_filter(), Some("trace"));
        assert!(trace.json);
    }
}
