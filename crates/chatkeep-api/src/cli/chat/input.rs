//! Line input for the chat REPL.
//!
//! Wraps `rustyline_async::Readline` so the prompt keeps line editing and
//! history while answers are printed through its `SharedWriter`.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

/// What the user did at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// A submitted line, trimmed.
    Message(String),
    /// Ctrl+D.
    Eof,
    /// Ctrl+C.
    Interrupted,
}

impl From<ReadlineEvent> for InputEvent {
    fn from(event: ReadlineEvent) -> Self {
        match event {
            ReadlineEvent::Line(line) => InputEvent::Message(line.trim().to_string()),
            ReadlineEvent::Eof => InputEvent::Eof,
            ReadlineEvent::Interrupted => InputEvent::Interrupted,
        }
    }
}

pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    /// Start reading with `prompt`.
    ///
    /// The returned writer prints above the prompt without garbling it.
    /// Fails when stdin is not a terminal.
    pub fn new(prompt: String) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, writer) = Readline::new(prompt)?;
        Ok((Self { rl }, writer))
    }

    /// Wait for the next line. Non-empty lines are added to history.
    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(event) => {
                let event = InputEvent::from(event);
                if let InputEvent::Message(text) = &event {
                    if !text.is_empty() {
                        self.rl.add_history_entry(text.clone());
                    }
                }
                event
            }
            Err(e) => {
                tracing::debug!(error = %e, "Readline failed, ending input");
                InputEvent::Eof
            }
        }
    }
}
