//! Interactive chat session
//!
//! Reads entries from a line-oriented input, drives the [`TurnController`], and
//! re-renders turns as the conversation changes. A line ending in `\` continues the
//! entry on the next line instead of submitting it. Lines starting with `/` are
//! commands; `//` escapes a literal leading slash.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::app::App;
use crate::completion::CompletionProvider;
use crate::controller::{CompletionReceiver, TurnController, TurnUpdate};
use crate::conversation::{Author, Turn, TurnStatus};
use crate::preferences::AVAILABLE_VOICES;
use crate::setup::mask_secret;
use crate::voice::{SpeechSynthesizer, speak_detached};
use crate::Result;

const HELP: &str = "\
Type a message and press Enter to send. End a line with \\ to continue on the next line.

Commands:
  /regen          ask again for the last reply (also retries a failed reply)
  /speak [n]      speak turn n, or the latest reply
  /voice [name]   show or change the speech voice
  /key [secret]   show or change the API key
  /history        reprint the conversation
  /help           show this help
  /quit           leave";

/// A parsed input entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Regenerate,
    Speak(Option<usize>),
    Voice(Option<String>),
    Key(Option<String>),
    History,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    /// Interpret one complete entry
    #[must_use]
    pub fn parse(entry: &str) -> Self {
        if let Some(escaped) = entry.trim_start().strip_prefix("//") {
            return Self::Send(format!("/{escaped}"));
        }
        let Some(rest) = entry.trim().strip_prefix('/') else {
            return Self::Send(entry.to_string());
        };

        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, None), |(n, a)| {
                let a = a.trim();
                (n, (!a.is_empty()).then(|| a.to_string()))
            });

        match name {
            "regen" | "regenerate" | "retry" => Self::Regenerate,
            "speak" | "say" => match arg.as_deref().map(str::parse::<usize>) {
                None => Self::Speak(None),
                Some(Ok(n)) => Self::Speak(Some(n)),
                Some(Err(_)) => Self::Unknown(rest.to_string()),
            },
            "voice" => Self::Voice(arg),
            "key" => Self::Key(arg),
            "history" => Self::History,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

/// Accumulates continued lines into one entry
#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: String,
}

impl LineEditor {
    /// Feed one raw input line; returns the entry once it is complete
    pub fn push(&mut self, line: &str) -> Option<String> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(head) = line.strip_suffix('\\') {
            self.buffer.push_str(head);
            self.buffer.push('\n');
            return None;
        }
        self.buffer.push_str(line);
        Some(std::mem::take(&mut self.buffer))
    }

    /// Whether an entry is being continued
    #[must_use]
    pub fn is_continuing(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// Format one turn for display; `number` is its 1-based position
#[must_use]
pub fn render_turn(number: usize, turn: &Turn) -> String {
    let label = match turn.author {
        Author::User => "you",
        Author::Assistant => "bot",
    };
    let body = match &turn.status {
        TurnStatus::Complete => turn.text.replace('\n', "\n      "),
        TurnStatus::Pending => "...".to_string(),
        TurnStatus::Failed { error } => format!("[failed: {error}] type /regen to retry"),
    };
    format!("[{number}] {label}: {body}")
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// One interactive conversation
pub struct ChatSession<W> {
    app: App,
    controller: TurnController,
    completions: CompletionReceiver,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    out: W,
}

impl<W: Write> ChatSession<W> {
    /// Create a session writing its transcript to `out`
    pub fn new(
        app: App,
        provider: Arc<dyn CompletionProvider>,
        speech: Option<Arc<dyn SpeechSynthesizer>>,
        out: W,
    ) -> Self {
        let (controller, completions) =
            TurnController::new(provider, app.config().system_prompt.clone());
        Self {
            app,
            controller,
            completions,
            speech,
            out,
        }
    }

    #[must_use]
    pub const fn controller(&self) -> &TurnController {
        &self.controller
    }

    #[must_use]
    pub const fn output(&self) -> &W {
        &self.out
    }

    /// Run until `/quit` or end of input
    ///
    /// At end of input the session waits for an outstanding reply before returning.
    ///
    /// # Errors
    ///
    /// Returns error if reading input or writing output fails
    pub async fn run<R>(&mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut editor = LineEditor::default();
        let mut input_open = true;

        if !self.app.has_credential() {
            writeln!(self.out, "No API key set. Use /key <secret> or `banter settings`.")?;
        }
        writeln!(self.out, "Type /help for commands.")?;
        self.out.flush()?;

        loop {
            if !input_open && !self.controller.is_pending() {
                break;
            }

            tokio::select! {
                line = lines.next_line(), if input_open => {
                    match line? {
                        Some(line) => {
                            if let Some(entry) = editor.push(&line)
                                && self.handle(Command::parse(&entry))? == Flow::Quit
                            {
                                break;
                            }
                        }
                        None => {
                            input_open = false;
                            if editor.is_continuing() {
                                tracing::debug!("input closed mid-entry, discarding");
                            }
                        }
                    }
                }
                Some(completion) = self.completions.recv() => {
                    let update = self.controller.apply(completion);
                    self.render_update(&update)?;
                }
                else => break,
            }

            self.out.flush()?;
        }

        Ok(())
    }

    fn handle(&mut self, command: Command) -> Result<Flow> {
        tracing::trace!(?command, "handling entry");
        match command {
            Command::Send(text) => self.send(&text)?,
            Command::Regenerate => self.regenerate()?,
            Command::Speak(number) => self.speak(number)?,
            Command::Voice(voice) => self.voice(voice)?,
            Command::Key(key) => self.key(key)?,
            Command::History => self.history()?,
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Unknown(name) => {
                writeln!(self.out, "Unknown command /{name}. Type /help for commands.")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn send(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        if self.controller.is_pending() {
            writeln!(self.out, "Still waiting for the previous reply.")?;
            return Ok(());
        }
        if self.controller.send_turn(text).is_some() {
            let len = self.controller.conversation().len();
            self.render_from(len.saturating_sub(2))?;
        }
        Ok(())
    }

    fn regenerate(&mut self) -> Result<()> {
        if self.controller.regenerate_turn().is_some() {
            writeln!(self.out, "Regenerating...")?;
            let len = self.controller.conversation().len();
            self.render_from(len.saturating_sub(1))?;
        } else {
            writeln!(self.out, "Nothing to regenerate yet.")?;
        }
        Ok(())
    }

    fn speak(&mut self, number: Option<usize>) -> Result<()> {
        let conversation = self.controller.conversation();
        let turn = match number {
            Some(n) => n.checked_sub(1).and_then(|i| conversation.all().get(i)),
            None => conversation.last_reply(),
        };

        let Some(turn) = turn.filter(|t| t.status == TurnStatus::Complete) else {
            writeln!(self.out, "Nothing to speak.")?;
            return Ok(());
        };
        let text = turn.text.clone();

        match &self.speech {
            Some(speech) => {
                speak_detached(Arc::clone(speech), text, self.app.voice().to_string());
            }
            None => writeln!(self.out, "Speech unavailable. Set an API key with /key.")?,
        }
        Ok(())
    }

    fn voice(&mut self, voice: Option<String>) -> Result<()> {
        match voice {
            Some(voice) => {
                self.app.set_voice(&voice)?;
                writeln!(self.out, "Voice set to {voice}.")?;
            }
            None => {
                let current = self.app.voice().to_string();
                writeln!(self.out, "Current voice: {current}")?;
                writeln!(self.out, "Available: {}", AVAILABLE_VOICES.join(", "))?;
            }
        }
        Ok(())
    }

    fn key(&mut self, key: Option<String>) -> Result<()> {
        match key {
            Some(key) => {
                self.app.set_credential(&key)?;
                self.controller.set_provider(self.app.completion());
                self.speech = self.app.speech().ok();
                writeln!(self.out, "API key saved.")?;
            }
            None => {
                let stored = &self.app.preferences().api_token;
                if stored.is_empty() {
                    writeln!(self.out, "No API key stored.")?;
                } else {
                    writeln!(self.out, "API key: {}", mask_secret(stored))?;
                }
            }
        }
        Ok(())
    }

    fn history(&mut self) -> Result<()> {
        if self.controller.conversation().is_empty() {
            writeln!(self.out, "No messages yet.")?;
            return Ok(());
        }
        self.render_from(0)
    }

    fn render_update(&mut self, update: &TurnUpdate) -> Result<()> {
        let id = match update {
            TurnUpdate::Completed(id) | TurnUpdate::Failed { id, .. } => *id,
            TurnUpdate::Stale(_) => return Ok(()),
        };
        let conversation = self.controller.conversation();
        if let Some(index) = conversation.position(id) {
            let line = render_turn(index + 1, &conversation.all()[index]);
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn render_from(&mut self, start: usize) -> Result<()> {
        let conversation = self.controller.conversation();
        for (index, turn) in conversation.all().iter().enumerate().skip(start) {
            writeln!(self.out, "{}", render_turn(index + 1, turn))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text_as_send() {
        assert_eq!(Command::parse("hello"), Command::Send("hello".to_string()));
        assert_eq!(Command::parse("//etc"), Command::Send("/etc".to_string()));
        assert_eq!(Command::parse("  //etc"), Command::Send("/etc".to_string()));
        assert_eq!(Command::parse("  /quit"), Command::Quit);
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/regen"), Command::Regenerate);
        assert_eq!(Command::parse("/retry"), Command::Regenerate);
        assert_eq!(Command::parse("/speak"), Command::Speak(None));
        assert_eq!(Command::parse("/speak 3"), Command::Speak(Some(3)));
        assert_eq!(
            Command::parse("/voice  nova "),
            Command::Voice(Some("nova".to_string()))
        );
        assert_eq!(Command::parse("/key"), Command::Key(None));
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/bogus"), Command::Unknown("bogus".to_string()));
        assert!(matches!(Command::parse("/speak two"), Command::Unknown(_)));
    }

    #[test]
    fn backslash_continues_entry() {
        let mut editor = LineEditor::default();
        assert_eq!(editor.push("first line\\"), None);
        assert!(editor.is_continuing());
        assert_eq!(editor.push("second line\r"), Some("first line\nsecond line".to_string()));
        assert!(!editor.is_continuing());
        assert_eq!(editor.push("next"), Some("next".to_string()));
    }

    #[test]
    fn renders_each_status() {
        let user = Turn::user("hi");
        assert_eq!(render_turn(1, &user), "[1] you: hi");

        let pending = Turn::pending();
        assert_eq!(render_turn(2, &pending), "[2] bot: ...");

        let mut failed = Turn::pending();
        failed.status = TurnStatus::Failed {
            error: "401".to_string(),
        };
        assert!(render_turn(2, &failed).contains("/regen"));
    }
}
