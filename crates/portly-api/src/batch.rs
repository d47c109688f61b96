// ── Command batch executor ──
//
// Runs an ordered list of CLI commands over one session acquisition.
// Each command is followed by a unique sentinel line; the switch echoes
// it (and complains about it), which gives an unambiguous end marker
// for the command's output even when an earlier command never finished.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::session::{SessionGuard, SessionManager};
use crate::transport::Shell;

/// Every sentinel line starts with this prefix.
pub const SENTINEL_PREFIX: &str = "portly-sentinel-";

/// Pager prompts answered with a space (next page).
const PAGER_NEXT: [&str; 2] = ["-- MORE --", "next page: Space"];
/// Pager prompt answered with `q`.
const PAGER_QUIT: &str = "(q to quit)";

/// Lines in a write command's output that mean the switch refused it.
const REJECTION_MARKERS: [&str; 4] = [
    "invalid input",
    "error",
    "not supported",
    "unknown command",
];

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(\[[0-9;?]*[A-Za-z]|[()][A-Z0-9]|[=>EM78])").expect("static ANSI pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    Complete,
    /// The sentinel did not come back within the per-command timeout.
    /// `text` is empty.
    TimedOut,
}

/// Cleaned output of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub command: String,
    /// Output with ANSI codes, pager prompts, echo and prompt lines removed.
    pub text: String,
    /// Prompt the switch showed after the command, e.g. `HP-2530-24G-PoEP#`.
    pub prompt: Option<String>,
    pub status: OutputStatus,
}

impl CommandOutput {
    fn timed_out(command: &str) -> Self {
        Self {
            command: command.to_owned(),
            text: String::new(),
            prompt: None,
            status: OutputStatus::TimedOut,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == OutputStatus::Complete
    }

    /// First line of the output that signals a refused command.
    pub fn rejection(&self) -> Option<&str> {
        self.text.lines().map(str::trim).find(|line| {
            let lower = line.to_ascii_lowercase();
            REJECTION_MARKERS.iter().any(|m| lower.contains(m))
        })
    }
}

/// Executes command batches against a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    command_timeout: Duration,
    batch_timeout: Duration,
}

impl BatchExecutor {
    pub fn new(command_timeout: Duration, batch_timeout: Duration) -> Self {
        Self {
            command_timeout,
            batch_timeout,
        }
    }

    /// Run read commands in order and return one output per command.
    ///
    /// A command whose sentinel does not arrive in time is reported as
    /// [`OutputStatus::TimedOut`] and the batch moves on; the session is
    /// discarded afterwards since it may still carry late output. Past
    /// the overall batch timeout the session is torn down and
    /// [`Error::Timeout`] is returned.
    pub async fn execute<C: AsRef<str>>(
        &self,
        sessions: &SessionManager,
        commands: &[C],
    ) -> Result<Vec<CommandOutput>, Error> {
        let mut guard = sessions.acquire().await?;
        let started = Instant::now();

        let result = tokio::time::timeout(self.batch_timeout, async {
            let mut run = Run::new(guard.shell()?, self.command_timeout);
            let mut outputs = Vec::with_capacity(commands.len());
            for command in commands {
                outputs.push(run.command(command.as_ref()).await?);
            }
            Ok::<_, Error>(outputs)
        })
        .await;

        match result {
            Err(_) => {
                warn!(
                    commands = commands.len(),
                    timeout_secs = self.batch_timeout.as_secs(),
                    "batch exceeded its deadline, tearing down session"
                );
                guard.invalidate().await;
                Err(Error::Timeout {
                    timeout_secs: self.batch_timeout.as_secs(),
                })
            }
            Ok(Err(e)) => {
                if e.breaks_session() {
                    guard.invalidate().await;
                }
                Err(e)
            }
            Ok(Ok(outputs)) => {
                let timed_out = outputs.iter().filter(|o| !o.is_complete()).count();
                debug!(
                    commands = outputs.len(),
                    timed_out,
                    elapsed_ms = started.elapsed().as_millis(),
                    "batch complete"
                );
                if timed_out > 0 {
                    guard.invalidate().await;
                }
                Ok(outputs)
            }
        }
    }

    /// Run a configuration sequence line by line, stopping at the first
    /// line that times out or is refused.
    ///
    /// A refused line yields [`Error::CommandRejected`]; a silent one
    /// yields [`Error::CommandTimeout`]. Either way the session is
    /// discarded so the next caller does not inherit a half-entered
    /// configuration context.
    pub async fn execute_write<C: AsRef<str>>(
        &self,
        sessions: &SessionManager,
        lines: &[C],
    ) -> Result<Vec<CommandOutput>, Error> {
        let guard = sessions.acquire().await?;
        self.write_on(guard, lines).await
    }

    /// Like [`execute_write`](Self::execute_write) on a session the
    /// caller already holds. The guard is consumed: released on success,
    /// invalidated on failure.
    pub async fn write_on<C: AsRef<str>>(
        &self,
        mut guard: SessionGuard<'_>,
        lines: &[C],
    ) -> Result<Vec<CommandOutput>, Error> {
        let result = tokio::time::timeout(self.batch_timeout, async {
            let mut run = Run::new(guard.shell()?, self.command_timeout);
            let mut outputs = Vec::with_capacity(lines.len());
            for line in lines {
                let line = line.as_ref();
                let output = run.command(line).await?;
                if !output.is_complete() {
                    return Err(Error::CommandTimeout {
                        command: line.to_owned(),
                        timeout_secs: self.command_timeout.as_secs(),
                    });
                }
                if let Some(message) = output.rejection() {
                    return Err(Error::CommandRejected {
                        command: line.to_owned(),
                        message: message.to_owned(),
                    });
                }
                outputs.push(output);
            }
            Ok::<_, Error>(outputs)
        })
        .await;

        match result {
            Ok(Ok(outputs)) => Ok(outputs),
            Ok(Err(e)) => {
                guard.invalidate().await;
                Err(e)
            }
            Err(_) => {
                guard.invalidate().await;
                Err(Error::Timeout {
                    timeout_secs: self.batch_timeout.as_secs(),
                })
            }
        }
    }
}

/// State of one batch on one shell.
struct Run<'s> {
    shell: &'s mut dyn Shell,
    command_timeout: Duration,
    batch_id: String,
    sent: usize,
    buffer: String,
}

impl<'s> Run<'s> {
    fn new(shell: &'s mut dyn Shell, command_timeout: Duration) -> Self {
        Self {
            shell,
            command_timeout,
            batch_id: Uuid::new_v4().simple().to_string(),
            sent: 0,
            buffer: String::new(),
        }
    }

    async fn command(&mut self, command: &str) -> Result<CommandOutput, Error> {
        // Index first so that token k is never a prefix of token k*10.
        let token = format!("{SENTINEL_PREFIX}{}-{}", self.sent, self.batch_id);
        self.sent += 1;

        self.shell.send(&format!("{command}\n")).await?;
        self.shell.send(&format!("{token}\n")).await?;

        let deadline = Instant::now() + self.command_timeout;
        loop {
            if let Some(raw) = self.take_through(&token) {
                let output = clean(command, &raw, &token);
                debug!(command, bytes = output.text.len(), "command complete");
                return Ok(output);
            }

            match tokio::time::timeout_at(deadline, self.shell.recv()).await {
                Err(_) => {
                    warn!(
                        command,
                        timeout_secs = self.command_timeout.as_secs(),
                        "no sentinel before command timeout"
                    );
                    return Ok(CommandOutput::timed_out(command));
                }
                Ok(Ok(Some(chunk))) => {
                    self.buffer.push_str(&chunk);
                    self.answer_pager().await?;
                }
                Ok(Ok(None)) => {
                    return Err(Error::SessionClosed {
                        reason: format!("channel closed while running '{command}'"),
                    });
                }
                Ok(Err(e)) => return Err(e),
            }
        }
    }

    /// Answer a pager prompt at the end of the buffer and drop it.
    async fn answer_pager(&mut self) -> Result<(), Error> {
        let next = PAGER_NEXT
            .iter()
            .filter_map(|m| self.buffer.rfind(m))
            .max()
            .map(|pos| (pos, " "));
        let quit = self.buffer.rfind(PAGER_QUIT).map(|pos| (pos, "q"));

        let Some((pos, reply)) = next.max(quit) else {
            return Ok(());
        };
        let line_start = self.buffer[..pos].rfind('\n').map_or(0, |i| i + 1);
        self.buffer.truncate(line_start);
        debug!(reply, "answering pager prompt");
        self.shell.send(reply).await
    }

    /// Split off everything up to the end of the line carrying `token`.
    fn take_through(&mut self, token: &str) -> Option<String> {
        let pos = self.buffer.find(token)?;
        let end = pos + token.len();
        let cut = self.buffer[end..].find('\n').map_or(end, |i| end + i + 1);
        let rest = self.buffer.split_off(cut);
        Some(std::mem::replace(&mut self.buffer, rest))
    }
}

fn normalize(raw: &str) -> String {
    ANSI_RE
        .replace_all(raw, "")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Extract one command's output from the raw text that ends with its
/// sentinel line.
fn clean(command: &str, raw: &str, token: &str) -> CommandOutput {
    let text = normalize(raw);
    let lines: Vec<&str> = text.lines().collect();

    let Some(end) = lines.iter().rposition(|l| l.contains(token)) else {
        return CommandOutput {
            command: command.to_owned(),
            text: String::new(),
            prompt: None,
            status: OutputStatus::Complete,
        };
    };

    let prompt = lines[end]
        .split(token)
        .next()
        .map(str::trim)
        .filter(|p| p.ends_with('#') || p.ends_with('>'))
        .map(str::to_owned);

    // Anything up to an earlier sentinel belongs to an earlier command.
    let start = lines[..end]
        .iter()
        .rposition(|l| l.contains(SENTINEL_PREFIX))
        .map_or(0, |i| i + 1);

    let mut body: Vec<&str> = lines[start..end]
        .iter()
        .copied()
        .filter(|l| !is_pager_line(l))
        .collect();

    if let Some(first) = body.iter().position(|l| !l.trim().is_empty()) {
        if body[first].trim_end().ends_with(command.trim()) {
            body.remove(first);
        }
    }
    if let Some(prompt) = prompt.as_deref() {
        body.retain(|l| l.trim() != prompt);
    }

    while body.first().is_some_and(|l| l.trim().is_empty()) {
        body.remove(0);
    }
    while body.last().is_some_and(|l| l.trim().is_empty()) {
        body.pop();
    }

    CommandOutput {
        command: command.to_owned(),
        text: body.join("\n"),
        prompt,
        status: OutputStatus::Complete,
    }
}

fn is_pager_line(line: &str) -> bool {
    PAGER_NEXT.iter().any(|m| line.contains(m)) || line.contains(PAGER_QUIT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mock::{MockSwitch, Reply};

    fn setup() -> (MockSwitch, SessionManager, BatchExecutor) {
        let switch = MockSwitch::new();
        let sessions = SessionManager::new(Arc::new(switch.clone()), Duration::from_secs(5));
        let executor = BatchExecutor::new(Duration::from_secs(8), Duration::from_secs(60));
        (switch, sessions, executor)
    }

    #[tokio::test]
    async fn outputs_are_returned_in_submission_order() {
        let (switch, sessions, executor) = setup();
        switch.reply_text("show system", " System Name : core-sw");
        switch.reply_text("show version", "  YA.16.08.0002");

        let outputs = executor
            .execute(&sessions, &["show system", "show version"])
            .await
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].command, "show system");
        assert_eq!(outputs[0].text, " System Name : core-sw");
        assert_eq!(outputs[1].text, "  YA.16.08.0002");
        assert_eq!(outputs[1].prompt.as_deref(), Some("HP-2530-24G-PoEP#"));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_command_does_not_steal_later_output() {
        let (switch, sessions, executor) = setup();
        switch.reply(
            "show interfaces all",
            Reply::Delayed(Duration::from_secs(10), "late counters".into()),
        );
        switch.reply_text("show system", " System Name : core-sw");

        let outputs = executor
            .execute(&sessions, &["show interfaces all", "show system"])
            .await
            .unwrap();

        assert_eq!(outputs[0].status, OutputStatus::TimedOut);
        assert!(outputs[0].text.is_empty());
        assert_eq!(outputs[1].status, OutputStatus::Complete);
        assert_eq!(outputs[1].text, " System Name : core-sw");
        // The late output may have left data in the pipe.
        drop(sessions.acquire().await.unwrap());
        assert_eq!(switch.connect_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_deadline_tears_down_session() {
        let (switch, sessions, _) = setup();
        let executor = BatchExecutor::new(Duration::from_secs(8), Duration::from_secs(5));
        switch.reply(
            "show interfaces all",
            Reply::Delayed(Duration::from_secs(30), String::new()),
        );

        let err = executor
            .execute(&sessions, &["show interfaces all"])
            .await
            .err()
            .unwrap();

        assert!(matches!(err, Error::Timeout { timeout_secs: 5 }));
        drop(sessions.acquire().await.unwrap());
        assert_eq!(switch.connect_attempts(), 2);
    }

    #[tokio::test]
    async fn pager_prompt_is_answered_and_removed() {
        let (switch, sessions, executor) = setup();
        switch.reply(
            "show interfaces brief",
            Reply::Paged("  1   100/1000T".into(), "  2   100/1000T".into()),
        );

        let outputs = executor
            .execute(&sessions, &["show interfaces brief"])
            .await
            .unwrap();

        assert_eq!(outputs[0].text, "  1   100/1000T\n  2   100/1000T");
    }

    #[tokio::test]
    async fn disconnect_mid_batch_invalidates_session() {
        let (switch, sessions, executor) = setup();
        switch.reply("show system", Reply::Disconnect);

        let err = executor
            .execute(&sessions, &["show system"])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::SessionClosed { .. }));

        switch.reply_text("show system", " System Name : core-sw");
        let outputs = executor.execute(&sessions, &["show system"]).await.unwrap();
        assert_eq!(outputs[0].text, " System Name : core-sw");
        assert_eq!(switch.connect_attempts(), 2);
    }

    #[tokio::test]
    async fn write_stops_at_rejected_line() {
        let (switch, sessions, executor) = setup();
        switch.reply_text("configure", "");

        let err = executor
            .execute_write(&sessions, &["configure", "interface 99", "enable"])
            .await
            .err()
            .unwrap();

        match err {
            Error::CommandRejected { command, message } => {
                assert_eq!(command, "interface 99");
                assert_eq!(message, "Invalid input: interface 99");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(switch.sent_commands(), vec!["configure", "interface 99"]);
    }

    #[tokio::test]
    async fn write_on_held_session_keeps_it_alive() {
        let (switch, sessions, executor) = setup();
        for line in ["configure", "interface 2", "enable", "exit", "write memory"] {
            switch.reply_text(line, "");
        }

        let guard = sessions.acquire().await.unwrap();
        let outputs = executor
            .write_on(guard, &["configure", "interface 2", "enable", "exit", "write memory"])
            .await
            .unwrap();

        assert_eq!(outputs.len(), 5);
        drop(sessions.acquire().await.unwrap());
        assert_eq!(switch.connect_attempts(), 1);
    }

    #[test]
    fn clean_strips_ansi_echo_and_prompt() {
        let token = "portly-sentinel-0-abc";
        let raw = format!(
            "\x1b[24;1Hshow system\r\n\x1b[2K Up Time : 3 days\r\n\r\nHP-2530# {token}\r\n"
        );

        let output = clean("show system", &raw, token);

        assert_eq!(output.text, " Up Time : 3 days");
        assert_eq!(output.prompt.as_deref(), Some("HP-2530#"));
    }
}
