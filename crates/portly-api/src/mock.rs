// Scripted in-memory switch for tests.
//
// `MockSwitch` is a `Connector` whose shells echo every typed line,
// answer known commands from a reply table, and reject everything else
// with "Invalid input" the way the ProCurve CLI does. Replies can be
// delayed, paged, or drop the connection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::batch::SENTINEL_PREFIX;
use crate::error::Error;
use crate::transport::{Connector, Shell};

const PAGER: &str = "-- MORE --, next page: Space, next line: Enter, quit: Control-C";

/// How the mock answers one command.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Answer only after the given delay.
    Delayed(Duration, String),
    /// First page, pager prompt, then the rest once a space arrives.
    Paged(String, String),
    /// Close the channel instead of answering.
    Disconnect,
}

struct State {
    prompt: String,
    replies: HashMap<String, Reply>,
    sent: Vec<String>,
    connect_attempts: u64,
    fail_connects: u32,
    reject_password: bool,
}

#[derive(Clone)]
pub struct MockSwitch {
    state: Arc<Mutex<State>>,
}

impl Default for MockSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSwitch {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                prompt: "HP-2530-24G-PoEP#".into(),
                replies: HashMap::new(),
                sent: Vec::new(),
                connect_attempts: 0,
                fail_connects: 0,
                reject_password: false,
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state)
    }

    /// Fail the next `n` connect attempts with a connect error.
    pub fn fail_connects(self, n: u32) -> Self {
        self.with_state(|s| s.fail_connects = n);
        self
    }

    /// Reject every login.
    pub fn reject_password(self) -> Self {
        self.with_state(|s| s.reject_password = true);
        self
    }

    pub fn set_prompt(&self, prompt: &str) {
        self.with_state(|s| s.prompt = prompt.to_owned());
    }

    /// Set (or replace) the reply for `command`.
    pub fn reply(&self, command: &str, reply: Reply) {
        self.with_state(|s| s.replies.insert(command.to_owned(), reply));
    }

    pub fn reply_text(&self, command: &str, text: &str) {
        self.reply(command, Reply::Text(text.to_owned()));
    }

    /// Every non-sentinel line typed so far, across all shells.
    pub fn sent_commands(&self) -> Vec<String> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn connect_attempts(&self) -> u64 {
        self.with_state(|s| s.connect_attempts)
    }
}

#[async_trait]
impl Connector for MockSwitch {
    async fn connect(&self) -> Result<Box<dyn Shell>, Error> {
        self.with_state(|s| {
            s.connect_attempts += 1;
            if s.fail_connects > 0 {
                s.fail_connects -= 1;
                return Err(Error::Connect {
                    host: "mock:22".into(),
                    reason: "connection refused".into(),
                });
            }
            if s.reject_password {
                return Err(Error::Authentication {
                    message: "password rejected for user 'manager'".into(),
                });
            }
            Ok(())
        })?;

        Ok(Box::new(MockShell {
            switch: self.clone(),
            input: String::new(),
            outbox: VecDeque::new(),
            last_ready: Instant::now(),
            next_page: None,
            closed: false,
        }))
    }

    fn endpoint(&self) -> String {
        "mock:22".into()
    }
}

struct MockShell {
    switch: MockSwitch,
    input: String,
    outbox: VecDeque<(Instant, String)>,
    last_ready: Instant,
    next_page: Option<String>,
    closed: bool,
}

impl MockShell {
    fn emit(&mut self, delay: Duration, chunk: String) {
        let ready = (Instant::now() + delay).max(self.last_ready);
        self.last_ready = ready;
        self.outbox.push_back((ready, chunk));
    }

    fn answer(&mut self, line: &str) {
        let (prompt, reply) = self.switch.with_state(|s| {
            if !line.is_empty() && !line.starts_with(SENTINEL_PREFIX) {
                s.sent.push(line.to_owned());
            }
            (s.prompt.clone(), s.replies.get(line).cloned())
        });

        if line.is_empty() {
            self.emit(Duration::ZERO, format!("\r\n{prompt} "));
            return;
        }

        match reply {
            Some(Reply::Text(body)) => {
                self.emit(Duration::ZERO, format!("{line}\r\n{body}\r\n{prompt} "));
            }
            Some(Reply::Delayed(delay, body)) => {
                self.emit(delay, format!("{line}\r\n{body}\r\n{prompt} "));
            }
            Some(Reply::Paged(first, rest)) => {
                self.emit(Duration::ZERO, format!("{line}\r\n{first}\r\n{PAGER}"));
                self.next_page = Some(format!("\x1b[2K{rest}\r\n{prompt} "));
            }
            Some(Reply::Disconnect) => self.closed = true,
            None => {
                self.emit(
                    Duration::ZERO,
                    format!("{line}\r\nInvalid input: {line}\r\n{prompt} "),
                );
            }
        }
    }
}

#[async_trait]
impl Shell for MockShell {
    async fn send(&mut self, data: &str) -> Result<(), Error> {
        if self.closed {
            return Err(Error::SessionClosed {
                reason: "mock channel closed".into(),
            });
        }

        // While the pager is up only a space or `q` gets through; typed
        // lines wait until the listing finishes.
        match (self.next_page.take(), data) {
            (Some(page), " ") => self.emit(Duration::ZERO, page),
            (Some(_), "q") => {
                let prompt = self.switch.with_state(|s| s.prompt.clone());
                self.emit(Duration::ZERO, format!("\r\n{prompt} "));
            }
            (page, _) => {
                self.next_page = page;
                self.input.push_str(data);
            }
        }

        while self.next_page.is_none() && !self.closed {
            let Some(pos) = self.input.find('\n') else {
                break;
            };
            let line: String = self.input.drain(..=pos).collect();
            self.answer(line.trim());
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, Error> {
        if let Some(&(ready, _)) = self.outbox.front() {
            tokio::time::sleep_until(ready).await;
            return Ok(self.outbox.pop_front().map(|(_, chunk)| chunk));
        }
        if self.closed {
            return Ok(None);
        }
        std::future::pending::<()>().await;
        Ok(None)
    }

    async fn close(&mut self) {
        self.closed = true;
        self.outbox.clear();
    }
}
