//! Scripted mock instrument endpoint.
//!
//! Simulated instrument for testing the sweep controller without
//! hardware, and for the binary's `--dry-run` mode. Responses are
//! scripted per command: a queue of replies is consumed in order and
//! the last entry sticks, so "`NAV` twice, then a value" and "always
//! `NAV`" are both one-liners to set up. Transport faults can be
//! injected at the nth occurrence of a given command to exercise
//! point-isolation behavior.
//!
//! Every write and query is appended to a transcript so tests can
//! assert on command ordering (e.g. teardown directives issued even
//! for a failed point).

use crate::error::{AppResult, SweepError};
use crate::instrument::ScpiEndpoint;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

pub struct MockEndpoint {
    responses: HashMap<String, VecDeque<String>>,
    default_response: String,
    faults: HashMap<String, u32>,
    seen: HashMap<String, u32>,
    transcript: Vec<String>,
    timeout: Duration,
    closed: bool,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: "0".to_string(),
            faults: HashMap::new(),
            seen: HashMap::new(),
            transcript: Vec::new(),
            timeout: Duration::from_secs(30),
            closed: false,
        }
    }

    /// Sticky reply for `cmd`: every matching query returns `response`.
    pub fn set_response(&mut self, cmd: &str, response: &str) -> &mut Self {
        self.responses
            .insert(cmd.to_string(), VecDeque::from([response.to_string()]));
        self
    }

    /// Scripted reply sequence for `cmd`; the last entry repeats once
    /// the earlier ones are consumed.
    pub fn enqueue_responses<I, S>(&mut self, cmd: &str, replies: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue: VecDeque<String> = replies.into_iter().map(Into::into).collect();
        self.responses.insert(cmd.to_string(), queue);
        self
    }

    /// Reply used for queries with no scripted response.
    pub fn set_default_response(&mut self, response: &str) -> &mut Self {
        self.default_response = response.to_string();
        self
    }

    /// Inject a communication fault at the `occurrence`-th (1-based)
    /// time `cmd` is sent, counting writes and queries alike.
    pub fn fail_on(&mut self, cmd: &str, occurrence: u32) -> &mut Self {
        self.faults.insert(cmd.to_string(), occurrence);
        self
    }

    /// Full ordered list of commands sent so far.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// How many times `cmd` was sent.
    pub fn count_of(&self, cmd: &str) -> usize {
        self.transcript.iter().filter(|c| *c == cmd).count()
    }

    /// Whether `cmd` was ever sent.
    pub fn was_sent(&self, cmd: &str) -> bool {
        self.count_of(cmd) > 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn record(&mut self, cmd: &str) -> AppResult<()> {
        if self.closed {
            return Err(SweepError::Communication(
                "mock session is closed".to_string(),
            ));
        }
        self.transcript.push(cmd.to_string());
        let counter = self.seen.entry(cmd.to_string()).or_insert(0);
        *counter += 1;
        let count = *counter;
        if self.faults.get(cmd).copied() == Some(count) {
            return Err(SweepError::Communication(format!(
                "injected fault on '{}' (occurrence {})",
                cmd, count
            )));
        }
        Ok(())
    }
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl ScpiEndpoint for MockEndpoint {
    fn write(&mut self, cmd: &str) -> AppResult<()> {
        self.record(cmd)
    }

    fn query_with_timeout(&mut self, cmd: &str, _timeout: Duration) -> AppResult<String> {
        self.record(cmd)?;
        let response = match self.responses.get_mut(cmd) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => self.default_response.clone(),
        };
        Ok(response)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn close(&mut self) -> AppResult<()> {
        self.closed = true;
        Ok(())
    }
}
