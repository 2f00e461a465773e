//! Rotating pool of desktop browser user-agent strings.

use rand::Rng;

pub const DESKTOP_USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
];

/// User-agent strings a client presents, one of which is current.
///
/// Starts on the first entry. [`UserAgentPool::rotate`] moves to a
/// uniformly chosen *different* entry.
#[derive(Debug, Clone)]
pub struct UserAgentPool {
    agents: Vec<String>,
    current: usize,
}

impl UserAgentPool {
    /// Builds a pool from `agents`; an empty list falls back to the desktop set.
    #[must_use]
    pub fn new(agents: Vec<String>) -> Self {
        if agents.is_empty() {
            return Self::desktop();
        }
        Self { agents, current: 0 }
    }

    #[must_use]
    pub fn desktop() -> Self {
        Self {
            agents: DESKTOP_USER_AGENTS.iter().map(|ua| (*ua).to_string()).collect(),
            current: 0,
        }
    }

    #[must_use]
    pub fn current(&self) -> &str {
        &self.agents[self.current]
    }

    /// Switches to another agent and returns it. A single-entry pool stays put.
    pub fn rotate(&mut self) -> &str {
        let len = self.agents.len();
        if len > 1 {
            let offset = rand::rng().random_range(1..len);
            self.current = (self.current + offset) % len;
        }
        self.current()
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self::desktop()
    }
}
