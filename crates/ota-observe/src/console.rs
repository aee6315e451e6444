//! Operator-facing console output.
//!
//! Tallies and verdicts are printed to stdout independently of the tracing logs.
//! Painting is pure: every helper returns a new string and holds no global state.

use std::io::IsTerminal;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

#[inline]
fn wrap(code: &str, s: &str) -> String {
    format!("{code}{s}{RESET}")
}

pub fn red(s: &str) -> String {
    wrap(RED, s)
}

pub fn green(s: &str) -> String {
    wrap(GREEN, s)
}

pub fn yellow(s: &str) -> String {
    wrap(YELLOW, s)
}

pub fn blue(s: &str) -> String {
    wrap(BLUE, s)
}

/// Console sink with color detection resolved once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Console {
    color: bool,
}

impl Console {
    /// Colors enabled when stdout is a terminal.
    pub fn detect() -> Self {
        Self {
            color: std::io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn red(&self, s: &str) -> String {
        self.paint(red, s)
    }

    pub fn green(&self, s: &str) -> String {
        self.paint(green, s)
    }

    pub fn yellow(&self, s: &str) -> String {
        self.paint(yellow, s)
    }

    pub fn blue(&self, s: &str) -> String {
        self.paint(blue, s)
    }

    pub fn line(&self, s: impl AsRef<str>) {
        println!("{}", s.as_ref());
    }

    fn paint(&self, f: fn(&str) -> String, s: &str) -> String {
        if self.color { f(s) } else { s.to_string() }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::detect()
    }
}
