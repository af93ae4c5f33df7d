//! Terminal control sequences used by the display.
//!
//! Only relative cursor movement is used. Every sequence carries an explicit
//! count so no terminal has to fall back on its default parameter.

use serde::{Deserialize, Serialize};

pub const CR: &str = "\r";
pub const RESET: &str = "\x1b[m";

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const BROWN: &str = "\x1b[33m";

/// Color state of an item line or detail line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Neutral,
    Pending,
    Success,
    Failure,
}

impl Tone {
    fn sgr(self) -> Option<&'static str> {
        match self {
            Tone::Neutral => None,
            Tone::Pending => Some(BROWN),
            Tone::Success => Some(GREEN),
            Tone::Failure => Some(RED),
        }
    }
}

/// Wrap `text` in the set/reset codes of `tone`. Neutral text is left bare.
pub fn paint(tone: Tone, text: &str) -> String {
    match tone.sgr() {
        Some(code) => format!("{code}{text}{RESET}"),
        None => text.to_string(),
    }
}

pub fn cursor_up(n: usize) -> String {
    format!("\x1b[{n}A")
}

pub fn cursor_down(n: usize) -> String {
    format!("\x1b[{n}B")
}

pub fn insert_lines(n: usize) -> String {
    format!("\x1b[{n}L")
}

pub fn delete_lines(n: usize) -> String {
    format!("\x1b[{n}M")
}
