#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::io::IsTerminal as _;

use crossterm::style::{Color, Stylize as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

#[must_use]
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Rendering layer selected once at startup: either emits ANSI styling or
/// passes text through unchanged. Matching and selection never depend on
/// which variant is active.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    enabled: bool,
}

impl Style {
    #[must_use]
    pub fn from_mode(mode: ColorMode) -> Self {
        let enabled = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => is_tty(),
        };
        Self { enabled }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self { enabled: false }
    }

    #[must_use]
    pub const fn styled() -> Self {
        Self { enabled: true }
    }

    #[must_use]
    pub fn header(&self, text: &str) -> String {
        self.paint(text, Color::Cyan, true)
    }

    #[must_use]
    pub fn accent(&self, text: &str) -> String {
        self.paint(text, Color::Cyan, false)
    }

    #[must_use]
    pub fn ok(&self, text: &str) -> String {
        self.paint(text, Color::Green, false)
    }

    #[must_use]
    pub fn err(&self, text: &str) -> String {
        self.paint(text, Color::Red, false)
    }

    #[must_use]
    pub fn warn(&self, text: &str) -> String {
        self.paint(text, Color::Yellow, false)
    }

    /// Marks matched char offsets in yellow bold, restoring `base` (when
    /// given) for the surrounding characters so a highlighted name embedded
    /// in a colored header keeps its base color after each match.
    #[must_use]
    pub fn highlight(
        &self,
        text: &str,
        positions: &BTreeSet<usize>,
        base: Option<Color>,
    ) -> String {
        if !self.enabled || positions.is_empty() {
            return match (self.enabled, base) {
                (true, Some(color)) => self.paint(text, color, false),
                _ => text.to_owned(),
            };
        }

        let mut out = String::new();
        for (i, ch) in text.chars().enumerate() {
            if positions.contains(&i) {
                out.push_str(&format!("{}", ch.to_string().with(Color::Yellow).bold()));
            } else if let Some(color) = base {
                out.push_str(&format!("{}", ch.to_string().with(color)));
            } else {
                out.push(ch);
            }
        }
        out
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.enabled {
            return text.to_owned();
        }
        let styled = text.to_owned().with(color);
        if bold {
            format!("{}", styled.bold())
        } else {
            format!("{styled}")
        }
    }
}
