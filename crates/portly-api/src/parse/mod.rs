// ── Output parsers ──
//
// One pure parser per CLI dialect. Each turns cleaned command output
// into typed records and collects a diagnostic for every line it had to
// skip. Nothing here touches the network.

pub mod brief;
pub mod identity;
pub mod interface;
pub mod lines;
pub mod poe;

use thiserror::Error;

pub use brief::{BriefRecord, parse_brief};
pub use identity::{IdentityRecord, model_from_prompt, parse_identity};
pub use interface::{InterfaceRecord, parse_interfaces};
pub use lines::Duplex;
pub use poe::{PoePortState, PoeRecord, parse_poe};

/// Records recovered from one command's output, plus what was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport<T> {
    pub records: Vec<T>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl<T> ParseReport<T> {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn skip(&mut self, line: usize, fragment: &str, reason: impl Into<String>) {
        self.diagnostics.push(ParseDiagnostic {
            line,
            fragment: fragment.trim().to_owned(),
            reason: reason.into(),
        });
    }

    /// Fail with [`ParseError::Unrecognized`] if nothing was recovered.
    pub(crate) fn require_records(self, dialect: &'static str) -> Result<Self, ParseError> {
        if self.records.is_empty() {
            return Err(ParseError::Unrecognized {
                dialect,
                diagnostics: self.diagnostics,
            });
        }
        Ok(self)
    }
}

/// A line the parser could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// 1-based line number within the command output.
    pub line: usize,
    /// The offending text, trimmed.
    pub fragment: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{dialect} output was empty")]
    Empty { dialect: &'static str },

    #[error("no {dialect} records found ({} lines skipped)", diagnostics.len())]
    Unrecognized {
        dialect: &'static str,
        diagnostics: Vec<ParseDiagnostic>,
    },
}

impl ParseError {
    /// First offending fragment, for event payloads.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::Empty { .. } => None,
            Self::Unrecognized { diagnostics, .. } => {
                diagnostics.first().map(|d| d.fragment.as_str())
            }
        }
    }
}

pub(crate) fn ensure_not_empty(raw: &str, dialect: &'static str) -> Result<(), ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty { dialect });
    }
    Ok(())
}
