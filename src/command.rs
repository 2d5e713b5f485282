//! Command interpreter
//!
//! Classifies one trimmed chat message into a structured ledger command or
//! free-form text for the model. The keyword is the first whitespace token,
//! compared case-insensitively; arguments keep their original case.

#[cfg(test)]
mod proptests;

use std::fmt;
use thiserror::Error;

/// Classified chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { category: String, amount: String },
    Edit { row: RowNumber, category: String, amount: String },
    Remove { row: RowNumber },
    Show,
    Freeform(String),
}

/// A structured command whose arguments did not fit its form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("❌ Use: Add [category] [amount]")]
    Add,
    #[error("❌ Use: Edit [row_number] [category] [amount]")]
    Edit,
    #[error("❌ Use: Remove [row_number]")]
    Remove,
}

/// A row number as typed: ASCII digits, leading zeros dropped.
///
/// Kept as text so a number too large for an index is still echoed back
/// exactly as the user wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowNumber(String);

impl RowNumber {
    fn from_digits(token: &str) -> Self {
        match token.trim_start_matches('0') {
            "" => Self("0".to_string()),
            digits => Self(digits.to_string()),
        }
    }

    /// The 1-based index, or `None` when it does not fit in a `usize`
    pub fn index(&self) -> Option<usize> {
        self.0.parse().ok()
    }
}

impl fmt::Display for RowNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
impl From<usize> for RowNumber {
    fn from(row: usize) -> Self {
        Self(row.to_string())
    }
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Add { .. } => CommandKind::Add,
            Command::Edit { .. } => CommandKind::Edit,
            Command::Remove { .. } => CommandKind::Remove,
            Command::Show => CommandKind::Show,
            Command::Freeform(_) => CommandKind::Freeform,
        }
    }
}

/// Variant tag, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Add,
    Edit,
    Remove,
    Show,
    Freeform,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Add => "add",
            CommandKind::Edit => "edit",
            CommandKind::Remove => "remove",
            CommandKind::Show => "show",
            CommandKind::Freeform => "freeform",
        };
        f.write_str(name)
    }
}

/// Parse a chat message. Checks run in the order Add, Edit, Remove, Show;
/// anything else is free-form text.
pub fn parse(text: &str) -> Result<Command, UsageError> {
    let text = text.trim();
    let parts: Vec<&str> = text.split_whitespace().collect();
    let keyword = parts.first().map(|k| k.to_lowercase()).unwrap_or_default();

    match keyword.as_str() {
        "add" => match parts.as_slice() {
            [_, category, amount, ..] => Ok(Command::Add {
                category: (*category).to_string(),
                amount: (*amount).to_string(),
            }),
            _ => Err(UsageError::Add),
        },
        "edit" => match parts.as_slice() {
            [_, row, category, amount, ..] if is_row_number(row) => Ok(Command::Edit {
                row: RowNumber::from_digits(row),
                category: (*category).to_string(),
                amount: (*amount).to_string(),
            }),
            _ => Err(UsageError::Edit),
        },
        "remove" => match parts.as_slice() {
            [_, row, ..] if is_row_number(row) => Ok(Command::Remove {
                row: RowNumber::from_digits(row),
            }),
            _ => Err(UsageError::Remove),
        },
        _ if text.eq_ignore_ascii_case("show") => Ok(Command::Show),
        _ => Ok(Command::Freeform(text.to_string())),
    }
}

fn is_row_number(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}
