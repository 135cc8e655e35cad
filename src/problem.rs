// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Compile and deployment diagnostics.
//!
//! Every compile, import, or run operation produces a flat list of
//! diagnostic records. A record pins a message to a line and column in the
//! object's source, carries a severity, and remembers where the diagnostic
//! came from. The whole list renders one record per line in the fixed
//! `line/position attribute text` shape, which line-based problem matchers
//! in editors key off of.
//!
//! Records come from three places. Database-reported rows map straight in.
//! Command-line compiler output is scraped with a regex for the
//! `LINE/COL message` shape that `SHOW ERRORS` produces. Unexpected system
//! failures collapse into a single record carrying the raw message, with a
//! best-effort line and column derived from any character offset the
//! failure reports.
//!
//! One diagnostic is special: the __server-change sentinel__. It flags that
//! the object changed on the server since the last sync, meaning the local
//! file needs a merge rather than a fix. It travels through the same list
//! so callers get one rendering path, and [`ErrorList::has_dirt`] picks it
//! back out.
//!
//! Lists are built fresh per operation and only appended to while being
//! built. A failure local to one object never aborts a batch; each object
//! gets its own independent list.

use regex::Regex;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Severity of one diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Error,
    Warning,
    Info,
}

impl Display for Attribute {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Attribute::Error => "ERROR",
            Attribute::Warning => "WARNING",
            Attribute::Info => "INFO",
        };
        fmt.write_str(label)
    }
}

/// Origin of one diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Server-side compiler diagnostics.
    Compiler,

    /// Unexpected system failure, e.g. network or driver.
    System,

    /// The server-change sentinel. Needs merge, not fix.
    ServerChange,
}

/// One diagnostic pinned to a line and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub line: u32,
    pub position: u32,
    pub attribute: Attribute,
    pub text: String,
    pub origin: Origin,
}

impl ErrorRecord {
    /// The server-change sentinel for one object.
    pub fn server_change(object_name: impl AsRef<str>) -> Self {
        Self {
            line: 1,
            position: 1,
            attribute: Attribute::Error,
            text: format!("{} changed on server since last sync", object_name.as_ref()),
            origin: Origin::ServerChange,
        }
    }
}

impl Display for ErrorRecord {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{}/{} {} {}",
            self.line, self.position, self.attribute, self.text
        )
    }
}

/// Flat list of diagnostics for one operation on one object.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorList {
    records: Vec<ErrorRecord>,
}

impl ErrorList {
    /// Construct an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from database-reported diagnostic rows.
    ///
    /// A row is `(line, position, attribute, text)` the way the server's
    /// error view hands them out. Unknown attribute labels degrade to
    /// [`Attribute::Error`].
    pub fn from_rows(
        rows: impl IntoIterator<Item = (u32, u32, impl AsRef<str>, impl Into<String>)>,
    ) -> Self {
        let mut list = Self::new();
        for (line, position, attribute, text) in rows {
            let attribute = match attribute.as_ref().trim().to_uppercase().as_str() {
                "WARNING" => Attribute::Warning,
                "INFO" => Attribute::Info,
                _ => Attribute::Error,
            };
            list.push(ErrorRecord {
                line,
                position,
                attribute,
                text: text.into(),
                origin: Origin::Compiler,
            });
        }
        list
    }

    /// Scrape diagnostics out of command-line compiler output.
    ///
    /// Picks up lines in the `LINE/COL message` shape. Messages carrying a
    /// `PLW-` code count as warnings, everything else as errors. Lines that
    /// do not fit the shape are skipped.
    pub fn from_compiler_output(output: impl AsRef<str>) -> Self {
        // Infallible, the pattern is a literal.
        let shape = Regex::new(r"^\s*(\d+)/(\d+)\s+(\S.*)$").unwrap();

        let mut list = Self::new();
        for line in output.as_ref().lines() {
            let Some(captures) = shape.captures(line) else {
                continue;
            };
            let Ok(line) = captures[1].parse() else {
                continue;
            };
            let Ok(position) = captures[2].parse() else {
                continue;
            };
            let text = captures[3].trim_end().to_string();

            let attribute = if text.contains("PLW-") {
                Attribute::Warning
            } else {
                Attribute::Error
            };
            list.push(ErrorRecord {
                line,
                position,
                attribute,
                text,
                origin: Origin::Compiler,
            });
        }
        list
    }

    /// Collapse an unexpected system failure into a single record.
    ///
    /// When the failure reports a character offset into `code`, the line
    /// and column are recovered from it. Otherwise the record pins to 1/1.
    pub fn from_system_failure(
        message: impl Into<String>,
        code: &str,
        offset: Option<usize>,
    ) -> Self {
        let (line, position) = match offset {
            Some(offset) => offset_to_line_position(code, offset),
            None => (1, 1),
        };

        let mut list = Self::new();
        list.push(ErrorRecord {
            line,
            position,
            attribute: Attribute::Error,
            text: message.into(),
            origin: Origin::System,
        });
        list
    }

    /// Append one record.
    pub fn push(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    /// Append every record of another list.
    pub fn extend(&mut self, other: ErrorList) {
        self.records.extend(other.records);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter()
    }

    /// Whether any record is an error.
    pub fn has_errors(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.attribute == Attribute::Error)
    }

    /// Whether any record is a warning.
    pub fn has_warnings(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.attribute == Attribute::Warning)
    }

    /// Whether any record is informational.
    pub fn has_infos(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.attribute == Attribute::Info)
    }

    /// Whether the server-change sentinel is present.
    ///
    /// Dirt means the local file needs a merge with the server's version,
    /// not that the code is broken.
    pub fn has_dirt(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.origin == Origin::ServerChange)
    }
}

impl Display for ErrorList {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for record in &self.records {
            writeln!(fmt, "{record}")?;
        }
        Ok(())
    }
}

fn offset_to_line_position(code: &str, offset: usize) -> (u32, u32) {
    // Driver offsets are raw bytes and may land inside a multi-byte
    // character. Walk back to the nearest boundary before slicing.
    let mut offset = offset.min(code.len());
    while !code.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &code[..offset];
    let line = before.matches('\n').count() as u32 + 1;
    let position = match before.rfind('\n') {
        Some(newline) => (offset - newline) as u32,
        None => offset as u32 + 1,
    };
    (line, position)
}
