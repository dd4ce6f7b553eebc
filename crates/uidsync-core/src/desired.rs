//! Desired-State Loader
//!
//! Parses the uid mapping file, a CSV with a header row and the columns
//! `username, uid, active[, comment]`:
//!
//! ```text
//! username,uid,active,comment
//! alice,1001,1
//! #bob,1002,1,only on gpu nodes
//! carol,1003,0,left the group
//! ```
//!
//! Rows are returned in file order. A malformed row becomes a
//! [`BrokenRow`] and never aborts the load; only an unreadable file does.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::types::AccountIdentity;

/// Leading marker on a username meaning "declared, inactive on this host".
pub const COMMENT_MARKER: char = '#';

/// Literal value of the active column meaning "active".
pub const ACTIVE_FLAG: &str = "1";

/// One well-formed row of the mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredAccountRecord {
    /// 1-based line number in the source file.
    pub line: u64,
    /// Username as written, including any comment marker.
    pub username: String,
    pub uid: u32,
    /// The stored active flag, before the comment marker is considered.
    pub active: bool,
    pub comment: Option<String>,
}

impl DesiredAccountRecord {
    /// Whether the username carries the comment marker.
    pub fn is_commented(&self) -> bool {
        self.username.starts_with(COMMENT_MARKER)
    }

    /// Account name with one leading comment marker removed.
    pub fn account_name(&self) -> &str {
        self.username
            .strip_prefix(COMMENT_MARKER)
            .unwrap_or(&self.username)
            .trim()
    }

    /// Whether the account should exist on this host.
    pub fn wants_account(&self) -> bool {
        self.active && !self.is_commented()
    }

    pub fn identity(&self) -> AccountIdentity {
        AccountIdentity::new(self.account_name(), self.uid)
    }
}

/// Why a row was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokenReason {
    /// Fewer than 3 or more than 4 fields.
    FieldCount(usize),
    /// One of username, uid, active is blank.
    EmptyField(&'static str),
    /// The uid column is not an unsigned integer.
    InvalidUid(String),
    /// The comment marker with no name after it.
    EmptyName,
    /// The row could not be decoded.
    Unparseable(String),
}

impl fmt::Display for BrokenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokenReason::FieldCount(n) => write!(f, "expected 3 or 4 fields, found {n}"),
            BrokenReason::EmptyField(name) => write!(f, "{name} is empty"),
            BrokenReason::InvalidUid(uid) => write!(f, "uid {uid:?} is not a number"),
            BrokenReason::EmptyName => write!(f, "username is only a comment marker"),
            BrokenReason::Unparseable(msg) => write!(f, "unparseable: {msg}"),
        }
    }
}

/// A row that failed validation, echoed to the operator for correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenRow {
    pub line: u64,
    /// Raw fields as read, untrimmed.
    pub fields: Vec<String>,
    pub reason: BrokenReason,
}

impl fmt::Display for BrokenRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "broken row (line {}): {:?} ({})",
            self.line, self.fields, self.reason
        )
    }
}

/// One data row of the mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredRow {
    Record(DesiredAccountRecord),
    Broken(BrokenRow),
}

/// Load the mapping file at `path`.
pub fn load_desired_state(path: &Path) -> CoreResult<Vec<DesiredRow>> {
    let file = File::open(path).map_err(|e| CoreError::MappingUnreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let rows = parse_desired_state(file).map_err(|e| match e {
        CoreError::MappingUnreadable { message, .. } => CoreError::MappingUnreadable {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "Loaded desired state");
    Ok(rows)
}

/// Parse mapping CSV from any reader. The first row is the header.
pub fn parse_desired_state<R: Read>(reader: R) -> CoreResult<Vec<DesiredRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.records() {
        match result {
            Ok(record) => {
                let line = record.position().map_or(0, |p| p.line());
                let fields: Vec<String> = record.iter().map(str::to_string).collect();
                if fields.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                rows.push(validate_row(line, fields));
            }
            Err(e) if e.is_io_error() => {
                return Err(CoreError::MappingUnreadable {
                    path: Default::default(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                rows.push(DesiredRow::Broken(BrokenRow {
                    line,
                    fields: Vec::new(),
                    reason: BrokenReason::Unparseable(e.to_string()),
                }));
            }
        }
    }
    Ok(rows)
}

fn validate_row(line: u64, fields: Vec<String>) -> DesiredRow {
    let broken = |fields: Vec<String>, reason| DesiredRow::Broken(BrokenRow { line, fields, reason });

    if !(3..=4).contains(&fields.len()) {
        let n = fields.len();
        return broken(fields, BrokenReason::FieldCount(n));
    }
    for (idx, name) in ["username", "uid", "active"].into_iter().enumerate() {
        if fields[idx].trim().is_empty() {
            return broken(fields, BrokenReason::EmptyField(name));
        }
    }

    let username = fields[0].trim().to_string();
    let name = username.strip_prefix(COMMENT_MARKER).unwrap_or(&username);
    if name.trim().is_empty() {
        return broken(fields, BrokenReason::EmptyName);
    }
    let uid_text = fields[1].trim();
    let uid = match uid_text.parse::<u32>() {
        Ok(uid) => uid,
        Err(_) => {
            let reason = BrokenReason::InvalidUid(uid_text.to_string());
            return broken(fields, reason);
        }
    };
    let active = fields[2].trim() == ACTIVE_FLAG;
    let comment = fields
        .get(3)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    DesiredRow::Record(DesiredAccountRecord {
        line,
        username,
        uid,
        active,
        comment,
    })
}
