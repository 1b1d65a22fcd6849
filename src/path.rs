//! User paths, parsed paths, and cleaned in-TLF paths.
//!
//! A [`UserPath`] is whatever the caller handed us: always rooted at
//! `/keybase`, but possibly not canonical (`/keybase/team/kb/dir/../file`).
//! Parsing splits it into the TLF it names and the path inside that TLF.
//! Subscriptions are matched on [`CleanPath`], the cleaned path relative to
//! the TLF root:
//!
//! ```text
//! /keybase/private/alice,bob/foo/bar  ->  /foo/bar
//! /keybase/private/alice,bob          ->  /
//! ```

use crate::error::{Result, SubscriptionError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mount root every user path must live under.
pub const ROOT: &str = "keybase";

/// Lexically clean a slash-separated path.
///
/// Collapses repeated separators, drops `.` elements and resolves `..`
/// against the preceding element. `..` at the root of a rooted path stays at
/// the root. The empty path cleans to `.`.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Raw user-supplied path, rooted at `/keybase`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserPath(pub String);

impl UserPath {
    pub fn new(path: impl Into<String>) -> Self {
        UserPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the path into its TLF and the path inside the TLF.
    pub fn parse(&self) -> Result<ParsedPath> {
        let cleaned = clean(&self.0);
        if !cleaned.starts_with('/') {
            return Err(SubscriptionError::invalid_path(&self.0, "path is not absolute"));
        }

        let mut components = cleaned.split('/').filter(|c| !c.is_empty());
        if components.next() != Some(ROOT) {
            return Err(SubscriptionError::invalid_path(
                &self.0,
                format!("path is not under /{ROOT}"),
            ));
        }

        let tlf_type = match components.next() {
            None => {
                return Ok(ParsedPath {
                    raw: self.clone(),
                    tlf: None,
                    raw_in_tlf_path: "/".to_string(),
                })
            }
            Some(segment) => TlfType::from_segment(segment).ok_or_else(|| {
                SubscriptionError::invalid_path(&self.0, format!("unknown TLF type {segment:?}"))
            })?,
        };

        let tlf = components.next().map(|name| TlfName {
            tlf_type,
            name: name.to_string(),
        });
        let rest: Vec<&str> = components.collect();

        Ok(ParsedPath {
            raw: self.clone(),
            tlf,
            raw_in_tlf_path: format!("/{}", rest.join("/")),
        })
    }
}

impl fmt::Debug for UserPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserPath({})", self.0)
    }
}

impl fmt::Display for UserPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserPath {
    fn from(s: &str) -> Self {
        UserPath(s.to_string())
    }
}

/// Visibility class of a TLF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlfType {
    Private,
    Public,
    Team,
}

impl TlfType {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "private" => Some(TlfType::Private),
            "public" => Some(TlfType::Public),
            "team" => Some(TlfType::Team),
            _ => None,
        }
    }
}

/// A TLF as named in a user path, before it is resolved to an ID.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TlfName {
    pub tlf_type: TlfType,
    pub name: String,
}

/// A user path split into TLF and in-TLF parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedPath {
    /// The path as the user gave it.
    pub raw: UserPath,
    /// `None` for paths above the TLF level, like `/keybase/private`.
    pub tlf: Option<TlfName>,
    /// Path inside the TLF, `/`-rooted.
    pub raw_in_tlf_path: String,
}

impl ParsedPath {
    pub fn clean_in_tlf_path(&self) -> CleanPath {
        CleanPath::new(&self.raw_in_tlf_path)
    }
}

/// Cleaned path rooted at a TLF.
///
/// `/foo/bar` for a node inside the TLF, `/` for the TLF itself.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CleanPath(String);

impl CleanPath {
    pub fn new(path: &str) -> Self {
        CleanPath(clean(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path one level up.
    ///
    /// Only paths at least two levels deep have a parent: `/a/b` yields `/a`,
    /// while `/a` and `/` yield `None`.
    pub fn parent(&self) -> Option<CleanPath> {
        match self.0.rfind('/') {
            Some(idx) if idx > 0 => Some(CleanPath(self.0[..idx].to_string())),
            _ => None,
        }
    }
}

impl fmt::Debug for CleanPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CleanPath({})", self.0)
    }
}

impl fmt::Display for CleanPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
