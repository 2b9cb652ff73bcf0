//! Core types for wiki revisions.

use crate::error::{Result, WikiError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Separator between the language tag and the title in a document key.
pub const KEY_SEPARATOR: char = '/';

/// Identifier of a user (caller identity, revision creator).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct UserId(pub u64);

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Revision number of a document (1-based).
///
/// `RevisionNumber(0)` is the sentinel for "no revision yet", and when used as a
/// request it asks for the latest revision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct RevisionNumber(pub u64);

impl RevisionNumber {
    /// "No revision" / "latest revision" sentinel.
    pub const LATEST: RevisionNumber = RevisionNumber(0);

    pub fn is_latest(self) -> bool {
        self.0 == 0
    }

    pub fn next(self) -> Self {
        RevisionNumber(self.0 + 1)
    }

    /// Parse a revision number supplied by a caller (form field, query string).
    ///
    /// Only plain decimal digits are accepted: signs and surrounding spaces are
    /// rejected.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WikiError::InvalidArgument(format!(
                "revision number {s:?} is not a decimal number"
            )));
        }
        s.parse::<u64>()
            .map(RevisionNumber)
            .map_err(|e| WikiError::InvalidArgument(format!("revision number {s:?}: {e}")))
    }
}

impl fmt::Debug for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rev({})", self.0)
    }
}

impl fmt::Display for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookup key of a document: `lang/title`.
///
/// The language tag may not be empty or contain the separator; the title may
/// not be empty but may itself contain `/`. Splitting at the first separator is
/// therefore unambiguous and distinct `(lang, title)` pairs never collide.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentKey {
    token: String,
    lang_len: usize,
}

impl DocumentKey {
    /// Build a key from its components, validating both.
    pub fn new(lang: &str, title: &str) -> Result<Self> {
        if lang.is_empty() {
            return Err(WikiError::InvalidArgument("empty language tag".into()));
        }
        if lang.contains(KEY_SEPARATOR) {
            return Err(WikiError::InvalidArgument(format!(
                "language tag {lang:?} contains {KEY_SEPARATOR:?}"
            )));
        }
        if title.is_empty() {
            return Err(WikiError::InvalidArgument("empty title".into()));
        }

        let mut token = String::with_capacity(lang.len() + 1 + title.len());
        token.push_str(lang);
        token.push(KEY_SEPARATOR);
        token.push_str(title);

        Ok(Self {
            token,
            lang_len: lang.len(),
        })
    }

    /// Parse a `lang/title` token.
    pub fn parse(token: &str) -> Result<Self> {
        match token.split_once(KEY_SEPARATOR) {
            Some((lang, title)) => Self::new(lang, title),
            None => Err(WikiError::InvalidArgument(format!(
                "document key {token:?} has no {KEY_SEPARATOR:?}"
            ))),
        }
    }

    pub fn lang(&self) -> &str {
        &self.token[..self.lang_len]
    }

    pub fn title(&self) -> &str {
        &self.token[self.lang_len + 1..]
    }

    /// The joined token sent to the store.
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentKey({})", self.token)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl TryFrom<String> for DocumentKey {
    type Error = WikiError;

    fn try_from(token: String) -> Result<Self> {
        Self::parse(&token)
    }
}

impl From<DocumentKey> for String {
    fn from(key: DocumentKey) -> Self {
        key.token
    }
}

/// A retained revision as listed by the store (no content).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionSummary {
    pub number: RevisionNumber,
    pub creator: UserId,
}

/// Display data of a user, as returned by the profile service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub login: String,
    pub desc: String,
    pub info: HashMap<String, String>,
}

impl UserProfile {
    /// Placeholder for a user the profile service does not know.
    pub fn unknown(id: UserId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// A listed revision decorated with its creator's profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub number: RevisionNumber,
    pub creator: UserProfile,
}

/// Action checked by the authorizer before a store call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Access,
    Create,
    /// Accepted by store sessions alongside `Create`, for callers whose rights
    /// service grants edits of existing pages separately from creation.
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Access => "access",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
