//! # Filter Table
//!
//! The set of `(receiver, action)` pairs whose actions get reported.
//! An entry with [`ActionMatch::Any`] selects every action a receiver performs.
//!
//! Configured once at startup from `receiver[:action]` strings; read-only after.

use shared_types::Name;
use std::collections::BTreeSet;
use std::fmt;

use super::errors::ConfigError;

/// Action half of a filter entry.
///
/// `Any` sorts before every named action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionMatch {
    Any,
    Named(Name),
}

/// One `(receiver, action)` selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterEntry {
    pub receiver: Name,
    pub action: ActionMatch,
}

impl FilterEntry {
    /// Parse `receiver[:action]`.
    ///
    /// A missing or empty action part means "any action".
    ///
    /// # Errors
    ///
    /// `InvalidWatchEntry` when the receiver is empty, there is more than one
    /// `:`, or either part is not a valid name.
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidWatchEntry {
            entry: entry.to_string(),
            reason,
        };

        let mut parts = entry.trim().split(':');
        let receiver = parts.next().unwrap_or_default();
        let action = parts.next().unwrap_or_default();
        if parts.next().is_some() {
            return Err(invalid("expected receiver[:action]".into()));
        }
        if receiver.is_empty() {
            return Err(invalid("receiver is empty".into()));
        }

        let receiver: Name = receiver.parse().map_err(|e| invalid(format!("{e}")))?;
        let action = if action.is_empty() {
            ActionMatch::Any
        } else {
            ActionMatch::Named(action.parse().map_err(|e| invalid(format!("{e}")))?)
        };

        Ok(Self { receiver, action })
    }
}

impl fmt::Display for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            ActionMatch::Any => write!(f, "{}:*", self.receiver),
            ActionMatch::Named(action) => write!(f, "{}:{}", self.receiver, action),
        }
    }
}

/// Ordered set of filter entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTable {
    entries: BTreeSet<FilterEntry>,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `receiver[:action]` strings. Duplicates collapse.
    pub fn configure<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for entry in entries {
            table.insert(FilterEntry::parse(entry.as_ref())?);
        }
        Ok(table)
    }

    /// Add one entry. Returns false if it was already present.
    pub fn insert(&mut self, entry: FilterEntry) -> bool {
        self.entries.insert(entry)
    }

    /// True if `(receiver, action)` or `(receiver, any)` is configured.
    pub fn matches(&self, receiver: Name, action: Name) -> bool {
        self.entries.contains(&FilterEntry {
            receiver,
            action: ActionMatch::Named(action),
        }) || self.entries.contains(&FilterEntry {
            receiver,
            action: ActionMatch::Any,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            FilterEntry::parse("alice:transfer").unwrap(),
            FilterEntry {
                receiver: n("alice"),
                action: ActionMatch::Named(n("transfer")),
            }
        );
        assert_eq!(FilterEntry::parse("alice").unwrap().action, ActionMatch::Any);
        assert_eq!(FilterEntry::parse("alice:").unwrap().action, ActionMatch::Any);
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        for entry in ["", ":transfer", "a:b:c", "Alice:transfer", "alice:Transfer", "waytoolongname1"] {
            assert!(
                matches!(
                    FilterEntry::parse(entry),
                    Err(ConfigError::InvalidWatchEntry { .. })
                ),
                "{entry:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_matches_exact_and_wildcard() {
        let table = FilterTable::configure(["alice:transfer", "eosio"]).unwrap();

        assert!(table.matches(n("alice"), n("transfer")));
        assert!(!table.matches(n("alice"), n("vote")));
        assert!(table.matches(n("eosio"), n("vote")));
        assert!(table.matches(n("eosio"), n("newaccount")));
        assert!(!table.matches(n("bob"), n("transfer")));
    }

    #[test]
    fn test_matches_only_configured_pairs() {
        let configured = [("alice", "transfer"), ("bob", "vote")];
        let table = FilterTable::configure(
            configured.iter().map(|(r, a)| format!("{r}:{a}")),
        )
        .unwrap();

        for receiver in ["alice", "bob", "carol"] {
            for action in ["transfer", "vote", "issue"] {
                let expected = configured.contains(&(receiver, action));
                assert_eq!(table.matches(n(receiver), n(action)), expected);
            }
        }
    }

    #[test]
    fn test_duplicates_collapse() {
        let table = FilterTable::configure(["alice:transfer", "alice:transfer", "alice"]).unwrap();
        assert_eq!(table.len(), 2);
        let rendered: Vec<String> = table.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["alice:*", "alice:transfer"]);
    }
}
