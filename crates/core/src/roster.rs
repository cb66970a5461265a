//! Roster of messaging counterparts and their unread markers.
//!
//! A student's roster is their assigned mentor; a mentor's roster is the
//! list of mentees. Entries come from the platform API and are replaced on
//! refresh, while unread markers live in a side map keyed by user ID so
//! they survive both roster refreshes and counterpart switches.

use crate::chat::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A user the local user can message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterpart {
    /// Platform user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Avatar image reference, if the user has one.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the mentoring relationship has been approved. Messaging an
    /// unapproved counterpart is rejected before any transport call.
    pub approved: bool,
}

impl Counterpart {
    /// Create a counterpart with just an ID, name and approval flag.
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, approved: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: String::new(),
            avatar: None,
            approved,
        }
    }
}

/// One roster row joined with its unread marker.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    /// The counterpart.
    pub counterpart: Counterpart,
    /// Messages received from this user while their conversation was not
    /// active.
    pub unread: u32,
}

/// In-session container for counterparts and unread markers.
#[derive(Debug, Default)]
pub struct Roster {
    entries: Vec<Counterpart>,
    unread: HashMap<UserId, u32>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry list with fresh API data. Unread markers are kept;
    /// they belong to the session, not to any one fetch.
    pub fn replace_entries(&mut self, entries: Vec<Counterpart>) {
        tracing::debug!(count = entries.len(), "roster replaced");
        self.entries = entries;
    }

    /// Find a counterpart by ID.
    pub fn get(&self, id: &UserId) -> Option<&Counterpart> {
        self.entries.iter().find(|c| c.id == *id)
    }

    /// Whether messaging with the given user is approved.
    pub fn is_approved(&self, id: &UserId) -> bool {
        self.get(id).map(|c| c.approved).unwrap_or(false)
    }

    /// Bump the unread marker for a user and return the new count. The user
    /// does not have to be in the entry list yet; a marker recorded before
    /// the roster catches up is shown once it does.
    pub fn mark_unread(&mut self, id: &UserId) -> u32 {
        let count = self.unread.entry(id.clone()).or_insert(0);
        *count += 1;
        *count
    }

    /// Clear the unread marker for a user. Returns true if there was one.
    pub fn clear_unread(&mut self, id: &UserId) -> bool {
        self.unread.remove(id).map(|c| c > 0).unwrap_or(false)
    }

    /// Current unread count for a user.
    pub fn unread_count(&self, id: &UserId) -> u32 {
        self.unread.get(id).copied().unwrap_or(0)
    }

    /// Sum of unread markers across all users.
    pub fn total_unread(&self) -> u32 {
        self.unread.values().sum()
    }

    /// All roster rows joined with their unread markers.
    pub fn entries(&self) -> Vec<RosterEntry> {
        self.entries
            .iter()
            .map(|c| RosterEntry {
                counterpart: c.clone(),
                unread: self.unread_count(&c.id),
            })
            .collect()
    }

    /// Number of counterparts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster has no counterparts.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_approval() {
        let mut roster = Roster::new();
        roster.replace_entries(vec![
            Counterpart::new("mentor-1", "Dana", true),
            Counterpart::new("mentor-2", "Lee", false),
        ]);

        assert_eq!(roster.len(), 2);
        assert!(roster.is_approved(&"mentor-1".into()));
        assert!(!roster.is_approved(&"mentor-2".into()));
        assert!(!roster.is_approved(&"stranger".into()));
        assert_eq!(roster.get(&"mentor-2".into()).unwrap().name, "Lee");
    }

    #[test]
    fn test_unread_markers() {
        let mut roster = Roster::new();
        roster.replace_entries(vec![Counterpart::new("mentor-1", "Dana", true)]);

        assert_eq!(roster.mark_unread(&"mentor-1".into()), 1);
        assert_eq!(roster.mark_unread(&"mentor-1".into()), 2);
        assert_eq!(roster.unread_count(&"mentor-1".into()), 2);

        assert!(roster.clear_unread(&"mentor-1".into()));
        assert_eq!(roster.unread_count(&"mentor-1".into()), 0);
        assert!(!roster.clear_unread(&"mentor-1".into()));
    }

    #[test]
    fn test_unread_survives_roster_refresh() {
        let mut roster = Roster::new();
        roster.replace_entries(vec![Counterpart::new("student-7", "Ana", true)]);
        roster.mark_unread(&"student-7".into());

        roster.replace_entries(vec![
            Counterpart::new("student-7", "Ana", true),
            Counterpart::new("student-8", "Ben", true),
        ]);

        assert_eq!(roster.unread_count(&"student-7".into()), 1);
        let entries = roster.entries();
        assert_eq!(entries[0].unread, 1);
        assert_eq!(entries[1].unread, 0);
    }

    #[test]
    fn test_unread_for_user_not_yet_listed() {
        let mut roster = Roster::new();
        roster.mark_unread(&"student-9".into());
        assert_eq!(roster.unread_count(&"student-9".into()), 1);
        assert_eq!(roster.total_unread(), 1);

        roster.replace_entries(vec![Counterpart::new("student-9", "Kim", true)]);
        assert_eq!(roster.entries()[0].unread, 1);
    }
}
