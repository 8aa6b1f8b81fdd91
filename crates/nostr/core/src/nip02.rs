//! NIP-02: Follow List (Contact List and Petnames)
//!
//! Defines how users publish their follow/contact lists as kind 3 events.
//! Each followed profile is represented by a "p" tag with optional relay URL and petname.
//!
//! See: <https://github.com/nostr-protocol/nips/blob/master/02.md>

use crate::Event;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event kind for contact lists (follow lists)
pub const CONTACT_LIST_KIND: u16 = 3;

/// Tag name for participant (pubkey) references
pub const PUBKEY_TAG: &str = "p";

/// Errors that can occur during NIP-02 operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Nip02Error {
    #[error("invalid p-tag format: {0}")]
    InvalidPTag(String),
}

/// A single contact in a follow list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// The public key of the followed profile (32-byte hex)
    pub pubkey: String,

    /// Optional relay URL where this profile can be found
    pub relay_url: Option<String>,

    /// Optional local petname for this contact
    pub petname: Option<String>,
}

impl Contact {
    /// Parse a contact from a p-tag array
    pub fn from_tag(tag: &[String]) -> Result<Self, Nip02Error> {
        if tag.first().map(String::as_str) != Some(PUBKEY_TAG) {
            return Err(Nip02Error::InvalidPTag(
                "tag must start with 'p'".to_string(),
            ));
        }

        let pubkey = tag.get(1).ok_or_else(|| {
            Nip02Error::InvalidPTag("p-tag must have at least pubkey".to_string())
        })?;

        let non_empty = |i: usize| tag.get(i).filter(|s| !s.is_empty()).cloned();

        Ok(Self {
            pubkey: pubkey.clone(),
            relay_url: non_empty(2),
            petname: non_empty(3),
        })
    }
}

/// Contacts referenced by an event's "p" tags, in tag order.
///
/// Tags named "p" without a value are skipped. The event kind is not checked:
/// callers scanning relay results take whatever the relay returned.
pub fn contacts(event: &Event) -> Vec<Contact> {
    event
        .tags()
        .iter()
        .filter_map(|tag| Contact::from_tag(tag).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_contact_from_tag_minimal() {
        let contact = Contact::from_tag(&tag(&["p", "abc"])).unwrap();
        assert_eq!(contact.pubkey, "abc");
        assert_eq!(contact.relay_url, None);
        assert_eq!(contact.petname, None);
    }

    #[test]
    fn test_contact_from_tag_full() {
        let contact =
            Contact::from_tag(&tag(&["p", "abc", "wss://relay.example.com", "alice"])).unwrap();
        assert_eq!(contact.relay_url.as_deref(), Some("wss://relay.example.com"));
        assert_eq!(contact.petname.as_deref(), Some("alice"));
    }

    #[test]
    fn test_contact_from_tag_empty_relay() {
        let contact = Contact::from_tag(&tag(&["p", "abc", "", "bob"])).unwrap();
        assert_eq!(contact.relay_url, None);
        assert_eq!(contact.petname.as_deref(), Some("bob"));
    }

    #[test]
    fn test_contact_from_tag_errors() {
        assert!(Contact::from_tag(&tag(&["e", "abc"])).is_err());
        assert!(Contact::from_tag(&tag(&["p"])).is_err());
        assert!(Contact::from_tag(&[]).is_err());
    }

    #[test]
    fn test_contacts_skips_other_and_malformed_tags() {
        let event = Event {
            id: "id".to_string(),
            pubkey: "author".to_string(),
            created_at: Some(1),
            kind: CONTACT_LIST_KIND,
            tags: Some(vec![
                tag(&["p", "one"]),
                tag(&["e", "note"]),
                tag(&["p"]),
                tag(&["p", "two", "wss://relay"]),
            ]),
            ..Default::default()
        };

        let pubkeys: Vec<String> = contacts(&event).into_iter().map(|c| c.pubkey).collect();
        assert_eq!(pubkeys, vec!["one".to_string(), "two".to_string()]);
    }
}
