//! NIP-01: Basic protocol flow description.
//!
//! This module implements the event structure as it arrives from relays:
//! - Event structure (id, pubkey, created_at, kind, tags, content, sig)
//! - Well-known kinds used by the bootstrap client
//! - Chronological ordering helpers
//!
//! Signing and verification are not performed here; events are treated as
//! opaque, already-signed records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User metadata (profile) events.
pub const KIND_METADATA: u16 = 0;
pub const KIND_SHORT_TEXT_NOTE: u16 = 1;
pub const KIND_RECOMMEND_RELAY: u16 = 2;
/// Follow list (contact list) events. See [`crate::nip02`].
pub const KIND_CONTACTS: u16 = 3;

/// A signed Nostr event.
///
/// Relays occasionally omit fields on malformed events. `id`, `pubkey` and
/// `kind` are required; the other NIP-01 fields are kept as `None` when
/// absent and are not written back. Members this type does not model land in
/// `extra`, so a record re-serializes with everything it arrived with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 32-bytes lowercase hex-encoded sha256 of the serialized event data
    pub id: String,
    /// 32-bytes lowercase hex-encoded public key of the event creator
    pub pubkey: String,
    /// Unix timestamp in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Event kind (integer between 0 and 65535)
    pub kind: u16,
    /// Array of arrays of strings (tags)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Vec<String>>>,
    /// Arbitrary string content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// 64-bytes lowercase hex signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Timestamp used for ordering; a missing `created_at` counts as 0.
    pub fn created_at(&self) -> i64 {
        self.created_at.unwrap_or(0)
    }

    pub fn tags(&self) -> &[Vec<String>] {
        self.tags.as_deref().unwrap_or_default()
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Iterate over the values of every tag named `name`.
    ///
    /// The value is the second element of the tag array; tags with only a
    /// name are skipped.
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags()
            .iter()
            .filter(move |tag| tag.first().is_some_and(|n| n == name))
            .filter_map(|tag| tag.get(1).map(String::as_str))
    }
}

/// Sort events oldest first.
///
/// The sort is stable, so events sharing a timestamp keep their relative order.
pub fn sort_chronologically(events: &mut [Event]) {
    events.sort_by_key(Event::created_at);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, created_at: i64) -> Event {
        Event {
            id: id.to_string(),
            pubkey: "pk".to_string(),
            created_at: Some(created_at),
            kind: KIND_METADATA,
            ..Default::default()
        }
    }

    #[test]
    fn test_deserialize_full_event() {
        let json = r#"{"id":"abc","pubkey":"pk","created_at":123,"kind":3,"tags":[["p","def"]],"content":"","sig":"sig"}"#;
        let event: Event = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "abc");
        assert_eq!(event.created_at(), 123);
        assert_eq!(event.kind, KIND_CONTACTS);
        assert_eq!(event.tags(), &[vec!["p".to_string(), "def".to_string()]]);
        assert!(event.extra.is_empty());
    }

    #[test]
    fn test_missing_created_at_defaults_to_zero() {
        let json = r#"{"id":"abc","pubkey":"pk","kind":0}"#;
        let event: Event = serde_json::from_str(json).unwrap();

        assert_eq!(event.created_at, None);
        assert_eq!(event.created_at(), 0);
        assert!(event.tags().is_empty());
        assert!(event.content().is_empty());
    }

    #[test]
    fn test_reserialize_keeps_unknown_and_omits_missing() {
        let json = r#"{"id":"abc","pubkey":"pk","kind":0,"content":"hi","relay_hint":"wss://r","seen":[1,2]}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.extra.get("relay_hint"), Some(&Value::from("wss://r")));

        let written = serde_json::to_string(&event).unwrap();
        assert_eq!(written, json);
        assert!(!written.contains("\"sig\""));
        assert!(!written.contains("created_at"));
    }

    #[test]
    fn test_reserialize_full_event_unchanged() {
        let json = r#"{"id":"abc","pubkey":"pk","created_at":0,"kind":1,"tags":[],"content":"","sig":""}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&event).unwrap(), json);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let json = r#"{"pubkey":"pk","created_at":1,"kind":0}"#;
        assert!(serde_json::from_str::<Event>(json).is_err());
    }

    #[test]
    fn test_negative_timestamp() {
        let json = r#"{"id":"abc","pubkey":"pk","created_at":-5,"kind":0}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.created_at(), -5);
    }

    #[test]
    fn test_tag_values() {
        let mut event = event("a", 1);
        event.tags = Some(vec![
            vec!["p".to_string(), "one".to_string()],
            vec!["e".to_string(), "note".to_string()],
            vec!["p".to_string()],
            vec!["p".to_string(), "two".to_string(), "wss://relay".to_string()],
        ]);

        let values: Vec<&str> = event.tag_values("p").collect();
        assert_eq!(values, vec!["one", "two"]);
    }

    #[test]
    fn test_sort_chronologically_is_stable() {
        let mut events = vec![event("c", 30), event("a", 10), event("b1", 20), event("b2", 20)];
        sort_chronologically(&mut events);

        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b1", "b2", "c"]);
    }
}
