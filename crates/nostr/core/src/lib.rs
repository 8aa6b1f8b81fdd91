//! Nostr protocol types for the profile bootstrap client.
//!
//! This crate provides:
//! - NIP-01: Event structure and well-known kinds
//! - NIP-02: Follow List (Contact List) tag scanning
//! - NIP-19: bech32 `npub` decoding into raw public keys
//!
//! Signing and signature verification are intentionally absent; events are
//! handled as opaque records received from relays.

mod keys;
pub mod nip01;
pub mod nip02;
pub mod nip19;

pub use keys::{KeyError, PUBLIC_KEY_LEN, PublicKey};

// NIP-01: Basic protocol
pub use nip01::{
    Event, KIND_CONTACTS, KIND_METADATA, KIND_RECOMMEND_RELAY, KIND_SHORT_TEXT_NOTE,
    sort_chronologically,
};

// NIP-02: Follow List (Contact List and Petnames)
pub use nip02::{CONTACT_LIST_KIND, Contact, Nip02Error, PUBKEY_TAG, contacts};

// NIP-19: bech32-encoded entities
pub use nip19::{DecodeOptions, NPUB_PREFIX, Nip19Error, decode_npub};
