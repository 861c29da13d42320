//! # Vote Entity Types
//!
//! The record the service stores and broadcasts, its identifier, and the
//! conversions to and from the generated protobuf messages.
//!
//! ## Identifiers
//!
//! [`CryptoId`] is a 12-byte identifier rendered as 24 lowercase hex
//! characters:
//!
//! | bytes | content                                   |
//! |-------|-------------------------------------------|
//! | 0..4  | seconds since the Unix epoch, big-endian  |
//! | 4..9  | random value fixed for the process        |
//! | 9..12 | per-process counter, big-endian           |
//!
//! Identifiers minted by one process therefore sort in creation order, which
//! the in-memory store relies on for `ReadAllCrypto`.

use crate::{Error, Result, proto};
use core::fmt;
use core::str::FromStr;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of raw bytes in a [`CryptoId`].
pub const CRYPTO_ID_LEN: usize = 12;

const COUNTER_MASK: u32 = 0x00ff_ffff;

static PROCESS_UNIQUE: LazyLock<[u8; 5]> = LazyLock::new(rand::random::<[u8; 5]>);
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Opaque, time-ordered identifier of a [`Crypto`] record.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CryptoId([u8; CRYPTO_ID_LEN]);

impl CryptoId {
    /// Mints a fresh identifier.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0_u8; CRYPTO_ID_LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; CRYPTO_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; CRYPTO_ID_LEN] {
        &self.0
    }

    /// Seconds since the Unix epoch at which the identifier was minted.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl FromStr for CryptoId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidId { id: s.to_string() };

        if s.len() != CRYPTO_ID_LEN * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = [0_u8; CRYPTO_ID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for CryptoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CryptoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CryptoId({self})")
    }
}

/// Which vote counter a mutation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteCounter {
    Upvotes,
    Downvotes,
}

impl fmt::Display for VoteCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteCounter::Upvotes => write!(f, "upvotes"),
            VoteCounter::Downvotes => write!(f, "downvotes"),
        }
    }
}

/// A votable cryptocurrency record.
///
/// Values travel through the broadcast path by copy: every subscriber
/// receives its own clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Crypto {
    pub id: CryptoId,
    pub name: String,
    pub description: String,
    pub upvotes: u32,
    pub downvotes: u32,
}

impl Crypto {
    /// A new record with both counters at zero.
    pub fn new(id: CryptoId, draft: CryptoDraft) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            upvotes: 0,
            downvotes: 0,
        }
    }

    /// `upvotes - downvotes`. Never stored.
    pub fn vote_sum(&self) -> i64 {
        i64::from(self.upvotes) - i64::from(self.downvotes)
    }

    /// Adds `delta` to one counter, saturating at zero and `u32::MAX`.
    pub fn apply_vote(&mut self, counter: VoteCounter, delta: i32) {
        let slot = match counter {
            VoteCounter::Upvotes => &mut self.upvotes,
            VoteCounter::Downvotes => &mut self.downvotes,
        };
        *slot = slot.saturating_add_signed(delta);
    }
}

/// The client-editable fields of a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CryptoDraft {
    pub name: String,
    pub description: String,
}

impl CryptoDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Rejects blank names or descriptions.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.description.trim().is_empty() {
            return Err(Error::EmptyFields);
        }
        Ok(())
    }
}

impl From<proto::Cryptocurrency> for CryptoDraft {
    fn from(value: proto::Cryptocurrency) -> Self {
        Self {
            name: value.name,
            description: value.description,
        }
    }
}

impl From<Crypto> for proto::Cryptocurrency {
    fn from(value: Crypto) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            description: value.description,
            upvote: value.upvotes,
            downvote: value.downvotes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_renders_as_24_lowercase_hex_chars() {
        let id = CryptoId::generate();
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 24);
        assert!(
            rendered
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
        assert_eq!(rendered.parse::<CryptoId>(), Ok(id));
    }

    #[test]
    fn parse_accepts_uppercase_hex() {
        let id: CryptoId = "6037662306086867038F7B1D".parse().unwrap();
        assert_eq!(id.to_string(), "6037662306086867038f7b1d");
        assert_eq!(id.timestamp(), 0x6037_6623);
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        for bad in [
            "",
            "abc",
            "6037662306086867038f7b1",
            "zz37662306086867038f7b1d",
            "+f37662306086867038f7b1d",
        ] {
            assert_eq!(
                bad.parse::<CryptoId>(),
                Err(Error::InvalidId { id: bad.to_string() }),
                "{bad:?} should be rejected"
            );
        }
        // 24 bytes, but not 24 hex digits.
        assert!("éé37662306086867038f7b".parse::<CryptoId>().is_err());
    }

    #[test]
    fn generated_ids_sort_in_creation_order() {
        let ids: Vec<_> = (0..1000).map(|_| CryptoId::generate()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn vote_sum_may_go_negative() {
        let mut crypto = Crypto::new(CryptoId::generate(), CryptoDraft::new("Doge", "Wow"));
        crypto.apply_vote(VoteCounter::Upvotes, 1);
        crypto.apply_vote(VoteCounter::Downvotes, 3);
        assert_eq!(crypto.vote_sum(), -2);
    }

    #[test]
    fn counters_never_drop_below_zero() {
        let mut crypto = Crypto::new(CryptoId::generate(), CryptoDraft::new("Doge", "Wow"));
        crypto.apply_vote(VoteCounter::Upvotes, -5);
        assert_eq!(crypto.upvotes, 0);
    }

    #[test]
    fn draft_validation_rejects_blank_fields() {
        assert_eq!(CryptoDraft::new("", "x").validate(), Err(Error::EmptyFields));
        assert_eq!(CryptoDraft::new("x", "  ").validate(), Err(Error::EmptyFields));
        assert!(CryptoDraft::new("Bitcoin", "Digital gold").validate().is_ok());
    }
}
