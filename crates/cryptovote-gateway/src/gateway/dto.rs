//! JSON shapes of the HTTP API.

use cryptovote_core::proto::Cryptocurrency;
use serde::{Deserialize, Serialize};

/// A record as sent and received over HTTP.
///
/// Every field is optional on input; the server decides which ones matter for
/// the route.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoBody {
    pub id: String,
    pub name: String,
    pub description: String,
    pub upvote: u32,
    pub downvote: u32,
}

impl From<Cryptocurrency> for CryptoBody {
    fn from(value: Cryptocurrency) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            upvote: value.upvote,
            downvote: value.downvote,
        }
    }
}

impl From<CryptoBody> for Cryptocurrency {
    fn from(value: CryptoBody) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            upvote: value.upvote,
            downvote: value.downvote,
        }
    }
}

/// Success envelope: `{"result": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub result: T,
}

impl<T> Envelope<T> {
    pub const fn new(result: T) -> Self {
        Self { result }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteSum {
    pub votes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_default() {
        let body: CryptoBody = serde_json::from_value(json!({ "name": "Bitcoin" })).unwrap();
        assert_eq!(body.name, "Bitcoin");
        assert!(body.id.is_empty());
        assert!(body.description.is_empty());
        assert_eq!(body.upvote, 0);
    }

    #[test]
    fn envelope_wraps_result() {
        let value = serde_json::to_value(Envelope::new(VoteSum { votes: -3 })).unwrap();
        assert_eq!(value, json!({ "result": { "votes": -3 } }));
    }
}
