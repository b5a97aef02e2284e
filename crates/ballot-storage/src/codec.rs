//! Conversion between [`Poll`] and its stored tuple.
//!
//! Decoding is strict: a field with the wrong type fails the whole record.
//! Nothing is defaulted or coerced, so a bad row surfaces as a
//! [`DecodeError`] instead of turning into a poll with silently missing data.

use std::collections::BTreeMap;

use ballot_core::Poll;
use serde_json::{Map, Value};

use crate::error::{DecodeError, json_kind};

/// Number of fields in a poll tuple.
pub const POLL_ARITY: usize = 7;

/// Field positions inside a poll tuple.
pub mod field {
    pub const ID: usize = 0;
    pub const TITLE: usize = 1;
    pub const OPTIONS: usize = 2;
    pub const CREATED_BY: usize = 3;
    pub const CREATED_AT: usize = 4;
    pub const IS_ACTIVE: usize = 5;
    pub const VOTES: usize = 6;
}

/// Encodes a poll as its 7-field tuple.
pub fn encode(poll: &Poll) -> Value {
    let options = poll.options.iter().cloned().map(Value::String).collect();
    let votes: Map<String, Value> = poll
        .votes
        .iter()
        .map(|(user, option)| (user.clone(), Value::String(option.clone())))
        .collect();

    Value::Array(vec![
        Value::String(poll.id.clone()),
        Value::String(poll.title.clone()),
        Value::Array(options),
        Value::String(poll.created_by.clone()),
        Value::from(poll.created_at),
        Value::Bool(poll.is_active),
        Value::Object(votes),
    ])
}

/// Decodes a stored tuple into a poll.
pub fn decode(tuple: &Value) -> Result<Poll, DecodeError> {
    let fields = tuple.as_array().ok_or(DecodeError::NotATuple {
        found: json_kind(tuple),
    })?;

    if fields.len() != POLL_ARITY {
        return Err(DecodeError::Arity {
            expected: POLL_ARITY,
            found: fields.len(),
        });
    }

    Ok(Poll {
        id: string_field(&fields[field::ID], "id")?,
        title: string_field(&fields[field::TITLE], "title")?,
        options: options_field(&fields[field::OPTIONS])?,
        created_by: string_field(&fields[field::CREATED_BY], "created_by")?,
        created_at: fields[field::CREATED_AT]
            .as_u64()
            .ok_or_else(|| DecodeError::field_type("created_at", "u64", &fields[field::CREATED_AT]))?,
        is_active: fields[field::IS_ACTIVE]
            .as_bool()
            .ok_or_else(|| DecodeError::field_type("is_active", "bool", &fields[field::IS_ACTIVE]))?,
        votes: votes_field(&fields[field::VOTES])?,
    })
}

/// Reads the primary key of any tuple without decoding the rest.
pub fn tuple_key(tuple: &Value) -> Option<&str> {
    tuple.get(field::ID).and_then(Value::as_str)
}

fn string_field(value: &Value, name: &str) -> Result<String, DecodeError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| DecodeError::field_type(name, "string", value))
}

fn options_field(value: &Value) -> Result<Vec<String>, DecodeError> {
    let items = value
        .as_array()
        .ok_or_else(|| DecodeError::field_type("options", "array<string>", value))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| string_field(item, &format!("options[{i}]")))
        .collect()
}

fn votes_field(value: &Value) -> Result<BTreeMap<String, String>, DecodeError> {
    let entries = value
        .as_object()
        .ok_or_else(|| DecodeError::field_type("votes", "map<string,string>", value))?;

    entries
        .iter()
        .map(|(user, option)| {
            let option = string_field(option, &format!("votes[{user}]"))?;
            Ok((user.clone(), option))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Poll {
        let mut poll = Poll::new(
            "p-1",
            "Favorite color?",
            vec!["Red".into(), "Green".into(), "Blue".into()],
            "alice",
            1_700_000_000,
        );
        poll.votes.insert("bob".into(), "Red".into());
        poll
    }

    #[test]
    fn test_encode_layout() {
        let tuple = encode(&sample());
        assert_eq!(
            tuple,
            json!([
                "p-1",
                "Favorite color?",
                ["Red", "Green", "Blue"],
                "alice",
                1_700_000_000u64,
                true,
                {"bob": "Red"}
            ])
        );
    }

    #[test]
    fn test_decode_encoded_tuple() {
        let poll = sample();
        assert_eq!(decode(&encode(&poll)).unwrap(), poll);
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let err = decode(&json!({"id": "p-1"})).unwrap_err();
        assert_eq!(err, DecodeError::NotATuple { found: "map" });
    }

    #[test]
    fn test_decode_rejects_wrong_arity() {
        let err = decode(&json!(["p-1", "t", [], "alice", 1, true])).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Arity {
                expected: 7,
                found: 6
            }
        );

        let err = decode(&json!(["p-1", "t", [], "alice", 1, true, {}, "extra"])).unwrap_err();
        assert!(matches!(err, DecodeError::Arity { found: 8, .. }));
    }

    #[test]
    fn test_decode_rejects_non_string_option() {
        let err = decode(&json!(["p-1", "t", ["A", 2], "alice", 1, true, {}])).unwrap_err();
        assert_eq!(
            err,
            DecodeError::FieldType {
                field: "options[1]".into(),
                expected: "string",
                found: "unsigned integer"
            }
        );
    }

    #[test]
    fn test_decode_rejects_signed_or_float_timestamp() {
        let err = decode(&json!(["p-1", "t", ["A", "B"], "alice", -5, true, {}])).unwrap_err();
        assert!(matches!(err, DecodeError::FieldType { ref field, .. } if field == "created_at"));

        let err = decode(&json!(["p-1", "t", ["A", "B"], "alice", 1.5, true, {}])).unwrap_err();
        assert!(matches!(err, DecodeError::FieldType { found: "float", .. }));
    }

    #[test]
    fn test_decode_does_not_coerce_flag() {
        let err = decode(&json!(["p-1", "t", ["A", "B"], "alice", 1, "true", {}])).unwrap_err();
        assert!(matches!(err, DecodeError::FieldType { ref field, .. } if field == "is_active"));
    }

    #[test]
    fn test_decode_rejects_bad_vote_value() {
        let err = decode(&json!(["p-1", "t", ["A", "B"], "alice", 1, true, {"bob": 1}])).unwrap_err();
        assert_eq!(
            err,
            DecodeError::FieldType {
                field: "votes[bob]".into(),
                expected: "string",
                found: "unsigned integer"
            }
        );
    }

    #[test]
    fn test_decode_rejects_null_votes() {
        let err = decode(&json!(["p-1", "t", ["A", "B"], "alice", 1, true, null])).unwrap_err();
        assert!(matches!(err, DecodeError::FieldType { found: "null", .. }));
    }

    #[test]
    fn test_tuple_key() {
        assert_eq!(tuple_key(&json!(["k", 1])), Some("k"));
        assert_eq!(tuple_key(&json!([1, "k"])), None);
        assert_eq!(tuple_key(&json!("k")), None);
    }
}
