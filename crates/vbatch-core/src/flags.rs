//! Ordered tool flags and their single-string encoding.
//!
//! Flags cross process boundaries as one string: command-line words are
//! joined with `;`, and the `--unwindset` value is a `,`-joined list of
//! `loop:count` pairs. Decoding pairs each `--flag` with the following word
//! unless that word is itself a flag, so `--unwind;1;--trace` decodes to
//! `--unwind = 1` and a bare `--trace`. Insertion order is preserved in both
//! directions.
//!
//! JSON documents may also spell flags as an object, `{"--unwind": 1,
//! "--trace": null}`, with `--unwindset` given either as a string or as an
//! object of loop counts. Bare flags are `null` or `true`; `false` drops the
//! flag.

use crate::errors::ConfigError;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

pub const UNWINDSET: &str = "--unwindset";

const WORD_SEPARATOR: char = ';';
const PAIR_SEPARATOR: char = ',';
const COUNT_SEPARATOR: char = ':';

/// Flags the coverage phase must not pass to the checker.
pub const COVERAGE_INCOMPATIBLE: [&str; 3] = ["--unwinding-assertions", "--trace", "--stop-on-fail"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Int(i64),
    Text(String),
    Unwindset(Vec<(String, String)>),
}

impl FlagValue {
    fn from_word(word: &str) -> Self {
        match word.parse::<i64>() {
            Ok(n) => FlagValue::Int(n),
            Err(_) => FlagValue::Text(word.to_string()),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Int(n) => write!(f, "{}", n),
            FlagValue::Text(s) => write!(f, "{}", s),
            FlagValue::Unwindset(pairs) => {
                let joined = pairs
                    .iter()
                    .map(|(name, count)| format!("{}{}{}", name, COUNT_SEPARATOR, count))
                    .collect::<Vec<_>>()
                    .join(&PAIR_SEPARATOR.to_string());
                write!(f, "{}", joined)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct ToolFlags {
    entries: Vec<(String, Option<FlagValue>)>,
}

impl ToolFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim().trim_matches('=');
        if trimmed.is_empty() {
            return Ok(Self::new());
        }
        let words: Vec<String> = trimmed.split(WORD_SEPARATOR).map(str::to_string).collect();
        Self::from_words(&words).map_err(|reason| ConfigError::InvalidFlags {
            input: input.to_string(),
            reason,
        })
    }

    pub fn encode(&self) -> String {
        self.to_words().join(&WORD_SEPARATOR.to_string())
    }

    fn from_words(words: &[String]) -> Result<Self, String> {
        let mut flags = Self::new();
        let mut idx = 0;

        while idx < words.len() {
            let key = &words[idx];
            idx += 1;
            match words.get(idx) {
                Some(next) if !next.starts_with("--") => {
                    flags.insert(key, Some(FlagValue::from_word(next)));
                    idx += 1;
                }
                _ => flags.insert(key, None),
            }
        }

        if let Some(Some(raw)) = flags.get(UNWINDSET).cloned() {
            let pairs = parse_unwindset(&raw.to_string())?;
            flags.insert(UNWINDSET, Some(FlagValue::Unwindset(pairs)));
        }

        Ok(flags)
    }

    /// Words as they appear on the checker's command line.
    pub fn to_words(&self) -> Vec<String> {
        let mut words = Vec::with_capacity(self.entries.len() * 2);
        for (key, value) in &self.entries {
            words.push(key.clone());
            if let Some(value) = value {
                words.push(value.to_string());
            }
        }
        words
    }

    /// Sets `key`, keeping its original position when it is already present.
    pub fn insert(&mut self, key: &str, value: Option<FlagValue>) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Option<FlagValue>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<FlagValue>> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FlagValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn for_coverage(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !COVERAGE_INCOMPATIBLE.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }
}

fn parse_unwindset(raw: &str) -> Result<Vec<(String, String)>, String> {
    raw.split(PAIR_SEPARATOR)
        .map(|pair| {
            let mut parts = pair.split(COUNT_SEPARATOR);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(name), Some(count), None) if !name.is_empty() && !count.is_empty() => {
                    Ok((name.to_string(), count.to_string()))
                }
                _ => Err(format!(
                    "unwindset entry '{}' is not of the form loop:count",
                    pair
                )),
            }
        })
        .collect()
}

fn scalar_word(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_from_json(key: &str, value: Value) -> Result<Option<Option<FlagValue>>, String> {
    match value {
        Value::Null | Value::Bool(true) => Ok(Some(None)),
        Value::Bool(false) => Ok(None),
        Value::Object(counts) if key == UNWINDSET => counts
            .into_iter()
            .map(|(name, count)| {
                scalar_word(&count)
                    .map(|count| (name.clone(), count))
                    .ok_or_else(|| format!("unwindset count for '{}' must be a number or string", name))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|pairs| Some(Some(FlagValue::Unwindset(pairs)))),
        Value::String(raw) if key == UNWINDSET => {
            parse_unwindset(&raw).map(|pairs| Some(Some(FlagValue::Unwindset(pairs))))
        }
        other => scalar_word(&other)
            .map(|word| Some(Some(FlagValue::from_word(&word))))
            .ok_or_else(|| format!("value of '{}' must be a number, string, boolean or null", key)),
    }
}

struct ToolFlagsVisitor;

impl<'de> Visitor<'de> for ToolFlagsVisitor {
    type Value = ToolFlags;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a ';'-separated flag string or an object of flags")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<ToolFlags, E> {
        ToolFlags::decode(value).map_err(E::custom)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ToolFlags, A::Error> {
        let mut flags = ToolFlags::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            if let Some(value) = value_from_json(&key, value).map_err(de::Error::custom)? {
                flags.insert(&key, value);
            }
        }
        Ok(flags)
    }
}

impl<'de> Deserialize<'de> for ToolFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ToolFlagsVisitor)
    }
}

impl From<ToolFlags> for String {
    fn from(flags: ToolFlags) -> Self {
        flags.encode()
    }
}

impl fmt::Display for ToolFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pairs_values_with_flags() {
        let flags = ToolFlags::decode("--unwind;1;--bounds-check;--object-bits;8").unwrap();
        assert_eq!(flags.len(), 3);
        assert_eq!(flags.get("--unwind"), Some(&Some(FlagValue::Int(1))));
        assert_eq!(flags.get("--bounds-check"), Some(&None));
        assert_eq!(flags.get("--object-bits"), Some(&Some(FlagValue::Int(8))));
    }

    #[test]
    fn test_decode_trailing_flag_has_no_value() {
        let flags = ToolFlags::decode("--function;harness;--trace").unwrap();
        assert_eq!(
            flags.get("--function"),
            Some(&Some(FlagValue::Text("harness".into())))
        );
        assert_eq!(flags.get("--trace"), Some(&None));
    }

    #[test]
    fn test_decode_unwindset() {
        let flags = ToolFlags::decode("--unwindset;loop.0:3,other.1:10;--unwind;1").unwrap();
        assert_eq!(
            flags.get(UNWINDSET),
            Some(&Some(FlagValue::Unwindset(vec![
                ("loop.0".into(), "3".into()),
                ("other.1".into(), "10".into())
            ])))
        );
    }

    #[test]
    fn test_decode_rejects_malformed_unwindset() {
        let err = ToolFlags::decode("--unwindset;loop.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFlags { .. }));
        assert!(ToolFlags::decode("--unwindset;a:1:2").is_err());
    }

    #[test]
    fn test_decode_strips_equals_and_empty() {
        assert!(ToolFlags::decode("").unwrap().is_empty());
        let flags = ToolFlags::decode("=--unwind;2=").unwrap();
        assert_eq!(flags.get("--unwind"), Some(&Some(FlagValue::Int(2))));
    }

    #[test]
    fn test_encode_decode_roundtrip_preserves_order() {
        let encoded = "--z-flag;--unwindset;b:2,a:1;--unwind;5;--function;main";
        let flags = ToolFlags::decode(encoded).unwrap();
        assert_eq!(flags.encode(), encoded);
        assert_eq!(ToolFlags::decode(&flags.encode()).unwrap(), flags);
    }

    #[test]
    fn test_insert_keeps_position() {
        let mut flags = ToolFlags::decode("--a;1;--b;2").unwrap();
        flags.insert("--a", Some(FlagValue::Int(9)));
        flags.insert("--c", None);
        assert_eq!(flags.encode(), "--a;9;--b;2;--c");
        assert_eq!(flags.remove("--b"), Some(Some(FlagValue::Int(2))));
        assert_eq!(flags.encode(), "--a;9;--c");
    }

    #[test]
    fn test_for_coverage_drops_incompatible_flags() {
        let flags =
            ToolFlags::decode("--unwinding-assertions;--unwind;2;--trace;--stop-on-fail;--bounds-check")
                .unwrap();
        assert_eq!(flags.for_coverage().to_words(), vec!["--unwind", "2", "--bounds-check"]);
    }

    #[test]
    fn test_serde_uses_encoded_string() {
        let flags = ToolFlags::decode("--unwind;1").unwrap();
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "\"--unwind;1\"");
        let back: ToolFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }

    #[test]
    fn test_object_form_keeps_key_order() {
        let flags: ToolFlags = serde_json::from_str(
            r#"{"--unwind": 1, "--function": "harness", "--trace": null, "--bounds-check": true}"#,
        )
        .unwrap();
        assert_eq!(flags.encode(), "--unwind;1;--function;harness;--trace;--bounds-check");
        assert_eq!(flags.get("--unwind"), Some(&Some(FlagValue::Int(1))));
    }

    #[test]
    fn test_object_form_unwindset_and_disabled_flags() {
        let flags: ToolFlags = serde_json::from_str(
            r#"{"--unwindset": {"loop.0": 3, "other.1": "10"}, "--stop-on-fail": false}"#,
        )
        .unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(
            flags.get(UNWINDSET),
            Some(&Some(FlagValue::Unwindset(vec![
                ("loop.0".into(), "3".into()),
                ("other.1".into(), "10".into())
            ])))
        );

        let spelled: ToolFlags = serde_json::from_str(r#"{"--unwindset": "loop.0:3,other.1:10"}"#).unwrap();
        assert_eq!(spelled, flags);
    }

    #[test]
    fn test_object_form_rejects_nested_values() {
        assert!(serde_json::from_str::<ToolFlags>(r#"{"--unwind": [1, 2]}"#).is_err());
        assert!(serde_json::from_str::<ToolFlags>(r#"{"--unwindset": "loop.0"}"#).is_err());
        assert!(serde_json::from_str::<ToolFlags>("7").is_err());
    }
}
