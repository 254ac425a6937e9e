// Serde helpers for numeric fields that browsers post as strings.
//
// Form inputs arrive as `"10"` just as often as `10`; both spellings are
// accepted wherever these helpers are used.

use std::fmt::Display;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
}

/// Deserialize a number that may be encoded as a JSON string.
pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match NumberOrText::<T>::deserialize(deserializer)? {
        NumberOrText::Number(v) => Ok(v),
        NumberOrText::Text(s) => s.trim().parse().map_err(D::Error::custom),
    }
}

/// Like [`number`], but `null` and blank strings become `None`.
pub fn option_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<NumberOrText<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(v)) => Ok(Some(v)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Form {
        #[serde(deserialize_with = "number")]
        count: usize,
        #[serde(default, deserialize_with = "option_number")]
        limit: Option<f64>,
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let a: Form = serde_json::from_str(r#"{"count": 10, "limit": 0.5}"#).unwrap();
        let b: Form = serde_json::from_str(r#"{"count": " 10 ", "limit": "0.5"}"#).unwrap();
        assert_eq!(a.count, 10);
        assert_eq!(b.count, 10);
        assert_eq!(a.limit, Some(0.5));
        assert_eq!(b.limit, Some(0.5));
    }

    #[test]
    fn blank_and_missing_optionals_are_none() {
        let a: Form = serde_json::from_str(r#"{"count": 1, "limit": ""}"#).unwrap();
        let b: Form = serde_json::from_str(r#"{"count": 1}"#).unwrap();
        let c: Form = serde_json::from_str(r#"{"count": 1, "limit": null}"#).unwrap();
        assert!(a.limit.is_none());
        assert!(b.limit.is_none());
        assert!(c.limit.is_none());
    }

    #[test]
    fn rejects_non_numeric_text() {
        let res: Result<Form, _> = serde_json::from_str(r#"{"count": "ten"}"#);
        assert!(res.is_err());
    }
}
