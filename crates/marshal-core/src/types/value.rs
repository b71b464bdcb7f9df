//! Field values, rows and the loose equality rules shared by dirty
//! tracking and every lookup path.
//!
//! ## Coercion table
//!
//! | left / right        | result                                          |
//! |---------------------|-------------------------------------------------|
//! | null / null         | equal                                           |
//! | null / anything     | not equal (`0`, `""` and `false` included)      |
//! | numeric / numeric   | compared as numbers                             |
//! | array / array       | same length, element-wise loose equality        |
//! | anything else       | strict: same variant and same payload           |
//!
//! "Numeric" means an `Int`, a `Float`, or a `String` whose whole text
//! (surrounding whitespace aside) is a decimal number. This makes `"69"`
//! equal to `69` and also `"007"` equal to `7`, which can hide a real edit
//! of a zero-padded code.
//!
//! An integer and a float are equal only when the float holds exactly that
//! integer. Above 2^53 this means `9007199254740993` does not equal
//! `9007199254740992.0` even though the integer rounds to it. A `NaN` float
//! equals any other `NaN` so that it has a usable index key.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered mapping of field name to value: one raw row or one entity's data.
pub type Row = IndexMap<String, Value>;

// =============================================================================
// VALUE
// =============================================================================

/// A single field value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    /// Check if the value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Loose equality, see the module docs for the coercion table.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => match (self.numeric(), other.numeric()) {
                (Some(a), Some(b)) => a.same_number(b),
                _ => self == other,
            },
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Self::Int(i) => Some(Numeric::Int(*i)),
            Self::Float(f) => Some(Numeric::Float(*f)),
            Self::String(s) => parse_numeric(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// NUMERIC COERCION
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    /// Compare the way `key()` collapses: an `Int` and a `Float` match only
    /// when the float is exactly that integer, so `2^53 + 1` does not match
    /// the nearest float. `NaN` matches `NaN`.
    fn same_number(self, other: Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int(i), Self::Float(f)) | (Self::Float(f), Self::Int(i)) => {
                integral(f) == Some(i)
            }
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
        }
    }

    /// Integral numbers collapse to `Key::Int` so `1`, `1.0` and `"1"` share a key.
    fn key(self) -> Key {
        match self {
            Self::Int(i) => Key::Int(i),
            Self::Float(f) if f.is_nan() => Key::Float(f64::NAN.to_bits()),
            Self::Float(f) => integral(f).map_or(Key::Float(f.to_bits()), Key::Int),
        }
    }
}

/// The `i64` a float holds exactly, if any.
fn integral(f: f64) -> Option<i64> {
    let in_range = (i64::MIN as f64..i64::MAX as f64).contains(&f);
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// Parse a decimal number out of a string, rejecting `inf`, `NaN` and friends.
fn parse_numeric(s: &str) -> Option<Numeric> {
    let text = s.trim();
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if !digits
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Numeric::Int(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Numeric::Float)
}

// =============================================================================
// KEY
// =============================================================================

/// Hashable, ordered normalization of a `Value`.
///
/// Two values produce the same key exactly when they are `loose_eq`, so
/// the identity map and the secondary indexes can be keyed by `Key` and
/// still honor loose equality on lookup.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    /// Non-integral number, stored as its bit pattern.
    Float(u64),
    Str(String),
    Array(Vec<Key>),
}

impl Key {
    /// Convert back to a representative value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Float(bits) => Value::Float(f64::from_bits(*bits)),
            Self::Str(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_value).collect()),
        }
    }
}

impl From<&Value> for Key {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(i) => Self::Int(*i),
            Value::Float(f) => Numeric::Float(*f).key(),
            Value::String(s) => parse_numeric(s).map_or_else(|| Self::Str(s.clone()), Numeric::key),
            Value::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
        }
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::from(&Value::from(s))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_string_equals_integer() {
        assert!(Value::from("69").loose_eq(&Value::from(69)));
        assert!(Value::from(69).loose_eq(&Value::from("69")));
        assert!(Value::from("1.0").loose_eq(&Value::from(1)));
        assert!(Value::from(" 42").loose_eq(&Value::from(42)));
    }

    #[test]
    fn zero_padded_string_equals_integer() {
        // Surprising but intentional: "007" and 7 are the same number.
        assert!(Value::from("007").loose_eq(&Value::from(7)));
    }

    #[test]
    fn different_numbers_are_not_equal() {
        assert!(!Value::from("69").loose_eq(&Value::from(4.56)));
        assert!(!Value::from(1).loose_eq(&Value::from(2)));
    }

    #[test]
    fn null_only_equals_null() {
        assert!(Value::Null.loose_eq(&Value::Null));
        assert!(!Value::Null.loose_eq(&Value::from(0)));
        assert!(!Value::from(0).loose_eq(&Value::Null));
        assert!(!Value::Null.loose_eq(&Value::from("")));
        assert!(!Value::Null.loose_eq(&Value::from(false)));
    }

    #[test]
    fn non_numeric_strings_compare_strictly() {
        assert!(Value::from("abc").loose_eq(&Value::from("abc")));
        assert!(!Value::from("abc").loose_eq(&Value::from("ABC")));
        assert!(!Value::from("inf").loose_eq(&Value::from(f64::INFINITY)));
        assert!(!Value::from(true).loose_eq(&Value::from(1)));
    }

    #[test]
    fn arrays_compare_element_wise() {
        let a = Value::from(vec!["1", "2"]);
        let b = Value::from(vec![1, 2]);
        assert!(a.loose_eq(&b));
        assert!(!a.loose_eq(&Value::from(vec![1])));
    }

    #[test]
    fn key_agrees_with_loose_eq() {
        assert_eq!(Key::from(&Value::from("69")), Key::from(&Value::from(69)));
        assert_eq!(Key::from(&Value::from(2.0)), Key::Int(2));
        assert_ne!(Key::from(&Value::from("4.56")), Key::Int(4));
        assert_eq!(
            Key::from(&Value::from("4.56")),
            Key::from(&Value::from(4.56))
        );
        assert_ne!(Key::from(&Value::Null), Key::from(&Value::from(0)));
    }

    #[test]
    fn large_integers_do_not_round_to_floats() {
        let int = Value::Int(9_007_199_254_740_993);
        let float = Value::Float(9_007_199_254_740_992.0);
        assert!(!int.loose_eq(&float));
        assert!(!float.loose_eq(&int));
        assert_ne!(Key::from(&int), Key::from(&float));

        let exact = Value::Int(9_007_199_254_740_992);
        assert!(exact.loose_eq(&float));
        assert_eq!(Key::from(&exact), Key::from(&float));

        let text = Value::from("9007199254740993");
        assert!(text.loose_eq(&int));
        assert!(!text.loose_eq(&float));
    }

    #[test]
    fn nan_is_equal_to_nan_and_shares_its_key() {
        let nan = Value::Float(f64::NAN);
        let other_nan = Value::Float(f64::from_bits(f64::NAN.to_bits() | 1));
        assert!(nan.loose_eq(&nan));
        assert!(nan.loose_eq(&other_nan));
        assert_eq!(Key::from(&nan), Key::from(&other_nan));
        assert!(!nan.loose_eq(&Value::from(0)));
        assert_ne!(Key::from(&nan), Key::from(&Value::from(0)));
    }

    #[test]
    fn key_round_trips_to_value() {
        assert_eq!(Key::Int(5).to_value(), Value::Int(5));
        assert_eq!(Key::from("hello").to_value(), Value::from("hello"));
    }

    #[test]
    fn values_deserialize_untagged() {
        let row: Row =
            serde_json::from_str(r#"{"id": 1, "name": "a", "score": 1.5, "gone": null, "tags": [1, "x"]}"#)
                .expect("parse");
        assert_eq!(row["id"], Value::Int(1));
        assert_eq!(row["name"], Value::from("a"));
        assert_eq!(row["score"], Value::Float(1.5));
        assert!(row["gone"].is_null());
        assert_eq!(row["tags"], Value::Array(vec![Value::Int(1), Value::from("x")]));
        let keys: Vec<_> = row.keys().cloned().collect();
        assert_eq!(keys, vec!["id", "name", "score", "gone", "tags"]);
    }
}
