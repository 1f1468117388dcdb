use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One raw or formatted row, field name to value.
pub type Record = BTreeMap<String, Field>;

/// Lookup from a field's string form to another field's value.
pub type RefTable = HashMap<String, Field>;

pub const TOPICS_FILE: &str = "topics.json";
pub const USERS_FILE: &str = "users.json";
pub const ARTICLES_FILE: &str = "articles.json";
pub const COMMENTS_FILE: &str = "comments.json";

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(DateTime<Utc>),
}

impl Field {
    pub fn is_truthy(&self) -> bool {
        match self {
            Field::Null => false,
            Field::Bool(b) => *b,
            Field::Integer(n) => *n != 0,
            Field::Float(f) => *f != 0.0 && !f.is_nan(),
            Field::Text(s) => !s.is_empty(),
            Field::Date(_) => true,
        }
    }

    /// String form used as a [`RefTable`] key.
    pub fn key(&self) -> String {
        match self {
            Field::Null => "null".to_string(),
            Field::Bool(b) => b.to_string(),
            Field::Integer(n) => n.to_string(),
            Field::Float(f) => f.to_string(),
            Field::Text(s) => s.clone(),
            Field::Date(d) => d.to_rfc3339(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Field::Integer(n) => Some(*n),
            Field::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Field::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Field::Null,
            Value::Bool(b) => Field::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Field::Integer(i),
                None => Field::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Field::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => Field::Text(nested.to_string()),
        }
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Text(s.to_string())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Text(s)
    }
}

impl From<i64> for Field {
    fn from(n: i64) -> Self {
        Field::Integer(n)
    }
}

impl From<i32> for Field {
    fn from(n: i32) -> Self {
        Field::Integer(n.into())
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Field::from)
    }
}
