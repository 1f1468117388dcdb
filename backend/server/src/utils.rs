//! Request payload checks.
//!
//! Each check either hands back exactly what it was given or rejects with a
//! fixed status and message. Nothing here touches the database.
use std::sync::LazyLock;

use axum::{body::Bytes, http::StatusCode};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::AppError;

pub type Payload = Map<String, Value>;

pub const INVALID_ARTICLE_ID: &str = "Invalid Article ID: please try again";
pub const INVALID_COMMENT_ID: &str = "Comment ID can only be in number format!";
pub const COMMENT_SHAPE: &str = r#"Comment body must be: {username: "test-username", body:"test-body"}"#;
pub const VOTES_SHAPE: &str =
    "The request body must be structured as follows: { inc_votes: number_of_votes }";
pub const VOTES_NOT_INTEGER: &str = "Votes must be an number!";
pub const ARTICLE_SHAPE: &str =
    "Article missing required information, or information inputted incorrectly";
pub const TOPIC_SHAPE: &str = "Topic missing required fields, empty or incorrect";

const ARTICLE_REQUIRED: [&str; 4] = ["author", "title", "body", "topic"];
const ARTICLE_ALLOWED: [&str; 5] = ["author", "title", "body", "topic", "article_img_url"];

static NON_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9]").expect("valid regex"));

pub fn parse_payload(bytes: &Bytes) -> Result<Payload, AppError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(AppError::MalformedPayload),
    }
}

pub fn check_article_id(article_id: &str) -> Result<&str, AppError> {
    if NON_DIGIT.is_match(article_id) {
        return Err(AppError::bad_request(INVALID_ARTICLE_ID));
    }

    Ok(article_id)
}

pub fn validate_comment(comment_id: &str) -> Result<&str, AppError> {
    if NON_DIGIT.is_match(comment_id) {
        return Err(AppError::bad_request(INVALID_COMMENT_ID));
    }

    Ok(comment_id)
}

/// Missing both fields is rejected first, then anything that is not exactly
/// two fields. A payload with only one of the two plus some other key gets
/// through both branches.
pub fn check_new_comment(new_comment: &Payload) -> Result<&Payload, AppError> {
    if !new_comment.contains_key("username") && !new_comment.contains_key("body") {
        return Err(AppError::bad_request(COMMENT_SHAPE));
    }

    if new_comment.len() != 2 {
        return Err(AppError::bad_request(COMMENT_SHAPE));
    }

    Ok(new_comment)
}

pub fn check_votes(votes: &Payload) -> Result<&Payload, AppError> {
    let inc_votes = match votes.get("inc_votes") {
        Some(value) if is_truthy(value) => value,
        _ => return Err(AppError::bad_request(VOTES_SHAPE)),
    };

    if !is_integer(inc_votes) {
        return Err(AppError::unprocessable(VOTES_NOT_INTEGER));
    }

    if votes.len() > 1 {
        return Err(AppError::unprocessable(VOTES_SHAPE));
    }

    Ok(votes)
}

pub fn check_new_article(new_article: &Payload) -> Result<&Payload, AppError> {
    let missing = ARTICLE_REQUIRED
        .iter()
        .any(|field| !new_article.contains_key(*field));

    let extra = new_article
        .keys()
        .any(|field| !ARTICLE_ALLOWED.contains(&field.as_str()));

    if missing || extra {
        return Err(AppError::bad_request(ARTICLE_SHAPE));
    }

    Ok(new_article)
}

pub fn check_new_topic(new_topic: &Payload) -> Result<&Payload, AppError> {
    if new_topic.len() > 2 {
        return Err(topic_rejection());
    }

    if !new_topic.contains_key("slug") && !new_topic.contains_key("description") {
        return Err(topic_rejection());
    }

    Ok(new_topic)
}

pub fn topic_rejection() -> AppError {
    AppError::Rejected {
        status: StatusCode::NOT_FOUND,
        msg: TOPIC_SHAPE,
    }
}

/// JSON falsiness: null, false, zero and the empty string.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Any finite JSON number without a fractional part, however large.
pub fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Whole JSON numbers, `5` and `5.0` alike, that fit in an `i64`.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

/// Parses an id that already passed a digit check into a database key.
pub fn parse_id(id: &str, msg: &'static str) -> Result<i32, AppError> {
    id.parse().map_err(|_| AppError::bad_request(msg))
}

pub fn get_str<'a>(payload: &'a Payload, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(Value::as_str)
}

/// Absent or null reads as `None`, any other non-string is rejected.
pub fn get_optional_str<'a>(
    payload: &'a Payload,
    field: &str,
    rejection: impl FnOnce() -> AppError,
) -> Result<Option<&'a str>, AppError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(rejection()),
    }
}
