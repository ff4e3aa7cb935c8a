//! Output formatting for CLI results
//!
//! Plain text prints just the answer; JSON mirrors the response objects of the
//! HTTP front end this tool replaces: `{status, query, result, time}`.

use crate::error::PiError;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "not found")]
    NotFound,
    #[serde(rename = "error")]
    Error,
}

/// Result of a `find` request; `result` is -1 when nothing was found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindResponse {
    pub status: Status,
    pub query: String,
    pub result: i64,
    /// Seconds spent resolving
    pub time: f64,
}

impl FindResponse {
    pub fn new(query: &str, offset: Option<u64>, elapsed: Duration) -> Self {
        Self {
            status: if offset.is_some() {
                Status::Success
            } else {
                Status::NotFound
            },
            query: query.to_string(),
            result: offset.map(|o| o as i64).unwrap_or(-1),
            time: elapsed.as_secs_f64(),
        }
    }
}

/// Result of a `range` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeResponse {
    pub status: Status,
    pub query: [u64; 2],
    pub result: String,
    pub time: f64,
}

impl RangeResponse {
    pub fn new(start: u64, end: u64, digits: String, elapsed: Duration) -> Self {
        Self {
            status: Status::Success,
            query: [start, end],
            result: digits,
            time: elapsed.as_secs_f64(),
        }
    }
}

/// A rejected or failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: Status,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }
}

impl From<&PiError> for ErrorResponse {
    fn from(err: &PiError) -> Self {
        Self::new(err.to_string())
    }
}

/// Print a find result
pub fn write_find<W: Write>(out: &mut W, response: &FindResponse, json: bool) -> io::Result<()> {
    if json {
        return write_json(out, response);
    }
    match response.status {
        Status::Success => writeln!(out, "{}", response.result),
        _ => writeln!(out, "not found"),
    }
}

/// Print a range result
pub fn write_range<W: Write>(out: &mut W, response: &RangeResponse, json: bool) -> io::Result<()> {
    if json {
        return write_json(out, response);
    }
    writeln!(out, "{}", response.result)
}

/// Print an error; plain errors are left to the caller's error reporting
pub fn write_error<W: Write>(out: &mut W, response: &ErrorResponse) -> io::Result<()> {
    write_json(out, response)
}

fn write_json<W: Write>(out: &mut W, value: &impl Serialize) -> io::Result<()> {
    serde_json::to_writer(&mut *out, value).map_err(io::Error::from)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_json_shape() {
        let response = FindResponse::new("26535", Some(6), Duration::from_millis(250));
        let mut buf = Vec::new();
        write_find(&mut buf, &response, true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["query"], "26535");
        assert_eq!(value["result"], 6);
        assert_eq!(value["time"], 0.25);
    }

    #[test]
    fn test_not_found() {
        let response = FindResponse::new("99999", None, Duration::ZERO);
        assert_eq!(response.result, -1);

        let mut buf = Vec::new();
        write_find(&mut buf, &response, false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "not found\n");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "not found");
    }

    #[test]
    fn test_range_plain_and_json() {
        let response = RangeResponse::new(0, 6, "314159".to_string(), Duration::ZERO);

        let mut plain = Vec::new();
        write_range(&mut plain, &response, false).unwrap();
        assert_eq!(String::from_utf8(plain).unwrap(), "314159\n");

        let mut json = Vec::new();
        write_range(&mut json, &response, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["query"], serde_json::json!([0, 6]));
        assert_eq!(value["result"], "314159");
    }

    #[test]
    fn test_error_response_from_pi_error() {
        let err = PiError::Validation("query is empty".to_string());
        let response = ErrorResponse::from(&err);
        assert_eq!(response.status, Status::Error);
        assert!(response.message.contains("query is empty"));
    }
}
