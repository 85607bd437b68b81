//! RESP (Redis Serialization Protocol) Reply Types
//!
//! This module defines the values the server writes back to clients.
//!
//! ## Protocol Format
//!
//! Each RESP type starts with a type prefix byte. The server understands the
//! full set of prefixes below but only produces `+`, `-`, `$` and `*`:
//!
//! | Prefix | Type            | Prefix | Type            |
//! |--------|-----------------|--------|-----------------|
//! | `+`    | Simple String   | `(`    | Big Number      |
//! | `-`    | Simple Error    | `!`    | Bulk Error      |
//! | `:`    | Integer         | `=`    | Verbatim String |
//! | `$`    | Bulk String     | `%`    | Map             |
//! | `*`    | Array           | `\|`   | Attribute       |
//! | `#`    | Boolean         | `~`    | Set             |
//! | `,`    | Double          | `>`    | Push            |
//!
//! All types are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-InvalidArgument invalid argument\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Array: `*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n`
//! Null Bulk String: `$-1\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
    pub const BOOLEAN: u8 = b'#';
    pub const DOUBLE: u8 = b',';
    pub const BIG_NUMBER: u8 = b'(';
    pub const BULK_ERROR: u8 = b'!';
    pub const VERBATIM_STRING: u8 = b'=';
    pub const MAP: u8 = b'%';
    pub const ATTRIBUTE: u8 = b'|';
    pub const SET: u8 = b'~';
    pub const PUSH: u8 = b'>';

    /// Returns true for any byte that starts a RESP value.
    pub fn is_type_marker(byte: u8) -> bool {
        matches!(
            byte,
            SIMPLE_STRING
                | ERROR
                | INTEGER
                | BULK_STRING
                | ARRAY
                | BOOLEAN
                | DOUBLE
                | BIG_NUMBER
                | BULK_ERROR
                | VERBATIM_STRING
                | MAP
                | ATTRIBUTE
                | SET
                | PUSH
        )
    }
}

/// A reply in the RESP protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Format: `-<error message>\r\n`
    Error(String),

    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string: `$-1\r\n`
    Null,

    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a new bulk string response.
    ///
    /// # Example
    /// ```
    /// use respite::protocol::types::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Common response for successful operations
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Common response for PING
    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the RESP value to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the RESP value into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                extend_line(buf, s);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                extend_line(buf, s);
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            RespValue::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }
}

/// Appends the text of a simple string or error line.
///
/// These lines cannot contain CR or LF, so both are written as spaces.
fn extend_line(buf: &mut Vec<u8>, s: &str) {
    buf.extend(s.bytes().map(|b| match b {
        b'\r' | b'\n' => b' ',
        other => other,
    }));
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "\"{}\"", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) if values.is_empty() => write!(f, "(empty array)"),
            RespValue::Array(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, v)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        assert_eq!(RespValue::simple_string("OK").serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("InvalidArgument invalid argument");
        assert_eq!(value.serialize(), b"-InvalidArgument invalid argument\r\n");
    }

    #[test]
    fn test_line_types_never_contain_crlf() {
        let value = RespValue::error("InvalidCommandFlag invalid flag for SET command: X\r\n+OK");
        assert_eq!(
            value.serialize(),
            b"-InvalidCommandFlag invalid flag for SET command: X  +OK\r\n"
        );
        assert_eq!(RespValue::simple_string("a\nb").serialize(), b"+a b\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");

        let empty = RespValue::bulk_string(Bytes::new());
        assert_eq!(empty.serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::bulk_string(Bytes::from("dir")),
            RespValue::bulk_string(Bytes::from("/tmp")),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n");
        assert_eq!(RespValue::array(vec![]).serialize(), b"*0\r\n");
    }

    #[test]
    fn test_fixed_replies() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
        assert_eq!(RespValue::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_type_markers() {
        for byte in b"+-:$*#,(!=%|~>" {
            assert!(prefix::is_type_marker(*byte));
        }
        assert!(!prefix::is_type_marker(b'P'));
    }

    #[test]
    fn test_display() {
        let value = RespValue::array(vec![
            RespValue::bulk_string(Bytes::from("a")),
            RespValue::null(),
        ]);
        assert_eq!(value.to_string(), "1) \"a\"\n2) (nil)");
    }
}
