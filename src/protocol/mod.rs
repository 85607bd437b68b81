//! RESP Protocol Implementation
//!
//! This module handles both directions of the Redis Serialization Protocol
//! (RESP) as spoken by this server.
//!
//! ## Overview
//!
//! Requests arrive as arrays of bulk strings (or as bare inline commands) and
//! are decoded straight into [`Command`](crate::commands::Command)s. Replies
//! are built as [`RespValue`]s and serialized back onto the socket.
//!
//! ## Modules
//!
//! - `decoder`: Incremental request decoder with error recovery
//! - `types`: Defines the `RespValue` enum and serialization
//!
//! ## Example
//!
//! ```
//! use respite::protocol::{Decoded, FrameDecoder, RespValue};
//! use respite::commands::Command;
//! use bytes::Bytes;
//!
//! // Decoding incoming data
//! let mut decoder = FrameDecoder::new();
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (decoded, consumed) = decoder.decode(data).unwrap();
//! assert_eq!(consumed, data.len());
//! assert!(matches!(decoded, Decoded::Command(Command::Get { .. })));
//!
//! // Creating responses
//! let response = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(response.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod decoder;
pub mod types;

pub use decoder::{Decoded, FrameDecoder, MAX_ARRAY_LEN, MAX_BULK_SIZE};
pub use types::RespValue;
