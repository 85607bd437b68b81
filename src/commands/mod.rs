//! Command Module
//!
//! This module implements the command layer. It turns decoded requests into
//! typed commands, executes them against the shared server context, and
//! renders the reply bytes.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  FrameDecoder   │  (protocol module)
//! └────────┬────────┘
//!          │ Command::parse
//!          ▼
//! ┌─────────────────┐
//! │    Command      │  (this module)
//! │                 │
//! │  - Validate     │
//! │  - Execute      │
//! │  - Encode reply │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Context      │  store, server info, replication
//! └─────────────────┘
//! ```
//!
//! Every failure is a [`CommandError`]; it is carried by
//! [`Command::Error`] and answered as a single `-<Kind> <message>` reply.

pub mod command;
pub mod error;

pub use command::{Command, Flag};
pub use error::CommandError;
