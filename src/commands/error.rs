//! Command Error Kinds
//!
//! Every failure that can happen while decoding or executing a request is one
//! of these kinds. They never abort a connection: the decoder wraps them in
//! [`Command::Error`](crate::commands::Command::Error) and the client receives
//! a single simple-error reply of the form `-<Kind> <message>\r\n`.

use thiserror::Error;

/// Errors produced while decoding, validating or executing a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The command received too few or too many arguments
    #[error("invalid number of arguments")]
    InvalidNumberOfArguments,

    /// An argument had the right position but an unusable value
    #[error("invalid argument")]
    InvalidArgument,

    /// A length or count header was not a number
    #[error("invalid character")]
    InvalidCharacter,

    /// A RESP type this server does not accept as request input
    #[error("invalid redis RESP type")]
    InvalidRespDataType,

    /// Unknown command keyword, or the stream ended inside a frame
    #[error("invalid redis command")]
    InvalidRedisCommand,

    /// Snapshot value-type byte other than plain string
    #[error("invalid value type in RDB file")]
    InvalidRdbValueType(u8),

    /// A flag the command does not recognize
    #[error("invalid flag for {command} command: {flag}")]
    InvalidCommandFlag { command: String, flag: String },

    /// A configuration name the server does not know about
    #[error("invalid Redis config: {0}")]
    InvalidServerConfig(String),

    /// Follower configured without a usable leader address
    #[error("no redis leader available")]
    NoLeaderAvailable,
}

impl CommandError {
    /// Returns the name of the error kind, used as the first word of the
    /// simple-error reply.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::InvalidNumberOfArguments => "InvalidNumberOfArguments",
            CommandError::InvalidArgument => "InvalidArgument",
            CommandError::InvalidCharacter => "InvalidCharacter",
            CommandError::InvalidRespDataType => "InvalidRespDataType",
            CommandError::InvalidRedisCommand => "InvalidRedisCommand",
            CommandError::InvalidRdbValueType(_) => "InvalidRDBValueType",
            CommandError::InvalidCommandFlag { .. } => "InvalidCommandFlag",
            CommandError::InvalidServerConfig(_) => "InvalidServerConfig",
            CommandError::NoLeaderAvailable => "NoLeaderAvailable",
        }
    }

    /// Shorthand for building an [`CommandError::InvalidCommandFlag`].
    pub fn invalid_flag(command: &str, flag: impl Into<String>) -> Self {
        CommandError::InvalidCommandFlag {
            command: command.to_string(),
            flag: flag.into(),
        }
    }

    /// Renders the error as the text of a RESP simple error.
    pub fn reply_text(&self) -> String {
        format!("{} {}", self.kind(), self)
    }
}
