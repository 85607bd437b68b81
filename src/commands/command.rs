//! Command Model
//!
//! A closed set of commands. Each variant is built by [`Command::parse`],
//! which validates the argument shape, and runs once through
//! [`Command::execute`], which produces the wire-encoded reply.
//!
//! | Command              | Reply                                       |
//! |----------------------|---------------------------------------------|
//! | `PING`               | `+PONG`                                     |
//! | `ECHO msg`           | bulk string `msg`                           |
//! | `SET k v [PX ms]`    | `+OK`                                       |
//! | `GET k`              | bulk string, or `$-1` if absent/expired     |
//! | `CONFIG GET name..`  | array `[name, value, ...]`                  |
//! | `KEYS pattern`       | array of keys (`*` only)                    |
//! | `INFO [section]`     | bulk string of `label:value` lines          |

use crate::commands::CommandError;
use crate::protocol::RespValue;
use crate::server::{info, Context};
use crate::storage::Value;
use bytes::Bytes;
use std::time::Duration;
use tracing::trace;

/// A named modifier attached to a command, e.g. `PX 100` on `SET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    name: String,
    value: String,
}

impl Flag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A decoded request, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Echo { message: Bytes },
    Set { key: Bytes, value: Bytes, flags: Vec<Flag> },
    Get { key: Bytes },
    Config { flags: Vec<Flag> },
    Keys { pattern: Bytes },
    Info { section: Option<String> },
    /// A decode or validation failure, answered with a simple error
    Error(CommandError),
}

impl Command {
    /// Builds a command from its keyword and positional arguments.
    ///
    /// The keyword is matched case-insensitively. Validation errors are
    /// returned rather than wrapped so the caller decides how to report them.
    pub fn parse(keyword: &[u8], args: Vec<Bytes>) -> Result<Command, CommandError> {
        match keyword.to_ascii_uppercase().as_slice() {
            b"PING" => {
                let [] = exact_args::<0>(args)?;
                Ok(Command::Ping)
            }
            b"ECHO" => {
                let [message] = exact_args::<1>(args)?;
                Ok(Command::Echo { message })
            }
            b"SET" => parse_set(args),
            b"GET" => {
                let [key] = exact_args::<1>(args)?;
                Ok(Command::Get { key })
            }
            b"CONFIG" => parse_config(args),
            b"KEYS" => {
                let [pattern] = exact_args::<1>(args)?;
                Ok(Command::Keys { pattern })
            }
            b"INFO" => match args.len() {
                0 => Ok(Command::Info { section: None }),
                1 => Ok(Command::Info {
                    section: Some(text(&args[0])?),
                }),
                _ => Err(CommandError::InvalidNumberOfArguments),
            },
            _ => Err(CommandError::InvalidRedisCommand),
        }
    }

    /// Returns the command keyword, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Echo { .. } => "ECHO",
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Config { .. } => "CONFIG",
            Command::Keys { .. } => "KEYS",
            Command::Info { .. } => "INFO",
            Command::Error(_) => "ERROR",
        }
    }

    /// Executes the command and returns the serialized reply.
    pub fn execute(&self, ctx: &Context) -> Vec<u8> {
        self.respond(ctx).serialize()
    }

    /// Executes the command and returns the reply value.
    ///
    /// Failures become a simple-error reply; they never propagate further.
    pub fn respond(&self, ctx: &Context) -> RespValue {
        trace!(command = self.name(), "Executing command");
        match self.run(ctx) {
            Ok(reply) => reply,
            Err(e) => RespValue::error(e.reply_text()),
        }
    }

    fn run(&self, ctx: &Context) -> Result<RespValue, CommandError> {
        match self {
            Command::Ping => Ok(RespValue::pong()),
            Command::Echo { message } => Ok(RespValue::bulk_string(message.clone())),
            Command::Set { key, value, flags } => {
                let mut ttl = None;
                for flag in flags {
                    if flag.name.eq_ignore_ascii_case("PX") {
                        let millis: u64 = flag
                            .value
                            .parse()
                            .map_err(|_| CommandError::InvalidArgument)?;
                        ttl = Some(Duration::from_millis(millis));
                    } else {
                        return Err(CommandError::invalid_flag("SET", flag.name.as_str()));
                    }
                }

                let value = match ttl {
                    Some(ttl) => Value::string_with_ttl(value.clone(), ttl),
                    None => Value::string(value.clone()),
                };
                ctx.store().set(key.clone(), value);
                Ok(RespValue::ok())
            }
            Command::Get { key } => Ok(match ctx.store().get(key) {
                Some(value) if !value.is_expired() => {
                    RespValue::bulk_string(value.as_bytes().clone())
                }
                _ => RespValue::null(),
            }),
            Command::Config { flags } => {
                let mut reply = Vec::with_capacity(flags.len() * 2);
                for flag in flags {
                    let value = ctx.store().config(&flag.value)?;
                    reply.push(RespValue::bulk_string(Bytes::from(flag.value.clone())));
                    reply.push(RespValue::bulk_string(Bytes::from(value.to_string())));
                }
                Ok(RespValue::array(reply))
            }
            Command::Keys { pattern } => {
                if &pattern[..] != b"*" {
                    return Ok(RespValue::array(vec![]));
                }
                let keys = ctx
                    .store()
                    .live_keys()
                    .into_iter()
                    .map(RespValue::bulk_string)
                    .collect();
                Ok(RespValue::array(keys))
            }
            Command::Info { section } => {
                let text = info::render(ctx, section.as_deref())?;
                Ok(RespValue::bulk_string(Bytes::from(text)))
            }
            Command::Error(e) => Err(e.clone()),
        }
    }
}

impl From<CommandError> for Command {
    fn from(err: CommandError) -> Self {
        Command::Error(err)
    }
}

/// Converts the argument list into exactly `N` arguments.
fn exact_args<const N: usize>(args: Vec<Bytes>) -> Result<[Bytes; N], CommandError> {
    args.try_into()
        .map_err(|_| CommandError::InvalidNumberOfArguments)
}

/// Reads an argument that must be valid UTF-8 text.
fn text(arg: &Bytes) -> Result<String, CommandError> {
    std::str::from_utf8(arg)
        .map(str::to_string)
        .map_err(|_| CommandError::InvalidArgument)
}

/// SET key value [PX milliseconds]
fn parse_set(args: Vec<Bytes>) -> Result<Command, CommandError> {
    let mut args = args.into_iter();
    let (Some(key), Some(value)) = (args.next(), args.next()) else {
        return Err(CommandError::InvalidNumberOfArguments);
    };

    let mut flags = Vec::new();
    while let Some(name) = args.next() {
        let name = text(&name)?;
        if !name.eq_ignore_ascii_case("PX") {
            return Err(CommandError::invalid_flag("SET", name));
        }
        let value = args.next().ok_or(CommandError::InvalidNumberOfArguments)?;
        flags.push(Flag::new(name, text(&value)?));
    }

    Ok(Command::Set { key, value, flags })
}

/// CONFIG GET name [name ...]
fn parse_config(args: Vec<Bytes>) -> Result<Command, CommandError> {
    let Some((subcommand, names)) = args.split_first() else {
        return Err(CommandError::InvalidNumberOfArguments);
    };

    let subcommand = text(subcommand)?;
    if !subcommand.eq_ignore_ascii_case("GET") {
        return Err(CommandError::invalid_flag("CONFIG", subcommand));
    }
    if names.is_empty() {
        return Err(CommandError::InvalidNumberOfArguments);
    }

    let flags = names
        .iter()
        .map(|name| Ok(Flag::new(subcommand.as_str(), text(name)?)))
        .collect::<Result<Vec<_>, CommandError>>()?;
    Ok(Command::Config { flags })
}
