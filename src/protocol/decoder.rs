//! RESP Frame Decoder
//!
//! Turns raw request bytes into [`Command`]s. The decoder walks one token at a
//! time through a small state machine:
//!
//! ```text
//!             *N                      $L
//! AwaitType ──────> InArray(N) ──────────> InBulk(L, N-1)
//!     │                 │                      │ L payload bytes
//!     │ $L              │ other                ▼
//!     └──> InBulk(L,0)  └────────────> keyword + N-1 arguments ──> Command
//! ```
//!
//! Arguments after the keyword are read in their canonical encoding: a
//! `$<len>` header followed by exactly `len` payload bytes.
//!
//! ## Contract
//!
//! [`FrameDecoder::decode`] looks at a buffer and returns:
//! - `Some((Decoded::Command(cmd), consumed))` - a frame was decoded
//! - `Some((Decoded::Skipped, consumed))` - bytes were consumed without
//!   producing a command (empty bulk string, discarded garbage)
//! - `None` - the buffer holds an incomplete frame, read more data
//!
//! Malformed input never fails the decoder: it yields a [`Command::Error`] and
//! the next call resumes with the following frame.

use crate::commands::{Command, CommandError};
use crate::protocol::types::prefix;
use bytes::Bytes;
use tracing::{debug, trace};

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of elements in a request array (same as Redis)
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// The outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Command(Command),
    Skipped,
}

/// Decoder state between tokens of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitType,
    InArray(usize),
    InBulk { len: usize, remaining: usize },
}

impl State {
    /// Elements still to be read at this point, the current one included.
    fn elements_left(self) -> usize {
        match self {
            State::InArray(n) => n,
            State::AwaitType | State::InBulk { .. } => 1,
        }
    }
}

/// Why decoding stopped before producing a frame.
#[derive(Debug)]
enum Halt {
    Incomplete,
    Invalid(CommandError),
}

impl From<CommandError> for Halt {
    fn from(err: CommandError) -> Self {
        Halt::Invalid(err)
    }
}

type Step<T> = Result<T, Halt>;

/// Stateful RESP decoder for one connection.
///
/// The only state kept between calls is how many lines of a broken frame
/// still need to be thrown away. Those lines always end on a complete
/// `$<len>` header and payload pair, so an odd count means the next line is
/// a payload.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    discard: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { discard: 0 }
    }

    /// Attempts to decode one frame from the front of `buf`.
    pub fn decode(&mut self, buf: &[u8]) -> Option<(Decoded, usize)> {
        let mut tokens = Tokens::new(buf);

        while self.discard > 0 {
            match tokens.peek_line() {
                None => return (tokens.pos > 0).then_some((Decoded::Skipped, tokens.pos)),
                Some((line, _))
                    if self.discard % 2 == 0 && line.first() == Some(&prefix::ARRAY) =>
                {
                    self.discard = 0
                }
                Some((_, end)) => {
                    trace!(bytes = end - tokens.pos, "Discarding line of broken frame");
                    tokens.pos = end;
                    self.discard -= 1;
                }
            }
        }

        let start = tokens.pos;
        match self.decode_frame(&mut tokens) {
            Ok(Some(cmd)) => Some((Decoded::Command(cmd), tokens.pos)),
            Ok(None) => Some((Decoded::Skipped, tokens.pos)),
            Err(Halt::Incomplete) => (start > 0).then_some((Decoded::Skipped, start)),
            Err(Halt::Invalid(err)) => {
                debug!(error = %err, discard = self.discard, "Malformed frame");
                Some((Decoded::Command(Command::Error(err)), tokens.pos))
            }
        }
    }

    /// Walks the state machine over one frame.
    ///
    /// Returns `Ok(None)` for frames that carry no command.
    fn decode_frame(&mut self, tokens: &mut Tokens<'_>) -> Step<Option<Command>> {
        let mut state = State::AwaitType;

        loop {
            state = match state {
                State::InBulk { len, remaining } => {
                    let keyword = match tokens.payload(len) {
                        Err(Halt::Invalid(err)) => return Err(self.fail(err, 2 * remaining)),
                        other => other?,
                    };
                    return self.parse_command(&keyword, remaining, tokens).map(Some);
                }
                State::AwaitType | State::InArray(_) => {
                    let left = state.elements_left();
                    let line = tokens.line()?;
                    match line.first().copied() {
                        None if state == State::AwaitType => return Ok(None),
                        None => return Err(self.fail(CommandError::InvalidCharacter, 2 * (left - 1))),
                        Some(prefix::ARRAY) => match parse_length(&line[1..]) {
                            Ok(Some(0)) | Ok(None) => return Ok(None),
                            Ok(Some(count)) if count > MAX_ARRAY_LEN => {
                                return Err(self.fail(CommandError::InvalidArgument, 2 * (left - 1)));
                            }
                            Ok(Some(count)) => State::InArray(count),
                            Err(err) => return Err(self.fail(err, 2 * (left - 1))),
                        },
                        Some(prefix::BULK_STRING) => match parse_length(&line[1..]) {
                            Ok(Some(0)) => {
                                tokens.payload(0)?;
                                return Ok(None);
                            }
                            Ok(None) => return Ok(None),
                            Ok(Some(len)) => State::InBulk {
                                len,
                                remaining: left - 1,
                            },
                            Err(err) => return Err(self.fail(err, 2 * left - 1)),
                        },
                        Some(_) if state == State::AwaitType && !prefix::is_type_marker(line[0]) => {
                            return parse_inline(line).map(Some).map_err(Halt::Invalid);
                        }
                        Some(_) => {
                            return Err(self.fail(CommandError::InvalidRespDataType, 2 * (left - 1)));
                        }
                    }
                }
            };
        }
    }

    /// Reads `remaining` arguments and hands them to the command parser.
    fn parse_command(
        &mut self,
        keyword: &[u8],
        remaining: usize,
        tokens: &mut Tokens<'_>,
    ) -> Step<Command> {
        let mut args = Vec::new();
        for i in 0..remaining {
            args.push(self.argument(tokens, remaining - i)?);
        }

        trace!(
            keyword = %String::from_utf8_lossy(keyword),
            args = args.len(),
            "Decoded frame"
        );
        Ok(Command::parse(keyword, args).unwrap_or_else(Command::Error))
    }

    /// Reads one argument in canonical encoding: `$<len>\r\n<payload>\r\n`.
    ///
    /// `left` counts this argument and the ones after it.
    fn argument(&mut self, tokens: &mut Tokens<'_>, left: usize) -> Step<Bytes> {
        let header = tokens.line()?;
        let after = 2 * (left - 1);
        match header.split_first() {
            Some((&prefix::BULK_STRING, digits)) => match parse_length(digits) {
                Ok(Some(len)) => match tokens.payload(len) {
                    Err(Halt::Invalid(err)) => Err(self.fail(err, after)),
                    other => other,
                },
                Ok(None) => Err(self.fail(CommandError::InvalidArgument, after)),
                Err(err) => Err(self.fail(err, after + 1)),
            },
            _ => Err(self.fail(CommandError::InvalidRespDataType, after)),
        }
    }

    /// Records how many lines of the broken frame are still to come.
    fn fail(&mut self, err: CommandError, lines: usize) -> Halt {
        self.discard = lines;
        Halt::Invalid(err)
    }
}

/// Parses a length or count header.
///
/// Negative values (`-1` is the RESP null marker) yield `None`.
fn parse_length(digits: &[u8]) -> Result<Option<usize>, CommandError> {
    let n: i64 = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::InvalidCharacter)?;

    match usize::try_from(n) {
        Ok(n) if n > MAX_BULK_SIZE => Err(CommandError::InvalidArgument),
        Ok(n) => Ok(Some(n)),
        Err(_) => Ok(None),
    }
}

/// Parses a whitespace separated inline command such as `PING\r\n`.
fn parse_inline(line: &[u8]) -> Result<Command, CommandError> {
    let mut words = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|w| !w.is_empty());

    let Some(keyword) = words.next() else {
        return Err(CommandError::InvalidRedisCommand);
    };
    let args = words.map(Bytes::copy_from_slice).collect();
    Ok(Command::parse(keyword, args).unwrap_or_else(Command::Error))
}

/// Cursor over the bytes of the current buffer.
struct Tokens<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the next line without its terminator, and the position just
    /// past the terminator. Accepts `\r\n` and a bare `\n`.
    fn peek_line(&self) -> Option<(&'a [u8], usize)> {
        let rest = &self.buf[self.pos..];
        let newline = rest.iter().position(|&b| b == b'\n')?;
        let line = &rest[..newline];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some((line, self.pos + newline + 1))
    }

    fn line(&mut self) -> Step<&'a [u8]> {
        let (line, end) = self.peek_line().ok_or(Halt::Incomplete)?;
        self.pos = end;
        Ok(line)
    }

    /// Reads exactly `len` payload bytes followed by CRLF.
    fn payload(&mut self, len: usize) -> Step<Bytes> {
        let end = self.pos + len;
        if self.buf.len() < end + 2 {
            return Err(Halt::Incomplete);
        }
        if &self.buf[end..end + 2] != b"\r\n" {
            // Skip whatever is on the line so the next frame starts clean.
            self.line()?;
            return Err(Halt::Invalid(CommandError::InvalidCharacter));
        }
        let data = Bytes::copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end + 2;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Flag;

    /// Decodes every complete frame in `input`, in order.
    fn decode_all(input: &[u8]) -> Vec<Command> {
        let mut decoder = FrameDecoder::new();
        let mut commands = Vec::new();
        let mut pos = 0;
        while let Some((decoded, consumed)) = decoder.decode(&input[pos..]) {
            assert!(consumed > 0, "decoder made no progress");
            pos += consumed;
            if let Decoded::Command(cmd) = decoded {
                commands.push(cmd);
            }
        }
        assert_eq!(pos, input.len(), "unconsumed input");
        commands
    }

    #[test]
    fn test_decode_set() {
        let input = b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n";
        let (decoded, consumed) = FrameDecoder::new().decode(input).unwrap();

        assert_eq!(consumed, input.len());
        assert_eq!(
            decoded,
            Decoded::Command(Command::Set {
                key: Bytes::from("foo"),
                value: Bytes::from("bar"),
                flags: vec![],
            })
        );
    }

    #[test]
    fn test_decode_set_with_px() {
        let input = b"*5\r\n$3\r\nset\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\npx\r\n$3\r\n100\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Set {
                key: Bytes::from("foo"),
                value: Bytes::from("bar"),
                flags: vec![Flag::new("px", "100")],
            }]
        );
    }

    #[test]
    fn test_decode_ping_variants() {
        assert_eq!(decode_all(b"*1\r\n$4\r\nPING\r\n"), vec![Command::Ping]);
        assert_eq!(decode_all(b"$4\r\nping\r\n"), vec![Command::Ping]);
        assert_eq!(decode_all(b"PING\r\n"), vec![Command::Ping]);
        assert_eq!(decode_all(b"PING\n"), vec![Command::Ping]);
    }

    #[test]
    fn test_decode_inline_with_arguments() {
        assert_eq!(
            decode_all(b"ECHO hello\r\n"),
            vec![Command::Echo {
                message: Bytes::from("hello")
            }]
        );
    }

    #[test]
    fn test_decode_config_get() {
        let input = b"*3\r\n$6\r\nCONFIG\r\n$3\r\nGET\r\n$3\r\ndir\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Config {
                flags: vec![Flag::new("GET", "dir")],
            }]
        );
    }

    #[test]
    fn test_decode_info_optional_section() {
        assert_eq!(
            decode_all(b"*1\r\n$4\r\nINFO\r\n"),
            vec![Command::Info { section: None }]
        );
        assert_eq!(
            decode_all(b"*2\r\n$4\r\nINFO\r\n$11\r\nreplication\r\n"),
            vec![Command::Info {
                section: Some("replication".to_string())
            }]
        );
    }

    #[test]
    fn test_incomplete_frame() {
        let mut decoder = FrameDecoder::new();
        let input = b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";

        for cut in 0..input.len() {
            assert_eq!(decoder.decode(&input[..cut]), None, "cut at {}", cut);
        }
        assert!(matches!(
            decoder.decode(input),
            Some((Decoded::Command(Command::Get { .. }), 22))
        ));
    }

    #[test]
    fn test_pipelined_frames() {
        let input = b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$1\r\nk\r\n*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n";
        assert_eq!(
            decode_all(input),
            vec![
                Command::Ping,
                Command::Get {
                    key: Bytes::from("k")
                },
                Command::Echo {
                    message: Bytes::from("hi")
                },
            ]
        );
    }

    #[test]
    fn test_binary_safe_argument() {
        let input = b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$7\r\nab\r\ncd!\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Set {
                key: Bytes::from("k"),
                value: Bytes::from(&b"ab\r\ncd!"[..]),
                flags: vec![],
            }]
        );
    }

    #[test]
    fn test_empty_bulk_string_emits_nothing() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode(b"$0\r\n\r\n"), Some((Decoded::Skipped, 6)));
        assert_eq!(decode_all(b"$0\r\n\r\n*1\r\n$4\r\nPING\r\n"), vec![Command::Ping]);
    }

    #[test]
    fn test_arity_from_array_header() {
        assert_eq!(
            decode_all(b"*1\r\n$4\r\nECHO\r\n"),
            vec![Command::Error(CommandError::InvalidNumberOfArguments)]
        );
        assert_eq!(
            decode_all(b"*3\r\n$3\r\nGET\r\n$1\r\na\r\n$1\r\nb\r\n*1\r\n$4\r\nPING\r\n"),
            vec![
                Command::Error(CommandError::InvalidNumberOfArguments),
                Command::Ping,
            ]
        );
    }

    #[test]
    fn test_unknown_command_consumes_frame() {
        assert_eq!(
            decode_all(b"*2\r\n$4\r\nLLEN\r\n$1\r\nl\r\n*1\r\n$4\r\nPING\r\n"),
            vec![
                Command::Error(CommandError::InvalidRedisCommand),
                Command::Ping,
            ]
        );
    }

    #[test]
    fn test_unknown_flag() {
        let input = b"*5\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$2\r\nNX\r\n$1\r\n1\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Error(CommandError::invalid_flag("SET", "NX"))]
        );
    }

    #[test]
    fn test_bad_length_yields_one_error_and_resumes() {
        let input = b"*2\r\n$3\r\nGET\r\n$abc\r\nfoo\r\n*1\r\n$4\r\nPING\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Error(CommandError::InvalidCharacter), Command::Ping]
        );
    }

    #[test]
    fn test_bad_top_level_bulk_length() {
        let input = b"$x\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Error(CommandError::InvalidCharacter), Command::Ping]
        );
    }

    #[test]
    fn test_bad_array_count() {
        assert_eq!(
            decode_all(b"*two\r\nPING\r\n"),
            vec![Command::Error(CommandError::InvalidCharacter), Command::Ping]
        );
    }

    #[test]
    fn test_discard_stops_at_next_array() {
        let input = b"*4\r\n$3\r\nSET\r\n$1\r\nk\r\n:1\r\n*1\r\n$4\r\nPING\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Error(CommandError::InvalidRespDataType), Command::Ping]
        );
    }

    #[test]
    fn test_discarded_payload_may_start_with_star() {
        let input = b"*2\r\n$4\r\nKEYS\r\n$x\r\n*\r\n*1\r\n$4\r\nPING\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Error(CommandError::InvalidCharacter), Command::Ping]
        );

        let input = b"*3\r\n$4\r\nECHO\r\n$2\r\nhello\r\n$1\r\n*\r\n*1\r\n$4\r\nPING\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Error(CommandError::InvalidCharacter), Command::Ping]
        );
    }

    #[test]
    fn test_huge_array_count() {
        let mut decoder = FrameDecoder::new();
        let (decoded, consumed) = decoder.decode(b"*536870912\r\n$4\r\nPING\r\n").unwrap();
        assert_eq!(consumed, 12);
        assert_eq!(decoded, Decoded::Command(Command::Error(CommandError::InvalidArgument)));

        // A count within bounds waits for the rest of the frame.
        let header = format!("*{}\r\n$4\r\nECHO\r\n$1\r\na\r\n", MAX_ARRAY_LEN);
        assert_eq!(FrameDecoder::new().decode(header.as_bytes()), None);
    }

    #[test]
    fn test_huge_bulk_length_in_argument() {
        assert_eq!(
            FrameDecoder::new().decode(b"*2\r\n$4\r\nECHO\r\n$536870912\r\nabc"),
            None
        );
        assert_eq!(
            decode_all(b"*2\r\n$4\r\nECHO\r\n$99999999999\r\nabc\r\n*1\r\n$4\r\nPING\r\n"),
            vec![Command::Error(CommandError::InvalidArgument), Command::Ping]
        );
    }

    #[test]
    fn test_crlf_in_flag_name_yields_one_reply_line() {
        let input = b"*4\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$6\r\nX\r\n+OK\r\n";
        let commands = decode_all(input);
        assert_eq!(commands.len(), 1);

        let ctx = crate::server::Context::with_store(std::sync::Arc::new(
            crate::storage::StorageEngine::new(),
        ));
        let reply = commands[0].execute(&ctx);
        assert_eq!(reply.iter().filter(|&&b| b == b'\n').count(), 1);
        assert!(reply.starts_with(b"-InvalidCommandFlag "));
        assert!(reply.ends_with(b"X  +OK\r\n"));
    }

    #[test]
    fn test_unsupported_resp_type() {
        assert_eq!(
            decode_all(b":42\r\n*1\r\n$4\r\nPING\r\n"),
            vec![Command::Error(CommandError::InvalidRespDataType), Command::Ping]
        );
    }

    #[test]
    fn test_payload_length_mismatch() {
        let input = b"*2\r\n$4\r\nECHO\r\n$2\r\nhello\r\n*1\r\n$4\r\nPING\r\n";
        assert_eq!(
            decode_all(input),
            vec![Command::Error(CommandError::InvalidCharacter), Command::Ping]
        );
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert_eq!(decode_all(b"\r\n*1\r\n$4\r\nPING\r\n"), vec![Command::Ping]);
    }

    #[test]
    fn test_partial_discard_keeps_progress() {
        let mut decoder = FrameDecoder::new();
        let first = b"*2\r\n$3\r\nGET\r\n$?\r\n";
        let (decoded, consumed) = decoder.decode(first).unwrap();
        assert_eq!(consumed, first.len());
        assert_eq!(decoded, Decoded::Command(Command::Error(CommandError::InvalidCharacter)));

        // The payload line of the broken argument arrives later and is dropped.
        assert_eq!(decoder.decode(b"fo"), None);
        assert_eq!(decoder.decode(b"foo\r\n"), Some((Decoded::Skipped, 5)));
        assert!(matches!(
            decoder.decode(b"*1\r\n$4\r\nPING\r\n"),
            Some((Decoded::Command(Command::Ping), 14))
        ));
    }
}
