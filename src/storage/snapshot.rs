//! RDB Snapshot Loader
//!
//! Decodes a binary snapshot into a map of live key/value pairs. Decoding is a
//! pure transform over a byte slice; [`restore`] is the thin startup helper
//! that reads the configured file and feeds the result into a store.
//!
//! ## Layout
//!
//! ```text
//! "REDIS0011"                        9-byte header, skipped
//! 0xFA <string> <string>             metadata (repeated, ignored)
//! 0xFE <size> 0xFB <size> <size>     database section header
//!     [0xFC <u64 ms LE> | 0xFD <u32 s LE>] 0x00 <string key> <string value>
//!     ...                            one record per key
//! 0xFF <checksum>                    end of file
//! ```
//!
//! Any unexpected marker is fatal: there is no partial load.

use crate::commands::CommandError;
use crate::storage::{StorageEngine, Value};
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

/// Length of the `REDIS` magic plus four version digits.
const HEADER_LEN: usize = 9;

/// Section and record markers
pub mod opcode {
    pub const METADATA: u8 = 0xFA;
    pub const RESIZE_DB: u8 = 0xFB;
    pub const EXPIRE_MS: u8 = 0xFC;
    pub const EXPIRE_SECS: u8 = 0xFD;
    pub const SELECT_DB: u8 = 0xFE;
    pub const EOF: u8 = 0xFF;
    pub const STRING_TYPE: u8 = 0x00;
}

/// Errors that can occur while loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The data ended in the middle of a section
    #[error("snapshot truncated at offset {0}")]
    UnexpectedEof(usize),

    /// A byte that cannot start a section or record at this position
    #[error("unexpected marker {byte:#04x} at offset {offset}")]
    UnexpectedMarker { byte: u8, offset: usize },

    /// A special string encoding other than 8/16/32-bit integers
    #[error("unsupported string encoding {0:#04x}")]
    UnsupportedStringEncoding(u8),

    /// Value type or configuration errors
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Reading the snapshot file failed
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Decodes a snapshot, dropping keys that have already expired.
pub fn load(data: &[u8]) -> SnapshotResult<HashMap<Bytes, Value>> {
    load_at(data, SystemTime::now())
}

/// Decodes a snapshot, treating `now` as the current time.
pub fn load_at(data: &[u8], now: SystemTime) -> SnapshotResult<HashMap<Bytes, Value>> {
    let mut reader = SnapshotReader::new(data);
    let mut pairs = HashMap::new();

    reader.take(HEADER_LEN)?;

    loop {
        let offset = reader.pos;
        match reader.read_u8()? {
            opcode::EOF => break,
            opcode::METADATA => {
                let key = reader.read_string()?;
                let value = reader.read_string()?;
                debug!(
                    key = %String::from_utf8_lossy(&key),
                    value = %String::from_utf8_lossy(&value),
                    "Snapshot metadata"
                );
            }
            opcode::SELECT_DB => {
                let index = reader.read_size()?;
                reader.expect(opcode::RESIZE_DB)?;
                let key_count = reader.read_size()?;
                let expiring = reader.read_size()?;
                debug!(db = index, keys = key_count, expiring, "Snapshot database section");

                for _ in 0..key_count {
                    let (key, value) = reader.read_record()?;
                    if value.is_expired_at(now) {
                        debug!(key = %String::from_utf8_lossy(&key), "Skipping expired key");
                        continue;
                    }
                    pairs.insert(key, value);
                }
            }
            byte => return Err(SnapshotError::UnexpectedMarker { byte, offset }),
        }
    }

    Ok(pairs)
}

/// Loads the snapshot named by the store's `dir` and `dbfilename` settings
/// into the store.
///
/// A missing file is not an error; the store simply starts empty. Returns the
/// number of keys inserted.
pub fn restore(store: &StorageEngine) -> SnapshotResult<usize> {
    let path = Path::new(store.config("dir")?.trim()).join(store.config("dbfilename")?.trim());

    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No snapshot file, starting empty");
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let pairs = load(&data)?;
    let count = pairs.len();
    for (key, value) in pairs {
        store.set(key, value);
    }

    info!(path = %path.display(), keys = count, "Snapshot loaded");
    Ok(count)
}

/// Cursor over the raw snapshot bytes.
struct SnapshotReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SnapshotReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> SnapshotResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(SnapshotError::UnexpectedEof(self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> SnapshotResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> SnapshotResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn expect(&mut self, marker: u8) -> SnapshotResult<()> {
        let offset = self.pos;
        match self.read_u8()? {
            byte if byte == marker => Ok(()),
            byte => Err(SnapshotError::UnexpectedMarker { byte, offset }),
        }
    }

    /// Reads a size-encoded integer (6-bit, 14-bit or 32-bit big-endian).
    fn read_size(&mut self) -> SnapshotResult<usize> {
        let offset = self.pos;
        let first = self.read_u8()?;
        match first >> 6 {
            0b00 => Ok((first & 0x3F) as usize),
            0b01 => {
                let second = self.read_u8()?;
                Ok((((first & 0x3F) as usize) << 8) | second as usize)
            }
            0b10 if first == 0x80 => Ok(u32::from_be_bytes(self.read_array()?) as usize),
            _ => Err(SnapshotError::UnexpectedMarker {
                byte: first,
                offset,
            }),
        }
    }

    /// Reads a string: either length-prefixed raw bytes or an integer
    /// rendered as decimal text.
    fn read_string(&mut self) -> SnapshotResult<Bytes> {
        let first = self.data.get(self.pos).copied();
        match first {
            Some(byte) if byte >> 6 == 0b11 => {
                self.pos += 1;
                let number = match byte & 0x3F {
                    0 => i64::from(i8::from_le_bytes(self.read_array()?)),
                    1 => i64::from(i16::from_le_bytes(self.read_array()?)),
                    2 => i64::from(i32::from_le_bytes(self.read_array()?)),
                    _ => return Err(SnapshotError::UnsupportedStringEncoding(byte)),
                };
                Ok(Bytes::from(number.to_string()))
            }
            _ => {
                let len = self.read_size()?;
                Ok(Bytes::copy_from_slice(self.take(len)?))
            }
        }
    }

    /// Reads one key record with its optional expiry prefix.
    fn read_record(&mut self) -> SnapshotResult<(Bytes, Value)> {
        let mut value_type = self.read_u8()?;

        let expires_at = match value_type {
            opcode::EXPIRE_MS => {
                let millis = u64::from_le_bytes(self.read_array()?);
                value_type = self.read_u8()?;
                Some(UNIX_EPOCH + Duration::from_millis(millis))
            }
            opcode::EXPIRE_SECS => {
                let secs = u32::from_le_bytes(self.read_array()?);
                value_type = self.read_u8()?;
                Some(UNIX_EPOCH + Duration::from_secs(u64::from(secs)))
            }
            _ => None,
        };

        if value_type != opcode::STRING_TYPE {
            return Err(CommandError::InvalidRdbValueType(value_type).into());
        }

        let key = self.read_string()?;
        let data = self.read_string()?;
        let value = match expires_at {
            Some(at) => Value::string_expiring_at(data, at),
            None => Value::string(data),
        };
        Ok((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreConfig;

    const HEADER: &[u8] = b"REDIS0011";

    /// Builds a snapshot with one database section holding `records`.
    fn snapshot(records: &[&[u8]]) -> Vec<u8> {
        let mut data = HEADER.to_vec();
        data.extend_from_slice(&[0xFA, 9]);
        data.extend_from_slice(b"redis-ver");
        data.extend_from_slice(&[5]);
        data.extend_from_slice(b"7.2.0");
        data.extend_from_slice(&[0xFE, 0x00, 0xFB, records.len() as u8, 0x00]);
        for record in records {
            data.extend_from_slice(record);
        }
        data.push(0xFF);
        data.extend_from_slice(&[0u8; 8]);
        data
    }

    fn string_record(key: &str, value: &str) -> Vec<u8> {
        let mut record = vec![0x00, key.len() as u8];
        record.extend_from_slice(key.as_bytes());
        record.push(value.len() as u8);
        record.extend_from_slice(value.as_bytes());
        record
    }

    #[test]
    fn test_load_single_key() {
        let record = string_record("foo", "bar");
        let pairs = load(&snapshot(&[&record])).unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[&Bytes::from("foo")], Value::string("bar"));
    }

    #[test]
    fn test_load_drops_expired_millisecond_key() {
        let mut expired = vec![0xFC];
        expired.extend_from_slice(&1_000u64.to_le_bytes());
        expired.extend_from_slice(&string_record("old", "gone"));

        let fresh = string_record("new", "kept");
        let pairs = load(&snapshot(&[&expired, &fresh])).unwrap();

        assert!(!pairs.contains_key(&Bytes::from("old")));
        assert_eq!(pairs[&Bytes::from("new")], Value::string("kept"));
    }

    #[test]
    fn test_load_keeps_future_expiry() {
        let deadline_ms: u64 = 4_102_444_800_000; // 2100-01-01
        let mut record = vec![0xFC];
        record.extend_from_slice(&deadline_ms.to_le_bytes());
        record.extend_from_slice(&string_record("later", "v"));

        let pairs = load(&snapshot(&[&record])).unwrap();
        let value = &pairs[&Bytes::from("later")];
        assert_eq!(
            value.expires_at(),
            Some(UNIX_EPOCH + Duration::from_millis(deadline_ms))
        );
    }

    #[test]
    fn test_load_seconds_expiry() {
        let mut record = vec![0xFD];
        record.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        record.extend_from_slice(&string_record("k", "v"));
        let data = snapshot(&[&record]);

        let before = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let pairs = load_at(&data, before).unwrap();
        assert_eq!(
            pairs[&Bytes::from("k")].expires_at(),
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );

        let after = UNIX_EPOCH + Duration::from_secs(1_800_000_000);
        assert!(load_at(&data, after).unwrap().is_empty());
    }

    #[test]
    fn test_integer_encoded_strings() {
        let record: &[u8] = &[
            0x00, 0xC0, 0x7B, // key: 8-bit 123
            0xC1, 0x39, 0x30, // value: 16-bit 12345
        ];
        let negative: &[u8] = &[
            0x00, 0x01, b'n', // key "n"
            0xC2, 0xFF, 0xFF, 0xFF, 0xFF, // value: 32-bit -1
        ];

        let pairs = load(&snapshot(&[record, negative])).unwrap();
        assert_eq!(pairs[&Bytes::from("123")], Value::string("12345"));
        assert_eq!(pairs[&Bytes::from("n")], Value::string("-1"));
    }

    #[test]
    fn test_unsupported_value_type() {
        let record: &[u8] = &[0x01, 0x01, b'l', 0x00];
        let err = load(&snapshot(&[record])).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Command(CommandError::InvalidRdbValueType(0x01))
        ));
    }

    #[test]
    fn test_unexpected_section_marker() {
        let mut data = HEADER.to_vec();
        data.push(0x42);
        let err = load(&data).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::UnexpectedMarker { byte: 0x42, offset: 9 }
        ));
    }

    #[test]
    fn test_truncated_snapshot() {
        let mut data = snapshot(&[&string_record("foo", "bar")]);
        data.truncate(data.len() - 12);
        assert!(matches!(load(&data), Err(SnapshotError::UnexpectedEof(_))));

        assert!(matches!(load(b"REDIS"), Err(SnapshotError::UnexpectedEof(0))));
    }

    #[test]
    fn test_empty_database() {
        let pairs = load(&snapshot(&[])).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_restore_from_disk() {
        let dir = std::env::temp_dir().join(format!("respite-restore-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("dump.rdb"), snapshot(&[&string_record("foo", "bar")])).unwrap();

        let store = StorageEngine::with_config(StoreConfig {
            dir: dir.to_string_lossy().into_owned(),
            dbfilename: "dump.rdb".to_string(),
        });
        assert_eq!(restore(&store).unwrap(), 1);
        assert_eq!(store.get(b"foo").unwrap().as_bytes(), &Bytes::from("bar"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_restore_missing_file() {
        let store = StorageEngine::with_config(StoreConfig {
            dir: "/nonexistent/respite".to_string(),
            dbfilename: "dump.rdb".to_string(),
        });
        assert_eq!(restore(&store).unwrap(), 0);
        assert!(store.is_empty());
    }
}
