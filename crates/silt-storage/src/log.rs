//! Append-only commit log.
//!
//! File-backed stores persist every committed write batch as one log
//! record. Opening the store replays the log from the start to rebuild the
//! in-memory map. A record that was cut short by a crash is ignored along
//! with everything after it.
//!
//! Record layout:
//!
//! ```text
//! u32 entry count
//! per entry:
//!   u8  kind (0 = put, 1 = delete)
//!   u32 key length, key bytes
//!   u32 value length, value bytes   (puts only)
//! ```
//!
//! All integers are big-endian.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{StorageError, StorageResult};

const KIND_PUT: u8 = 0;
const KIND_DELETE: u8 = 1;

/// One committed write.
#[derive(Debug, Clone)]
pub enum LogEntry {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Writer half of the commit log.
#[derive(Debug)]
pub struct CommitLog {
    file: BufWriter<File>,
}

impl CommitLog {
    /// Opens the log for appending, creating it if needed.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: BufWriter::new(file),
        })
    }

    /// Appends one batch record and syncs it to disk.
    pub fn append(&mut self, entries: &[LogEntry]) -> StorageResult<()> {
        self.file
            .write_all(&(entries.len() as u32).to_be_bytes())?;
        for entry in entries {
            match entry {
                LogEntry::Put(key, value) => {
                    self.file.write_all(&[KIND_PUT])?;
                    self.file.write_all(&(key.len() as u32).to_be_bytes())?;
                    self.file.write_all(key)?;
                    self.file.write_all(&(value.len() as u32).to_be_bytes())?;
                    self.file.write_all(value)?;
                }
                LogEntry::Delete(key) => {
                    self.file.write_all(&[KIND_DELETE])?;
                    self.file.write_all(&(key.len() as u32).to_be_bytes())?;
                    self.file.write_all(key)?;
                }
            }
        }
        self.file.flush()?;
        self.file.get_ref().sync_data()?;
        Ok(())
    }
}

/// Replays every complete batch record in `path`, in commit order.
pub fn replay(path: &Path, mut apply: impl FnMut(LogEntry)) -> StorageResult<()> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let mut r = BufReader::new(file);

    loop {
        let count = match read_u32(&mut r) {
            Ok(Some(n)) => n,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e),
        };

        // A batch is applied only if it can be read in full; a torn tail
        // record is treated as if the commit never happened.
        let mut batch = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut kind = [0u8; 1];
            if r.read_exact(&mut kind).is_err() {
                return Ok(());
            }
            let key = match read_bytes(&mut r)? {
                Some(k) => k,
                None => return Ok(()),
            };
            match kind[0] {
                KIND_PUT => {
                    let value = match read_bytes(&mut r)? {
                        Some(v) => v,
                        None => return Ok(()),
                    };
                    batch.push(LogEntry::Put(key, value));
                }
                KIND_DELETE => batch.push(LogEntry::Delete(key)),
                k => {
                    return Err(StorageError::CorruptLog(format!(
                        "unknown entry kind {k}"
                    )))
                }
            }
        }
        for entry in batch {
            apply(entry);
        }
    }
}

fn read_u32(r: &mut impl Read) -> StorageResult<Option<u32>> {
    let mut buf = [0u8; 4];
    match r.read_exact(&mut buf) {
        Ok(()) => Ok(Some(u32::from_be_bytes(buf))),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_bytes(r: &mut impl Read) -> StorageResult<Option<Vec<u8>>> {
    let len = match read_u32(r)? {
        Some(n) => n as usize,
        None => return Ok(None),
    };
    let mut buf = vec![0u8; len];
    match r.read_exact(&mut buf) {
        Ok(()) => Ok(Some(buf)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}
