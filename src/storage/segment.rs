//! One slice of the log on disk: a data file of length-prefix framed
//! records plus its offset index, covering a contiguous offset range that
//! starts at the segment's base offset.
use crate::error::Result;
use crate::storage::index::Index;
use crate::storage::record::Record;
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const FRAME_HEADER_SIZE: u64 = 8;

#[derive(Debug)]
pub struct Segment {
    pub base_offset: u64,
    pub next_offset: u64,
    file: File,
    path: PathBuf,
    index: Index,
}

pub(crate) fn segment_filename(base_offset: u64) -> String {
    format!("{:020}.log", base_offset)
}

impl Segment {
    /// Opens (creating if absent) the segment for `base_offset`. A
    /// non-empty data file is scanned frame-by-frame to recover
    /// `next_offset`; if the index disagrees with the scan it is rebuilt
    /// from the scanned positions.
    pub fn open(dir: &Path, base_offset: u64) -> Result<Self> {
        let path = dir.join(segment_filename(base_offset));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let mut index = Index::open(dir, base_offset)?;

        let entries = scan_frames(&file, base_offset)?;
        let next_offset = base_offset + entries.len() as u64;
        if index.entry_count() != entries.len() {
            warn!(
                "index {:?} holds {} entries but the data file holds {} records, rebuilding",
                index.path(),
                index.entry_count(),
                entries.len()
            );
            index.rebuild(&entries)?;
        }

        Ok(Self {
            base_offset,
            next_offset,
            file,
            path,
            index,
        })
    }

    /// Assigns the next offset to `record` and appends its framed bytes.
    /// The record reaches durable storage before its index entry does; on
    /// any failure the partial frame is truncated away and `next_offset`
    /// is left untouched.
    pub fn append(&mut self, record: &mut Record) -> Result<u64> {
        record.offset = self.next_offset;
        let mut payload = Vec::with_capacity(record.binary_size());
        record.write(&mut payload)?;

        let pos = self.file.seek(SeekFrom::End(0))?;
        let outcome = (|| -> Result<()> {
            self.file.write_u64::<NetworkEndian>(payload.len() as u64)?;
            self.file.write_all(&payload)?;
            self.file.sync_all()?;
            self.index.write(record.offset, pos)
        })();
        if let Err(err) = outcome {
            let _ = self.file.set_len(pos);
            return Err(err);
        }

        self.next_offset += 1;
        Ok(record.offset)
    }

    /// Reads records with offsets in `[start_offset, next_offset)` in
    /// order, at most `max_records` of them when `max_records > 0`. A
    /// malformed frame ends the scan; whatever was decoded so far is
    /// returned.
    pub fn read_from(&self, start_offset: u64, max_records: usize) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        if start_offset >= self.next_offset {
            return Ok(records);
        }

        let (mut pos, mut current_offset) = match self.index.lookup(start_offset) {
            Some(pos) if start_offset > self.base_offset => (pos, start_offset),
            _ => (0, self.base_offset),
        };
        let file_size = self.file.metadata()?.len();
        let mut reader = BufReader::new(&self.file);
        reader.seek(SeekFrom::Start(pos))?;

        loop {
            let payload_len = match reader.read_u64::<NetworkEndian>() {
                Ok(len) => len,
                Err(_) => break,
            };
            // payload_len is untrusted; a frame reaching past EOF is a
            // torn or corrupt tail
            if payload_len > file_size - (pos + FRAME_HEADER_SIZE) {
                warn!(
                    "truncated frame at position {} in {:?}, stopping scan",
                    pos, self.path
                );
                break;
            }
            if current_offset < start_offset {
                reader.seek_relative(payload_len as i64)?;
            } else {
                let mut payload = vec![0u8; payload_len as usize];
                reader.read_exact(&mut payload)?;
                match Record::from_binary(current_offset, &mut payload.as_slice()) {
                    Ok(record) => records.push(record),
                    Err(_) => {
                        warn!(
                            "malformed record at offset {} in {:?}, stopping scan",
                            current_offset, self.path
                        );
                        break;
                    }
                }
                if max_records > 0 && records.len() >= max_records {
                    break;
                }
            }
            pos += FRAME_HEADER_SIZE + payload_len;
            current_offset += 1;
        }

        Ok(records)
    }

    /// Current data file size in bytes, used to drive segment rolling.
    pub fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

/// Walks the data file frame-by-frame, yielding the `(offset, position)`
/// pair of every complete frame. A torn frame at the tail ends the walk.
fn scan_frames(file: &File, base_offset: u64) -> Result<Vec<(u64, u64)>> {
    let file_size = file.metadata()?.len();
    let mut entries = Vec::new();
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(0))?;

    let mut pos = 0u64;
    let mut offset = base_offset;
    loop {
        let payload_len = match reader.read_u64::<NetworkEndian>() {
            Ok(len) => len,
            Err(_) => break,
        };
        if payload_len > file_size - (pos + FRAME_HEADER_SIZE) {
            break;
        }
        reader.seek_relative(payload_len as i64)?;
        entries.push((offset, pos));
        pos += FRAME_HEADER_SIZE + payload_len;
        offset += 1;
    }

    Ok(entries)
}
