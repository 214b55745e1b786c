//! Durable offset → byte-position mapping for one segment, mirrored in
//! memory for O(1) lookups on the read path.
use crate::error::Result;
use crate::storage::segment::segment_filename;
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const ENTRY_SIZE: usize = 16;

#[derive(Debug)]
pub struct Index {
    file: File,
    path: PathBuf,
    table: HashMap<u64, u64>,
}

impl Index {
    /// Opens (creating if absent) the index file named after `base_offset`
    /// and loads every entry into the in-memory table. A partial trailing
    /// entry is ignored.
    pub fn open(dir: &Path, base_offset: u64) -> Result<Self> {
        let path = dir
            .join(segment_filename(base_offset))
            .with_extension("index");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let mut index = Self {
            file,
            path,
            table: HashMap::new(),
        };
        index.load()?;
        Ok(index)
    }

    fn load(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(&self.file);
        loop {
            let offset = match reader.read_u64::<NetworkEndian>() {
                Ok(offset) => offset,
                Err(_) => break,
            };
            let position = match reader.read_u64::<NetworkEndian>() {
                Ok(position) => position,
                Err(_) => break,
            };
            self.table.insert(offset, position);
        }
        Ok(())
    }

    /// Appends one entry and fsyncs it before the in-memory table is
    /// updated, so a served lookup always refers to a durable entry.
    pub fn write(&mut self, offset: u64, position: u64) -> Result<()> {
        self.file.seek(SeekFrom::End(0))?;
        let mut buf = Vec::with_capacity(ENTRY_SIZE);
        buf.write_u64::<NetworkEndian>(offset)?;
        buf.write_u64::<NetworkEndian>(position)?;
        self.file.write_all(&buf)?;
        self.file.sync_all()?;
        self.table.insert(offset, position);
        Ok(())
    }

    pub fn lookup(&self, offset: u64) -> Option<u64> {
        self.table.get(&offset).copied()
    }

    pub fn entry_count(&self) -> usize {
        self.table.len()
    }

    /// Replaces the whole index, on disk and in memory, with the given
    /// entries. Used when the data file scan disagrees with the index at
    /// segment open.
    pub fn rebuild(&mut self, entries: &[(u64, u64)]) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        let mut writer = BufWriter::new(&self.file);
        for (offset, position) in entries {
            writer.write_u64::<NetworkEndian>(*offset)?;
            writer.write_u64::<NetworkEndian>(*position)?;
        }
        writer.flush()?;
        self.file.sync_all()?;
        self.table = entries.iter().copied().collect();
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod index_tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_open() {
        let tmp_dir = TempDir::new("test_tempdir").unwrap();
        let expected_file = tmp_dir.path().join("00000000000000000000.index");

        let index = Index::open(tmp_dir.path(), 0).unwrap();

        assert!(expected_file.as_path().exists());
        assert_eq!(index.entry_count(), 0);
        tmp_dir.close().unwrap();
    }

    #[test]
    fn test_write_and_lookup() {
        let tmp_dir = TempDir::new("test_tempdir").unwrap();
        let expected_file = tmp_dir.path().join("00000000000000000000.index");

        let mut index = Index::open(tmp_dir.path(), 0).unwrap();
        index.write(12, 400).unwrap();

        assert_eq!(
            fs::read(&expected_file).unwrap(),
            &[0, 0, 0, 0, 0, 0, 0, 12, 0, 0, 0, 0, 0, 0, 1, 144]
        );
        assert_eq!(index.lookup(12), Some(400));
        assert_eq!(index.lookup(13), None);

        index.write(13, 1011).unwrap();
        assert_eq!(index.entry_count(), 2);
        assert_eq!(fs::read(&expected_file).unwrap().len(), ENTRY_SIZE * 2);
        tmp_dir.close().unwrap();
    }

    #[test]
    fn test_open_existing() {
        let tmp_dir = TempDir::new("test_tempdir").unwrap();

        let mut index = Index::open(tmp_dir.path(), 48).unwrap();
        index.write(48, 0).unwrap();
        index.write(49, 77).unwrap();
        drop(index);

        let index = Index::open(tmp_dir.path(), 48).unwrap();
        assert_eq!(index.entry_count(), 2);
        assert_eq!(index.lookup(49), Some(77));
        tmp_dir.close().unwrap();
    }

    #[test]
    fn test_partial_trailing_entry_ignored() {
        let tmp_dir = TempDir::new("test_tempdir").unwrap();
        let path = tmp_dir.path().join("00000000000000000000.index");

        let mut index = Index::open(tmp_dir.path(), 0).unwrap();
        index.write(0, 0).unwrap();
        drop(index);

        let mut raw = fs::read(&path).unwrap();
        raw.extend_from_slice(&[0, 0, 0, 0, 0]);
        fs::write(&path, &raw).unwrap();

        let index = Index::open(tmp_dir.path(), 0).unwrap();
        assert_eq!(index.entry_count(), 1);
        assert_eq!(index.lookup(0), Some(0));
        tmp_dir.close().unwrap();
    }

    #[test]
    fn test_rebuild() {
        let tmp_dir = TempDir::new("test_tempdir").unwrap();
        let path = tmp_dir.path().join("00000000000000000000.index");

        let mut index = Index::open(tmp_dir.path(), 0).unwrap();
        index.write(0, 0).unwrap();

        index.rebuild(&[(0, 0), (1, 30), (2, 60)]).unwrap();

        assert_eq!(index.entry_count(), 3);
        assert_eq!(index.lookup(2), Some(60));
        assert_eq!(fs::read(&path).unwrap().len(), ENTRY_SIZE * 3);

        let reopened = Index::open(tmp_dir.path(), 0).unwrap();
        assert_eq!(reopened.entry_count(), 3);
        assert_eq!(reopened.lookup(1), Some(30));
        tmp_dir.close().unwrap();
    }
}
