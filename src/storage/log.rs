//! An ordered sequence of segments for one partition. The segment with the
//! greatest base offset is the active one and takes all appends; a
//! size-triggered roll seals it and opens a fresh segment at its
//! `next_offset`.
use crate::error::{Error, Result};
use crate::storage::record::Record;
use crate::storage::segment::Segment;
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

pub struct Log {
    inner: Mutex<LogInner>,
}

struct LogInner {
    dir: PathBuf,
    max_segment_bytes: u64,
    segments: Vec<Segment>,
}

impl Log {
    /// Opens the log at `dir`, creating the directory if needed. Every
    /// `*.log` file found is opened as a segment, in ascending base-offset
    /// order; an empty directory gets a first segment at base offset 0.
    pub fn open(dir: impl Into<PathBuf>, max_segment_bytes: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut bases = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "log") {
                continue;
            }
            let base = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
                .ok_or_else(|| Error::InvalidSegmentFile(path.clone()))?;
            bases.push(base);
        }
        bases.sort_unstable();

        let mut segments = Vec::with_capacity(bases.len().max(1));
        for base in bases {
            segments.push(Segment::open(&dir, base)?);
        }
        if segments.is_empty() {
            segments.push(Segment::open(&dir, 0)?);
        }
        info!("opened log at {:?} with {} segment(s)", dir, segments.len());

        Ok(Self {
            inner: Mutex::new(LogInner {
                dir,
                max_segment_bytes,
                segments,
            }),
        })
    }

    /// Appends one record with the current wall-clock timestamp and returns
    /// its assigned offset. Rolls the active segment once its data file has
    /// reached the configured size.
    pub fn append(&self, key: &[u8], value: &[u8]) -> Result<u64> {
        let mut inner = self.inner.lock();
        let mut record = Record::new(key.to_vec(), value.to_vec());
        let offset = inner.active_mut().append(&mut record)?;
        if inner.active().size()? >= inner.max_segment_bytes {
            inner.roll()?;
        }
        Ok(offset)
    }

    /// Reads up to `max_records` records starting at `start_offset`,
    /// walking segments in offset order. `max_records == 0` reads to the
    /// end of the log. A start past the end yields an empty vec.
    pub fn read(&self, start_offset: u64, max_records: usize) -> Result<Vec<Record>> {
        let inner = self.inner.lock();
        let mut records = Vec::new();
        let mut offset = start_offset;
        for segment in &inner.segments {
            if offset >= segment.next_offset {
                continue;
            }
            let remaining = if max_records > 0 {
                max_records - records.len()
            } else {
                0
            };
            let mut batch = segment.read_from(offset, remaining)?;
            records.append(&mut batch);
            offset = segment.next_offset;
            if max_records > 0 && records.len() >= max_records {
                break;
            }
        }
        Ok(records)
    }
}

impl LogInner {
    fn active(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }

    fn active_mut(&mut self) -> &mut Segment {
        let last = self.segments.len() - 1;
        &mut self.segments[last]
    }

    // The sealed segment's file handle stays open; it only serves reads
    // from here on.
    fn roll(&mut self) -> Result<()> {
        let base = self.active().next_offset;
        debug!("rolling segment in {:?}, new base offset {}", self.dir, base);
        let segment = Segment::open(&self.dir, base)?;
        self.segments.push(segment);
        Ok(())
    }
}
