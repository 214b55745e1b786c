//! A key/value record, the smallest unit held by the log.
//!
//! A `Record` carries an offset assigned by the segment at append time, a
//! creation timestamp and opaque key/value bytes. Records are immutable once
//! appended; on disk they are written length-prefix framed, with the offset
//! implied by the append order rather than stored in the payload.
use crate::error::{Error, Result};
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use chrono::{TimeZone, Utc};
use std::fmt;
use std::io::{self, Read, Write};
use std::mem::size_of;

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub offset: u64,
    pub timestamp: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dt = Utc.timestamp_nanos(self.timestamp);
        write!(
            f,
            "{} - offset: {} ({} bytes)",
            dt,
            self.offset,
            self.value.len()
        )
    }
}

impl Record {
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Record {
        Self {
            offset: 0,
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            key,
            value,
        }
    }

    pub fn binary_size(&self) -> usize {
        size_of::<u32>() + self.key.len() + size_of::<u32>() + self.value.len() + size_of::<u64>()
    }

    pub fn write(&self, buf: &mut impl Write) -> io::Result<usize> {
        buf.write_u32::<NetworkEndian>(self.key.len() as u32)?;
        buf.write_all(&self.key)?;
        buf.write_u32::<NetworkEndian>(self.value.len() as u32)?;
        buf.write_all(&self.value)?;
        buf.write_u64::<NetworkEndian>(self.timestamp as u64)?;
        Ok(self.binary_size())
    }

    /// Decodes one record payload, stamping `offset` onto the result. A
    /// truncated payload is a decode failure; readers treat it as
    /// end-of-segment.
    pub fn from_binary(offset: u64, buf: &mut impl Read) -> Result<Self> {
        let mut read = || -> io::Result<Record> {
            let key_size = buf.read_u32::<NetworkEndian>()?;
            let mut key = vec![0u8; key_size as usize];
            buf.read_exact(&mut key)?;
            let value_size = buf.read_u32::<NetworkEndian>()?;
            let mut value = vec![0u8; value_size as usize];
            buf.read_exact(&mut value)?;
            let timestamp = buf.read_u64::<NetworkEndian>()? as i64;
            Ok(Record {
                offset,
                timestamp,
                key,
                value,
            })
        };
        read().map_err(|_| Error::Decode { offset })
    }
}
