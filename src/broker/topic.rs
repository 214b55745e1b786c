use crate::error::{Error, Result};
use crate::storage::Log;

pub struct Partition {
    pub id: u32,
    pub log: Log,
}

/// A named, fixed-length list of partitions. The partition count is set at
/// topic creation and never changes.
pub struct Topic {
    pub name: String,
    partitions: Vec<Partition>,
}

impl Topic {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: Vec::new(),
        }
    }

    pub(crate) fn add_partition(&mut self, partition: Partition) {
        self.partitions.push(partition);
    }

    pub fn partition(&self, id: u32) -> Result<&Partition> {
        self.partitions
            .get(id as usize)
            .ok_or(Error::UnknownPartition(id))
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }
}
