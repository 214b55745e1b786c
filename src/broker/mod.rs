//! Topic and partition routing over the storage core. The broker owns the
//! topic map and routes a produce call to a partition by hashing the
//! record key.
pub mod topic;

use crate::error::{Error, Result};
use crate::storage::Log;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use topic::{Partition, Topic};

const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x01000193;

pub struct Broker {
    data_dir: PathBuf,
    max_segment_bytes: u64,
    topics: RwLock<HashMap<String, Arc<Topic>>>,
}

impl Broker {
    pub fn new(data_dir: impl Into<PathBuf>, max_segment_bytes: u64) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_segment_bytes,
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a topic with one log per partition under
    /// `<data_dir>/topics/<name>/partition-<i>`. A partition count below 1
    /// is clamped to 1; an existing name is an error.
    pub fn create_topic(&self, name: &str, partitions: u32) -> Result<()> {
        let partitions = partitions.max(1);
        let mut topics = self.topics.write();
        if topics.contains_key(name) {
            return Err(Error::TopicAlreadyExists(name.to_string()));
        }

        let mut topic = Topic::new(name);
        for id in 0..partitions {
            let dir = self
                .data_dir
                .join("topics")
                .join(name)
                .join(format!("partition-{}", id));
            let log = Log::open(dir, self.max_segment_bytes)?;
            topic.add_partition(Partition { id, log });
        }
        topics.insert(name.to_string(), Arc::new(topic));
        info!("created topic {} with {} partition(s)", name, partitions);
        Ok(())
    }

    pub fn get_topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.read().get(name).cloned()
    }

    /// Maps a record key to a partition of `topic`. The FNV-1a hash and the
    /// modulo are contractual: a given (topic, partition count, key) always
    /// routes to the same partition, across restarts included.
    pub fn partition_for_key(&self, topic: &str, key: &[u8]) -> Result<u32> {
        let topic = self
            .get_topic(topic)
            .ok_or_else(|| Error::UnknownTopic(topic.to_string()))?;
        Ok(fnv1a_32(key) % topic.partition_count())
    }
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}
