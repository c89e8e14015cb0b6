//! Defines partitioners for distributing data in a shuffle.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

/// Assigns every key to one of `num_partitions` output partitions.
pub trait Partitioner<K>: Send + Sync + Debug {
    fn num_partitions(&self) -> usize;

    /// Destination partition for `key`, always in `0..num_partitions()`.
    fn get_partition(&self, key: &K) -> usize;
}

/// A partitioner that uses the hash of the key to distribute data.
///
/// `DefaultHasher::new()` uses fixed keys, so the assignment is stable
/// across runs of the same binary.
#[derive(Clone, Debug)]
pub struct HashPartitioner {
    num_partitions: usize,
    seed: u64,
}

impl HashPartitioner {
    pub fn new(num_partitions: usize) -> Self {
        Self {
            num_partitions,
            seed: 0, // Default seed
        }
    }

    pub fn with_seed(num_partitions: usize, seed: u64) -> Self {
        Self {
            num_partitions,
            seed,
        }
    }
}

impl<K: Hash> Partitioner<K> for HashPartitioner {
    fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn get_partition(&self, key: &K) -> usize {
        let mut s = DefaultHasher::new();
        self.seed.hash(&mut s);
        key.hash(&mut s);
        (s.finish() % self.num_partitions.max(1) as u64) as usize
    }
}
