use crate::error::RingError;
use crate::worker::types::ShardId;

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Number of points each shard occupies on the ring.
const VIRTUAL_NODES: usize = 64;

/// Ring membership as pushed by the coordinator: `shard_id -> host:port`.
pub type RingMembership = BTreeMap<ShardId, String>;

/// Consistent hash ring over a set of shard identifiers.
///
/// Built once from the full membership; there is no incremental add/remove,
/// a membership change rebuilds the ring from scratch.
#[derive(Debug, Clone)]
pub struct HashRing {
    points: BTreeMap<u64, ShardId>,
    shards: Vec<ShardId>,
}

impl HashRing {
    pub fn build<I>(shards: I) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = ShardId>,
    {
        let mut shards: Vec<ShardId> = shards.into_iter().collect();
        shards.sort_by(|a, b| a.0.cmp(&b.0));
        shards.dedup();

        if shards.is_empty() {
            return Err(RingError::Empty);
        }

        let mut points = BTreeMap::new();
        for shard in &shards {
            for replica in 0..VIRTUAL_NODES {
                let point = hash_key(&format!("{}#{}", shard.0, replica));
                // On the (unlikely) collision the lexically smaller shard keeps the point,
                // since shards are visited in sorted order.
                points.entry(point).or_insert_with(|| shard.clone());
            }
        }

        tracing::debug!(
            "Built hash ring with {} shards ({} points)",
            shards.len(),
            points.len()
        );

        Ok(Self { points, shards })
    }

    pub fn from_membership(membership: &RingMembership) -> Result<Self, RingError> {
        Self::build(membership.keys().cloned())
    }

    /// Returns the shard owning `key`: the first ring point clockwise from the key's hash.
    pub fn owner(&self, key: &str) -> &ShardId {
        let hash = hash_key(key);

        self.points
            .range(hash..)
            .next()
            .or_else(|| self.points.iter().next())
            .map(|(_, shard)| shard)
            // build() rejects empty shard sets, so the ring always has points
            .unwrap_or(&self.shards[0])
    }

    pub fn shards(&self) -> &[ShardId] {
        &self.shards
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn contains(&self, shard: &ShardId) -> bool {
        self.shards.binary_search_by(|s| s.0.cmp(&shard.0)).is_ok()
    }
}

fn hash_key(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
