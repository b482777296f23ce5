use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of every routing key produced by the built-in vindexes.
pub const KEYSPACE_ID_LEN: usize = 8;

/// Where a row, or a statement fragment, has to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    /// Exactly the shard owning this keyspace id.
    KeyspaceId(Vec<u8>),
    /// Every shard of the keyspace.
    AllShards,
    /// A single named shard, e.g. `-80`.
    Shard(String),
    /// Shards overlapping the half-open range; an empty bound is unbounded.
    KeyRange { start: Vec<u8>, end: Vec<u8> },
    /// No shard; the value cannot be routed.
    None,
}

impl Destination {
    pub fn keyspace_id(&self) -> Option<&[u8]> {
        match self {
            Destination::KeyspaceId(ksid) => Some(ksid),
            _ => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::KeyspaceId(ksid) => {
                write!(f, "DestinationKeyspaceID({})", hex::encode(ksid))
            }
            Destination::AllShards => write!(f, "DestinationAllShards()"),
            Destination::Shard(shard) => write!(f, "DestinationShard({shard})"),
            Destination::KeyRange { start, end } => write!(
                f,
                "DestinationKeyRange({}-{})",
                hex::encode(start),
                hex::encode(end)
            ),
            Destination::None => write!(f, "DestinationNone()"),
        }
    }
}

/// Big-endian encoding of a routing value.
pub fn encode_keyspace_id(value: u64) -> [u8; KEYSPACE_ID_LEN] {
    value.to_be_bytes()
}

/// Inverse of [`encode_keyspace_id`]; `None` when the key is not exactly
/// [`KEYSPACE_ID_LEN`] bytes.
pub fn decode_keyspace_id(ksid: &[u8]) -> Option<u64> {
    let bytes: [u8; KEYSPACE_ID_LEN] = ksid.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}
