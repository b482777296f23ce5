//! Shard-key mapping functions ("vindexes").
//!
//! A vindex maps a column value to a [`Destination`]. Reversible vindexes can
//! also recover the column value from the routing key, which lets the planner
//! skip a lookup when only the keyspace id is known.

pub mod numeric;
pub mod registry;
pub mod slot_mask;

use crate::error::VgateError;
use crate::key::Destination;
use crate::value::Value;
use std::fmt;
use thiserror::Error;

pub use registry::{VindexConstructor, VindexRegistry};

/// Capability contract shared by all vindex types.
pub trait Vindex: fmt::Debug + Send + Sync {
    /// Name the vindex was declared under in its keyspace.
    fn name(&self) -> &str;

    /// Relative expense hint used to rank candidate vindexes.
    fn cost(&self) -> i32;

    /// True when every valid input maps to exactly one routing key.
    fn is_unique(&self) -> bool;

    /// True when `map`/`verify` need a live connection (lookup vindexes).
    fn needs_vcursor(&self) -> bool;

    /// One destination per input value, in input order.
    fn map(&self, ids: &[Value]) -> Result<Vec<Destination>, VgateError>;

    /// Checks that each id maps to the paired keyspace id.
    fn verify(&self, ids: &[Value], ksids: &[Vec<u8>]) -> Result<Vec<bool>, VgateError>;

    fn as_reversible(&self) -> Option<&dyn Reversible> {
        None
    }
}

/// Vindexes whose mapping can be inverted without a lookup.
pub trait Reversible: Vindex {
    fn reverse_map(&self, ksids: &[Vec<u8>]) -> Result<Vec<Value>, ReverseMapError>;
}

/// A reverse mapping that stopped at the first malformed keyspace id.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ReverseMapError {
    /// Values decoded before the failing key.
    pub decoded: Vec<Value>,
    #[source]
    pub source: VgateError,
}

impl From<ReverseMapError> for VgateError {
    fn from(err: ReverseMapError) -> Self {
        err.source
    }
}

pub(crate) fn check_verify_lengths(ids: &[Value], ksids: &[Vec<u8>]) -> Result<(), VgateError> {
    if ids.len() != ksids.len() {
        return Err(VgateError::InvalidArgument(format!(
            "verify: {} ids but {} keyspace ids",
            ids.len(),
            ksids.len()
        )));
    }
    Ok(())
}
