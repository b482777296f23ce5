use crate::error::VgateError;
use crate::key::{Destination, decode_keyspace_id, encode_keyspace_id};
use crate::value::Value;
use crate::vindex::{ReverseMapError, Reversible, Vindex, check_verify_lengths};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const NUMERIC_TYPE: &str = "numeric";

/// Identity vindex: the keyspace id is the big-endian encoding of the id.
#[derive(Debug, Clone)]
pub struct Numeric {
    name: String,
}

impl Numeric {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

pub(crate) fn construct(
    name: &str,
    _params: &BTreeMap<String, String>,
) -> Result<Arc<dyn Vindex>, VgateError> {
    Ok(Arc::new(Numeric::new(name)))
}

impl Vindex for Numeric {
    fn name(&self) -> &str {
        &self.name
    }

    fn cost(&self) -> i32 {
        0
    }

    fn is_unique(&self) -> bool {
        true
    }

    fn needs_vcursor(&self) -> bool {
        false
    }

    fn map(&self, ids: &[Value]) -> Result<Vec<Destination>, VgateError> {
        Ok(ids
            .iter()
            .map(|id| match id.to_u64() {
                Ok(num) => Destination::KeyspaceId(encode_keyspace_id(num).to_vec()),
                Err(_) => Destination::None,
            })
            .collect())
    }

    fn verify(&self, ids: &[Value], ksids: &[Vec<u8>]) -> Result<Vec<bool>, VgateError> {
        check_verify_lengths(ids, ksids)?;
        let mut out = Vec::with_capacity(ids.len());
        for (id, ksid) in ids.iter().zip(ksids) {
            let num = id.to_u64()?;
            out.push(encode_keyspace_id(num).as_slice() == ksid.as_slice());
        }
        Ok(out)
    }

    fn as_reversible(&self) -> Option<&dyn Reversible> {
        Some(self)
    }
}

impl Reversible for Numeric {
    fn reverse_map(&self, ksids: &[Vec<u8>]) -> Result<Vec<Value>, ReverseMapError> {
        let mut decoded = Vec::with_capacity(ksids.len());
        for ksid in ksids {
            let Some(value) = decode_keyspace_id(ksid) else {
                return Err(ReverseMapError {
                    decoded,
                    source: VgateError::KeyspaceIdLength {
                        vindex: "Numeric",
                        len: ksid.len(),
                    },
                });
            };
            decoded.push(Value::Uint64(value));
        }
        Ok(decoded)
    }
}
