use crate::error::VgateError;
use crate::key::{Destination, KEYSPACE_ID_LEN, decode_keyspace_id, encode_keyspace_id};
use crate::value::Value;
use crate::vindex::{ReverseMapError, Reversible, Vindex, check_verify_lengths};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const SLOT_MASK_TYPE: &str = "slot_mask";
pub const PARAM_RANGE_SIZE: &str = "shard_range_size";
pub const PARAM_SLOT_RANGE: &str = "shard_slot_range";
pub const PARAM_SLOT_MASK: &str = "shard_slot_mask";

/// Parameters of a slot-mask vindex. Zero when not supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotMaskParams {
    pub range_size: u64,
    pub slot_range: u64,
    pub mask: u64,
}

impl SlotMaskParams {
    /// Parses the base-16 parameters. Unknown keys are ignored and the three
    /// values are not checked against each other.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self, VgateError> {
        Ok(Self {
            range_size: parse_hex_param(params, PARAM_RANGE_SIZE)?,
            slot_range: parse_hex_param(params, PARAM_SLOT_RANGE)?,
            mask: parse_hex_param(params, PARAM_SLOT_MASK)?,
        })
    }

    fn offset(&self, value: u64) -> u64 {
        let slot = value & self.mask;
        // A zero slot range puts every slot in range 0.
        let range = slot.checked_div(self.slot_range).unwrap_or(0);
        self.range_size.wrapping_mul(range)
    }

    pub fn id_to_routing_value(&self, id: u64) -> u64 {
        id.wrapping_add(self.offset(id))
    }

    pub fn routing_value_to_id(&self, value: u64) -> u64 {
        value.wrapping_sub(self.offset(value))
    }
}

fn parse_hex_param(params: &BTreeMap<String, String>, key: &str) -> Result<u64, VgateError> {
    let Some(raw) = params.get(key) else {
        return Ok(0);
    };
    // from_str_radix tolerates a leading '+'; hex params are bare digits.
    if raw.starts_with('+') {
        return Err(VgateError::InvalidConfig {
            message: format!("{key}: parsing {raw:?}: invalid syntax"),
        });
    }
    u64::from_str_radix(raw, 16).map_err(|e| VgateError::InvalidConfig {
        message: format!("{key}: parsing {raw:?}: {e}"),
    })
}

/// Reversible vindex that spreads ids across ranges by their masked slot:
/// `ksid = id + range_size * ((id & mask) / slot_range)`.
#[derive(Debug, Clone)]
pub struct SlotMask {
    name: String,
    params: SlotMaskParams,
}

impl SlotMask {
    pub fn new(name: &str, params: &BTreeMap<String, String>) -> Result<Self, VgateError> {
        Ok(Self {
            name: name.to_string(),
            params: SlotMaskParams::from_params(params)?,
        })
    }

    pub fn params(&self) -> SlotMaskParams {
        self.params
    }

    pub fn id_to_keyspace_id(&self, id: &Value) -> Result<[u8; KEYSPACE_ID_LEN], VgateError> {
        let num = id.to_u64()?;
        Ok(encode_keyspace_id(self.params.id_to_routing_value(num)))
    }

    pub fn keyspace_id_to_id(&self, ksid: &[u8]) -> Result<Value, VgateError> {
        let value = decode_keyspace_id(ksid).ok_or(VgateError::KeyspaceIdLength {
            vindex: "SlotMask",
            len: ksid.len(),
        })?;
        Ok(Value::Uint64(self.params.routing_value_to_id(value)))
    }
}

pub(crate) fn construct(
    name: &str,
    params: &BTreeMap<String, String>,
) -> Result<Arc<dyn Vindex>, VgateError> {
    Ok(Arc::new(SlotMask::new(name, params)?))
}

impl Vindex for SlotMask {
    fn name(&self) -> &str {
        &self.name
    }

    fn cost(&self) -> i32 {
        1
    }

    fn is_unique(&self) -> bool {
        true
    }

    fn needs_vcursor(&self) -> bool {
        false
    }

    /// Ids that cannot be converted map to an all-zero keyspace id rather than
    /// failing the batch.
    fn map(&self, ids: &[Value]) -> Result<Vec<Destination>, VgateError> {
        Ok(ids
            .iter()
            .map(|id| {
                let ksid = self
                    .id_to_keyspace_id(id)
                    .unwrap_or([0u8; KEYSPACE_ID_LEN]);
                Destination::KeyspaceId(ksid.to_vec())
            })
            .collect())
    }

    fn verify(&self, ids: &[Value], ksids: &[Vec<u8>]) -> Result<Vec<bool>, VgateError> {
        check_verify_lengths(ids, ksids)?;
        ids.iter()
            .zip(ksids)
            .map(|(id, ksid)| {
                let computed = self.id_to_keyspace_id(id)?;
                Ok::<bool, VgateError>(computed.as_slice() == ksid.as_slice())
            })
            .collect()
    }

    fn as_reversible(&self) -> Option<&dyn Reversible> {
        Some(self)
    }
}

impl Reversible for SlotMask {
    fn reverse_map(&self, ksids: &[Vec<u8>]) -> Result<Vec<Value>, ReverseMapError> {
        let mut decoded = Vec::with_capacity(ksids.len());
        for ksid in ksids {
            match self.keyspace_id_to_id(ksid) {
                Ok(id) => decoded.push(id),
                Err(source) => return Err(ReverseMapError { decoded, source }),
            }
        }
        Ok(decoded)
    }
}
