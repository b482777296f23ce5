use crate::error::VgateError;
use crate::key::Destination;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabletType {
    #[default]
    Primary,
    Replica,
    Rdonly,
}

impl TabletType {
    pub fn parse(raw: &str) -> Result<Self, VgateError> {
        match raw.to_ascii_lowercase().as_str() {
            "primary" | "master" => Ok(TabletType::Primary),
            "replica" => Ok(TabletType::Replica),
            "rdonly" | "batch" => Ok(TabletType::Rdonly),
            _ => Err(VgateError::InvalidArgument(format!(
                "unknown tablet type: {raw}"
            ))),
        }
    }
}

impl fmt::Display for TabletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabletType::Primary => write!(f, "primary"),
            TabletType::Replica => write!(f, "replica"),
            TabletType::Rdonly => write!(f, "rdonly"),
        }
    }
}

/// Narrowing of a session to part of its keyspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TargetDestination {
    Shard(String),
    /// Half-open range; an empty bound is unbounded.
    KeyRange { start: Vec<u8>, end: Vec<u8> },
    KeyspaceId(Vec<u8>),
}

impl From<&TargetDestination> for Destination {
    fn from(target: &TargetDestination) -> Self {
        match target {
            TargetDestination::Shard(shard) => Destination::Shard(shard.clone()),
            TargetDestination::KeyRange { start, end } => Destination::KeyRange {
                start: start.clone(),
                end: end.clone(),
            },
            TargetDestination::KeyspaceId(ksid) => Destination::KeyspaceId(ksid.clone()),
        }
    }
}

/// The database a session is pointed at: `ks[:shard|/shard|[range]][@type]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SessionTarget {
    pub keyspace: Option<String>,
    pub destination: Option<TargetDestination>,
    pub tablet_type: TabletType,
}

impl SessionTarget {
    pub fn keyspace(keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: Some(keyspace.into()),
            ..Self::default()
        }
    }

    /// Where statements for `keyspace` go from this session: the session's
    /// narrowing when it targets that keyspace, every shard otherwise.
    pub fn destination_for(&self, keyspace: &str) -> Destination {
        match &self.destination {
            Some(target) if self.keyspace.as_deref() == Some(keyspace) => target.into(),
            _ => Destination::AllShards,
        }
    }

    pub fn parse(target: &str) -> Result<Self, VgateError> {
        let mut rest = target.trim();
        let mut tablet_type = TabletType::default();
        if let Some(at) = rest.rfind('@') {
            tablet_type = TabletType::parse(&rest[at + 1..])?;
            rest = &rest[..at];
        }

        let mut destination = None;
        if let Some(sep) = rest.rfind([':', '/']) {
            destination = Some(TargetDestination::Shard(rest[sep + 1..].to_string()));
            rest = &rest[..sep];
        }

        if let Some(open) = rest.rfind('[') {
            let close = rest.rfind(']').filter(|c| *c > open).ok_or_else(|| {
                VgateError::InvalidArgument(
                    "invalid key range provided. Couldn't find range end ']'".into(),
                )
            })?;
            let inner = &rest[open + 1..close];
            destination = Some(if let Some((start, end)) = inner.split_once('-') {
                TargetDestination::KeyRange {
                    start: decode_hex(start)?,
                    end: decode_hex(end)?,
                }
            } else {
                TargetDestination::KeyspaceId(decode_hex(inner)?)
            });
            rest = &rest[..open];
        }

        Ok(Self {
            keyspace: (!rest.is_empty()).then(|| rest.to_string()),
            destination,
            tablet_type,
        })
    }
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, VgateError> {
    hex::decode(raw).map_err(|e| VgateError::InvalidArgument(format!("invalid hex {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::{SessionTarget, TabletType, TargetDestination};
    use crate::error::VgateError;
    use crate::key::Destination;

    #[test]
    fn bare_keyspace() {
        let t = SessionTarget::parse("user").expect("parse");
        assert_eq!(t, SessionTarget::keyspace("user"));
        assert_eq!(SessionTarget::parse("").expect("empty").keyspace, None);
    }

    #[test]
    fn shard_suffix_and_tablet_type() {
        let t = SessionTarget::parse("user:-80@replica").expect("parse");
        assert_eq!(t.keyspace.as_deref(), Some("user"));
        assert_eq!(t.destination, Some(TargetDestination::Shard("-80".into())));
        assert_eq!(t.tablet_type, TabletType::Replica);

        let t = SessionTarget::parse("user/80-").expect("parse");
        assert_eq!(t.destination, Some(TargetDestination::Shard("80-".into())));
        assert_eq!(t.tablet_type, TabletType::Primary);
    }

    #[test]
    fn bracketed_range_or_keyspace_id() {
        let t = SessionTarget::parse("user[40-80]").expect("parse");
        assert_eq!(
            t.destination,
            Some(TargetDestination::KeyRange {
                start: vec![0x40],
                end: vec![0x80],
            })
        );
        let t = SessionTarget::parse("user[-80]@rdonly").expect("parse");
        assert_eq!(
            t.destination,
            Some(TargetDestination::KeyRange {
                start: vec![],
                end: vec![0x80],
            })
        );
        let t = SessionTarget::parse("user[0102]").expect("parse");
        assert_eq!(t.destination, Some(TargetDestination::KeyspaceId(vec![1, 2])));
    }

    #[test]
    fn malformed_targets_are_rejected() {
        assert!(matches!(
            SessionTarget::parse("user[40-80"),
            Err(VgateError::InvalidArgument(_))
        ));
        assert!(matches!(
            SessionTarget::parse("user[zz]"),
            Err(VgateError::InvalidArgument(_))
        ));
        assert!(matches!(
            SessionTarget::parse("user@leader"),
            Err(VgateError::InvalidArgument(_))
        ));
    }

    #[test]
    fn narrowing_applies_only_to_the_session_keyspace() {
        let t = SessionTarget::parse("user/-80").expect("parse");
        assert_eq!(t.destination_for("user"), Destination::Shard("-80".into()));
        assert_eq!(t.destination_for("main"), Destination::AllShards);
        assert_eq!(
            SessionTarget::keyspace("user").destination_for("user"),
            Destination::AllShards
        );
    }
}
