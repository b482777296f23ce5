use crate::key::Destination;
use crate::session::TabletType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyspaceRef {
    pub name: String,
    pub sharded: bool,
}

/// Sends one query to the shards selected by `destination`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Send {
    pub keyspace: KeyspaceRef,
    pub destination: Destination,
    #[serde(default)]
    pub tablet_type: TabletType,
    pub query: String,
    pub is_dml: bool,
    pub single_shard_only: bool,
}

/// Execution plan handed to the engine. `Concatenate` runs its sources in
/// order and appends their results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Primitive {
    Send(Send),
    Concatenate { sources: Vec<Primitive> },
}

impl Primitive {
    /// Every send in execution order.
    pub fn sends(&self) -> Vec<&Send> {
        match self {
            Primitive::Send(send) => vec![send],
            Primitive::Concatenate { sources } => sources.iter().flat_map(|p| p.sends()).collect(),
        }
    }

    pub fn keyspaces(&self) -> Vec<&str> {
        self.sends()
            .into_iter()
            .map(|s| s.keyspace.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyspaceRef, Primitive, Send};
    use crate::key::Destination;
    use crate::session::TabletType;

    fn send(ks: &str, query: &str) -> Primitive {
        Primitive::Send(Send {
            keyspace: KeyspaceRef {
                name: ks.into(),
                sharded: false,
            },
            destination: Destination::AllShards,
            tablet_type: TabletType::Primary,
            query: query.into(),
            is_dml: false,
            single_shard_only: false,
        })
    }

    #[test]
    fn sends_flatten_in_order() {
        let plan = Primitive::Concatenate {
            sources: vec![send("main", "q1"), send("user", "q2")],
        };
        assert_eq!(plan.keyspaces(), vec!["main", "user"]);
        assert_eq!(send("main", "q").sends().len(), 1);
    }

    #[test]
    fn json_is_tagged_by_operator() {
        let json = serde_json::to_value(Primitive::Concatenate {
            sources: vec![send("main", "q1")],
        })
        .expect("json");
        assert_eq!(json["op"], "concatenate");
        assert_eq!(json["sources"][0]["op"], "send");
        assert_eq!(json["sources"][0]["query"], "q1");
    }
}
