use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Identity of the principal issuing a statement, as yielded by the
/// authentication layer in front of the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CallerContext {
    pub caller_id: String,
}

impl CallerContext {
    pub fn new(caller_id: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum AclState {
    #[default]
    Nobody,
    Everyone,
    Users(BTreeSet<String>),
}

impl AclState {
    fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if spec.is_empty() {
            return AclState::Nobody;
        }
        if spec == "%" {
            return AclState::Everyone;
        }
        let users: BTreeSet<String> = spec
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();
        if users.is_empty() {
            AclState::Nobody
        } else {
            AclState::Users(users)
        }
    }
}

/// Allow-list gating vschema mutations.
///
/// Clones share state, so a reload through any handle is seen by every
/// planner holding one.
#[derive(Debug, Clone, Default)]
pub struct VschemaAcl {
    state: Arc<RwLock<AclState>>,
}

impl VschemaAcl {
    pub fn new(spec: &str) -> Self {
        let acl = Self::default();
        acl.reload(spec);
        acl
    }

    /// Replaces the allow-list. Takes effect for the next authorization check.
    pub fn reload(&self, spec: &str) {
        let next = AclState::parse(spec);
        if next == AclState::Everyone {
            tracing::warn!("vschema ACL allows every caller to perform vschema operations");
        }
        *self.state.write() = next;
    }

    pub fn authorized(&self, caller: &CallerContext) -> bool {
        match &*self.state.read() {
            AclState::Nobody => false,
            AclState::Everyone => true,
            AclState::Users(users) => users.contains(&caller.caller_id),
        }
    }
}
