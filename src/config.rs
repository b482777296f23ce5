use crate::error::VgateError;
use std::path::PathBuf;

pub const DEFAULT_WATCH_BUFFER: usize = 16;

/// Runtime configuration for a gateway instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VgateConfig {
    /// ACL spec for vschema DDL: empty denies everyone, `%` allows everyone,
    /// otherwise a comma-separated list of caller names.
    pub authorized_ddl_users: String,
    /// Per-subscriber buffer for published snapshots. A subscriber that falls
    /// further behind than this is disconnected.
    pub watch_buffer: usize,
    /// Optional JSON vschema loaded when the instance opens.
    pub vschema_path: Option<PathBuf>,
}

impl Default for VgateConfig {
    fn default() -> Self {
        Self {
            authorized_ddl_users: String::new(),
            watch_buffer: DEFAULT_WATCH_BUFFER,
            vschema_path: None,
        }
    }
}

impl VgateConfig {
    /// Pins the DDL allow-list to the given callers.
    pub fn production(authorized_users: &[&str]) -> Self {
        Self {
            authorized_ddl_users: authorized_users.join(","),
            ..Self::default()
        }
    }

    /// Every caller may alter the vschema.
    pub fn development() -> Self {
        Self {
            authorized_ddl_users: "%".to_string(),
            ..Self::default()
        }
    }

    pub fn with_authorized_ddl_users(mut self, spec: impl Into<String>) -> Self {
        self.authorized_ddl_users = spec.into();
        self
    }

    pub fn with_watch_buffer(mut self, watch_buffer: usize) -> Self {
        self.watch_buffer = watch_buffer;
        self
    }

    pub fn with_vschema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vschema_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<(), VgateError> {
        if self.watch_buffer == 0 {
            return Err(VgateError::InvalidConfig {
                message: "watch_buffer must be > 0".into(),
            });
        }
        Ok(())
    }
}
