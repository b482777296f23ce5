use crate::error::VgateError;
use crate::vindex::{Vindex, numeric, slot_mask};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Builds a vindex from its declared name and `with` parameters.
pub type VindexConstructor =
    fn(&str, &BTreeMap<String, String>) -> Result<Arc<dyn Vindex>, VgateError>;

/// Maps vindex type names to constructors.
#[derive(Clone, Default)]
pub struct VindexRegistry {
    constructors: HashMap<String, VindexConstructor>,
}

impl fmt::Debug for VindexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VindexRegistry")
            .field("types", &self.types())
            .finish()
    }
}

static BUILTIN: LazyLock<Arc<VindexRegistry>> = LazyLock::new(|| {
    let mut registry = VindexRegistry::default();
    registry.register_builtin();
    Arc::new(registry)
});

impl VindexRegistry {
    /// Process-wide registry holding every vindex type shipped with the crate.
    pub fn builtin() -> Arc<VindexRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// A fresh registry with the shipped types, open to further registration.
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.constructors.insert(slot_mask::SLOT_MASK_TYPE.to_string(), slot_mask::construct);
        self.constructors.insert(numeric::NUMERIC_TYPE.to_string(), numeric::construct);
    }

    pub fn register(
        &mut self,
        vindex_type: &str,
        constructor: VindexConstructor,
    ) -> Result<(), VgateError> {
        if self.constructors.contains_key(vindex_type) {
            return Err(VgateError::InvalidConfig {
                message: format!("vindex type {vindex_type} is already registered"),
            });
        }
        self.constructors.insert(vindex_type.to_string(), constructor);
        Ok(())
    }

    pub fn contains(&self, vindex_type: &str) -> bool {
        self.constructors.contains_key(vindex_type)
    }

    /// Registered type names, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.constructors.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn create(
        &self,
        vindex_type: &str,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Arc<dyn Vindex>, VgateError> {
        let constructor = self
            .constructors
            .get(vindex_type)
            .ok_or_else(|| VgateError::UnknownVindexType(vindex_type.to_string()))?;
        constructor(name, params)
    }
}
