//! In-memory analysis database.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::{AnalysisDatabase, ImportEntry, ImportModule, ImportVisitor};
use crate::core::switch_info::SwitchInfo;
use crate::core::Ea;
use crate::error::Result;

/// Database held entirely in memory. Serializable as a JSON snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDatabase {
    switches: BTreeMap<Ea, SwitchInfo>,
    modules: Vec<ImportModule>,
    names: BTreeMap<Ea, String>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an import module and return its index.
    pub fn add_import_module(&mut self, name: impl Into<String>) -> usize {
        self.modules.push(ImportModule {
            name: name.into(),
            entries: Vec::new(),
        });
        self.modules.len() - 1
    }

    /// Append an import to module `index`. Returns false for a bad index.
    pub fn add_import(&mut self, index: usize, entry: ImportEntry) -> bool {
        match self.modules.get_mut(index) {
            Some(module) => {
                module.entries.push(entry);
                true
            }
            None => false,
        }
    }

    pub fn set_name(&mut self, ea: Ea, name: impl Into<String>) {
        self.names.insert(ea, name.into());
    }

    pub fn modules(&self) -> &[ImportModule] {
        &self.modules
    }

    /// Addresses with a recorded switch, ascending.
    pub fn switch_addresses(&self) -> impl Iterator<Item = Ea> + '_ {
        self.switches.keys().copied()
    }

    /// Build a database from the import directories of a PE image.
    pub fn from_pe_bytes(data: &[u8]) -> Result<Self> {
        let image = super::pe::parse_imports(data)?;
        let mut db = Self::new();
        for module in image.modules {
            for entry in &module.entries {
                if let Some(name) = &entry.name {
                    db.names.insert(entry.ea, format!("__imp_{}", name));
                }
            }
            db.modules.push(module);
        }
        debug!(
            modules = db.modules.len(),
            image_base = image.image_base,
            "loaded PE import table"
        );
        Ok(db)
    }

    pub fn from_pe_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_pe_bytes(&data)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn module(&self, index: i32) -> Option<&ImportModule> {
        usize::try_from(index).ok().and_then(|i| self.modules.get(i))
    }
}

impl AnalysisDatabase for MemoryDatabase {
    fn switch_info(&self, ea: Ea) -> Option<SwitchInfo> {
        self.switches.get(&ea).copied()
    }

    fn store_switch_info(&mut self, ea: Ea, info: &SwitchInfo) {
        self.switches.insert(ea, *info);
    }

    fn remove_switch_info(&mut self, ea: Ea) {
        self.switches.remove(&ea);
    }

    fn import_module_qty(&self) -> usize {
        self.modules.len()
    }

    fn import_module_name(&self, index: i32) -> Option<String> {
        self.module(index).map(|m| m.name.clone())
    }

    fn name_at(&self, ea: Ea) -> Option<String> {
        self.names.get(&ea).cloned()
    }

    fn enum_import_names(&self, index: i32, visitor: &mut ImportVisitor<'_>) -> i32 {
        let Some(module) = self.module(index) else {
            return -1;
        };
        for entry in &module.entries {
            let code = visitor(entry);
            if code <= 0 {
                return code;
            }
        }
        1
    }
}
