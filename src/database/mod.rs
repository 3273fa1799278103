//! Analysis database collaborator.
//!
//! The binding layer never analyzes anything itself. Switch descriptors,
//! import tables and names come from an [`AnalysisDatabase`], which is the
//! seam where a disassembler SDK plugs in. [`MemoryDatabase`] is the
//! in-process implementation.

pub mod memory;
pub mod pe;

pub use memory::MemoryDatabase;

use serde::{Deserialize, Serialize};

use crate::core::switch_info::SwitchInfo;
use crate::core::{Ea, Uval};

/// One imported symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportEntry {
    /// Address of the import slot
    pub ea: Ea,
    /// Imported name; `None` for imports by ordinal
    pub name: Option<String>,
    /// Ordinal; 0 for imports by name
    pub ordinal: Uval,
}

impl ImportEntry {
    pub fn by_name(ea: Ea, name: impl Into<String>) -> Self {
        Self {
            ea,
            name: Some(name.into()),
            ordinal: 0,
        }
    }

    pub fn by_ordinal(ea: Ea, ordinal: Uval) -> Self {
        Self {
            ea,
            name: None,
            ordinal,
        }
    }
}

/// A module the program imports from, with its entries in table order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportModule {
    pub name: String,
    pub entries: Vec<ImportEntry>,
}

/// Per-item enumeration callback: `1` continues, `<= 0` stops and becomes
/// the enumeration result.
pub type ImportVisitor<'a> = dyn FnMut(&ImportEntry) -> i32 + 'a;

/// Queries and updates the binding layer forwards to the analysis engine.
pub trait AnalysisDatabase {
    /// Switch descriptor recorded at `ea`.
    fn switch_info(&self, ea: Ea) -> Option<SwitchInfo>;

    /// Record a switch descriptor at `ea`, replacing any previous one.
    fn store_switch_info(&mut self, ea: Ea, info: &SwitchInfo);

    /// Forget the switch descriptor at `ea`.
    fn remove_switch_info(&mut self, ea: Ea);

    /// Number of import modules.
    fn import_module_qty(&self) -> usize;

    /// Name of the import module at `index`.
    fn import_module_name(&self, index: i32) -> Option<String>;

    /// Display name of whatever is at `ea`.
    fn name_at(&self, ea: Ea) -> Option<String>;

    /// Push every import of module `index` into `visitor`.
    ///
    /// Returns 1 when all items were visited, the visitor's code when it
    /// stopped early, and -1 when `index` is not a valid module.
    fn enum_import_names(&self, index: i32, visitor: &mut ImportVisitor<'_>) -> i32;
}
