//! Scripting-facing entry points.
//!
//! [`Binding`] ties the handle table to an [`AnalysisDatabase`]. Every entry
//! point resolves its handle first and reports a failed resolution through
//! its return value: getters give [`Value::None`], setters
//! [`BindError::UnresolvedHandle`], lifecycle operations `false`.

use tracing::{debug, trace, warn};

use crate::config::BindingConfig;
use crate::core::field::Field;
use crate::core::handle::{Handle, HandleTable, Ownership};
use crate::core::switch_info::SwitchInfo;
use crate::core::value::Value;
use crate::core::Ea;
use crate::database::AnalysisDatabase;
use crate::enumerate::{import_visitor, ImportVisit};
use crate::error::{BindError, Result};

/// Generates the named getter/setter pair for each field.
macro_rules! field_accessors {
    ($($field:expr => $get:ident, $set:ident;)*) => {
        $(
            pub fn $get(&self, handle: &Value) -> Value {
                self.get_field(handle, $field)
            }

            pub fn $set(&mut self, handle: &Value, value: &Value) -> Result<()> {
                self.set_field(handle, $field, value)
            }
        )*
    };
}

/// Binding state: linked descriptors plus the database they are read from
/// and written to.
#[derive(Debug)]
pub struct Binding<D> {
    handles: HandleTable,
    db: D,
    config: BindingConfig,
}

impl<D: AnalysisDatabase> Binding<D> {
    pub fn new(db: D) -> Self {
        Self::with_config(db, BindingConfig::default())
    }

    pub fn with_config(db: D, config: BindingConfig) -> Self {
        Self {
            handles: HandleTable::new(),
            db,
            config,
        }
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: BindingConfig) {
        self.config = config;
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut D {
        &mut self.db
    }

    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Resolve a handle to its descriptor.
    pub fn resolve(&self, handle: &Value) -> Option<&SwitchInfo> {
        self.handles.resolve(handle)
    }

    // -- field marshaling -------------------------------------------------

    pub fn get_field(&self, handle: &Value, field: Field) -> Value {
        match self.handles.resolve(handle) {
            Some(info) => Value::Int(field.read(info)),
            None => {
                trace!(%field, "get on unresolved handle");
                Value::None
            }
        }
    }

    pub fn set_field(&mut self, handle: &Value, field: Field, value: &Value) -> Result<()> {
        let policy = self.config.truncation;
        let log_truncation = self.config.log_truncation;
        let Some(info) = self.handles.resolve_mut(handle) else {
            trace!(%field, "set on unresolved handle");
            return Err(BindError::UnresolvedHandle);
        };
        let raw = value.as_int().ok_or(BindError::NotANumber {
            field: field.name(),
        })?;
        let stored = field.write(info, raw, policy)?;
        if stored.truncated && log_truncation {
            warn!(
                %field,
                value = %raw,
                stored = %stored.value,
                bits = field.kind().bits(),
                "value truncated to field width"
            );
        }
        Ok(())
    }

    field_accessors! {
        Field::Regdtype => get_regdtype, set_regdtype;
        Field::Flags => get_flags, set_flags;
        Field::Jcases => get_jcases, set_jcases;
        Field::Regnum => get_regnum, set_regnum;
        Field::Ncases => get_ncases, set_ncases;
        Field::Defjump => get_defjump, set_defjump;
        Field::Jumps => get_jumps, set_jumps;
        Field::Elbase => get_elbase, set_elbase;
        Field::Startea => get_startea, set_startea;
        Field::Custom => get_custom, set_custom;
        Field::IndLowcase => get_ind_lowcase, set_ind_lowcase;
        Field::ValuesLowcase => get_values_lowcase, set_values_lowcase;
    }

    // -- lifecycle ----------------------------------------------------------

    /// Create an owned, zeroed descriptor.
    pub fn create_handle(&mut self) -> Handle {
        let handle = self.handles.insert(SwitchInfo::default(), Ownership::Owned);
        debug!(%handle, "created switch descriptor");
        handle
    }

    pub fn create(&mut self) -> Value {
        Value::Handle(self.create_handle())
    }

    /// Free the descriptor behind `handle`. False if it does not resolve.
    pub fn destroy(&mut self, handle: &Value) -> bool {
        let freed = self.handles.remove(handle).is_some();
        debug!(freed, "destroy switch descriptor");
        freed
    }

    /// Memberwise copy of `src` into `dst`. False if either does not resolve.
    pub fn assign(&mut self, dst: &Value, src: &Value) -> bool {
        let Some(source) = self.handles.resolve(src).copied() else {
            return false;
        };
        match self.handles.resolve_mut(dst) {
            Some(target) => {
                *target = source;
                true
            }
            None => false,
        }
    }

    /// Drop one descriptor produced by [`Binding::get_switch_info`]. False for
    /// owned or unresolvable handles.
    pub fn release(&mut self, handle: &Value) -> bool {
        let released = self.handles.release(handle);
        trace!(released, "release linked descriptor");
        released
    }

    /// Drop all descriptors produced by [`Binding::get_switch_info`].
    pub fn release_linked(&mut self) -> usize {
        self.handles.release_linked()
    }

    // -- database -----------------------------------------------------------

    /// Link the descriptor recorded at `ea`, if any.
    pub fn linked_switch_info(&mut self, ea: Ea) -> Option<Handle> {
        let info = self.db.switch_info(ea)?;
        let handle = self.handles.insert(info, Ownership::Linked);
        debug!(ea, %handle, "linked switch descriptor");
        Some(handle)
    }

    pub fn get_switch_info(&mut self, ea: Ea) -> Value {
        self.linked_switch_info(ea)
            .map_or(Value::None, Value::Handle)
    }

    /// Persist the descriptor behind `handle` at `ea`.
    pub fn set_switch_info(&mut self, ea: Ea, handle: &Value) -> bool {
        let Some(info) = self.handles.resolve(handle) else {
            return false;
        };
        self.db.store_switch_info(ea, info);
        debug!(ea, "stored switch descriptor");
        true
    }

    pub fn del_switch_info(&mut self, ea: Ea) {
        self.db.remove_switch_info(ea);
        debug!(ea, "deleted switch descriptor");
    }

    pub fn get_import_module_qty(&self) -> usize {
        self.db.import_module_qty()
    }

    pub fn get_import_module_name(&self, index: i32) -> Value {
        self.db.import_module_name(index).into()
    }

    /// Call `callback(ea, name, ordinal)` for each import of module `index`.
    ///
    /// Returns 1 when all imports were visited, 0 when the callback stopped
    /// early, and -1 when `callback` is not callable or the module does not
    /// exist.
    pub fn enum_import_names(&self, index: i32, callback: &Value) -> i32 {
        let Value::Callable(cb) = callback else {
            debug!(index, "enum_import_names: callback is not callable");
            return ImportVisit::INVALID_ARGUMENT;
        };
        let mut visit = import_visitor(&self.db, |ea, name, ordinal| {
            let args = [
                Value::from(ea),
                name.map_or(Value::None, Value::from),
                Value::from(ordinal),
            ];
            cb.call(&args).map(|r| r.is_truthy())
        });
        let code = self.db.enum_import_names(index, &mut visit);
        trace!(index, code, "enum_import_names finished");
        code
    }
}

impl<D: AnalysisDatabase + Default> Default for Binding<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TruncationPolicy;
    use crate::database::MemoryDatabase;

    #[test]
    fn test_worked_example() {
        let mut b = Binding::new(MemoryDatabase::new());
        let h = b.create();
        b.set_ncases(&h, &Value::Int(5)).unwrap();
        b.set_regnum(&h, &Value::Int(2)).unwrap();
        b.set_defjump(&h, &Value::Int(0x401000)).unwrap();
        assert_eq!(b.get_ncases(&h), Value::Int(5));
        assert_eq!(b.get_regnum(&h), Value::Int(2));
        assert_eq!(b.get_defjump(&h), Value::Int(0x401000));

        let copy = b.create();
        assert!(b.assign(&copy, &h));
        assert_eq!(b.get_ncases(&copy), Value::Int(5));
        assert_eq!(b.get_regnum(&copy), Value::Int(2));
        assert_eq!(b.get_defjump(&copy), Value::Int(0x401000));
    }

    #[test]
    fn test_unresolved_handle_contracts() {
        let mut b = Binding::new(MemoryDatabase::new());
        let stale = b.create();
        assert!(b.destroy(&stale));
        for field in Field::ALL {
            assert_eq!(b.get_field(&stale, field), Value::None);
            assert!(matches!(
                b.set_field(&stale, field, &Value::Int(1)),
                Err(BindError::UnresolvedHandle)
            ));
        }
        assert!(!b.destroy(&stale));
        assert!(!b.assign(&stale, &stale));
        assert!(!b.set_switch_info(0x1000, &Value::Int(3)));
    }

    #[test]
    fn test_not_a_number() {
        let mut b = Binding::new(MemoryDatabase::new());
        let h = b.create();
        b.set_jcases(&h, &Value::Int(3)).unwrap();
        assert!(matches!(
            b.set_jcases(&h, &Value::from("many")),
            Err(BindError::NotANumber { field: "jcases" })
        ));
        assert_eq!(b.get_jcases(&h), Value::Int(3));
        b.set_jcases(&h, &Value::Bool(true)).unwrap();
        assert_eq!(b.get_jcases(&h), Value::Int(1));
    }

    #[test]
    fn test_policy_switch() {
        let mut b = Binding::new(MemoryDatabase::new());
        let h = b.create();
        b.set_ncases(&h, &Value::Int(0x1_0002)).unwrap();
        assert_eq!(b.get_ncases(&h), Value::Int(2));

        b.set_config(BindingConfig {
            truncation: TruncationPolicy::Reject,
            log_truncation: false,
        });
        assert!(matches!(
            b.set_ncases(&h, &Value::Int(0x1_0003)),
            Err(BindError::Truncation { .. })
        ));
        assert_eq!(b.get_ncases(&h), Value::Int(2));
    }

    #[test]
    fn test_store_query_delete() {
        let mut b = Binding::new(MemoryDatabase::new());
        let h = b.create();
        b.set_startea(&h, &Value::Int(0x401000)).unwrap();
        b.set_jumps(&h, &Value::Int(0x402000)).unwrap();
        assert!(b.set_switch_info(0x401000, &h));

        let linked = b.get_switch_info(0x401000);
        assert_eq!(b.get_jumps(&linked), Value::Int(0x402000));
        assert_eq!(b.handles().ownership(&linked), Some(Ownership::Linked));

        // Linked copies are independent of the stored record.
        b.set_jumps(&linked, &Value::Int(0)).unwrap();
        assert_eq!(b.database().switch_info(0x401000).map(|i| i.jumps), Some(0x402000));

        b.del_switch_info(0x401000);
        assert_eq!(b.get_switch_info(0x401000), Value::None);
        assert_eq!(b.release_linked(), 1);
        assert_eq!(b.get_jumps(&linked), Value::None);
    }

    #[test]
    fn test_released_queries_do_not_accumulate() {
        let mut b = Binding::new(MemoryDatabase::new());
        let h = b.create();
        b.set_ncases(&h, &Value::Int(7)).unwrap();
        assert!(b.set_switch_info(0x401000, &h));

        for _ in 0..1000 {
            let linked = b.get_switch_info(0x401000);
            assert_eq!(b.get_ncases(&linked), Value::Int(7));
            assert!(b.release(&linked));
        }
        assert_eq!(b.handles().len(), 1);
        assert!(!b.release(&h));
        assert_eq!(b.get_ncases(&h), Value::Int(7));
    }
}
