//! Python bindings for the database entry points.

use pyo3::prelude::*;
use tracing::{trace, warn};

use super::switch_info::{handle_of, PySwitchInfo, ReleaseQueue};
use crate::binding::Binding;
use crate::config::BindingConfig;
use crate::core::value::Value;
use crate::core::Ea;
use crate::database::{AnalysisDatabase, ImportEntry, MemoryDatabase};
use crate::enumerate::{import_visitor, ImportVisit};

/// Binding over an in-memory analysis database.
#[pyclass(name = "Binding")]
pub struct PyBinding {
    pub(crate) inner: Binding<MemoryDatabase>,
    pub(crate) release_queue: ReleaseQueue,
}

impl PyBinding {
    pub(crate) fn wrap(inner: Binding<MemoryDatabase>) -> Self {
        Self {
            inner,
            release_queue: ReleaseQueue::default(),
        }
    }

    /// Release descriptors whose objects were collected while borrowed.
    fn drain_released(&mut self) {
        let pending = match self.release_queue.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        if pending.is_empty() {
            return;
        }
        trace!(count = pending.len(), "releasing collected descriptors");
        for handle in pending {
            self.inner.release(&Value::Handle(handle));
        }
    }
}

#[pymethods]
impl PyBinding {
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<BindingConfig>) -> Self {
        Self::wrap(Binding::with_config(
            MemoryDatabase::new(),
            config.unwrap_or_default(),
        ))
    }

    /// Load the import table of a PE file.
    #[staticmethod]
    #[pyo3(signature = (path, config=None))]
    fn from_pe(path: &str, config: Option<BindingConfig>) -> PyResult<Self> {
        let db = MemoryDatabase::from_pe_path(path)?;
        Ok(Self::wrap(Binding::with_config(db, config.unwrap_or_default())))
    }

    /// Load a database snapshot written by `save`.
    #[staticmethod]
    #[pyo3(signature = (path, config=None))]
    fn load(path: &str, config: Option<BindingConfig>) -> PyResult<Self> {
        let db = MemoryDatabase::load(path)?;
        Ok(Self::wrap(Binding::with_config(db, config.unwrap_or_default())))
    }

    fn save(&self, path: &str) -> PyResult<()> {
        Ok(self.inner.database().save(path)?)
    }

    #[getter]
    fn get_config(&self) -> BindingConfig {
        self.inner.config().clone()
    }

    #[setter]
    fn set_config(&mut self, config: BindingConfig) {
        self.inner.set_config(config);
    }

    // switch_info_t lifecycle

    fn switch_info_t_create(slf: &Bound<'_, Self>) -> PyResult<PySwitchInfo> {
        let handle = slf.try_borrow_mut()?.inner.create_handle();
        Ok(PySwitchInfo {
            binding: slf.clone().unbind(),
            handle,
            release_queue: None,
        })
    }

    fn switch_info_t_destroy(&mut self, obj: &Bound<'_, PyAny>) -> bool {
        self.inner.destroy(&handle_of(obj))
    }

    fn switch_info_t_assign(&mut self, dst: &Bound<'_, PyAny>, src: &Bound<'_, PyAny>) -> bool {
        self.inner.assign(&handle_of(dst), &handle_of(src))
    }

    // switch information in the database

    /// Descriptor recorded at `ea`, or None.
    ///
    /// The returned object holds a private copy, released when the object is
    /// collected.
    fn get_switch_info(slf: &Bound<'_, Self>, ea: Ea) -> PyResult<Option<PySwitchInfo>> {
        let mut this = slf.try_borrow_mut()?;
        this.drain_released();
        let handle = this.inner.linked_switch_info(ea);
        let release_queue = this.release_queue.clone();
        Ok(handle.map(|handle| PySwitchInfo {
            binding: slf.clone().unbind(),
            handle,
            release_queue: Some(release_queue),
        }))
    }

    fn set_switch_info(&mut self, ea: Ea, switch_info: &Bound<'_, PyAny>) -> bool {
        self.inner.set_switch_info(ea, &handle_of(switch_info))
    }

    fn del_switch_info(&mut self, ea: Ea) {
        self.inner.del_switch_info(ea);
    }

    /// Number of descriptors currently held by this binding.
    fn handle_count(&self) -> usize {
        self.inner.handles().len()
    }

    // imports

    fn get_import_module_qty(&self) -> usize {
        self.inner.get_import_module_qty()
    }

    /// Name of the imported module at `mod_index`, or None.
    fn get_import_module_name(&self, mod_index: i32) -> Option<String> {
        self.inner.get_import_module_name(mod_index).as_str().map(str::to_string)
    }

    /// Enumerate imports from a module.
    ///
    /// `callback(ea, name, ordinal)` is called for each import; `name` is
    /// None when neither the import nor the address has one. Returns 1 when
    /// finished, 0 if the callback returned a falsy value or raised, -1 if
    /// `callback` is not callable or the module does not exist.
    fn enum_import_names(&self, mod_index: i32, callback: &Bound<'_, PyAny>) -> i32 {
        if !callback.is_callable() {
            return ImportVisit::INVALID_ARGUMENT;
        }
        let db = self.inner.database();
        let mut visit = import_visitor(db, |ea, name, ordinal| {
            match callback
                .call1((ea, name, ordinal))
                .and_then(|r| r.is_truthy())
            {
                Ok(keep_going) => Some(keep_going),
                Err(err) => {
                    warn!(%err, ea, "import callback raised");
                    None
                }
            }
        });
        db.enum_import_names(mod_index, &mut visit)
    }

    /// Append an import module; returns its index.
    fn add_import_module(&mut self, name: &str) -> usize {
        self.inner.database_mut().add_import_module(name)
    }

    #[pyo3(signature = (mod_index, ea, name=None, ordinal=0))]
    fn add_import(&mut self, mod_index: usize, ea: Ea, name: Option<String>, ordinal: u64) -> bool {
        self.inner
            .database_mut()
            .add_import(mod_index, ImportEntry { ea, name, ordinal })
    }

    fn set_name(&mut self, ea: Ea, name: &str) {
        self.inner.database_mut().set_name(ea, name);
    }

    fn __repr__(&self) -> String {
        format!(
            "Binding(modules={}, linked={}, truncation='{}')",
            self.inner.get_import_module_qty(),
            self.inner.handles().len(),
            self.inner.config().truncation
        )
    }
}
