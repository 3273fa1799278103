//! Python bindings for switch descriptors.
//!
//! A `switch_info_t` object is a handle into the descriptor table of the
//! `Binding` that produced it. The flat `switch_info_t_get_*` /
//! `switch_info_t_set_*` functions take such an object; anything else, or a
//! handle whose descriptor was destroyed, reads as `None` and ignores writes.
//!
//! Objects returned by `Binding.get_switch_info` give their descriptor back
//! when Python collects them. Objects from `switch_info_t_create` own theirs
//! until `switch_info_t_destroy`.

use pyo3::exceptions::PyAttributeError;
use pyo3::prelude::*;
use std::sync::{Arc, Mutex};

use super::nalt::PyBinding;
use crate::core::field::Field;
use crate::core::handle::Handle;
use crate::core::value::Value;
use crate::error::BindError;

/// Handles whose Python objects were collected while their binding was
/// borrowed. Drained by the binding on its next query.
pub(crate) type ReleaseQueue = Arc<Mutex<Vec<Handle>>>;

/// Python handle to a linked switch descriptor.
#[pyclass(name = "switch_info_t")]
pub struct PySwitchInfo {
    pub(crate) binding: Py<PyBinding>,
    pub(crate) handle: Handle,
    /// Set for query results; releases the descriptor on drop.
    pub(crate) release_queue: Option<ReleaseQueue>,
}

impl Drop for PySwitchInfo {
    fn drop(&mut self) {
        let Some(queue) = self.release_queue.take() else {
            return;
        };
        let handle = Value::Handle(self.handle);
        let released = Python::attach(|py| match self.binding.bind(py).try_borrow_mut() {
            Ok(mut binding) => {
                binding.inner.release(&handle);
                true
            }
            Err(_) => false,
        });
        if !released {
            if let Ok(mut pending) = queue.lock() {
                pending.push(self.handle);
            }
        }
    }
}

/// Convert a Python object to the runtime value model.
pub(crate) fn to_value(obj: &Bound<'_, PyAny>) -> Value {
    if obj.is_none() {
        return Value::None;
    }
    if let Ok(b) = obj.extract::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(i) = obj.extract::<i128>() {
        return Value::Int(i);
    }
    if let Ok(s) = obj.extract::<String>() {
        return Value::Str(s);
    }
    handle_of(obj)
}

/// The handle an object stands for, or `Value::None`.
pub(crate) fn handle_of(obj: &Bound<'_, PyAny>) -> Value {
    obj.extract::<PyRef<'_, PySwitchInfo>>()
        .map_or(Value::None, |swi| Value::Handle(swi.handle))
}

fn get_linked(obj: &Bound<'_, PyAny>, field: Field) -> Option<i128> {
    let swi = obj.extract::<PyRef<'_, PySwitchInfo>>().ok()?;
    swi.read(obj.py(), field)
}

fn set_linked(obj: &Bound<'_, PyAny>, field: Field, value: &Bound<'_, PyAny>) -> PyResult<()> {
    match obj.extract::<PyRef<'_, PySwitchInfo>>() {
        Ok(swi) => swi.write(obj.py(), field, value),
        Err(_) => Ok(()),
    }
}

impl PySwitchInfo {
    fn read(&self, py: Python<'_>, field: Field) -> Option<i128> {
        let binding = self.binding.bind(py).try_borrow().ok()?;
        binding
            .inner
            .get_field(&Value::Handle(self.handle), field)
            .as_int()
    }

    fn write(&self, py: Python<'_>, field: Field, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let mut binding = self.binding.bind(py).try_borrow_mut()?;
        match binding
            .inner
            .set_field(&Value::Handle(self.handle), field, &to_value(value))
        {
            Ok(()) | Err(BindError::UnresolvedHandle) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[pymethods]
impl PySwitchInfo {
    /// Numeric id of the underlying handle.
    #[getter]
    fn handle_id(&self) -> u64 {
        self.handle.id()
    }

    /// True while the descriptor is alive.
    fn is_valid(&self, py: Python<'_>) -> bool {
        self.binding
            .bind(py)
            .try_borrow()
            .map(|b| b.inner.resolve(&Value::Handle(self.handle)).is_some())
            .unwrap_or(false)
    }

    /// Copy every field of `other` into this descriptor.
    fn assign(&self, py: Python<'_>, other: &Bound<'_, PyAny>) -> PyResult<bool> {
        let src = handle_of(other);
        let mut binding = self.binding.bind(py).try_borrow_mut()?;
        Ok(binding.inner.assign(&Value::Handle(self.handle), &src))
    }

    fn __getattr__(&self, py: Python<'_>, name: &str) -> PyResult<Option<i128>> {
        let field = name
            .parse::<Field>()
            .map_err(|_| PyAttributeError::new_err(name.to_string()))?;
        Ok(self.read(py, field))
    }

    fn __setattr__(&self, py: Python<'_>, name: &str, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let field = name
            .parse::<Field>()
            .map_err(|_| PyAttributeError::new_err(name.to_string()))?;
        self.write(py, field, value)
    }

    fn __repr__(&self, py: Python<'_>) -> String {
        let binding = self.binding.bind(py).try_borrow().ok();
        match binding
            .as_ref()
            .and_then(|b| b.inner.resolve(&Value::Handle(self.handle)))
        {
            Some(info) => format!("<switch_info_t {}: {}>", self.handle, info),
            None => format!("<switch_info_t {}: released>", self.handle),
        }
    }
}

macro_rules! py_field_accessors {
    ($($field:expr => $get:ident, $set:ident;)*) => {
        $(
            #[pyfunction]
            fn $get(obj: &Bound<'_, PyAny>) -> Option<i128> {
                get_linked(obj, $field)
            }

            #[pyfunction]
            fn $set(obj: &Bound<'_, PyAny>, value: &Bound<'_, PyAny>) -> PyResult<()> {
                set_linked(obj, $field, value)
            }
        )*

        /// Register the flat field accessor functions.
        pub fn register_field_accessors(m: &Bound<'_, PyModule>) -> PyResult<()> {
            $(
                m.add_function(wrap_pyfunction!($get, m)?)?;
                m.add_function(wrap_pyfunction!($set, m)?)?;
            )*
            Ok(())
        }
    };
}

py_field_accessors! {
    Field::Regdtype => switch_info_t_get_regdtype, switch_info_t_set_regdtype;
    Field::Flags => switch_info_t_get_flags, switch_info_t_set_flags;
    Field::Jcases => switch_info_t_get_jcases, switch_info_t_set_jcases;
    Field::Regnum => switch_info_t_get_regnum, switch_info_t_set_regnum;
    Field::Ncases => switch_info_t_get_ncases, switch_info_t_set_ncases;
    Field::Defjump => switch_info_t_get_defjump, switch_info_t_set_defjump;
    Field::Jumps => switch_info_t_get_jumps, switch_info_t_set_jumps;
    Field::Elbase => switch_info_t_get_elbase, switch_info_t_set_elbase;
    Field::Startea => switch_info_t_get_startea, switch_info_t_set_startea;
    Field::Custom => switch_info_t_get_custom, switch_info_t_set_custom;
    Field::IndLowcase => switch_info_t_get_ind_lowcase, switch_info_t_set_ind_lowcase;
    Field::ValuesLowcase => switch_info_t_get_values_lowcase, switch_info_t_set_values_lowcase;
}
