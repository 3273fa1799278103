#[cfg(feature = "python-ext")]
use pyo3::prelude::*;

/// Scripting-facing entry points
pub mod binding;
/// Binding configuration
pub mod config;
/// Core data types module
pub mod core;
/// Analysis database collaborator
pub mod database;
pub mod enumerate;
pub mod error;
pub mod logging;

#[cfg(feature = "python-ext")]
pub mod python_bindings;

pub use binding::Binding;
pub use config::{BindingConfig, TruncationPolicy};
pub use crate::core::field::{Field, FieldKind};
pub use crate::core::handle::{Handle, Ownership};
pub use crate::core::switch_info::{SwitchFlags, SwitchInfo};
pub use crate::core::value::{Callback, Value};
pub use database::{AnalysisDatabase, ImportEntry, ImportModule, MemoryDatabase};
pub use error::{BindError, Result};

/// A Python module implemented in Rust.
#[cfg(feature = "python-ext")]
#[pymodule]
fn nalt_bind(m: &Bound<'_, PyModule>) -> PyResult<()> {
    python_bindings::register_python_bindings(m.py(), m)
}
