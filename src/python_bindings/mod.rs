//! Python bindings for the binding layer.
//!
//! Classes and the flat accessor functions are registered here; the
//! scripting-visible names follow the SDK (`switch_info_t_*`,
//! `get_switch_info`, `enum_import_names`).

pub mod nalt;
pub mod switch_info;

use pyo3::prelude::*;

/// Register all Python bindings with the module.
pub fn register_python_bindings(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Classes
    m.add_class::<nalt::PyBinding>()?;
    m.add_class::<switch_info::PySwitchInfo>()?;
    m.add_class::<crate::config::BindingConfig>()?;
    m.add_class::<crate::config::TruncationPolicy>()?;
    m.add_class::<crate::logging::LogLevel>()?;

    // switch_info_t_get_* / switch_info_t_set_*
    switch_info::register_field_accessors(m)?;
    m.add_function(wrap_pyfunction!(
        crate::core::switch_info::describe_switch_flags,
        m
    )?)?;

    // Logging
    m.add_function(wrap_pyfunction!(crate::logging::init_logging, m)?)?;
    m.add_function(wrap_pyfunction!(crate::logging::log_message, m)?)?;

    m.add("BADADDR", crate::core::BADADDR)?;
    m.add("IMPORT_ENUM_INVALID", crate::enumerate::ImportVisit::INVALID_ARGUMENT)?;

    Ok(())
}
