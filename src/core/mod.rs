//! Core data types of the binding layer.
//!
//! The switch descriptor, its field marshaling table, the runtime value
//! model and the handle table that links descriptors to runtime values.

pub mod field;
pub mod handle;
pub mod switch_info;
pub mod value;

/// Effective address in the analyzed program.
pub type Ea = u64;
/// Address-width unsigned value.
pub type Uval = u64;
/// Address-width signed value.
pub type Sval = i64;

/// Invalid address marker.
pub const BADADDR: Ea = u64::MAX;
