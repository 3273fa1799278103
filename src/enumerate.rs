//! Import enumeration adapter.
//!
//! The database pushes imports one by one into a native-style visitor that
//! answers continue/stop. [`import_visitor`] builds that visitor around a
//! single runtime callable taking `(ea, name, ordinal)`.

use crate::core::{Ea, Uval};
use crate::database::{AnalysisDatabase, ImportEntry};

/// Result codes of the enumeration protocol.
pub struct ImportVisit;

impl ImportVisit {
    pub const CONTINUE: i32 = 1;
    pub const STOP: i32 = 0;
    /// The supplied callback is not callable; nothing was enumerated.
    pub const INVALID_ARGUMENT: i32 = -1;
}

/// Adapt `invoke` to the database's per-item visitor.
///
/// Entries without a name get one from [`AnalysisDatabase::name_at`] when
/// possible. `invoke` returns the truthiness of the callable's result, or
/// `None` if the call failed; only a truthy result continues.
pub fn import_visitor<'a, D, F>(db: &'a D, mut invoke: F) -> impl FnMut(&ImportEntry) -> i32 + 'a
where
    D: AnalysisDatabase + ?Sized + 'a,
    F: FnMut(Ea, Option<&str>, Uval) -> Option<bool> + 'a,
{
    move |entry: &ImportEntry| {
        let resolved;
        let name = match entry.name.as_deref() {
            Some(name) => Some(name),
            None => {
                resolved = db.name_at(entry.ea);
                resolved.as_deref()
            }
        };
        match invoke(entry.ea, name, entry.ordinal) {
            Some(true) => ImportVisit::CONTINUE,
            Some(false) | None => ImportVisit::STOP,
        }
    }
}
