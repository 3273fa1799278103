//! Switch descriptor type.
//!
//! `SwitchInfo` mirrors the analysis SDK's switch structure: a flat value
//! describing how a recognized switch statement indexes its jump table.
//! It has no internal pointers, so copying it is a plain memberwise copy.

use bitflags::bitflags;
#[cfg(feature = "python-ext")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Ea, Sval, Uval, BADADDR};

bitflags! {
    /// Known switch flag bits. The descriptor stores the raw `u32`; bits
    /// outside this set are kept as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SwitchFlags: u32 {
        /// Sparse switch: a value table maps values to targets
        const SPARSE = 0x0000_0001;
        /// Value table elements are 32-bit
        const V32 = 0x0000_0002;
        /// Jump table elements are 32-bit
        const J32 = 0x0000_0004;
        /// Value table is split
        const VSPLIT = 0x0000_0008;
        /// Default case is an entry of the jump table
        const DEF_IN_TBL = 0x0000_0010;
        const USER = 0x0000_0020;
        /// Jump table is inverted
        const JMP_INV = 0x0000_0040;
        /// Element shift amount, see [`SwitchInfo::shift`]
        const SHIFT_MASK = 0x0000_0180;
        /// Jump table entries are relative to `elbase`
        const ELBASE = 0x0000_0200;
        /// Jump table entry size is explicit (1 or 8 bytes)
        const JSIZE = 0x0000_0400;
        /// Value table entry size is explicit
        const VSIZE = 0x0000_0800;
        /// Value table is separate from the jump table
        const SEPARATE = 0x0000_1000;
        /// Jump table entries are signed
        const SIGNED = 0x0000_2000;
        /// Custom switch, `custom` holds processor-specific data
        const CUSTOM = 0x0000_4000;
    }
}

/// Description of a switch statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SwitchInfo {
    /// Data type of the index register
    pub regdtype: i8,
    /// Raw switch flags, see [`SwitchFlags`]
    pub flags: u32,
    /// Number of entries in the jump table
    pub jcases: i32,
    /// Register holding the switch index
    pub regnum: i32,
    /// Number of cases (excluding default)
    pub ncases: u16,
    /// Default jump target
    pub defjump: Ea,
    /// Jump table address
    pub jumps: Ea,
    /// Element base for relative tables
    pub elbase: Ea,
    /// Start of the switch idiom
    pub startea: Ea,
    /// Processor-specific custom data
    pub custom: Uval,
    /// Lowest case value of an indirect table
    pub ind_lowcase: Sval,
    /// Value table address, or lowest case value for plain tables
    pub values_lowcase: Ea,
}

impl SwitchInfo {
    /// Flags as a typed set. Unknown bits are retained.
    pub fn switch_flags(&self) -> SwitchFlags {
        SwitchFlags::from_bits_retain(self.flags)
    }

    pub fn set_switch_flags(&mut self, flags: SwitchFlags) {
        self.flags = flags.bits();
    }

    pub fn is_sparse(&self) -> bool {
        self.switch_flags().contains(SwitchFlags::SPARSE)
    }

    pub fn is_signed(&self) -> bool {
        self.switch_flags().contains(SwitchFlags::SIGNED)
    }

    pub fn is_custom(&self) -> bool {
        self.switch_flags().contains(SwitchFlags::CUSTOM)
    }

    /// Left shift applied to jump table elements.
    pub fn shift(&self) -> u32 {
        (self.flags & SwitchFlags::SHIFT_MASK.bits()) >> 7
    }

    /// Size in bytes of one jump table element.
    pub fn jtable_element_size(&self) -> usize {
        let f = self.switch_flags();
        match (f.contains(SwitchFlags::J32), f.contains(SwitchFlags::JSIZE)) {
            (false, false) => 2,
            (true, false) => 4,
            (false, true) => 1,
            (true, true) => 8,
        }
    }

    /// Size in bytes of one value table element.
    pub fn vtable_element_size(&self) -> usize {
        let f = self.switch_flags();
        match (f.contains(SwitchFlags::V32), f.contains(SwitchFlags::VSIZE)) {
            (false, false) => 2,
            (true, false) => 4,
            (false, true) => 1,
            (true, true) => 8,
        }
    }

    /// True when a default target is recorded.
    pub fn has_default(&self) -> bool {
        self.defjump != BADADDR
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| e.to_string())
    }

    /// Deserialize from JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, String> {
        serde_json::from_str(json_str).map_err(|e| e.to_string())
    }

    /// Serialize to binary format.
    pub fn to_binary(&self) -> Result<Vec<u8>, String> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| e.to_string())
    }

    /// Deserialize from binary format.
    pub fn from_binary(data: &[u8]) -> Result<Self, String> {
        bincode::serde::decode_from_slice(data, bincode::config::standard())
            .map(|(info, _)| info)
            .map_err(|e| e.to_string())
    }
}

impl fmt::Display for SwitchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "switch@{:#x}: ncases={}, jumps={:#x}",
            self.startea, self.ncases, self.jumps
        )?;
        if self.has_default() {
            write!(f, ", default={:#x}", self.defjump)?;
        }
        if self.is_sparse() {
            write!(f, ", values={:#x}", self.values_lowcase)?;
        }
        Ok(())
    }
}

/// Names of the known flag bits set in `flags`.
#[cfg(feature = "python-ext")]
#[pyfunction]
pub fn describe_switch_flags(flags: u32) -> Vec<String> {
    SwitchFlags::from_bits_retain(flags)
        .iter_names()
        .map(|(name, _)| name.to_string())
        .collect()
}
