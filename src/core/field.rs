//! Field marshaling table for [`SwitchInfo`].
//!
//! Every exposed field is described by a [`Field`] and a [`FieldKind`]. The
//! runtime numeric representation is `i128`, wide enough for every native
//! width in both signednesses; reading widens, writing narrows according to
//! the configured [`TruncationPolicy`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::switch_info::SwitchInfo;
use crate::config::TruncationPolicy;
use crate::error::{BindError, Result};

/// Native width and signedness of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Narrow signed byte
    I8,
    /// 16-bit unsigned count
    U16,
    /// Signed int
    I32,
    /// 32-bit unsigned mask
    U32,
    /// Effective address
    Ea,
    /// Address-width unsigned value
    Uval,
    /// Address-width signed value
    Sval,
}

impl FieldKind {
    pub fn bits(self) -> u32 {
        match self {
            FieldKind::I8 => 8,
            FieldKind::U16 => 16,
            FieldKind::I32 | FieldKind::U32 => 32,
            FieldKind::Ea | FieldKind::Uval | FieldKind::Sval => 64,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, FieldKind::I8 | FieldKind::I32 | FieldKind::Sval)
    }

    /// Smallest representable value.
    pub fn min(self) -> i128 {
        match self {
            FieldKind::I8 => i8::MIN as i128,
            FieldKind::I32 => i32::MIN as i128,
            FieldKind::Sval => i64::MIN as i128,
            _ => 0,
        }
    }

    /// Largest representable value.
    pub fn max(self) -> i128 {
        match self {
            FieldKind::I8 => i8::MAX as i128,
            FieldKind::U16 => u16::MAX as i128,
            FieldKind::I32 => i32::MAX as i128,
            FieldKind::U32 => u32::MAX as i128,
            FieldKind::Ea | FieldKind::Uval => u64::MAX as i128,
            FieldKind::Sval => i64::MAX as i128,
        }
    }

    pub fn fits(self, value: i128) -> bool {
        (self.min()..=self.max()).contains(&value)
    }

    /// Two's-complement narrowing to this width, read back at this signedness.
    pub fn wrap(self, value: i128) -> i128 {
        match self {
            FieldKind::I8 => value as i8 as i128,
            FieldKind::U16 => value as u16 as i128,
            FieldKind::I32 => value as i32 as i128,
            FieldKind::U32 => value as u32 as i128,
            FieldKind::Ea | FieldKind::Uval => value as u64 as i128,
            FieldKind::Sval => value as i64 as i128,
        }
    }
}

/// Exposed fields of a switch descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Regdtype,
    Flags,
    Jcases,
    Regnum,
    Ncases,
    Defjump,
    Jumps,
    Elbase,
    Startea,
    Custom,
    IndLowcase,
    ValuesLowcase,
}

/// Outcome of a successful store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stored {
    /// Value now held by the field
    pub value: i128,
    /// True when the incoming value did not fit and was wrapped
    pub truncated: bool,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Regdtype,
        Field::Flags,
        Field::Jcases,
        Field::Regnum,
        Field::Ncases,
        Field::Defjump,
        Field::Jumps,
        Field::Elbase,
        Field::Startea,
        Field::Custom,
        Field::IndLowcase,
        Field::ValuesLowcase,
    ];

    /// Attribute name on the scripting side.
    pub fn name(self) -> &'static str {
        match self {
            Field::Regdtype => "regdtype",
            Field::Flags => "flags",
            Field::Jcases => "jcases",
            Field::Regnum => "regnum",
            Field::Ncases => "ncases",
            Field::Defjump => "defjump",
            Field::Jumps => "jumps",
            Field::Elbase => "elbase",
            Field::Startea => "startea",
            Field::Custom => "custom",
            Field::IndLowcase => "ind_lowcase",
            Field::ValuesLowcase => "values_lowcase",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Regdtype => FieldKind::I8,
            Field::Flags => FieldKind::U32,
            Field::Jcases | Field::Regnum => FieldKind::I32,
            Field::Ncases => FieldKind::U16,
            Field::Defjump
            | Field::Jumps
            | Field::Elbase
            | Field::Startea
            | Field::ValuesLowcase => FieldKind::Ea,
            Field::Custom => FieldKind::Uval,
            Field::IndLowcase => FieldKind::Sval,
        }
    }

    /// Read the field, widened to the runtime representation.
    pub fn read(self, info: &SwitchInfo) -> i128 {
        match self {
            Field::Regdtype => info.regdtype as i128,
            Field::Flags => info.flags as i128,
            Field::Jcases => info.jcases as i128,
            Field::Regnum => info.regnum as i128,
            Field::Ncases => info.ncases as i128,
            Field::Defjump => info.defjump as i128,
            Field::Jumps => info.jumps as i128,
            Field::Elbase => info.elbase as i128,
            Field::Startea => info.startea as i128,
            Field::Custom => info.custom as i128,
            Field::IndLowcase => info.ind_lowcase as i128,
            Field::ValuesLowcase => info.values_lowcase as i128,
        }
    }

    /// Narrow `value` to the field width and store it.
    ///
    /// With [`TruncationPolicy::Reject`] an out-of-range value fails and
    /// `info` is not modified.
    pub fn write(
        self,
        info: &mut SwitchInfo,
        value: i128,
        policy: TruncationPolicy,
    ) -> Result<Stored> {
        let kind = self.kind();
        let fits = kind.fits(value);
        if !fits && policy == TruncationPolicy::Reject {
            return Err(BindError::Truncation {
                field: self.name(),
                value,
                bits: kind.bits(),
            });
        }
        let v = kind.wrap(value);
        match self {
            Field::Regdtype => info.regdtype = v as i8,
            Field::Flags => info.flags = v as u32,
            Field::Jcases => info.jcases = v as i32,
            Field::Regnum => info.regnum = v as i32,
            Field::Ncases => info.ncases = v as u16,
            Field::Defjump => info.defjump = v as u64,
            Field::Jumps => info.jumps = v as u64,
            Field::Elbase => info.elbase = v as u64,
            Field::Startea => info.startea = v as u64,
            Field::Custom => info.custom = v as u64,
            Field::IndLowcase => info.ind_lowcase = v as i64,
            Field::ValuesLowcase => info.values_lowcase = v as u64,
        }
        Ok(Stored {
            value: v,
            truncated: !fits,
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| BindError::Config(format!("unknown switch field `{}`", s)))
    }
}
