//! PE import directory reader.
//!
//! Walks the regular and delay-load import directories of a PE32/PE32+ image
//! and produces one [`ImportModule`] per descriptor. Each entry's address is
//! the VA of its IAT slot. Reads are bounds-checked; a malformed table ends
//! the walk for that descriptor rather than failing the whole image. Both
//! directories draw from one shared budget, so descriptors that share a thunk
//! table cannot multiply the output.

use tracing::warn;

use super::{ImportEntry, ImportModule};
use crate::error::{BindError, Result};

const IMPORT_DIRECTORY: usize = 1;
const DELAY_IMPORT_DIRECTORY: usize = 13;
const MAX_NAME: usize = 256;
const MAX_THUNKS: usize = 0x10000;
/// Descriptors read across both import directories.
pub const MAX_DESCRIPTORS: usize = 0x1000;
/// Entries produced across all descriptors.
pub const MAX_IMPORT_ENTRIES: usize = 0x10000;

/// What is left to read of one image.
#[derive(Debug)]
struct Budget {
    descriptors: usize,
    entries: usize,
}

impl Budget {
    fn new() -> Self {
        Self {
            descriptors: MAX_DESCRIPTORS,
            entries: MAX_IMPORT_ENTRIES,
        }
    }

    fn take_descriptor(&mut self) -> bool {
        if self.descriptors == 0 || self.entries == 0 {
            return false;
        }
        self.descriptors -= 1;
        true
    }
}

/// Import information of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeImports {
    pub image_base: u64,
    pub is_pe32_plus: bool,
    pub modules: Vec<ImportModule>,
}

#[derive(Debug, Clone)]
struct SectionHdr {
    va: u32,
    raw_ptr: u32,
    raw_size: u32,
    virt_size: u32,
}

fn read_u16_le(data: &[u8], off: usize) -> Option<u16> {
    data.get(off..off.checked_add(2)?)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32_le(data: &[u8], off: usize) -> Option<u32> {
    data.get(off..off.checked_add(4)?)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64_le(data: &[u8], off: usize) -> Option<u64> {
    let lo = read_u32_le(data, off)? as u64;
    let hi = read_u32_le(data, off.checked_add(4)?)? as u64;
    Some((hi << 32) | lo)
}

struct Image<'a> {
    data: &'a [u8],
    sections: Vec<SectionHdr>,
    image_base: u64,
    is_pe32_plus: bool,
}

impl Image<'_> {
    fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        self.sections.iter().find_map(|s| {
            let size = s.virt_size.max(s.raw_size);
            if size == 0 || rva < s.va || rva >= s.va.saturating_add(size) {
                return None;
            }
            let delta = rva - s.va;
            if delta >= s.raw_size {
                // Zero-fill tail of the section, nothing on disk.
                return None;
            }
            Some(s.raw_ptr.saturating_add(delta) as usize)
        })
    }

    fn c_string(&self, rva: u32) -> Option<String> {
        let off = self.rva_to_offset(rva)?;
        let tail = self.data.get(off..)?;
        let max = tail.len().min(MAX_NAME);
        let end = tail[..max].iter().position(|&b| b == 0).unwrap_or(max);
        let s = std::str::from_utf8(&tail[..end]).ok()?;
        (!s.is_empty()).then(|| s.to_string())
    }

    fn thunk_size(&self) -> usize {
        if self.is_pe32_plus {
            8
        } else {
            4
        }
    }

    fn read_thunk(&self, off: usize) -> Option<u64> {
        if self.is_pe32_plus {
            read_u64_le(self.data, off)
        } else {
            read_u32_le(self.data, off).map(u64::from)
        }
    }

    fn ordinal_flag(&self) -> u64 {
        if self.is_pe32_plus {
            1u64 << 63
        } else {
            1u64 << 31
        }
    }

    /// Entries of one descriptor. `lookup_rva` is the name table (falls back
    /// to the IAT when absent), `iat_rva` the address table.
    fn thunks(&self, lookup_rva: u32, iat_rva: u32, budget: &mut Budget) -> Vec<ImportEntry> {
        let mut out = Vec::new();
        let table = if lookup_rva != 0 { lookup_rva } else { iat_rva };
        let Some(base) = self.rva_to_offset(table) else {
            return out;
        };
        let size = self.thunk_size();
        for index in 0..MAX_THUNKS.min(budget.entries) {
            let Some(val) = base
                .checked_add(index * size)
                .and_then(|off| self.read_thunk(off))
            else {
                break;
            };
            if val == 0 {
                break;
            }
            let slot_rva = iat_rva as u64 + (index * size) as u64;
            let ea = self.image_base.wrapping_add(slot_rva);
            if val & self.ordinal_flag() != 0 {
                out.push(ImportEntry::by_ordinal(ea, val & 0xFFFF));
            } else {
                // Hint/name entry: 2-byte hint, then the name.
                let hint_name_rva = (val & 0x7FFF_FFFF) as u32;
                match self.c_string(hint_name_rva.saturating_add(2)) {
                    Some(name) => out.push(ImportEntry::by_name(ea, name)),
                    None => out.push(ImportEntry::by_ordinal(ea, 0)),
                }
            }
        }
        budget.entries -= out.len();
        out
    }

    fn module_name(&self, rva: u32) -> String {
        self.c_string(rva).unwrap_or_else(|| format!("module_{:x}", rva))
    }

    fn import_descriptors(
        &self,
        dir_rva: u32,
        modules: &mut Vec<ImportModule>,
        budget: &mut Budget,
    ) {
        let Some(mut off) = self.rva_to_offset(dir_rva) else {
            return;
        };
        // IMAGE_IMPORT_DESCRIPTOR, 20 bytes
        while let (Some(lookup), Some(name_rva), Some(iat)) = (
            read_u32_le(self.data, off),
            read_u32_le(self.data, off + 12),
            read_u32_le(self.data, off + 16),
        ) {
            if (lookup == 0 && name_rva == 0 && iat == 0) || !budget.take_descriptor() {
                break;
            }
            modules.push(ImportModule {
                name: self.module_name(name_rva),
                entries: self.thunks(lookup, iat, budget),
            });
            off += 20;
        }
    }

    fn delay_descriptors(
        &self,
        dir_rva: u32,
        modules: &mut Vec<ImportModule>,
        budget: &mut Budget,
    ) {
        let Some(mut off) = self.rva_to_offset(dir_rva) else {
            return;
        };
        // IMAGE_DELAYLOAD_DESCRIPTOR, 32 bytes
        while let (Some(attrs), Some(name), Some(iat), Some(lookup)) = (
            read_u32_le(self.data, off),
            read_u32_le(self.data, off + 4),
            read_u32_le(self.data, off + 12),
            read_u32_le(self.data, off + 16),
        ) {
            if (name == 0 && iat == 0) || !budget.take_descriptor() {
                break;
            }
            // Version 1 descriptors hold VAs instead of RVAs.
            let to_rva = |v: u32| -> u32 {
                if attrs & 1 == 0 && v != 0 {
                    (v as u64).wrapping_sub(self.image_base) as u32
                } else {
                    v
                }
            };
            modules.push(ImportModule {
                name: self.module_name(to_rva(name)),
                entries: self.thunks(to_rva(lookup), to_rva(iat), budget),
            });
            off += 32;
        }
    }
}

/// Read the import and delay-import directories of a PE image.
pub fn parse_imports(data: &[u8]) -> Result<PeImports> {
    let invalid = |msg: &str| BindError::InvalidFormat(msg.to_string());

    if data.len() < 0x40 || &data[..2] != b"MZ" {
        return Err(invalid("missing MZ header"));
    }
    let e_lfanew = read_u32_le(data, 0x3c).ok_or_else(|| invalid("truncated DOS header"))? as usize;
    if data.get(e_lfanew..e_lfanew.saturating_add(4)) != Some(&b"PE\0\0"[..]) {
        return Err(invalid("missing PE signature"));
    }

    // COFF header
    let coff_off = e_lfanew + 4;
    let number_of_sections =
        read_u16_le(data, coff_off + 2).ok_or_else(|| invalid("truncated COFF header"))?;
    let size_of_optional_header =
        read_u16_le(data, coff_off + 16).ok_or_else(|| invalid("truncated COFF header"))?;

    // Optional header
    let opt_off = coff_off + 20;
    let magic = read_u16_le(data, opt_off).ok_or_else(|| invalid("truncated optional header"))?;
    let (is_pe32_plus, image_base, num_dirs_off, dirs_off) = match magic {
        0x20B => (true, read_u64_le(data, opt_off + 24), opt_off + 108, opt_off + 112),
        0x10B => (
            false,
            read_u32_le(data, opt_off + 28).map(u64::from),
            opt_off + 92,
            opt_off + 96,
        ),
        _ => return Err(invalid("unknown optional header magic")),
    };
    let image_base = image_base.ok_or_else(|| invalid("truncated optional header"))?;
    let num_dirs = read_u32_le(data, num_dirs_off).unwrap_or(0) as usize;
    let dir_rva = |index: usize| -> u32 {
        if index >= num_dirs {
            return 0;
        }
        read_u32_le(data, dirs_off + index * 8).unwrap_or(0)
    };

    // Sections
    let mut sections = Vec::with_capacity(number_of_sections as usize);
    let sec_off = opt_off + size_of_optional_header as usize;
    for i in 0..number_of_sections as usize {
        let off = sec_off + i * 40;
        let (Some(virt_size), Some(va), Some(raw_size), Some(raw_ptr)) = (
            read_u32_le(data, off + 8),
            read_u32_le(data, off + 12),
            read_u32_le(data, off + 16),
            read_u32_le(data, off + 20),
        ) else {
            break;
        };
        sections.push(SectionHdr {
            va,
            raw_ptr,
            raw_size,
            virt_size,
        });
    }

    let image = Image {
        data,
        sections,
        image_base,
        is_pe32_plus,
    };
    let mut modules = Vec::new();
    let mut budget = Budget::new();
    let import_rva = dir_rva(IMPORT_DIRECTORY);
    if import_rva != 0 {
        image.import_descriptors(import_rva, &mut modules, &mut budget);
    }
    let delay_rva = dir_rva(DELAY_IMPORT_DIRECTORY);
    if delay_rva != 0 {
        image.delay_descriptors(delay_rva, &mut modules, &mut budget);
    }
    if budget.descriptors == 0 || budget.entries == 0 {
        warn!(
            modules = modules.len(),
            "import table exceeds parse limits, truncated"
        );
    }

    Ok(PeImports {
        image_base,
        is_pe32_plus,
        modules,
    })
}
