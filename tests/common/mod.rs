//! Common test utilities and helpers.
//!
//! Synthetic PE images with import tables, plus a recording callback for
//! enumeration tests.
#![allow(dead_code)]

pub mod test_utils;

use nalt_bind::{Callback, Value};
use std::sync::{Arc, Mutex};

/// One import thunk of a synthetic module.
#[derive(Debug, Clone, Copy)]
pub enum Thunk {
    Name(&'static str),
    Ordinal(u16),
}

/// A built image and the IAT slot VA of every thunk, per module.
pub struct BuiltPe {
    pub bytes: Vec<u8>,
    pub image_base: u64,
    pub iat_vas: Vec<Vec<u64>>,
}

/// Builds a minimal single-section PE32/PE32+ image holding an import
/// directory and optionally a delay-load directory.
pub struct PeBuilder {
    pe32_plus: bool,
    image_base: u64,
    modules: Vec<(String, Vec<Thunk>)>,
    delay: Vec<(String, Vec<Thunk>)>,
}

const SECTION_RVA: u32 = 0x1000;
const SECTION_RAW: usize = 0x200;

fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

fn alloc(sec: &mut Vec<u8>, size: usize) -> usize {
    let off = sec.len();
    sec.resize(off + size, 0);
    off
}

fn alloc_str(sec: &mut Vec<u8>, s: &str) -> usize {
    let off = alloc(sec, (s.len() + 2) & !1);
    sec[off..off + s.len()].copy_from_slice(s.as_bytes());
    off
}

fn rva(off: usize) -> u32 {
    SECTION_RVA + off as u32
}

impl PeBuilder {
    pub fn pe32_plus() -> Self {
        Self {
            pe32_plus: true,
            image_base: 0x1_4000_0000,
            modules: Vec::new(),
            delay: Vec::new(),
        }
    }

    pub fn pe32() -> Self {
        Self {
            pe32_plus: false,
            image_base: 0x40_0000,
            modules: Vec::new(),
            delay: Vec::new(),
        }
    }

    pub fn module(mut self, name: &str, thunks: &[Thunk]) -> Self {
        self.modules.push((name.to_string(), thunks.to_vec()));
        self
    }

    pub fn delay_module(mut self, name: &str, thunks: &[Thunk]) -> Self {
        self.delay.push((name.to_string(), thunks.to_vec()));
        self
    }

    pub fn build(&self) -> BuiltPe {
        let ts = if self.pe32_plus { 8 } else { 4 };
        let ordinal_flag = if self.pe32_plus { 1u64 << 63 } else { 1u64 << 31 };

        let mut sec = Vec::new();
        let idt = alloc(&mut sec, (self.modules.len() + 1) * 20);
        let ddt = if self.delay.is_empty() {
            None
        } else {
            Some(alloc(&mut sec, (self.delay.len() + 1) * 32))
        };

        let mut iat_vas = Vec::new();
        let all = self
            .modules
            .iter()
            .map(|m| (false, m))
            .chain(self.delay.iter().map(|m| (true, m)));
        let (mut regular_index, mut delay_index) = (0usize, 0usize);
        for (is_delay, (name, thunks)) in all {
            let int = alloc(&mut sec, (thunks.len() + 1) * ts);
            let iat = alloc(&mut sec, (thunks.len() + 1) * ts);
            let name_off = alloc_str(&mut sec, name);
            let mut vas = Vec::new();
            for (j, thunk) in thunks.iter().enumerate() {
                let value = match thunk {
                    Thunk::Name(n) => {
                        let hint_name = alloc(&mut sec, (n.len() + 3 + 1) & !1);
                        sec[hint_name + 2..hint_name + 2 + n.len()].copy_from_slice(n.as_bytes());
                        rva(hint_name) as u64
                    }
                    Thunk::Ordinal(o) => ordinal_flag | *o as u64,
                };
                for table in [int, iat] {
                    let off = table + j * ts;
                    if self.pe32_plus {
                        put_u64(&mut sec, off, value);
                    } else {
                        put_u32(&mut sec, off, value as u32);
                    }
                }
                vas.push(self.image_base + rva(iat) as u64 + (j * ts) as u64);
            }
            iat_vas.push(vas);

            if is_delay {
                let d = ddt.unwrap() + delay_index * 32;
                put_u32(&mut sec, d, 1);
                put_u32(&mut sec, d + 4, rva(name_off));
                put_u32(&mut sec, d + 12, rva(iat));
                put_u32(&mut sec, d + 16, rva(int));
                delay_index += 1;
            } else {
                let d = idt + regular_index * 20;
                put_u32(&mut sec, d, rva(int));
                put_u32(&mut sec, d + 12, rva(name_off));
                put_u32(&mut sec, d + 16, rva(iat));
                regular_index += 1;
            }
        }

        let raw_size = (sec.len() + 0x1ff) & !0x1ff;
        let mut bytes = vec![0u8; SECTION_RAW + raw_size];
        bytes[SECTION_RAW..SECTION_RAW + sec.len()].copy_from_slice(&sec);

        // DOS header
        bytes[0] = b'M';
        bytes[1] = b'Z';
        put_u32(&mut bytes, 0x3c, 0x40);
        bytes[0x40..0x44].copy_from_slice(b"PE\0\0");

        // COFF header
        let coff = 0x44;
        let opt_size: u16 = if self.pe32_plus { 240 } else { 224 };
        put_u16(&mut bytes, coff, if self.pe32_plus { 0x8664 } else { 0x14c });
        put_u16(&mut bytes, coff + 2, 1);
        put_u16(&mut bytes, coff + 16, opt_size);
        put_u16(&mut bytes, coff + 18, 0x22);

        // Optional header
        let opt = coff + 20;
        let dirs = if self.pe32_plus {
            put_u16(&mut bytes, opt, 0x20B);
            put_u64(&mut bytes, opt + 24, self.image_base);
            put_u32(&mut bytes, opt + 108, 16);
            opt + 112
        } else {
            put_u16(&mut bytes, opt, 0x10B);
            put_u32(&mut bytes, opt + 28, self.image_base as u32);
            put_u32(&mut bytes, opt + 92, 16);
            opt + 96
        };
        put_u32(&mut bytes, dirs + 8, rva(idt));
        put_u32(&mut bytes, dirs + 12, ((self.modules.len() + 1) * 20) as u32);
        if let Some(ddt) = ddt {
            put_u32(&mut bytes, dirs + 13 * 8, rva(ddt));
            put_u32(&mut bytes, dirs + 13 * 8 + 4, ((self.delay.len() + 1) * 32) as u32);
        }

        // Section header
        let sh = opt + opt_size as usize;
        bytes[sh..sh + 6].copy_from_slice(b".idata");
        put_u32(&mut bytes, sh + 8, sec.len() as u32);
        put_u32(&mut bytes, sh + 12, SECTION_RVA);
        put_u32(&mut bytes, sh + 16, raw_size as u32);
        put_u32(&mut bytes, sh + 20, SECTION_RAW as u32);

        BuiltPe {
            bytes,
            image_base: self.image_base,
            iat_vas,
        }
    }
}

/// Arguments of one enumeration callback invocation.
pub type Call = (Value, Value, Value);

/// A callable that records its arguments and answers with `answer(n)` where
/// `n` is the 1-based invocation count.
pub fn recording_callback<F>(answer: F) -> (Value, Arc<Mutex<Vec<Call>>>)
where
    F: Fn(usize) -> Option<Value> + Send + Sync + 'static,
{
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let cb = Callback::new(move |args| {
        let mut calls = sink.lock().unwrap();
        calls.push((args[0].clone(), args[1].clone(), args[2].clone()));
        answer(calls.len())
    });
    (Value::Callable(cb), calls)
}
