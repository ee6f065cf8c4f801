//! Symbol table for property, action and event names
//!
//! Names are interned once and identified by a dense `Symbol` from then on. The table has a
//! fixed capacity; symbols are never reused.

use core::hash::{BuildHasher, Hasher};

use hashbrown::HashMap;
use log::warn;
use wot_gc::Symbol;

use super::error::{RuntimeError, RuntimeResult};

pub struct Names {
    symbols: HashMap<Box<str>, Symbol, OneAtATimeState>,

    /// Name of each symbol, indexed by symbol
    names: Vec<Box<str>>,

    capacity: usize,
}

impl Names {
    /// Create a table that holds at most `capacity` names. Capacity is clamped so that every
    /// symbol fits in a tree key.
    pub fn with_capacity(capacity: usize) -> Names {
        let capacity = capacity.min(Symbol::MAX.0 as usize + 1);
        Names {
            symbols: HashMap::with_capacity_and_hasher(capacity, OneAtATimeState),
            names: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// The symbol for `name`, interning it if it has not been seen before
    pub fn symbol(&mut self, name: &str) -> RuntimeResult<Symbol> {
        if let Some(&symbol) = self.symbols.get(name) {
            return Ok(symbol);
        }

        if self.names.len() >= self.capacity {
            warn!("symbol table full, cannot intern {:?}", name);
            return Err(RuntimeError::NamesFull {
                capacity: self.capacity,
            });
        }

        let symbol = Symbol(self.names.len() as u16);
        self.symbols.insert(name.into(), symbol);
        self.names.push(name.into());
        Ok(symbol)
    }

    /// The symbol for `name` if it has been interned
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).copied()
    }

    /// The name a symbol was interned from
    #[inline]
    pub fn name(&self, symbol: Symbol) -> Option<&str> {
        self.names.get(symbol.0 as usize).map(|name| &**name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Percentage of the table in use
    pub fn used(&self) -> f32 {
        if self.capacity == 0 {
            return 100.0;
        }
        100.0 * self.names.len() as f32 / self.capacity as f32
    }

    /// Every interned name with its symbol, in symbol order
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (Symbol(index as u16), &**name))
    }
}

/// Jenkins one-at-a-time hash
#[derive(Default)]
pub struct OneAtATime {
    hash: u32,
}

impl Hasher for OneAtATime {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.hash = self.hash.wrapping_add(byte as u32);
            self.hash = self.hash.wrapping_add(self.hash << 10);
            self.hash ^= self.hash >> 6;
        }
    }

    fn finish(&self) -> u64 {
        let mut hash = self.hash;
        hash = hash.wrapping_add(hash << 3);
        hash ^= hash >> 11;
        hash = hash.wrapping_add(hash << 15);
        hash as u64
    }
}

#[derive(Clone, Copy, Default)]
pub struct OneAtATimeState;

impl BuildHasher for OneAtATimeState {
    type Hasher = OneAtATime;

    #[inline]
    fn build_hasher(&self) -> OneAtATime {
        OneAtATime::default()
    }
}
