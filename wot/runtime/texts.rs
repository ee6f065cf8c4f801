//! Text table
//!
//! String values in the pool hold a `TextRef` into this table. The text is released when the
//! heap reclaims the string value.

use log::{trace, warn};
use wot_gc::TextRef;

use crate::common::error::{RuntimeError, RuntimeResult};

pub struct TextTable {
    entries: Vec<Option<Box<str>>>,

    /// Released entries, reused before the table grows
    free: Vec<u16>,

    capacity: usize,
}

impl TextTable {
    pub fn with_capacity(capacity: usize) -> TextTable {
        let capacity = capacity.min(u16::MAX as usize + 1);
        TextTable {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            capacity,
        }
    }

    /// Store a copy of `text`
    pub fn insert(&mut self, text: &str) -> RuntimeResult<TextRef> {
        if let Some(index) = self.free.pop() {
            self.entries[index as usize] = Some(text.into());
            return Ok(TextRef(index));
        }

        if self.entries.len() >= self.capacity {
            warn!("text table full, cannot store {:?}", text);
            return Err(RuntimeError::TextTableFull {
                capacity: self.capacity,
            });
        }

        let index = self.entries.len() as u16;
        self.entries.push(Some(text.into()));
        Ok(TextRef(index))
    }

    #[inline]
    pub fn get(&self, text: TextRef) -> Option<&str> {
        self.entries
            .get(text.0 as usize)
            .and_then(|entry| entry.as_deref())
    }

    /// Drop a text. Releasing an entry twice is ignored.
    pub fn release(&mut self, text: TextRef) {
        match self.entries.get_mut(text.0 as usize) {
            Some(entry) if entry.is_some() => {
                *entry = None;
                self.free.push(text.0);
            }
            _ => trace!("ignoring release of unused text {:?}", text),
        }
    }

    /// Number of live texts
    pub fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_release_reuse() {
        let mut texts = TextTable::with_capacity(2);
        let hello = texts.insert("hello").unwrap();
        let world = texts.insert("world").unwrap();
        assert_eq!(texts.get(hello), Some("hello"));
        assert_eq!(
            texts.insert("mum"),
            Err(RuntimeError::TextTableFull { capacity: 2 })
        );

        texts.release(hello);
        texts.release(hello);
        assert_eq!(texts.get(hello), None);
        assert_eq!(texts.len(), 1);

        let mum = texts.insert("mum").unwrap();
        assert_eq!(mum, hello);
        assert_eq!(texts.get(mum), Some("mum"));
        assert_eq!(texts.get(world), Some("world"));
    }
}
