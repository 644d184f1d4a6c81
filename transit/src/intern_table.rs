//! De-duplicated string tables referenced by byte offset
use crate::{short_string_size, write_any, write_short_string};
use anyhow::{Result, bail};
use std::collections::HashMap;

/// Strings in first-seen order, each stored once.
///
/// Once the position of the table in the output is known, [`InternTable::layout`]
/// gives the byte offset of every entry so that records written after the table
/// can reference strings by offset.
#[derive(Debug, Default)]
pub struct InternTable {
    entries: Vec<String>,
    indices: HashMap<String, usize>,
}

impl InternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the string if it was never seen, returns true when it was inserted
    pub fn intern(&mut self, value: &str) -> bool {
        if self.indices.contains_key(value) {
            return false;
        }
        self.indices.insert(value.to_owned(), self.entries.len());
        self.entries.push(value.to_owned());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Size of the serialized table: u32 count followed by the u16-prefixed entries
    pub fn size_bytes(&self) -> usize {
        std::mem::size_of::<u32>() + self.entries.iter().map(|e| short_string_size(e)).sum::<usize>()
    }

    /// Offsets of each entry's length prefix when the table is written at `table_offset`
    pub fn layout(&self, table_offset: u64) -> HashMap<&str, u64> {
        let mut offsets = HashMap::with_capacity(self.entries.len());
        let mut offset = table_offset + std::mem::size_of::<u32>() as u64;
        for entry in &self.entries {
            offsets.insert(entry.as_str(), offset);
            offset += short_string_size(entry) as u64;
        }
        offsets
    }

    pub fn write(&self, buffer: &mut Vec<u8>) -> Result<()> {
        let Ok(count) = u32::try_from(self.entries.len()) else {
            bail!("too many interned strings: {}", self.entries.len());
        };
        write_any(buffer, &count);
        for entry in &self.entries {
            write_short_string(buffer, entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_first_seen_order() {
        let mut table = InternTable::new();
        assert!(table.intern("size"));
        assert!(table.intern("mode"));
        assert!(!table.intern("size"));
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["size", "mode"]);
    }

    #[test]
    fn test_layout_matches_written_bytes() {
        let mut table = InternTable::new();
        table.intern("a");
        table.intern("bcd");
        let mut buffer = vec![0xff; 10];
        let offsets = table.layout(buffer.len() as u64);
        table.write(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 10 + table.size_bytes());
        assert_eq!(offsets["a"], 14);
        assert_eq!(offsets["bcd"], 17);
        assert_eq!(
            crate::read_short_string_at(&buffer, offsets["bcd"]).unwrap(),
            "bcd"
        );
    }
}
