use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{FrameError, Result};
use crate::frame::Frame;
use crate::number::parse_hex_u32;

/// A single acceptance rule.
///
/// A frame matches when `(identifier & mask) == (id & mask)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterEntry {
    pub id: u32,
    pub mask: u32,
}

impl FilterEntry {
    pub fn new(id: u32, mask: u32) -> Self {
        Self { id, mask }
    }

    pub fn matches(&self, frame: &Frame) -> bool {
        self.matches_id(frame.identifier())
    }

    pub fn matches_id(&self, identifier: u32) -> bool {
        identifier & self.mask == self.id & self.mask
    }
}

impl fmt::Display for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id: 0x{:08x} mask: 0x{:08x}", self.id, self.mask)
    }
}

/// An ordered set of acceptance rules.
///
/// An empty table accepts every frame. Otherwise a frame is accepted when
/// at least one entry matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTable {
    entries: Vec<FilterEntry>,
}

impl FilterTable {
    /// A table that accepts everything.
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = FilterEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Parse `id:mask[:id:mask]...`.
    ///
    /// Fields are hexadecimal, with or without a `0x` prefix.
    pub fn parse(spec: &str) -> Result<Self> {
        let fields: Vec<&str> = spec.split(':').collect();
        if fields.len() % 2 != 0 {
            return Err(invalid(spec, "trailing id without mask"));
        }

        let mut entries = Vec::with_capacity(fields.len() / 2);
        for pair in fields.chunks_exact(2) {
            let id = parse_field(spec, pair[0])?;
            let mask = parse_field(spec, pair[1])?;
            let entry = FilterEntry::new(id, mask);
            debug!(%entry, "parsed filter");
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    pub fn accepts(&self, frame: &Frame) -> bool {
        self.entries.is_empty() || self.entries.iter().any(|entry| entry.matches(frame))
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for FilterTable {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<'a> IntoIterator for &'a FilterTable {
    type Item = &'a FilterEntry;
    type IntoIter = std::slice::Iter<'a, FilterEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn parse_field(spec: &str, field: &str) -> Result<u32> {
    if field.trim().is_empty() {
        return Err(invalid(spec, "empty field"));
    }
    parse_hex_u32(field)
        .ok_or_else(|| invalid(spec, &format!("\"{field}\" is not a hex number")))
}

fn invalid(spec: &str, reason: &str) -> FrameError {
    FrameError::InvalidFilterSyntax {
        spec: spec.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pairs_in_order() {
        let table = FilterTable::parse("10:ff:20:0f").unwrap();
        assert_eq!(
            table.entries(),
            &[FilterEntry::new(16, 255), FilterEntry::new(32, 15)]
        );
    }

    #[test]
    fn parse_accepts_hex_prefix() {
        let table = FilterTable::parse("0x10:0xff:0X20:0f").unwrap();
        assert_eq!(
            table.entries(),
            &[FilterEntry::new(16, 255), FilterEntry::new(32, 15)]
        );
    }

    #[test]
    fn leading_zero_is_still_hex() {
        let table = FilterTable::parse("010:0x7ff").unwrap();
        assert_eq!(table.entries(), &[FilterEntry::new(0x10, 0x7FF)]);
    }

    #[test]
    fn parse_rejects_odd_field_count() {
        let err = FilterTable::parse("10:ff:20").unwrap_err();
        assert!(matches!(err, FrameError::InvalidFilterSyntax { .. }));
        assert!(FilterTable::parse("10").is_err());
    }

    #[test]
    fn parse_rejects_bad_fields() {
        assert!(FilterTable::parse("").is_err());
        assert!(FilterTable::parse("0x10:").is_err());
        assert!(FilterTable::parse("xyz:0x7ff").is_err());
        assert!(FilterTable::parse("100000000:7ff").is_err());
    }

    #[test]
    fn entry_matches_under_mask() {
        let table = FilterTable::from_entries([FilterEntry::new(0x100, 0x700)]);
        assert!(table.accepts(&Frame::new(0x123, &[])));
        assert!(!table.accepts(&Frame::new(0x523, &[])));
    }

    #[test]
    fn any_entry_accepts() {
        let table = FilterTable::from_entries([
            FilterEntry::new(0x100, 0x7FF),
            FilterEntry::new(0x200, 0x7FF),
        ]);
        assert!(table.accepts(&Frame::new(0x200, &[])));
        assert!(!table.accepts(&Frame::new(0x300, &[])));
    }

    #[test]
    fn empty_table_accepts_everything() {
        let table = FilterTable::accept_all();
        assert!(table.is_empty());
        assert!(table.accepts(&Frame::new(0x7FF, &[])));
    }

    #[test]
    fn entry_display_matches_filter_log_line() {
        let entry = FilterEntry::new(0x10, 0xff);
        assert_eq!(entry.to_string(), "id: 0x00000010 mask: 0x000000ff");
    }
}
