use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ids::{FilePathId, SymbolIndex};

/// Coarse classification of an indexed symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SymbolKind {
    #[default]
    None = 0,
    Enumeration = 1,
    Record = 2,
    Function = 3,
    Variable = 4,
    Macro = 5,
}

impl SymbolKind {
    pub fn from_ordinal(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::None),
            1 => Some(Self::Enumeration),
            2 => Some(Self::Record),
            3 => Some(Self::Function),
            4 => Some(Self::Variable),
            5 => Some(Self::Macro),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// Refinements of [`SymbolKind`] (which record keyword, scoped enum, ...).
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SymbolTags: u8 {
        const CLASS = 1;
        const STRUCT = 1 << 1;
        const ENUMERATION = 1 << 2;
        const UNION = 1 << 3;
        const MSVC_INTERFACE = 1 << 4;
    }
}

/// One distinct symbol seen during a collection pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    /// Unified Symbol Resolution string; stable across runs.
    pub usr: String,
    pub symbol_name: String,
    pub kind: SymbolKind,
    pub tags: SymbolTags,
}

impl SymbolEntry {
    pub fn new(usr: impl Into<String>, symbol_name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            usr: usr.into(),
            symbol_name: symbol_name.into(),
            kind,
            tags: SymbolTags::empty(),
        }
    }

    pub fn with_tags(mut self, tags: SymbolTags) -> Self {
        self.tags = tags;
        self
    }
}

/// Symbols of one collection pass keyed by their pass-local index.
pub type SymbolEntries = BTreeMap<SymbolIndex, SymbolEntry>;

/// Role of a single symbol occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SourceLocationKind {
    None = 0,
    Declaration = 1,
    DeclarationReference = 2,
    Definition = 3,
    MacroDefinition = 4,
    MacroUndefinition = 5,
    MacroUsage = 6,
}

impl SourceLocationKind {
    pub fn from_ordinal(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::None),
            1 => Some(Self::Declaration),
            2 => Some(Self::DeclarationReference),
            3 => Some(Self::Definition),
            4 => Some(Self::MacroDefinition),
            5 => Some(Self::MacroUndefinition),
            6 => Some(Self::MacroUsage),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// One occurrence of a symbol in a file. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocationEntry {
    pub symbol_id: SymbolIndex,
    pub file_path_id: FilePathId,
    pub line: u32,
    pub column: u32,
    pub kind: SourceLocationKind,
}

pub type SourceLocationEntries = Vec<SourceLocationEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_kind_ordinal_round_trip() {
        for n in 0..=5u8 {
            let kind = SymbolKind::from_ordinal(n).unwrap();
            assert_eq!(kind.ordinal(), n);
        }
        assert!(SymbolKind::from_ordinal(6).is_none());
    }

    #[test]
    fn location_kind_ordinal_round_trip() {
        for n in 0..=6u8 {
            let kind = SourceLocationKind::from_ordinal(n).unwrap();
            assert_eq!(kind.ordinal(), n);
        }
        assert!(SourceLocationKind::from_ordinal(7).is_none());
    }

    #[test]
    fn tags_combine() {
        let tags = SymbolTags::CLASS | SymbolTags::MSVC_INTERFACE;
        assert!(tags.contains(SymbolTags::CLASS));
        assert!(!tags.contains(SymbolTags::STRUCT));
        assert_eq!(SymbolTags::from_bits(tags.bits()), Some(tags));
    }

    #[test]
    fn entry_builder() {
        let entry = SymbolEntry::new("c:@S@Foo", "Foo", SymbolKind::Record)
            .with_tags(SymbolTags::STRUCT);
        assert_eq!(entry.symbol_name, "Foo");
        assert_eq!(entry.tags, SymbolTags::STRUCT);
    }
}
