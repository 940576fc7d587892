use serde::{Deserialize, Serialize};

/// Source languages understood by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Language {
    C = 0,
    Cxx = 1,
}

impl Language {
    /// Map a source file extension to a Language.
    ///
    /// Headers are not mapped: their language is the language of the
    /// translation unit that includes them.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "c" => Some(Self::C),
            "cc" | "cpp" | "cxx" | "c++" | "cp" => Some(Self::Cxx),
            _ => None,
        }
    }

    /// Returns `true` for C/C++ header extensions.
    pub fn is_header_extension(ext: &str) -> bool {
        matches!(ext, "h" | "hh" | "hpp" | "hxx" | "h++" | "inl" | "tcc")
    }

    /// Parse the value of a `-x` compiler switch.
    pub fn from_switch(value: &str) -> Option<Self> {
        match value {
            "c" | "c-header" => Some(Self::C),
            "c++" | "c++-header" => Some(Self::Cxx),
            _ => None,
        }
    }

    pub fn from_ordinal(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::C),
            1 => Some(Self::Cxx),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cxx => "c++",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(Language::from_extension("c"), Some(Language::C));
        assert_eq!(Language::from_extension("cpp"), Some(Language::Cxx));
        assert_eq!(Language::from_extension("cc"), Some(Language::Cxx));
        assert_eq!(Language::from_extension("cxx"), Some(Language::Cxx));
        assert_eq!(Language::from_extension("h"), None);
        assert_eq!(Language::from_extension("py"), None);
    }

    #[test]
    fn header_extensions() {
        assert!(Language::is_header_extension("h"));
        assert!(Language::is_header_extension("hpp"));
        assert!(!Language::is_header_extension("cpp"));
    }

    #[test]
    fn switch_values() {
        assert_eq!(Language::from_switch("c++"), Some(Language::Cxx));
        assert_eq!(Language::from_switch("c-header"), Some(Language::C));
        assert_eq!(Language::from_switch("objective-c"), None);
    }

    #[test]
    fn ordinal_round_trip() {
        for n in 0..=1u8 {
            let lang = Language::from_ordinal(n).unwrap();
            assert_eq!(lang.ordinal(), n);
        }
        assert!(Language::from_ordinal(2).is_none());
    }
}
