use std::path::Path;

use ri_core::Language;
use tree_sitter::Language as TSLanguage;

/// Maps languages and file names to tree-sitter grammars.
pub struct ParserRegistry;

impl ParserRegistry {
    /// The grammar used to parse every file of a translation unit in `lang`.
    pub fn grammar(lang: Language) -> TSLanguage {
        match lang {
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cxx => tree_sitter_cpp::LANGUAGE.into(),
        }
    }

    /// Resolve the language of a main file from its extension.
    pub fn language_for_path(path: &str) -> Option<Language> {
        let ext = Path::new(path).extension()?.to_str()?;
        Language::from_extension(&ext.to_ascii_lowercase())
    }

    /// Whether `path` names a C/C++ source or header.
    pub fn is_indexable_path(path: &str) -> bool {
        let ext = match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_ascii_lowercase(),
            None => return false,
        };
        Language::from_extension(&ext).is_some() || Language::is_header_extension(&ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_languages_have_grammars() {
        for lang in [Language::C, Language::Cxx] {
            let mut parser = tree_sitter::Parser::new();
            parser
                .set_language(&ParserRegistry::grammar(lang))
                .expect("grammar should load");
        }
    }

    #[test]
    fn language_for_path() {
        assert_eq!(ParserRegistry::language_for_path("/src/a.c"), Some(Language::C));
        assert_eq!(ParserRegistry::language_for_path("/src/a.CPP"), Some(Language::Cxx));
        assert_eq!(ParserRegistry::language_for_path("/src/a.h"), None);
        assert_eq!(ParserRegistry::language_for_path("/src/Makefile"), None);
    }

    #[test]
    fn indexable_paths() {
        assert!(ParserRegistry::is_indexable_path("/src/a.hpp"));
        assert!(ParserRegistry::is_indexable_path("/src/a.cc"));
        assert!(!ParserRegistry::is_indexable_path("/src/a.rs"));
    }
}
