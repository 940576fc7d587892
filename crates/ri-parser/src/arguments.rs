use ri_core::{normalize_path, Language};

use crate::error::ParserError;

/// A `-D` or `-U` switch, kept in command-line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroCommand {
    Define { name: String, value: String },
    Undefine(String),
}

/// The subset of a compiler command line the front end honours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation {
    pub language: Option<Language>,
    /// `-iquote`: searched for `"..."` includes only.
    pub quote_include_paths: Vec<String>,
    /// `-I`: searched for both include forms.
    pub user_include_paths: Vec<String>,
    /// `-isystem`, `-idirafter`: searched last; files found there are system headers.
    pub system_include_paths: Vec<String>,
    pub macro_commands: Vec<MacroCommand>,
    /// `-include`: processed before the main file.
    pub forced_includes: Vec<String>,
    /// `-include-pch`: replayed before the main file.
    pub precompiled_header: Option<String>,
}

impl CompilerInvocation {
    /// Parse `arguments`. Unknown switches are ignored; a switch that needs a
    /// value but is last on the line is an error.
    pub fn parse(arguments: &[String], working_directory: Option<&str>) -> Result<Self, ParserError> {
        let mut invocation = Self {
            language: None,
            quote_include_paths: Vec::new(),
            user_include_paths: Vec::new(),
            system_include_paths: Vec::new(),
            macro_commands: Vec::new(),
            forced_includes: Vec::new(),
            precompiled_header: None,
        };

        let resolve = |path: &str| -> String {
            match working_directory {
                Some(dir) if !path.starts_with('/') => normalize_path(&format!("{dir}/{path}")),
                _ => normalize_path(path),
            }
        };

        let mut iter = arguments
            .iter()
            .map(String::as_str)
            .filter(|arg| *arg != "-Xclang");

        while let Some(arg) = iter.next() {
            let mut value_of = |switch: &str, inline: &str| -> Result<String, ParserError> {
                if !inline.is_empty() {
                    return Ok(inline.to_string());
                }
                iter.next()
                    .map(str::to_string)
                    .ok_or_else(|| ParserError::InvalidArguments {
                        reason: format!("missing value after {switch}"),
                    })
            };

            if arg == "-include-pch" {
                let path = value_of(arg, "")?;
                invocation.precompiled_header = Some(resolve(&path));
            } else if arg == "-include" {
                let path = value_of(arg, "")?;
                invocation.forced_includes.push(resolve(&path));
            } else if let Some(rest) = arg.strip_prefix("-isystem") {
                let path = value_of("-isystem", rest)?;
                invocation.system_include_paths.push(resolve(&path));
            } else if let Some(rest) = arg.strip_prefix("-idirafter") {
                let path = value_of("-idirafter", rest)?;
                invocation.system_include_paths.push(resolve(&path));
            } else if let Some(rest) = arg.strip_prefix("-iquote") {
                let path = value_of("-iquote", rest)?;
                invocation.quote_include_paths.push(resolve(&path));
            } else if let Some(rest) = arg.strip_prefix("-I") {
                let path = value_of("-I", rest)?;
                invocation.user_include_paths.push(resolve(&path));
            } else if let Some(rest) = arg.strip_prefix("-D") {
                let definition = value_of("-D", rest)?;
                invocation.macro_commands.push(parse_define(&definition));
            } else if let Some(rest) = arg.strip_prefix("-U") {
                let name = value_of("-U", rest)?;
                invocation.macro_commands.push(MacroCommand::Undefine(name));
            } else if let Some(rest) = arg.strip_prefix("-x") {
                let value = value_of("-x", rest)?;
                invocation.language = Language::from_switch(&value).or(invocation.language);
            } else if let Some(standard) = arg.strip_prefix("-std=") {
                invocation.language = Some(language_of_standard(standard));
            }
        }

        Ok(invocation)
    }

    /// The effective language for `main_file`: an explicit `-x`/`-std` wins,
    /// then the extension, then C++.
    pub fn language_for(&self, main_file: &str) -> Language {
        self.language
            .or_else(|| crate::registry::ParserRegistry::language_for_path(main_file))
            .unwrap_or(Language::Cxx)
    }
}

fn parse_define(definition: &str) -> MacroCommand {
    match definition.split_once('=') {
        Some((name, value)) => MacroCommand::Define {
            name: name.to_string(),
            value: value.to_string(),
        },
        None => MacroCommand::Define {
            name: definition.to_string(),
            value: "1".to_string(),
        },
    }
}

fn language_of_standard(standard: &str) -> Language {
    if standard.contains("++") {
        Language::Cxx
    } else {
        Language::C
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn include_paths_joined_and_split() {
        let inv = CompilerInvocation::parse(
            &args(&["-I/inc", "-I", "/inc2", "-isystem", "/sys", "-iquote/q"]),
            None,
        )
        .unwrap();
        assert_eq!(inv.user_include_paths, vec!["/inc", "/inc2"]);
        assert_eq!(inv.system_include_paths, vec!["/sys"]);
        assert_eq!(inv.quote_include_paths, vec!["/q"]);
    }

    #[test]
    fn relative_paths_resolved_against_working_directory() {
        let inv = CompilerInvocation::parse(&args(&["-Iinclude/../api"]), Some("/project")).unwrap();
        assert_eq!(inv.user_include_paths, vec!["/project/api"]);
    }

    #[test]
    fn macros_keep_order() {
        let inv = CompilerInvocation::parse(&args(&["-DFOO", "-DBAR=2", "-UFOO", "-D", "BAZ=x"]), None).unwrap();
        assert_eq!(
            inv.macro_commands,
            vec![
                MacroCommand::Define { name: "FOO".into(), value: "1".into() },
                MacroCommand::Define { name: "BAR".into(), value: "2".into() },
                MacroCommand::Undefine("FOO".into()),
                MacroCommand::Define { name: "BAZ".into(), value: "x".into() },
            ]
        );
    }

    #[test]
    fn pch_through_xclang() {
        let inv = CompilerInvocation::parse(
            &args(&["-Xclang", "-include-pch", "-Xclang", "/tmp/p.pch", "-include", "/cfg.h"]),
            None,
        )
        .unwrap();
        assert_eq!(inv.precompiled_header.as_deref(), Some("/tmp/p.pch"));
        assert_eq!(inv.forced_includes, vec!["/cfg.h"]);
    }

    #[test]
    fn language_selection() {
        let inv = CompilerInvocation::parse(&args(&["-x", "c"]), None).unwrap();
        assert_eq!(inv.language_for("/a.cpp"), Language::C);

        let inv = CompilerInvocation::parse(&args(&["-std=c++17"]), None).unwrap();
        assert_eq!(inv.language_for("/a.c"), Language::Cxx);

        let inv = CompilerInvocation::parse(&[], None).unwrap();
        assert_eq!(inv.language_for("/a.c"), Language::C);
        assert_eq!(inv.language_for("/a.h"), Language::Cxx);
    }

    #[test]
    fn missing_value_is_error() {
        let err = CompilerInvocation::parse(&args(&["-I"]), None).unwrap_err();
        assert!(matches!(err, ParserError::InvalidArguments { .. }));
    }
}
