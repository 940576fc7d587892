use ri_core::{IncludeSearchPathType, ProjectPartContainer, ProjectPartPch};

/// Front-end arguments for the sources of `part`.
///
/// Order: language switch, tool-chain arguments, macros, include search
/// paths in search order, then the precompiled header.
pub fn build(part: &ProjectPartContainer, pch: Option<&ProjectPartPch>) -> Vec<String> {
    let mut arguments = Vec::with_capacity(
        2 + part.arguments.len() + part.compiler_macros.len() + 2 * part.include_search_paths.len() + 2,
    );

    arguments.push("-x".to_string());
    arguments.push(part.language.name().to_string());
    arguments.extend(part.arguments.iter().cloned());
    arguments.extend(part.compiler_macros.iter().map(|m| m.to_argument()));

    let mut include_search_paths: Vec<_> = part.include_search_paths.iter().collect();
    include_search_paths.sort_by_key(|p| p.index);
    for path in include_search_paths {
        let switch = match path.path_type {
            IncludeSearchPathType::User => "-I",
            IncludeSearchPathType::System
            | IncludeSearchPathType::BuiltIn
            | IncludeSearchPathType::Framework => "-isystem",
        };
        arguments.push(switch.to_string());
        arguments.push(path.path.clone());
    }

    if let Some(pch) = pch {
        arguments.push("-include-pch".to_string());
        arguments.push(pch.pch_path.clone());
    }

    arguments
}
