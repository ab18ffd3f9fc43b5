//! Platform definitions: compiled options plus tag rules, loaded from an OS
//! role directory, explicit files or the embedded defaults.

use std::fs;
use std::path::{Path, PathBuf};

use hconfig_core::{
    compile_rules, Options, OptionsDefinition, OptionsError, TagRule, TagRuleDefinition,
    TagRuleError,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const OPTIONS_FILE: &str = "hierarchical_configuration_options.yml";
pub const TAGS_FILE: &str = "hierarchical_configuration_tags.yml";

/// Options and tag rules for one platform.
#[derive(Debug, Clone, Default)]
pub struct Platform {
    pub options: Options,
    pub tag_rules: Vec<TagRule>,
}

/// Errors returned when loading platform definitions.
#[derive(Debug, Error)]
pub enum PlatformLoadError {
    #[error("error opening {path}: file not found")]
    Missing { path: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid options in {path}: {source}")]
    Options {
        path: String,
        source: OptionsError,
    },
    #[error("invalid tag rules in {path}: {source}")]
    Tags {
        path: String,
        source: TagRuleError,
    },
    #[error("unknown built-in platform '{0}'")]
    UnknownBuiltin(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TagFile {
    #[serde(default)]
    rule: Vec<TagRuleDefinition>,
}

/// `roles/<os_role>/vars` under `roles_dir`.
pub fn role_dir(roles_dir: &Path, os_role: &str) -> PathBuf {
    roles_dir.join(os_role).join("vars")
}

/// Operating system named by a role such as `os_ios`.
pub fn operating_system(os_role: &str) -> &str {
    os_role.strip_prefix("os_").unwrap_or(os_role)
}

/// Load the options and tag files of an OS role. Both files must exist.
pub fn load_role_with_source(
    roles_dir: &Path,
    os_role: &str,
) -> Result<(Platform, String), PlatformLoadError> {
    let dir = role_dir(roles_dir, os_role);
    let options_path = locate(&dir, OPTIONS_FILE)?;
    let tags_path = locate(&dir, TAGS_FILE)?;

    let platform = Platform {
        options: load_options(&options_path)?,
        tag_rules: load_tag_rules(&tags_path)?,
    };
    debug!(
        os = operating_system(os_role),
        rules = platform.tag_rules.len(),
        "loaded role definitions"
    );
    Ok((platform, format!("role:{}", dir.display())))
}

/// Load an options file and an optional tag file.
pub fn load_files_with_source(
    options: &Path,
    tags: Option<&Path>,
) -> Result<(Platform, String), PlatformLoadError> {
    let tag_rules = match tags {
        Some(path) => load_tag_rules(path)?,
        None => Vec::new(),
    };
    let platform = Platform {
        options: load_options(options)?,
        tag_rules,
    };
    Ok((platform, format!("file:{}", options.display())))
}

/// Load a built-in platform by name: the core's options for it plus the
/// embedded tag rules.
pub fn load_builtin_with_source(name: &str) -> Result<(Platform, String), PlatformLoadError> {
    let (options, raw) = match name {
        "ios" => (
            Options::ios(),
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/platforms/ios.toml")),
        ),
        _ => return Err(PlatformLoadError::UnknownBuiltin(name.to_string())),
    };
    let path = format!("embedded {name} tag rules");
    let parsed: TagFile = toml::from_str(raw).map_err(|source| PlatformLoadError::Toml {
        path: path.clone(),
        source,
    })?;
    let tag_rules =
        compile_rules(&parsed.rule).map_err(|source| PlatformLoadError::Tags { path, source })?;
    Ok((Platform { options, tag_rules }, "embedded".to_string()))
}

/// Load and compile an options file (YAML, or TOML by extension).
pub fn load_options(path: &Path) -> Result<Options, PlatformLoadError> {
    let def: OptionsDefinition = decode(path, &read(path)?)?;
    Options::compile(&def).map_err(|source| PlatformLoadError::Options {
        path: path.display().to_string(),
        source,
    })
}

/// Load and compile a tag file: a YAML list, or `[[rule]]` tables in TOML.
pub fn load_tag_rules(path: &Path) -> Result<Vec<TagRule>, PlatformLoadError> {
    let raw = read(path)?;
    let defs: Vec<TagRuleDefinition> = if is_toml(path) {
        decode::<TagFile>(path, &raw)?.rule
    } else {
        decode(path, &raw)?
    };
    compile_rules(&defs).map_err(|source| PlatformLoadError::Tags {
        path: path.display().to_string(),
        source,
    })
}

fn locate(dir: &Path, name: &str) -> Result<PathBuf, PlatformLoadError> {
    let path = dir.join(name);
    [path.clone(), path.with_extension("yaml"), path.with_extension("toml")]
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| PlatformLoadError::Missing {
            path: path.display().to_string(),
        })
}

fn read(path: &Path) -> Result<String, PlatformLoadError> {
    fs::read_to_string(path).map_err(|source| PlatformLoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("toml")
}

fn decode<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<T, PlatformLoadError> {
    let display = path.display().to_string();
    if is_toml(path) {
        toml::from_str(raw).map_err(|source| PlatformLoadError::Toml {
            path: display,
            source,
        })
    } else {
        serde_yaml::from_str(raw).map_err(|source| PlatformLoadError::Yaml {
            path: display,
            source,
        })
    }
}
