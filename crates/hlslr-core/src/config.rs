use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReflectError, ReflectResult};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "hlslr.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScanConfig {
    /// File extensions picked up when a directory is given, without the dot.
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["hlsl".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Appended to the input file name, so `a.hlsl` becomes `a.hlsl.inl`.
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: "inl".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BytecodeConfig {
    pub enabled: bool,
    /// Replaces the input's extension: `a.hlsl` pairs with `a.cso`.
    pub extension: String,
}

impl Default for BytecodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extension: "cso".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmitConfig {
    /// Attribute carrying the compute dispatch size. Compared case-insensitively.
    pub dispatch_attribute: String,
    /// Templated resource types that get a binding-constructor entry.
    pub buffer_types: Vec<String>,
    /// Spaces per nesting level in generated code.
    pub indent: usize,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            dispatch_attribute: "numthreads".to_string(),
            buffer_types: vec![
                "StructuredBuffer".to_string(),
                "RWStructuredBuffer".to_string(),
            ],
            indent: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct ReflectConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub bytecode: BytecodeConfig,
    #[serde(default)]
    pub emit: EmitConfig,
}

impl ReflectConfig {
    pub fn load_from_file(path: &Path) -> ReflectResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ReflectError::io("cannot read config", path, e))?;
        toml::from_str(&contents)
            .map_err(|e| ReflectError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to_file(&self, path: &Path) -> ReflectResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ReflectError::Config(e.to_string()))?;
        std::fs::write(path, contents).map_err(|e| ReflectError::io("cannot write config", path, e))
    }

    /// An explicit path must exist. Otherwise `hlslr.toml` in `dir` is used
    /// when present, then the defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> ReflectResult<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load_from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}
