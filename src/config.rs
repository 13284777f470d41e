use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::CompileError;

pub const CONFIG_FILE_NAME: &str = "basalt.toml";

/// Version of the target runtime the generated code links against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
}

impl RuntimeVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a `"MAJOR.MINOR"` string. Anything else is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.trim().split_once('.')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// How the runtime builds text objects from C format strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    Legacy,
    Modern,
}

impl TextEncoding {
    pub fn format_function(self) -> &'static str {
        match self {
            TextEncoding::Legacy => "PyString_FromFormat",
            TextEncoding::Modern => "PyUnicode_FromFormat",
        }
    }
}

/// Target-runtime feature flags, resolved once per compilation run and passed
/// down by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeProfile {
    pub version: RuntimeVersion,
    pub supports_exception_chaining: bool,
    pub uses_legacy_global_name_error_helper: bool,
    pub text_encoding: TextEncoding,
}

impl RuntimeProfile {
    pub fn for_version(version: RuntimeVersion) -> Self {
        Self {
            version,
            supports_exception_chaining: version.major >= 3,
            uses_legacy_global_name_error_helper: version < RuntimeVersion::new(3, 4),
            text_encoding: if version.major >= 3 {
                TextEncoding::Modern
            } else {
                TextEncoding::Legacy
            },
        }
    }

    pub fn legacy() -> Self {
        Self::for_version(RuntimeVersion::new(2, 7))
    }

    pub fn modern() -> Self {
        Self::for_version(RuntimeVersion::new(3, 8))
    }
}

impl Default for RuntimeProfile {
    fn default() -> Self {
        Self::modern()
    }
}

// ---- TOML deserialization types ----

#[derive(Deserialize)]
struct TomlConfig {
    runtime: Option<TomlRuntime>,
    #[serde(default)]
    capabilities: TomlCapabilities,
}

#[derive(Deserialize)]
struct TomlRuntime {
    version: Option<String>,
}

#[derive(Default, Deserialize)]
struct TomlCapabilities {
    exception_chaining: Option<bool>,
    legacy_global_name_error: Option<bool>,
    text_encoding: Option<TextEncoding>,
}

// ---- Discovery ----

/// Walk up from `start_dir` looking for `basalt.toml`. Stops at a `.git`
/// boundary (file or directory) or at the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if dir.join(".git").exists() {
            return None;
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Resolve the profile for a compilation rooted at `start_dir`. Without a
/// config file the modern default profile is used.
pub fn resolve_profile(start_dir: &Path) -> Result<RuntimeProfile, CompileError> {
    match find_config(start_dir) {
        Some(path) => load_profile(&path),
        None => {
            tracing::debug!(dir = %start_dir.display(), "no {CONFIG_FILE_NAME} found, using default runtime profile");
            Ok(RuntimeProfile::default())
        }
    }
}

// ---- Parsing & validation ----

pub fn load_profile(config_path: &Path) -> Result<RuntimeProfile, CompileError> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        CompileError::config(
            format!("{CONFIG_FILE_NAME}: could not read file: {e}"),
            config_path.to_path_buf(),
        )
    })?;
    parse_profile(&content, config_path)
}

pub fn parse_profile(content: &str, config_path: &Path) -> Result<RuntimeProfile, CompileError> {
    let config: TomlConfig = toml::from_str(content).map_err(|e| {
        CompileError::config(
            format!("{CONFIG_FILE_NAME}: invalid syntax: {e}"),
            config_path.to_path_buf(),
        )
    })?;

    let runtime = config.runtime.ok_or_else(|| {
        CompileError::config(
            format!("{CONFIG_FILE_NAME}: missing [runtime] section"),
            config_path.to_path_buf(),
        )
    })?;

    let version_str = runtime.version.ok_or_else(|| {
        CompileError::config(
            format!("{CONFIG_FILE_NAME}: missing 'version' in [runtime]"),
            config_path.to_path_buf(),
        )
    })?;

    let version = RuntimeVersion::parse(&version_str).ok_or_else(|| {
        CompileError::config(
            format!("{CONFIG_FILE_NAME}: invalid runtime version '{version_str}', expected MAJOR.MINOR"),
            config_path.to_path_buf(),
        )
    })?;

    let mut profile = RuntimeProfile::for_version(version);
    let caps = config.capabilities;
    if let Some(chaining) = caps.exception_chaining {
        profile.supports_exception_chaining = chaining;
    }
    if let Some(legacy) = caps.legacy_global_name_error {
        profile.uses_legacy_global_name_error_helper = legacy;
    }
    if let Some(encoding) = caps.text_encoding {
        profile.text_encoding = encoding;
    }

    tracing::debug!(
        path = %config_path.display(),
        version = %profile.version,
        chaining = profile.supports_exception_chaining,
        "loaded runtime profile"
    );
    Ok(profile)
}
