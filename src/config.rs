use anyhow::{Context, Result};
use mergekit::MergeSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Batch file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "xmlmerge.toml";

// ============================================================================
// Batch Config
// ============================================================================

/// A batch file:
///
/// ```toml
/// [options]
/// keep_going = false
///
/// [[merge]]
/// target = "target/web.xml"
/// sources = ["src/web-base.xml", "src/web-prod.xml"]
/// properties = "src/web-merge.properties"
/// ```
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct BatchConfig {
    #[serde(default)]
    pub options: BatchOptions,

    #[serde(default, rename = "merge")]
    pub merges: Vec<MergeEntry>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct BatchOptions {
    #[serde(default)]
    pub keep_going: bool,
    #[serde(default)]
    pub jobs: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MergeEntry {
    pub target: String,
    pub sources: Vec<String>,
    #[serde(default)]
    pub properties: Option<String>,
}

impl BatchConfig {
    /// Load and check a batch file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read batch file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid batch file {}", path.display()))?;
        log::debug!(
            "Loaded {} merge job(s) from {}",
            config.merges.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and check batch file content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format")?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        for (i, entry) in self.merges.iter().enumerate() {
            if entry.target.trim().is_empty() {
                anyhow::bail!("merge #{} has an empty target", i + 1);
            }
            if entry.sources.is_empty() {
                anyhow::bail!("merge #{} ({}) lists no sources", i + 1, entry.target);
            }
        }
        Ok(())
    }

    /// Build merge jobs, resolving relative paths against `base_dir`
    pub fn specs(&self, base_dir: &Path) -> Vec<MergeSpec> {
        self.merges
            .iter()
            .map(|entry| entry.to_spec(base_dir))
            .collect()
    }
}

impl MergeEntry {
    fn to_spec(&self, base_dir: &Path) -> MergeSpec {
        let spec = MergeSpec::new(
            resolve_path(&self.target, base_dir),
            self.sources.iter().map(|s| resolve_path(s, base_dir)),
        );
        match &self.properties {
            Some(props) => spec.with_properties(resolve_path(props, base_dir)),
            None => spec,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Directory that relative paths in a batch file are resolved against
pub fn base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Expand `~` and anchor relative paths at `base_dir`
pub fn resolve_path(raw: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    let path = PathBuf::from(expanded.as_ref());
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
