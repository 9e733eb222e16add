//! # File System Operations Module / 文件系统操作模块
//!
//! This module finds test sources on disk and expands user-supplied paths.
//!
//! 此模块在磁盘上查找测试源并展开用户提供的路径。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::TEST_PREFIX;

/// Extension of declarative test sources.
pub const DECLARATIVE_EXTENSION: &str = "json";

/// A test source file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name, used as the source's group id.
    pub name: String,
    pub path: PathBuf,
    /// Extension without the dot.
    pub extension: String,
}

impl SourceFile {
    pub fn is_declarative(&self) -> bool {
        self.extension == DECLARATIVE_EXTENSION
    }

    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read test source: {}", self.path.display()))
    }
}

/// Expands `~` and environment variables in a path.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path: {}", path.display()))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Lists `test_*.json` files and `test_*.<ext>` files for each script extension in `dir`.
///
/// Files are sorted by name so collection order does not depend on the file system.
/// Subdirectories are not searched.
pub fn discover_sources(dir: &Path, script_extensions: &[&str]) -> Result<Vec<SourceFile>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read tests directory: {}", dir.display()))?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read tests directory: {}", dir.display()))?
            .path();
        if !path.is_file() {
            continue;
        }

        let (Some(name), Some(extension)) = (
            path.file_name().and_then(|n| n.to_str()),
            path.extension().and_then(|e| e.to_str()),
        ) else {
            continue;
        };
        if !name.starts_with(TEST_PREFIX) {
            continue;
        }
        if extension != DECLARATIVE_EXTENSION && !script_extensions.contains(&extension) {
            continue;
        }

        sources.push(SourceFile {
            name: name.to_string(),
            extension: extension.to_string(),
            path: path.clone(),
        });
    }

    sources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sources)
}

/// Checks if a path exists and is a directory.
pub fn is_directory(path: &Path) -> bool {
    path.exists() && path.is_dir()
}
