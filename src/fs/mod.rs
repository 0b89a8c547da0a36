//! File system helpers for assembling the bundle tree

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use ignore::overrides::{Override, OverrideBuilder};
use tracing::warn;
use walkdir::WalkDir;

/// Current directory switched for the lifetime of the guard
///
/// The previous directory is restored on drop, including when the holder
/// returns early with an error.
#[derive(Debug)]
pub struct ScopedDir {
    previous: PathBuf,
}

impl ScopedDir {
    pub fn enter(dir: &Path) -> Result<Self> {
        let previous = env::current_dir().context("Failed to read current directory")?;
        env::set_current_dir(dir)
            .with_context(|| format!("Failed to enter {}", dir.display()))?;
        Ok(Self { previous })
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            warn!(dir = %self.previous.display(), error = %e, "Failed to restore working directory");
        }
    }
}

/// Shell-style name patterns (`*.pyc`, `*test*`) matched against entry names
pub struct NamePatterns {
    matcher: Override,
}

impl NamePatterns {
    pub fn new(root: &Path, patterns: &[String]) -> Result<Self> {
        let mut builder = OverrideBuilder::new(root);
        for pattern in patterns {
            builder
                .add(pattern)
                .with_context(|| format!("Invalid pattern '{}'", pattern))?;
        }
        let matcher = builder.build().context("Failed to build pattern matcher")?;
        Ok(Self { matcher })
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    pub fn matches(&self, path: &Path, is_dir: bool) -> bool {
        !self.matcher.is_empty() && self.matcher.matched(path, is_dir).is_whitelist()
    }
}

fn has_wildcard(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

/// Expand a path whose components may contain wildcards
///
/// Matches are returned sorted. A path without wildcards expands to itself
/// if it exists and to nothing otherwise.
pub fn expand(pattern: &Path) -> Result<Vec<PathBuf>> {
    let mut candidates = vec![PathBuf::new()];

    for component in pattern.components() {
        let part = component.as_os_str().to_string_lossy();
        let is_pattern = matches!(component, Component::Normal(_)) && has_wildcard(&part);

        if !is_pattern {
            for candidate in &mut candidates {
                candidate.push(component.as_os_str());
            }
            continue;
        }

        let mut next = Vec::new();
        for candidate in &candidates {
            if !candidate.is_dir() {
                continue;
            }
            let matcher = NamePatterns::new(candidate, &[part.to_string()])?;
            let entries = fs::read_dir(candidate)
                .with_context(|| format!("Failed to list {}", candidate.display()))?;
            for entry in entries {
                let entry = entry?;
                let path = entry.path();
                let is_dir = entry.file_type()?.is_dir();
                if matcher.matches(&path, is_dir) {
                    next.push(path);
                }
            }
        }
        candidates = next;
    }

    let mut matches: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|p| p.symlink_metadata().is_ok())
        .collect();
    matches.sort();
    Ok(matches)
}

/// Copy a file, directory or symlink into `dest_dir`, keeping its name
pub fn copy_into(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("Cannot copy {}: no file name", src.display()))?;
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;
    let dest = dest_dir.join(name);
    copy_entry(src, &dest)?;
    Ok(dest)
}

/// Copy `src` to `dest`, recursing into directories
pub fn copy_entry(src: &Path, dest: &Path) -> Result<()> {
    let meta = src
        .symlink_metadata()
        .with_context(|| format!("Cannot copy {}: not found", src.display()))?;

    if meta.file_type().is_symlink() {
        return copy_symlink(src, dest);
    }
    if meta.is_dir() {
        return copy_tree(src, dest);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
    Ok(())
}

/// Recursively copy a directory's contents into `dest`, merging with what is there
pub fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let target = fs::read_link(src)?;
    remove_if_exists(dest)?;
    std::os::unix::fs::symlink(&target, dest)
        .with_context(|| format!("Failed to link {}", dest.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let resolved = fs::canonicalize(src)?;
    copy_entry(&resolved, dest)
}

/// Create a symlink at `link` pointing to `target`
#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) -> Result<()> {
    remove_if_exists(link)?;
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("Failed to link {} -> {}", link.display(), target.display()))
}

#[cfg(not(unix))]
pub fn symlink(_target: &Path, link: &Path) -> Result<()> {
    anyhow::bail!("symlinks are not supported here: {}", link.display())
}

/// Remove a file, symlink or directory tree; absent paths are not an error
pub fn remove_if_exists(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
    .with_context(|| format!("Failed to remove {}", path.display()))
}

/// Total size in bytes of the regular files below `path`
pub fn dir_size(path: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
