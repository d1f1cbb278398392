//! Import resolution.
//!
//! The parser asks an [`ImportResolver`] for the text of every `@import`
//! that names a LESS file. [`FileResolver`] reads from the filesystem;
//! tests and embedders can supply their own.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// The loaded text of an import and where it was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedImport {
    /// Canonical location, used for once-only import tracking and as the
    /// base directory of nested imports.
    pub location: PathBuf,
    pub text: String,
}

/// Loads imported stylesheets.
pub trait ImportResolver {
    /// Loads `name` as written in the import statement, relative to
    /// `context_dir`, the directory of the importing file.
    fn load(&self, context_dir: &Path, name: &str) -> io::Result<ResolvedImport>;
}

/// Resolves imports against the filesystem, appending `.less` to names
/// without an extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileResolver;

impl ImportResolver for FileResolver {
    fn load(&self, context_dir: &Path, name: &str) -> io::Result<ResolvedImport> {
        let mut path = context_dir.join(name);
        if path.extension().is_none() {
            path.set_extension("less");
        }
        log::debug!("loading import {}", path.display());
        let text = std::fs::read_to_string(&path)?;
        Ok(ResolvedImport {
            location: normalize(&path),
            text,
        })
    }
}

/// Resolves imports from an in-memory table of file names, as used by
/// tests and by embedders that bundle their stylesheets.
#[derive(Clone, Debug, Default)]
pub struct MemoryResolver {
    files: HashMap<PathBuf, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file; `path` is relative to the root stylesheet's directory.
    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.files.insert(normalize(path.as_ref()), text.into());
        self
    }
}

impl ImportResolver for MemoryResolver {
    fn load(&self, context_dir: &Path, name: &str) -> io::Result<ResolvedImport> {
        let mut path = context_dir.join(name);
        if path.extension().is_none() {
            path.set_extension("less");
        }
        let location = normalize(&path);
        self.files
            .get(&location)
            .map(|text| ResolvedImport {
                location: location.clone(),
                text: text.clone(),
            })
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not found", location.display()),
                )
            })
    }
}

/// Removes `.` components and folds `..` into the preceding component.
pub fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Directory part of an import name, with forward slashes and a trailing
/// slash, or an empty string for names without one.
pub fn directory_of(name: &str) -> String {
    match name.rfind('/') {
        Some(index) => name[..=index].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c.less")), PathBuf::from("a/c.less"));
        assert_eq!(normalize(Path::new("./x.less")), PathBuf::from("x.less"));
    }

    #[test]
    fn test_memory_resolver_adds_extension() {
        let resolver = MemoryResolver::new().with_file("lib/mixins.less", ".m { a: b; }");
        let resolved = resolver.load(Path::new("lib"), "mixins").unwrap();
        assert_eq!(resolved.location, PathBuf::from("lib/mixins.less"));
        assert!(resolver.load(Path::new(""), "missing.less").is_err());
    }

    #[test]
    fn test_directory_of() {
        assert_eq!(directory_of("sub/dir/file.less"), "sub/dir/");
        assert_eq!(directory_of("file.less"), "");
    }
}
