//! # Path Guard
//!
//! Decides whether a path requested by the agent stays inside the confinement root.
//!
//! Containment is a string-prefix relation between the canonical root and the
//! lexically normalized target, with the separator included in the prefix so
//! `/a/bc` is never mistaken for a child of `/a/b`. Symlinks inside the root are
//! not followed unless hardening is enabled.

use std::io;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};
use thiserror::Error;

/// The confinement root could not be established.
#[derive(Debug, Error)]
pub enum RootError {
    #[error("cannot resolve confinement root {path:?}: {source}")]
    Unresolvable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("confinement root {0:?} is not a directory")]
    NotADirectory(PathBuf),
}

/// A requested path resolved outside the root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{requested}\" resolves to {resolved:?}, outside the permitted working directory")]
pub struct PathRejected {
    pub requested: String,
    pub resolved: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
    root_str: String,
    prefix: String,
    harden_symlinks: bool,
}

impl PathGuard {
    /// Canonicalizes `root` once. The root must exist and be a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, RootError> {
        let requested = root.as_ref();
        let root = std::fs::canonicalize(requested).map_err(|source| RootError::Unresolvable {
            path: requested.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(RootError::NotADirectory(root));
        }

        let root_str = root.to_string_lossy().into_owned();
        let prefix = if root_str.ends_with(MAIN_SEPARATOR) {
            root_str.clone()
        } else {
            format!("{}{}", root_str, MAIN_SEPARATOR)
        };

        Ok(Self {
            root,
            root_str,
            prefix,
            harden_symlinks: false,
        })
    }

    /// Also resolve symlinks in the existing part of the target before checking.
    pub fn with_symlink_hardening(mut self, enabled: bool) -> Self {
        self.harden_symlinks = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `relative` against the root, admitting it only if it stays inside.
    ///
    /// `""` and `"."` resolve to the root itself. An absolute `relative` replaces
    /// the root entirely (and is therefore rejected unless it points inside).
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, PathRejected> {
        let target = normalize(&self.root.join(relative));
        self.admit(relative, target.clone())?;

        if self.harden_symlinks {
            let real = canonicalize_existing(&target).unwrap_or_else(|e| {
                tracing::debug!("Falling back to lexical path for {:?}: {}", target, e);
                target.clone()
            });
            self.admit(relative, real)?;
        }

        Ok(target)
    }

    fn admit(&self, requested: &str, resolved: PathBuf) -> Result<(), PathRejected> {
        let resolved_str = resolved.to_string_lossy();
        if resolved_str == self.root_str || resolved_str.starts_with(&self.prefix) {
            Ok(())
        } else {
            Err(PathRejected {
                requested: requested.to_string(),
                resolved,
            })
        }
    }
}

/// Resolves `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the filesystem root stays at the root.
                normalized.pop();
            }
            Component::Normal(name) => normalized.push(name),
        }
    }
    normalized
}

/// Canonicalizes the deepest existing ancestor and re-appends the rest.
fn canonicalize_existing(path: &Path) -> io::Result<PathBuf> {
    let mut current = path.to_path_buf();
    let mut missing = Vec::new();

    loop {
        if current.exists() {
            let mut resolved = current.canonicalize()?;
            for part in missing.iter().rev() {
                resolved.push(part);
            }
            return Ok(resolved);
        }

        match (current.file_name(), current.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name.to_owned());
                current = parent.to_path_buf();
            }
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no existing ancestor for {:?}", path),
                ));
            }
        }
    }
}
