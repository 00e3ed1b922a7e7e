//! Backend over a real directory tree.

use std::fs::{self, Metadata, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::item::{Item, ItemKind, OpenMode, Opener, Permission, Stream};
use crate::owner::owner_name;
use crate::path::RelativePath;
use crate::traits::{Editor, Viewer};

/// Mode used for every directory created through [`Editor::create_dir`].
pub const DIR_CREATE_MODE: u32 = 0o755;

/// An [`Editor`] over the directory tree under `root`.
///
/// Every request path is normalized before it touches the disk, so nothing
/// outside `root` can be reached through `..`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<LocalStore> {
        let root = root.into();
        let attr = fs::metadata(&root).map_err(|error| Error::RootPathInvalid {
            path: root.clone(),
            error,
        })?;

        if !attr.is_dir() {
            return Err(Error::RootPathInvalid {
                path: root,
                error: io::Error::other("Root path must be a directory."),
            });
        }

        match root.canonicalize() {
            Ok(root) => Ok(LocalStore { root }),
            Err(error) => Err(Error::RootPathInvalid { path: root, error }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<(RelativePath, PathBuf)> {
        let relative = RelativePath::parse(path)?;
        self.check_ancestors(&relative)?;
        let absolute = relative.to_path_buf(&self.root);
        Ok((relative, absolute))
    }

    /// Every existing ancestor of `relative` must be a real directory.
    ///
    /// The OS follows symlinks in intermediate components, so a link inside
    /// the root would otherwise lead outside of it. A symlinked or
    /// non-directory ancestor makes the target `NotFound`. The walk stops at
    /// the first missing ancestor since nothing below it exists yet.
    fn check_ancestors(&self, relative: &RelativePath) -> Result<()> {
        let ancestors = relative.components.len().saturating_sub(1);
        let mut current = self.root.clone();
        for component in &relative.components[..ancestors] {
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(metadata) if metadata.file_type().is_dir() => {}
                Ok(_) => {
                    log::debug!(
                        "Refusing {}: {} is not a directory",
                        relative,
                        current.display()
                    );
                    return Err(Error::NotFound {
                        path: relative.to_string(),
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(err) => return Err(Error::from_io(relative.to_string(), err)),
            }
        }
        Ok(())
    }

    fn root_name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string())
    }

    /// Build an item from lstat metadata. Directories come back unlisted.
    fn describe(name: String, absolute: &Path, metadata: &Metadata) -> Item {
        let file_type = metadata.file_type();
        let kind = if file_type.is_dir() {
            ItemKind::Directory { children: None }
        } else if file_type.is_file() {
            ItemKind::Regular {
                opener: Arc::new(LocalOpener {
                    path: absolute.to_path_buf(),
                }),
            }
        } else {
            ItemKind::Other
        };

        Item {
            name,
            permission: permission_of(metadata),
            owner: owner_name(metadata),
            size: metadata.len(),
            kind,
        }
    }

    fn list(&self, relative: &RelativePath, absolute: &Path) -> Result<Vec<Item>> {
        let entries =
            fs::read_dir(absolute).map_err(|err| Error::from_io(relative.to_string(), err))?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| Error::from_io(relative.to_string(), err))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // DirEntry::metadata does not follow symlinks.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    log::debug!("{} vanished while listing", entry.path().display());
                    continue;
                }
                Err(err) => return Err(Error::from_io(relative.join(&name).to_string(), err)),
            };
            children.push(Self::describe(name, &entry.path(), &metadata));
        }

        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn lstat(relative: &RelativePath, absolute: &Path) -> Result<Metadata> {
        fs::symlink_metadata(absolute).map_err(|err| Error::from_io(relative.to_string(), err))
    }

    fn get_resolved(&self, relative: &RelativePath, absolute: &Path) -> Result<Item> {
        let metadata = Self::lstat(relative, absolute)?;
        let name = relative
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| self.root_name());

        let mut item = Self::describe(name, absolute, &metadata);
        if let ItemKind::Directory { children } = &mut item.kind {
            *children = Some(self.list(relative, absolute)?);
        }
        Ok(item)
    }
}

impl Viewer for LocalStore {
    fn get(&self, path: &str) -> Result<Item> {
        let (relative, absolute) = self.resolve(path)?;
        self.get_resolved(&relative, &absolute)
    }
}

impl Editor for LocalStore {
    fn create_file(&self, path: &str) -> Result<Item> {
        let (relative, absolute) = self.resolve(path)?;

        // The window between this check and the create is an accepted race;
        // create_new still refuses to clobber anything that shows up in it.
        match fs::symlink_metadata(&absolute) {
            Ok(_) => {
                return Err(Error::AlreadyExists {
                    path: relative.to_string(),
                })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(Error::from_io(relative.to_string(), err)),
        }

        log::debug!("Creating file {}...", absolute.display());
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&absolute)
            .map_err(|err| Error::from_io(relative.to_string(), err))?;

        self.get_resolved(&relative, &absolute)
    }

    fn create_dir(&self, path: &str) -> Result<Item> {
        let (relative, absolute) = self.resolve(path)?;

        log::debug!("Creating directory {}...", absolute.display());
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_CREATE_MODE);
        }
        builder
            .create(&absolute)
            .map_err(|err| Error::from_io(relative.to_string(), err))?;

        self.get_resolved(&relative, &absolute)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let (relative, absolute) = self.resolve(path)?;
        if relative.is_root() {
            return Err(Error::PermissionDenied {
                path: relative.to_string(),
            });
        }

        let metadata = Self::lstat(&relative, &absolute)?;
        log::debug!("Deleting {}...", absolute.display());
        let removed = if metadata.file_type().is_dir() {
            fs::remove_dir_all(&absolute)
        } else {
            fs::remove_file(&absolute)
        };
        removed.map_err(|err| Error::from_io(relative.to_string(), err))
    }
}

/// Opens the file at an absolute path each time it is asked to.
#[derive(Debug)]
struct LocalOpener {
    path: PathBuf,
}

impl Opener for LocalOpener {
    fn open(&self, mode: OpenMode) -> Result<Box<dyn Stream>> {
        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.read(true).write(true).create(true).truncate(true),
        };

        let file = options
            .open(&self.path)
            .map_err(|err| Error::from_io(self.path.display().to_string(), err))?;
        Ok(Box::new(file))
    }
}

#[cfg(unix)]
fn permission_of(metadata: &Metadata) -> Permission {
    use std::os::unix::fs::PermissionsExt;
    Permission::from_mode(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn permission_of(metadata: &Metadata) -> Permission {
    if metadata.permissions().readonly() {
        Permission::from_mode(0o444)
    } else {
        Permission::from_mode(0o666)
    }
}
