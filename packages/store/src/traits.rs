//! Capability traits: Viewer and Editor.

use std::sync::Arc;

use crate::error::Result;
use crate::item::Item;

/// Resolve paths to items.
///
/// Paths are slash-separated and relative to the store root; `""` and `"/"`
/// both name the root.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn Viewer>`.
pub trait Viewer: Send + Sync {
    /// Get the item at `path`.
    ///
    /// Directories come back with their immediate children listed; regular
    /// files come back with an opener.
    ///
    /// # Returns
    ///
    /// * `Ok(item)` - The node at the path.
    /// * `Err(Error::NotFound)` - Nothing exists at the path.
    /// * `Err(_)` - Any other failure.
    fn get(&self, path: &str) -> Result<Item>;
}

/// Viewer that can also change the tree.
pub trait Editor: Viewer {
    /// Create an empty regular file and return it.
    ///
    /// Fails with `AlreadyExists` if anything is already at `path`.
    fn create_file(&self, path: &str) -> Result<Item>;

    /// Create a directory and any missing parents, like `mkdir -p`.
    ///
    /// Succeeds if the directory already exists.
    fn create_dir(&self, path: &str) -> Result<Item>;

    /// Remove the file or the directory and everything under it.
    fn delete(&self, path: &str) -> Result<()>;
}

// Blanket implementations for references and smart pointers

impl<T: Viewer + ?Sized> Viewer for &T {
    fn get(&self, path: &str) -> Result<Item> {
        (**self).get(path)
    }
}

impl<T: Editor + ?Sized> Editor for &T {
    fn create_file(&self, path: &str) -> Result<Item> {
        (**self).create_file(path)
    }

    fn create_dir(&self, path: &str) -> Result<Item> {
        (**self).create_dir(path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        (**self).delete(path)
    }
}

impl<T: Viewer + ?Sized> Viewer for Box<T> {
    fn get(&self, path: &str) -> Result<Item> {
        self.as_ref().get(path)
    }
}

impl<T: Editor + ?Sized> Editor for Box<T> {
    fn create_file(&self, path: &str) -> Result<Item> {
        self.as_ref().create_file(path)
    }

    fn create_dir(&self, path: &str) -> Result<Item> {
        self.as_ref().create_dir(path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.as_ref().delete(path)
    }
}

impl<T: Viewer + ?Sized> Viewer for Arc<T> {
    fn get(&self, path: &str) -> Result<Item> {
        self.as_ref().get(path)
    }
}

impl<T: Editor + ?Sized> Editor for Arc<T> {
    fn create_file(&self, path: &str) -> Result<Item> {
        self.as_ref().create_file(path)
    }

    fn create_dir(&self, path: &str) -> Result<Item> {
        self.as_ref().create_dir(path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.as_ref().delete(path)
    }
}
