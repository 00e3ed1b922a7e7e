//! # treefs-store
//!
//! The capability model for serving a directory tree.
//!
//! - [`Viewer`] resolves a slash-separated path to an [`Item`].
//! - [`Editor`] extends it with file/directory creation and recursive delete.
//! - [`Opener`] is carried by regular-file items and opens their content as a
//!   [`Stream`] that is closed when dropped.
//!
//! Two backends implement the model: [`LocalStore`] over a real directory and
//! [`MemoryStore`] for tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::Read;
//! use treefs_store::{LocalStore, OpenMode, Viewer};
//!
//! let store = LocalStore::new("/srv/files")?;
//! let item = store.get("notes/todo.txt")?;
//!
//! let mut content = String::new();
//! item.open(OpenMode::Read)?.read_to_string(&mut content)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod item;
mod local;
mod memory;
mod owner;
mod path;
mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod conformance;

pub use error::{Error, Result};
pub use item::{Item, ItemKind, OpenMode, Opener, Permission, Stream};
pub use local::{LocalStore, DIR_CREATE_MODE};
pub use memory::MemoryStore;
pub use path::RelativePath;
pub use traits::{Editor, Viewer};
