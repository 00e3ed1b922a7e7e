//! In-memory backend.
//!
//! Behaves like [`LocalStore`](crate::LocalStore) without touching the disk,
//! which makes it the fixture of choice for exercising code written against
//! [`Viewer`]/[`Editor`].
//!
//! ```rust
//! use treefs_store::{MemoryStore, Viewer};
//!
//! let store = MemoryStore::new()
//!     .with_file("docs/readme.txt", "hello")
//!     .unwrap();
//!
//! let docs = store.get("docs").unwrap();
//! assert_eq!(docs.children().unwrap()[0].name, "readme.txt");
//! ```

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::item::{Item, ItemKind, OpenMode, Opener, Permission, Stream};
use crate::path::RelativePath;
use crate::traits::{Editor, Viewer};

const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

#[derive(Debug)]
enum Node {
    File {
        content: Vec<u8>,
        permission: Permission,
    },
    Dir {
        entries: BTreeMap<String, Node>,
        permission: Permission,
    },
}

impl Node {
    fn empty_dir() -> Node {
        Node::Dir {
            entries: BTreeMap::new(),
            permission: Permission::from_mode(DIR_MODE),
        }
    }

    fn empty_file() -> Node {
        Node::File {
            content: Vec::new(),
            permission: Permission::from_mode(FILE_MODE),
        }
    }

    fn lookup(&self, path: &RelativePath) -> Option<&Node> {
        let mut cursor = self;
        for component in &path.components {
            match cursor {
                Node::Dir { entries, .. } => cursor = entries.get(component)?,
                Node::File { .. } => return None,
            }
        }
        Some(cursor)
    }

    fn lookup_mut(&mut self, path: &RelativePath) -> Option<&mut Node> {
        let mut cursor = self;
        for component in &path.components {
            match cursor {
                Node::Dir { entries, .. } => cursor = entries.get_mut(component)?,
                Node::File { .. } => return None,
            }
        }
        Some(cursor)
    }

    /// The entry table of the directory that would hold `path`.
    fn parent_entries_mut(&mut self, path: &RelativePath) -> Option<&mut BTreeMap<String, Node>> {
        match self.lookup_mut(&path.parent()?)? {
            Node::Dir { entries, .. } => Some(entries),
            Node::File { .. } => None,
        }
    }
}

type SharedTree = Arc<Mutex<Node>>;

fn lock(tree: &SharedTree) -> MutexGuard<'_, Node> {
    // The tree is left consistent between statements, so a panic elsewhere
    // does not invalidate it.
    tree.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An [`Editor`] holding the whole tree in memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tree: SharedTree,
    owner: String,
    read_only: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tree: Arc::new(Mutex::new(Node::empty_dir())),
            owner: String::new(),
            read_only: false,
        }
    }

    /// Report `owner` as the owner of every item.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Refuse every mutation and every write open with `PermissionDenied`.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Seed a file, creating missing parent directories.
    pub fn with_file(self, path: &str, content: impl AsRef<[u8]>) -> Result<Self> {
        let relative = RelativePath::parse(path)?;
        let parent = relative.parent().ok_or_else(|| Error::AlreadyExists {
            path: relative.to_string(),
        })?;
        self.make_dirs(&parent)?;

        let mut tree = lock(&self.tree);
        let entries = tree
            .parent_entries_mut(&relative)
            .ok_or_else(|| Error::NotFound {
                path: relative.to_string(),
            })?;
        let name = relative.name().unwrap_or_default().to_string();
        entries.insert(
            name,
            Node::File {
                content: content.as_ref().to_vec(),
                permission: Permission::from_mode(FILE_MODE),
            },
        );
        drop(tree);
        Ok(self)
    }

    /// Seed a directory chain.
    pub fn with_dir(self, path: &str) -> Result<Self> {
        let relative = RelativePath::parse(path)?;
        self.make_dirs(&relative)?;
        Ok(self)
    }

    fn check_writable(&self, relative: &RelativePath) -> Result<()> {
        if self.read_only {
            Err(Error::PermissionDenied {
                path: relative.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn make_dirs(&self, relative: &RelativePath) -> Result<()> {
        let mut tree = lock(&self.tree);
        let mut cursor: &mut Node = &mut *tree;
        let last = relative.components.len();
        for (i, component) in relative.components.iter().enumerate() {
            let entries = match cursor {
                Node::Dir { entries, .. } => entries,
                // Same outcome as asking the OS to mkdir through a file.
                Node::File { .. } => {
                    return Err(Error::NotFound {
                        path: relative.to_string(),
                    })
                }
            };
            let next = entries
                .entry(component.clone())
                .or_insert_with(Node::empty_dir);
            if i + 1 == last && matches!(next, Node::File { .. }) {
                return Err(Error::AlreadyExists {
                    path: relative.to_string(),
                });
            }
            cursor = next;
        }
        Ok(())
    }

    fn describe(&self, name: String, relative: &RelativePath, node: &Node) -> Item {
        match node {
            Node::File {
                content,
                permission,
            } => Item {
                name,
                permission: *permission,
                owner: self.owner.clone(),
                size: content.len() as u64,
                kind: ItemKind::Regular {
                    opener: Arc::new(MemoryOpener {
                        tree: Arc::clone(&self.tree),
                        path: relative.clone(),
                        read_only: self.read_only,
                    }),
                },
            },
            Node::Dir { permission, .. } => Item {
                name,
                permission: *permission,
                owner: self.owner.clone(),
                size: 0,
                kind: ItemKind::Directory { children: None },
            },
        }
    }

    fn get_resolved(&self, relative: &RelativePath) -> Result<Item> {
        let tree = lock(&self.tree);
        let node = tree.lookup(relative).ok_or_else(|| Error::NotFound {
            path: relative.to_string(),
        })?;

        let name = relative.name().unwrap_or("/").to_string();
        let mut item = self.describe(name, relative, node);
        if let (Node::Dir { entries, .. }, ItemKind::Directory { children }) =
            (node, &mut item.kind)
        {
            *children = Some(
                entries
                    .iter()
                    .map(|(name, child)| self.describe(name.clone(), &relative.join(name), child))
                    .collect(),
            );
        }
        Ok(item)
    }
}

impl Viewer for MemoryStore {
    fn get(&self, path: &str) -> Result<Item> {
        let relative = RelativePath::parse(path)?;
        self.get_resolved(&relative)
    }
}

impl Editor for MemoryStore {
    fn create_file(&self, path: &str) -> Result<Item> {
        let relative = RelativePath::parse(path)?;
        {
            let mut tree = lock(&self.tree);
            if tree.lookup(&relative).is_some() {
                return Err(Error::AlreadyExists {
                    path: relative.to_string(),
                });
            }
            self.check_writable(&relative)?;

            let entries = tree
                .parent_entries_mut(&relative)
                .ok_or_else(|| Error::NotFound {
                    path: relative.to_string(),
                })?;
            let name = relative.name().unwrap_or_default().to_string();
            entries.insert(name, Node::empty_file());
        }
        self.get_resolved(&relative)
    }

    fn create_dir(&self, path: &str) -> Result<Item> {
        let relative = RelativePath::parse(path)?;
        let exists = matches!(
            lock(&self.tree).lookup(&relative),
            Some(Node::Dir { .. })
        );
        if !exists {
            self.check_writable(&relative)?;
            self.make_dirs(&relative)?;
        }
        self.get_resolved(&relative)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let relative = RelativePath::parse(path)?;
        if relative.is_root() {
            return Err(Error::PermissionDenied {
                path: relative.to_string(),
            });
        }

        let mut tree = lock(&self.tree);
        if tree.lookup(&relative).is_none() {
            return Err(Error::NotFound {
                path: relative.to_string(),
            });
        }
        self.check_writable(&relative)?;

        let name = relative.name().unwrap_or_default();
        tree.parent_entries_mut(&relative)
            .and_then(|entries| entries.remove(name))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound {
                path: relative.to_string(),
            })
    }
}

#[derive(Debug)]
struct MemoryOpener {
    tree: SharedTree,
    path: RelativePath,
    read_only: bool,
}

impl Opener for MemoryOpener {
    fn open(&self, mode: OpenMode) -> Result<Box<dyn Stream>> {
        let mut tree = lock(&self.tree);
        match mode {
            OpenMode::Read => match tree.lookup(&self.path) {
                Some(Node::File { content, .. }) => Ok(Box::new(MemoryStream {
                    cursor: Cursor::new(content.clone()),
                    commit_to: None,
                })),
                Some(Node::Dir { .. }) => Err(Error::NotAFile {
                    path: self.path.to_string(),
                }),
                None => Err(Error::NotFound {
                    path: self.path.to_string(),
                }),
            },
            OpenMode::Write => {
                if self.read_only {
                    return Err(Error::PermissionDenied {
                        path: self.path.to_string(),
                    });
                }
                let entries =
                    tree.parent_entries_mut(&self.path)
                        .ok_or_else(|| Error::NotFound {
                            path: self.path.to_string(),
                        })?;
                let name = self.path.name().unwrap_or_default().to_string();
                match entries.entry(name).or_insert_with(Node::empty_file) {
                    Node::File { content, .. } => content.clear(),
                    Node::Dir { .. } => {
                        return Err(Error::NotAFile {
                            path: self.path.to_string(),
                        })
                    }
                }
                Ok(Box::new(MemoryStream {
                    cursor: Cursor::new(Vec::new()),
                    commit_to: Some((Arc::clone(&self.tree), self.path.clone())),
                }))
            }
        }
    }
}

/// Reads from a snapshot; in write mode the buffer is stored back into the
/// tree on flush and on drop.
struct MemoryStream {
    cursor: Cursor<Vec<u8>>,
    commit_to: Option<(SharedTree, RelativePath)>,
}

impl MemoryStream {
    fn commit(&self) -> io::Result<()> {
        let Some((tree, path)) = &self.commit_to else {
            return Ok(());
        };
        let mut tree = lock(tree);
        match tree.lookup_mut(path) {
            Some(Node::File { content, .. }) => {
                content.clone_from(self.cursor.get_ref());
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is no longer a file", path),
            )),
        }
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.commit_to.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "stream was opened read-only",
            ));
        }
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
    }
}

impl Drop for MemoryStream {
    fn drop(&mut self) {
        if let Err(err) = self.commit() {
            log::debug!("Dropping unsaved memory stream: {}", err);
        }
    }
}
