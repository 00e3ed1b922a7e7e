//! The in-memory snapshot of one filesystem node.

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::error::{Error, Result};

/// How a content stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Read-only, positioned at the start.
    #[default]
    Read,
    /// Create if missing, open read/write and truncate any previous content.
    Write,
}

/// A byte stream over a node's content.
///
/// The stream is released when dropped, so scoping it to a block is enough
/// to close it on every exit path.
pub trait Stream: io::Read + io::Write + Send {}
impl<T: io::Read + io::Write + Send> Stream for T {}

/// The capability to open a node's content.
///
/// Implementations re-resolve the node when `open` is called; holding an
/// `Opener` does not keep anything open.
pub trait Opener: fmt::Debug + Send + Sync {
    fn open(&self, mode: OpenMode) -> Result<Box<dyn Stream>>;
}

/// POSIX permission bits (owner/group/other rwx plus setuid, setgid, sticky).
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Permission(u32);

impl Permission {
    pub const MASK: u32 = 0o7777;

    pub fn from_mode(mode: u32) -> Self {
        Permission(mode & Self::MASK)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// The rwx bits only, without setuid, setgid and sticky.
    pub fn perm(&self) -> u32 {
        self.0 & 0o777
    }

    /// Render as `ls -l` does, prefixed with `type_char` (`d`, `-`, `?`...).
    pub fn render(&self, type_char: char) -> String {
        const RWX: [char; 3] = ['r', 'w', 'x'];

        let mut out = String::with_capacity(10);
        out.push(type_char);
        for shift in [6u32, 3, 0] {
            let triplet = (self.0 >> shift) & 0o7;
            for (i, flag) in RWX.iter().enumerate() {
                if triplet & (0o4 >> i) != 0 {
                    out.push(*flag);
                } else {
                    out.push('-');
                }
            }
        }
        out
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// What kind of node an [`Item`] is, along with the data only that kind has.
#[derive(Clone, Debug)]
pub enum ItemKind {
    Regular {
        opener: Arc<dyn Opener>,
    },
    Directory {
        /// Immediate children, ordered by name. `None` when the listing was
        /// not fetched (children of a listed directory).
        children: Option<Vec<Item>>,
    },
    /// Symlinks, devices, sockets and anything else that is neither listed
    /// nor opened.
    Other,
}

/// One filesystem node as it was observed.
#[derive(Clone, Debug)]
pub struct Item {
    pub name: String,
    pub permission: Permission,
    /// Name of the owning user, empty when it could not be resolved.
    pub owner: String,
    pub size: u64,
    pub kind: ItemKind,
}

impl Item {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, ItemKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, ItemKind::Regular { .. })
    }

    pub fn children(&self) -> Option<&[Item]> {
        match &self.kind {
            ItemKind::Directory {
                children: Some(children),
            } => Some(children),
            _ => None,
        }
    }

    pub fn opener(&self) -> Option<&Arc<dyn Opener>> {
        match &self.kind {
            ItemKind::Regular { opener } => Some(opener),
            _ => None,
        }
    }

    /// Open this node's content. Fails with `NotAFile` unless it is a
    /// regular file.
    pub fn open(&self, mode: OpenMode) -> Result<Box<dyn Stream>> {
        match self.opener() {
            Some(opener) => opener.open(mode),
            None => Err(Error::NotAFile {
                path: self.name.clone(),
            }),
        }
    }

    /// `ls -l` style mode string, e.g. `drwxr-xr-x`.
    pub fn mode_string(&self) -> String {
        let type_char = match self.kind {
            ItemKind::Regular { .. } => '-',
            ItemKind::Directory { .. } => 'd',
            ItemKind::Other => '?',
        };
        self.permission.render(type_char)
    }
}
