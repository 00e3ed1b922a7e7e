use std::fmt;

use crate::error::{Error, Result};

/// A slash-separated path relative to a store root.
///
/// Parsing normalizes the path lexically: empty and `.` components are dropped
/// and `..` removes the preceding component. A `..` with nothing left to remove
/// would climb above the root, which is rejected.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RelativePath {
    pub components: Vec<String>,
}

impl RelativePath {
    pub fn parse(path: &str) -> Result<Self> {
        let mut components: Vec<String> = Vec::new();
        for component in path.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    if components.pop().is_none() {
                        return Err(Error::PathEscapesRoot {
                            path: path.to_string(),
                        });
                    }
                }
                other => components.push(other.to_string()),
            }
        }
        Ok(RelativePath { components })
    }

    pub fn root() -> Self {
        RelativePath::default()
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// The last component, if this is not the root.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<RelativePath> {
        if self.is_root() {
            return None;
        }
        Some(RelativePath {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    pub fn join(&self, name: &str) -> RelativePath {
        let mut components = self.components.clone();
        components.push(name.to_string());
        RelativePath { components }
    }

    /// Append the components to `base`, producing a path that stays under it.
    pub fn to_path_buf(&self, base: &std::path::Path) -> std::path::PathBuf {
        let mut buf = base.to_path_buf();
        buf.extend(&self.components);
        buf
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}
