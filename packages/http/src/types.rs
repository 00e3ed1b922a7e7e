use serde::{Deserialize, Serialize};

/// The `type` of a wire item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Dir,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Dir => "dir",
        }
    }
}

/// A filesystem node as sent over the wire.
///
/// Empty and zero fields are left out so directory listings stay compact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireItem {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// `None` for nodes that are neither files nor directories.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,

    /// Permission bits, e.g. `0o644`.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub permission: u32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,

    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub size: u64,

    /// File content, present only when it was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Immediate children, present only for listed directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WireItem>>,
}

fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}

/// Body of a PUT: the new content of the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteRequest {
    #[serde(default)]
    pub data: String,
}

/// Body of a POST: what to create, and for files the initial content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateRequest {
    #[serde(default)]
    pub data: String,

    /// Kept as a string so an unknown type can be reported as such instead
    /// of as unparseable JSON.
    #[serde(rename = "type", default)]
    pub file_type: String,
}

impl CreateRequest {
    pub fn file(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            file_type: FileType::File.as_str().to_string(),
        }
    }

    pub fn dir() -> Self {
        Self {
            data: String::new(),
            file_type: FileType::Dir.as_str().to_string(),
        }
    }

    pub fn kind(&self) -> Option<FileType> {
        match self.file_type.as_str() {
            "file" => Some(FileType::File),
            "dir" => Some(FileType::Dir),
            _ => None,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub id: String,
    pub user_message: String,
    pub system_message: String,
}
