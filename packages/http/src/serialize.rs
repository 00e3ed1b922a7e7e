//! Conversion of store items into their wire form.

use std::io::Read;

use treefs_store::{Error as StoreError, Item, ItemKind, OpenMode};

use crate::types::{FileType, WireItem};

impl WireItem {
    /// Convert `item` and, for a listed directory, its children.
    ///
    /// With `populate_data` the content of every regular file in the result
    /// is read and attached as `data`. Content that is not valid UTF-8 is
    /// converted lossily. The first failure aborts the whole conversion.
    pub fn from_item(item: &Item, populate_data: bool) -> Result<WireItem, StoreError> {
        let mut wire = WireItem {
            name: item.name.clone(),
            file_type: None,
            permission: item.permission.perm(),
            owner: item.owner.clone(),
            size: item.size,
            data: None,
            children: None,
        };

        match &item.kind {
            ItemKind::Regular { .. } => {
                wire.file_type = Some(FileType::File);
                if populate_data {
                    wire.data = Some(read_content(item)?);
                }
            }
            ItemKind::Directory { children } => {
                wire.file_type = Some(FileType::Dir);
                if let Some(children) = children {
                    wire.children = Some(
                        children
                            .iter()
                            .map(|child| WireItem::from_item(child, populate_data))
                            .collect::<Result<_, _>>()?,
                    );
                }
            }
            ItemKind::Other => {}
        }

        Ok(wire)
    }
}

fn read_content(item: &Item) -> Result<String, StoreError> {
    let mut content = Vec::new();
    let mut stream = item.open(OpenMode::Read)?;
    stream
        .read_to_end(&mut content)
        .map_err(|e| StoreError::from_io(item.name.clone(), e))?;
    Ok(String::from_utf8_lossy(&content).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use treefs_store::{MemoryStore, Viewer};

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_owner("alice")
            .with_file("a.txt", "hi")
            .unwrap()
            .with_file("sub/c.txt", "deep")
            .unwrap()
            .with_dir("empty")
            .unwrap()
    }

    #[test]
    fn file_carries_metadata() {
        let wire = WireItem::from_item(&store().get("a.txt").unwrap(), false).unwrap();
        assert_eq!(wire.name, "a.txt");
        assert_eq!(wire.file_type, Some(FileType::File));
        assert_eq!(wire.owner, "alice");
        assert_eq!(wire.size, 2);
        assert!(wire.permission > 0);
        assert_eq!(wire.data, None);
        assert_eq!(wire.children, None);
    }

    #[test]
    fn populated_file_carries_content() {
        let wire = WireItem::from_item(&store().get("a.txt").unwrap(), true).unwrap();
        assert_eq!(wire.data.as_deref(), Some("hi"));
    }

    #[test]
    fn directory_lists_one_level() {
        let wire = WireItem::from_item(&store().get("").unwrap(), false).unwrap();
        assert_eq!(wire.file_type, Some(FileType::Dir));

        let children = wire.children.unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "empty", "sub"]);

        // Grandchildren are not listed and no content was requested.
        for child in &children {
            assert_eq!(child.children, None);
            assert_eq!(child.data, None);
        }
    }

    #[test]
    fn populated_directory_reads_file_children() {
        let wire = WireItem::from_item(&store().get("").unwrap(), true).unwrap();
        let children = wire.children.unwrap();
        assert_eq!(children[0].data.as_deref(), Some("hi"));
        assert_eq!(children[1].data, None);
        assert_eq!(children[2].data, None);
    }

    #[test]
    fn special_permission_bits_are_not_sent() {
        let item = Item {
            name: "tmp".to_string(),
            permission: treefs_store::Permission::from_mode(0o1777),
            owner: String::new(),
            size: 0,
            kind: ItemKind::Directory { children: None },
        };
        let wire = WireItem::from_item(&item, false).unwrap();
        assert_eq!(wire.permission, 0o777);
        assert_eq!(wire.children, None);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let store = MemoryStore::new()
            .with_file("bin", [0x66u8, 0xff, 0x6f])
            .unwrap();
        let wire = WireItem::from_item(&store.get("bin").unwrap(), true).unwrap();
        assert_eq!(wire.data.as_deref(), Some("f\u{fffd}o"));
    }
}
