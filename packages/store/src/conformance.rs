//! Behaviour every [`Editor`] is expected to share.
//!
//! Each check starts from an empty store and panics on the first deviation,
//! so backends can run the whole suite from their own tests.

use std::io::{Read, Write};

use crate::error::Error;
use crate::item::{Item, OpenMode};
use crate::traits::Editor;

/// Replace the content of the file at `path` with `data`.
pub fn write_content(editor: &dyn Editor, path: &str, data: &str) {
    let item = editor.get(path).unwrap();
    let mut stream = item.open(OpenMode::Write).unwrap();
    stream.write_all(data.as_bytes()).unwrap();
    stream.flush().unwrap();
}

pub fn read_content(item: &Item) -> String {
    let mut stream = item.open(OpenMode::Read).unwrap();
    let mut content = String::new();
    stream.read_to_string(&mut content).unwrap();
    content
}

fn child_names(item: &Item) -> Vec<String> {
    item.children()
        .unwrap()
        .iter()
        .map(|c| c.name.clone())
        .collect()
}

pub fn root_resolves_for_empty_and_slash(editor: &dyn Editor) {
    for path in ["", "/", "//"] {
        let root = editor.get(path).unwrap();
        assert!(root.is_dir(), "root via {:?} is not a directory", path);
        assert!(root.children().unwrap().is_empty());
    }
}

pub fn missing_paths_are_not_found(editor: &dyn Editor) {
    editor.create_dir("present").unwrap();
    for path in ["missing", "missing/deeper", "present/missing", "a.txt"] {
        assert!(
            matches!(editor.get(path), Err(Error::NotFound { .. })),
            "expected NotFound for {}",
            path
        );
    }
}

pub fn listing_matches_immediate_entries(editor: &dyn Editor) {
    editor.create_dir("sub/deeper").unwrap();
    editor.create_file("b.txt").unwrap();
    editor.create_file("a.txt").unwrap();
    editor.create_file("sub/c.txt").unwrap();

    let root = editor.get("").unwrap();
    assert_eq!(child_names(&root), vec!["a.txt", "b.txt", "sub"]);
    for child in root.children().unwrap() {
        assert_eq!(child.is_dir(), child.name == "sub");
        assert_eq!(child.is_file(), child.name != "sub");
    }

    let sub = editor.get("sub").unwrap();
    assert_eq!(child_names(&sub), vec!["c.txt", "deeper"]);
}

pub fn create_file_twice_conflicts(editor: &dyn Editor) {
    let item = editor.create_file("once.txt").unwrap();
    assert!(item.is_file());
    assert_eq!(item.name, "once.txt");
    assert_eq!(item.size, 0);

    assert!(matches!(
        editor.create_file("once.txt"),
        Err(Error::AlreadyExists { .. })
    ));

    editor.create_dir("dir").unwrap();
    assert!(matches!(
        editor.create_file("dir"),
        Err(Error::AlreadyExists { .. })
    ));
}

pub fn create_dir_makes_chain(editor: &dyn Editor) {
    let item = editor.create_dir("a/b/c").unwrap();
    assert!(item.is_dir());
    assert_eq!(item.name, "c");

    for path in ["a", "a/b", "a/b/c"] {
        assert!(editor.get(path).unwrap().is_dir(), "{} is not a dir", path);
    }

    // Idempotent.
    assert!(editor.create_dir("a/b").unwrap().is_dir());
    assert_eq!(child_names(&editor.get("a/b").unwrap()), vec!["c"]);
}

pub fn write_replaces_content(editor: &dyn Editor) {
    editor.create_file("greeting.txt").unwrap();

    write_content(editor, "greeting.txt", "hello");
    assert_eq!(read_content(&editor.get("greeting.txt").unwrap()), "hello");

    write_content(editor, "greeting.txt", "goodbye");
    let item = editor.get("greeting.txt").unwrap();
    assert_eq!(read_content(&item), "goodbye");
    assert_eq!(item.size, "goodbye".len() as u64);

    write_content(editor, "greeting.txt", "hi");
    assert_eq!(read_content(&editor.get("greeting.txt").unwrap()), "hi");
}

pub fn delete_removes_subtree(editor: &dyn Editor) {
    editor.create_dir("doomed/inner").unwrap();
    editor.create_file("doomed/one.txt").unwrap();
    editor.create_file("doomed/inner/two.txt").unwrap();
    editor.create_file("kept.txt").unwrap();

    editor.delete("doomed").unwrap();

    for path in [
        "doomed",
        "doomed/one.txt",
        "doomed/inner",
        "doomed/inner/two.txt",
    ] {
        assert!(
            matches!(editor.get(path), Err(Error::NotFound { .. })),
            "{} survived delete",
            path
        );
    }
    assert_eq!(child_names(&editor.get("").unwrap()), vec!["kept.txt"]);

    editor.delete("kept.txt").unwrap();
    assert!(editor.get("").unwrap().children().unwrap().is_empty());
}

pub fn delete_missing_is_not_found(editor: &dyn Editor) {
    assert!(matches!(
        editor.delete("ghost"),
        Err(Error::NotFound { .. })
    ));
}
