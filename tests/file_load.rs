use std::fs;

use markpress::{Error, FileLoadError, MarkupDocument, Workspace, WorkspaceConfig};
use markpress::theme::MemoryThemeStore;

#[test]
fn txt_file_is_rejected_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "# Hi").unwrap();

    let mut doc = MarkupDocument::with_text("original");
    let err = doc.load_file(&path).unwrap_err();
    assert_eq!(err, FileLoadError::UnsupportedType { name: "notes.txt".into() });
    assert_eq!(doc.source_text(), "original");
}

#[test]
fn md_file_sets_source_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.md");
    fs::write(&path, "# Hi").unwrap();

    let mut doc = MarkupDocument::new();
    doc.load_file(&path).unwrap();
    assert_eq!(doc.source_text(), "# Hi");
}

#[test]
fn unreadable_file_reports_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.md");

    let mut doc = MarkupDocument::with_text("original");
    match doc.load_file(&path) {
        Err(FileLoadError::Read { name, .. }) => assert_eq!(name, "missing.md"),
        other => panic!("expected read error, got {:?}", other),
    }
    assert_eq!(doc.source_text(), "original");
}

#[test]
fn workspace_surfaces_specific_reason() {
    let dir = tempfile::tempdir().unwrap();
    let txt = dir.path().join("notes.txt");
    fs::write(&txt, "# Hi").unwrap();

    let mut ws = Workspace::new(WorkspaceConfig::default(), Box::new(MemoryThemeStore::new()), None);
    let err = ws.load_file(&txt).unwrap_err();
    assert!(matches!(err, Error::FileLoad(FileLoadError::UnsupportedType { .. })));
    assert_eq!(err.user_message(), "Please select a valid Markdown file (.md).");

    let err = ws.load_file(&dir.path().join("gone.md")).unwrap_err();
    assert!(err.user_message().contains("gone.md"));
    assert_eq!(ws.document().source_text(), "# Hola, Markdown!");
}

#[test]
fn uppercase_extension_and_invalid_utf8_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("README.MD");
    fs::write(&path, b"ok \xFF end").unwrap();

    let mut doc = MarkupDocument::new();
    doc.load_file(&path).unwrap();
    assert_eq!(doc.source_text(), "ok \u{FFFD} end");
}
