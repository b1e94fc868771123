use std::fs;

use classdex_classfile::ErrorKind;
use classdex_core::DotName;
use classdex_storage::{read_from_path, write_to_path, FormatVersion, WriteOptions};

use super::fixture::catalog;

#[test]
fn files_round_trip_without_leaving_temporaries() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("classes.cdx");
    let index = catalog();

    write_to_path(&path, &index, WriteOptions::default()).unwrap();
    let read = read_from_path(&path).unwrap();
    assert_eq!(read.len(), index.len());
    assert!(read.get(&DotName::simple("com.example.Box")).is_some());

    let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("classes.cdx")]);
}

#[test]
fn writing_replaces_an_existing_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("classes.cdx");
    fs::write(&path, b"stale").unwrap();

    write_to_path(&path, &catalog(), WriteOptions::version(FormatVersion::V1)).unwrap();
    let read = read_from_path(&path).unwrap();
    assert_eq!(read.len(), catalog().len());
}

#[test]
fn missing_files_are_reported() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = read_from_path(&dir.path().join("missing.cdx")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn garbage_files_are_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("classes.cdx");
    fs::write(&path, b"not an index at all").unwrap();

    let err = read_from_path(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptIndexStream);
}
