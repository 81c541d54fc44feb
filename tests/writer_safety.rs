//! Backup rotation and change verification on real files

use regenerate::writer::{write_with_backup, WriteError, WriterOptions};
use regenerate::{NoScripts, RegenerateError, RegenerateOptions, Regenerator, BUILT_IN_SHAPES};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn backups_of(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with('~'))
        .collect();
    names.sort();
    names
}

#[test]
fn test_exactly_one_backup_generation_is_kept() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("page.html");
    let options = WriterOptions::default();

    for generation in 1..=4 {
        write_with_backup(&target, &format!("generation {generation}\n"), false, &options)
            .unwrap();
    }

    assert_eq!(backups_of(dir.path()), vec!["page.html~".to_string()]);
    assert_eq!(
        fs::read_to_string(dir.path().join("page.html~")).unwrap(),
        "generation 3\n"
    );
    assert_eq!(fs::read_to_string(&target).unwrap(), "generation 4\n");
}

#[test]
fn test_custom_suffixes() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("page.html");
    let options = WriterOptions {
        backup_suffix: ".bak".into(),
        new_suffix: ".rejected".into(),
        context_bytes: 4,
    };
    write_with_backup(&target, "one\n", false, &options).unwrap();
    write_with_backup(&target, "one\n", true, &options).unwrap();
    assert!(dir.path().join("page.html.bak").exists());

    let err = write_with_backup(&target, "two\n", true, &options).unwrap_err();
    match err {
        WriteError::ChangeDetected {
            offset,
            expected,
            actual,
            new_path,
            ..
        } => {
            assert_eq!(offset, 0);
            assert_eq!(expected, "one\n");
            assert_eq!(actual, "two\n");
            assert_eq!(new_path, dir.path().join("page.html.rejected"));
        }
        other => panic!("expected a detected change, got {other:?}"),
    }
}

#[test]
fn test_verified_regeneration_detects_manual_edits() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src/index.html");
    let output = dir.path().join("out/index.html");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, "<h1>\n<!-- [title -->\nHello\n<!-- title] -->\n</h1>\n").unwrap();

    let mut regenerator =
        Regenerator::new(&BUILT_IN_SHAPES, NoScripts, RegenerateOptions::default());

    // First run creates the output tree; there is nothing to verify against yet.
    let first = regenerator.regenerate_to_output(&source, &output, true).unwrap();
    assert!(!first.verified);
    let generated = fs::read_to_string(&output).unwrap();

    // Second run reproduces the same bytes.
    let second = regenerator.regenerate_to_output(&source, &output, true).unwrap();
    assert!(second.verified);
    assert!(!dir.path().join("out/index.html.new").exists());

    // Someone edits the generated file; the third run must notice and roll back.
    let edited = generated.replace("Hello", "Hullo");
    fs::write(&output, &edited).unwrap();
    let err = regenerator
        .regenerate_to_output(&source, &output, true)
        .unwrap_err();

    assert!(err.is_change_detected());
    match &err {
        RegenerateError::Write(WriteError::ChangeDetected { offset, .. }) => {
            assert_eq!(*offset, generated.find("Hello").unwrap() + 1);
        }
        other => panic!("expected a detected change, got {other:?}"),
    }
    assert_eq!(fs::read_to_string(&output).unwrap(), edited);
    assert_eq!(
        fs::read_to_string(dir.path().join("out/index.html.new")).unwrap(),
        generated
    );
}

#[test]
fn test_in_place_regeneration_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.html");
    let source = "<!-- [summary\nAbout\nsummary] -->\n<p>body</p>\n<!-- [title] -->\n";
    fs::write(&path, source).unwrap();

    let mut regenerator =
        Regenerator::new(&BUILT_IN_SHAPES, NoScripts, RegenerateOptions::default());
    regenerator.regenerate_in_place(&path).unwrap();
    regenerator.regenerate_in_place(&path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), source);
    assert_eq!(fs::read_to_string(dir.path().join("index.html~")).unwrap(), source);
}

#[test]
fn test_clean_verified_run_clears_stale_side_file() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("page.html");
    let new_path = dir.path().join("page.html.new");
    let options = WriterOptions::default();

    write_with_backup(&target, "stable\n", false, &options).unwrap();
    let err = write_with_backup(&target, "drifted\n", true, &options).unwrap_err();
    assert!(matches!(err, WriteError::ChangeDetected { .. }));
    assert_eq!(fs::read_to_string(&new_path).unwrap(), "drifted\n");

    let outcome = write_with_backup(&target, "stable\n", true, &options).unwrap();
    assert!(outcome.verified);
    assert!(!new_path.exists());
    assert_eq!(fs::read_to_string(&target).unwrap(), "stable\n");
}
