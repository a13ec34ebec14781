use super::*;
use crate::handlers::tests::{write_pdf_with_metadata, write_png_with_exif};
use crate::result::ResultKind;
use sha2::{Digest, Sha256};
use std::path::Path;
use tempfile::tempdir;

fn hash(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    Ok(Sha256::digest(fs::read(path)?).to_vec())
}

fn file_names(dir: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn run_collecting(
    root: &Path,
    out_dir: &Path,
    options: &ScrubOptions,
) -> (BatchOutcome, Vec<ScrubRecord>) {
    let mut seen = Vec::new();
    let outcome = BatchOrchestrator::new().run(root, out_dir, options, |record| {
        seen.push(record.clone())
    });
    (outcome, seen)
}

#[test]
fn mixed_batch_produces_one_record_per_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("in");
    let out = dir.path().join("out");
    fs::create_dir_all(&root)?;
    write_png_with_exif(&root.join("photo.png"))?;
    fs::write(root.join("broken.pdf"), b"%PDF-1.7\n%%garbage without objects\n")?;
    fs::write(root.join("notes.txt"), b"plain notes")?;

    let (outcome, seen) = run_collecting(&root, &out, &ScrubOptions::default());
    let summary = &outcome.summary;

    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errored, 1);
    assert!(!summary.cancelled);
    assert_eq!(seen, outcome.records);

    let kinds: Vec<_> = outcome.records.iter().map(ScrubRecord::kind).collect();
    assert_eq!(
        kinds,
        vec![ResultKind::Error, ResultKind::Skip, ResultKind::Success]
    );

    let pdf = &outcome.records[0];
    assert_eq!(pdf.category(), Some(ErrorCategory::InputError));
    assert!(pdf.fix_hint().is_some_and(|hint| !hint.is_empty()));
    assert_eq!(outcome.records[1].message(), "unsupported file type: .txt");

    let image = &outcome.records[2];
    assert_eq!(image.output_path(), Some(out.join("photo.png").as_path()));
    assert!(image.bytes_written().is_some_and(|bytes| bytes > 0));

    assert_eq!(file_names(&out)?, vec!["photo.png"]);
    assert!(outcome.finished_at >= outcome.started_at);
    Ok(())
}

#[test]
fn inputs_are_never_modified() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("in");
    fs::create_dir_all(&root)?;
    let image = root.join("photo.png");
    let pdf = root.join("report.pdf");
    write_png_with_exif(&image)?;
    write_pdf_with_metadata(&pdf)?;
    let before = (hash(&image)?, hash(&pdf)?);

    let (outcome, _) = run_collecting(&root, &dir.path().join("out"), &ScrubOptions::default());

    assert_eq!(outcome.summary.succeeded, 2);
    assert_eq!((hash(&image)?, hash(&pdf)?), before);
    Ok(())
}

#[test]
fn cancellation_marks_remaining_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("in");
    let out = dir.path().join("out");
    fs::create_dir_all(&root)?;
    for index in 1..=5 {
        write_png_with_exif(&root.join(format!("photo{index}.png")))?;
    }

    let orchestrator = BatchOrchestrator::new();
    let token = orchestrator.cancel_token();
    let mut notified = 0;
    let outcome = orchestrator.run(&root, &out, &ScrubOptions::default(), |_| {
        notified += 1;
        if notified == 2 {
            token.cancel();
        }
    });

    let kinds: Vec<_> = outcome.records.iter().map(ScrubRecord::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ResultKind::Success,
            ResultKind::Success,
            ResultKind::Cancelled,
            ResultKind::Cancelled,
            ResultKind::Cancelled,
        ]
    );
    assert_eq!(notified, 5);
    assert!(outcome.summary.cancelled);
    assert_eq!(outcome.summary.cancelled_count, 3);
    assert_eq!(file_names(&out)?, vec!["photo1.png", "photo2.png"]);
    Ok(())
}

#[test]
fn cancellation_from_another_thread_is_observed() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("in");
    fs::create_dir_all(&root)?;
    fs::write(root.join("a.txt"), b"a")?;
    fs::write(root.join("b.txt"), b"b")?;

    let orchestrator = BatchOrchestrator::new();
    std::thread::scope(|scope| {
        scope.spawn(|| orchestrator.cancel());
    });

    let outcome = orchestrator.run(&root, &dir.path().join("out"), &ScrubOptions::default(), |_| {});

    assert!(
        outcome
            .records
            .iter()
            .all(|record| record.kind() == ResultKind::Cancelled)
    );
    assert_eq!(outcome.summary.scanned, 2);
    Ok(())
}

#[test]
fn dry_run_previews_without_touching_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("photo.png");
    let out = dir.path().join("out");
    write_png_with_exif(&input)?;

    let options = ScrubOptions {
        dry_run: true,
        ..ScrubOptions::default()
    };
    let (outcome, _) = run_collecting(&input, &out, &options);

    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(record.kind(), ResultKind::Success);
    assert!(record.is_preview());
    assert_eq!(record.output_path(), Some(out.join("photo.png").as_path()));
    assert!(record.format_line().contains("dry-run: would remove"));
    assert_eq!(outcome.summary.previewed, 1);
    assert!(!out.exists());
    Ok(())
}

#[test]
fn overwrite_runs_are_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("report.pdf");
    let out = dir.path().join("out");
    write_pdf_with_metadata(&input)?;

    let options = ScrubOptions {
        overwrite: true,
        ..ScrubOptions::default()
    };
    run_collecting(&input, &out, &options);
    let first = hash(&out.join("report.pdf"))?;
    run_collecting(&input, &out, &options);

    assert_eq!(hash(&out.join("report.pdf"))?, first);
    assert_eq!(file_names(&out)?, vec!["report.pdf"]);
    Ok(())
}

#[test]
fn repeated_runs_without_overwrite_get_suffixes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("photo.png");
    let out = dir.path().join("out");
    write_png_with_exif(&input)?;

    run_collecting(&input, &out, &ScrubOptions::default());
    let first = hash(&out.join("photo.png"))?;
    let (second, _) = run_collecting(&input, &out, &ScrubOptions::default());

    assert_eq!(
        second.records[0].output_path(),
        Some(out.join("photo_clean_1.png").as_path())
    );
    assert_eq!(hash(&out.join("photo.png"))?, first);
    assert_eq!(file_names(&out)?, vec!["photo.png", "photo_clean_1.png"]);
    Ok(())
}

#[test]
fn record_order_follows_the_plan() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("in");
    let out = dir.path().join("out");
    for name in ["b/z.txt", "a/y.pdf", "x.docx", "a/w.mp3"] {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, b"not a real file")?;
    }

    let options = ScrubOptions {
        recursive: true,
        dry_run: true,
        ..ScrubOptions::default()
    };
    let planned: Vec<PathBuf> = PathPlanner::new(&root, &out, &options)
        .plan()
        .map(|entry| entry.input_path().to_path_buf())
        .collect();
    let (outcome, _) = run_collecting(&root, &out, &options);
    let recorded: Vec<PathBuf> = outcome
        .records
        .iter()
        .map(|record| record.input_path().to_path_buf())
        .collect();

    assert_eq!(recorded, planned);
    assert_eq!(recorded.len(), 4);
    Ok(())
}

#[test]
fn missing_root_is_a_single_input_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let (outcome, seen) = run_collecting(
        &dir.path().join("does-not-exist"),
        &dir.path().join("out"),
        &ScrubOptions::default(),
    );

    assert_eq!(seen.len(), 1);
    assert_eq!(outcome.records[0].category(), Some(ErrorCategory::InputError));
    assert_eq!(outcome.records[0].message(), "Input path does not exist");
    assert!(outcome.summary.has_errors());
    assert!(!dir.path().join("out").exists());
    Ok(())
}

#[test]
fn output_that_is_a_file_fails_validation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("photo.png");
    let out = dir.path().join("out");
    write_png_with_exif(&input)?;
    fs::write(&out, b"occupied")?;

    let (outcome, _) = run_collecting(&input, &out, &ScrubOptions::default());

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].category(), Some(ErrorCategory::InputError));
    Ok(())
}

#[test]
fn refuses_to_replace_the_input_itself() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("photo.png");
    write_png_with_exif(&input)?;
    let before = hash(&input)?;

    let options = ScrubOptions {
        overwrite: true,
        ..ScrubOptions::default()
    };
    let (outcome, _) = run_collecting(&input, dir.path(), &options);

    assert_eq!(outcome.records[0].category(), Some(ErrorCategory::OutputError));
    assert_eq!(hash(&input)?, before);
    Ok(())
}

#[test]
fn keep_structure_mirrors_input_tree() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("in");
    let out = dir.path().join("out");
    fs::create_dir_all(root.join("album"))?;
    write_png_with_exif(&root.join("album/photo.png"))?;

    let options = ScrubOptions {
        recursive: true,
        keep_structure: true,
        ..ScrubOptions::default()
    };
    let (outcome, _) = run_collecting(&root, &out, &options);

    assert_eq!(outcome.summary.succeeded, 1);
    assert!(out.join("album/photo.png").is_file());
    Ok(())
}

#[cfg(unix)]
#[test]
fn special_files_are_skipped_without_blocking() -> Result<(), Box<dyn std::error::Error>> {
    use std::process::Command;
    use std::sync::mpsc;
    use std::time::Duration;

    let dir = tempdir()?;
    let root = dir.path().join("in");
    let out = dir.path().join("out");
    fs::create_dir_all(&root)?;
    write_png_with_exif(&root.join("photo.png"))?;
    let pipe = root.join("pipe.pdf");
    let status = Command::new("mkfifo").arg(&pipe).status()?;
    assert!(status.success(), "mkfifo failed");

    let (sender, receiver) = mpsc::channel();
    for target in [root.clone(), pipe.clone()] {
        let sender = sender.clone();
        let out = out.clone();
        std::thread::spawn(move || {
            let outcome =
                BatchOrchestrator::new().run(&target, &out, &ScrubOptions::default(), |_| {});
            let _ = sender.send(outcome);
        });
    }

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        outcomes.push(receiver.recv_timeout(Duration::from_secs(10))?);
    }
    outcomes.sort_by_key(|outcome| outcome.records.len());

    let single = &outcomes[0];
    assert_eq!(single.records.len(), 1);
    assert_eq!(single.records[0].kind(), ResultKind::Skip);
    assert_eq!(single.records[0].message(), "not a regular file");

    let batch = &outcomes[1];
    let kinds: Vec<_> = batch.records.iter().map(ScrubRecord::kind).collect();
    assert_eq!(kinds, vec![ResultKind::Success, ResultKind::Skip]);
    assert_eq!(batch.records[1].input_path(), pipe.as_path());
    assert_eq!(batch.records[1].message(), "not a regular file");
    Ok(())
}

#[test]
fn unreadable_entry_becomes_one_error_record() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("photo.png");
    write_png_with_exif(&input)?;
    let options = ScrubOptions::default();
    let registry = HandlerRegistry::for_options(&options)?;
    let writer = AtomicWriter::new(false);

    let locked = dir.path().join("locked");
    let failed = dispatch(
        PlanEntry::Unreadable {
            path: locked.clone(),
            error: io::Error::from(io::ErrorKind::PermissionDenied),
        },
        &registry,
        &writer,
        false,
    );

    assert_eq!(failed.kind(), ResultKind::Error);
    assert_eq!(failed.input_path(), locked.as_path());
    assert_eq!(failed.category(), Some(ErrorCategory::PermissionError));
    assert!(failed.fix_hint().is_some_and(|hint| !hint.is_empty()));
    assert!(!failed.message().contains(&*locked.to_string_lossy()));

    let next = dispatch(
        PlanEntry::Pair(PlannedPair {
            input: input.clone(),
            output: dir.path().join("out.png"),
        }),
        &registry,
        &writer,
        false,
    );

    assert_eq!(next.kind(), ResultKind::Success);
    assert!(dir.path().join("out.png").is_file());
    Ok(())
}
