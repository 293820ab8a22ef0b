use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

use canon_dupes::{Error, MatchFlags, Phase, ScanOptions, Session};

/// Temp dir with its path resolved, so expected paths line up with what the
/// session records after canonicalizing its roots.
fn workspace() -> (TempDir, PathBuf) {
    let tmp = tempdir().unwrap();
    let root = fs::canonicalize(tmp.path()).unwrap();
    (tmp, root)
}

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn run_scans(session: &mut Session) {
    session.do_query_scan().unwrap().for_each(drop);
    session.do_canonical_scan().unwrap().for_each(drop);
}

fn run_all(session: &mut Session, flags: MatchFlags) {
    run_scans(session);
    session.do_compare(flags).unwrap().for_each(drop);
}

fn name_only() -> MatchFlags {
    MatchFlags {
        name: true,
        ..MatchFlags::default()
    }
}

#[test]
fn test_duplicate_and_unique_by_name() {
    let (_tmp, root) = workspace();
    let x = vec![b'X'; 1024];
    let y = vec![b'Y'; 1024];
    write(&root.join("canon/photos/a.jpg"), &x);
    write(&root.join("query/in/a.jpg"), &x);
    write(&root.join("query/in/b.jpg"), &y);

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    run_all(&mut session, name_only());

    let a = root.join("query/in/a.jpg");
    let b = root.join("query/in/b.jpg");
    assert_eq!(
        session.actual_matches().get(&a),
        Some(&vec![root.join("canon/photos/a.jpg")])
    );
    assert!(session.unique().contains(&b));
    assert!(!session.unique().contains(&a));
    assert_eq!(session.outcome().compared_count, 2);
    assert_eq!(session.phase(), Phase::Compare);
}

#[test]
fn test_different_name_still_duplicate_without_flags() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/original.bin"), b"identical bytes");
    write(&root.join("query/copy.bin"), b"identical bytes");

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    run_all(&mut session, MatchFlags::default());

    assert_eq!(
        session.actual_matches().get(&root.join("query/copy.bin")),
        Some(&vec![root.join("canon/original.bin")])
    );

    // With name matching the same pair has no candidates at all.
    session.do_compare(name_only()).unwrap().for_each(drop);
    assert!(session.actual_matches().is_empty());
    assert!(session.unique().contains(&root.join("query/copy.bin")));
}

#[test]
fn test_no_size_match_is_unique() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/small.txt"), b"abc");
    write(&root.join("query/large.txt"), b"abcdefgh");

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    run_all(&mut session, MatchFlags::default());

    assert!(session.unique().contains(&root.join("query/large.txt")));
    assert_eq!(session.outcome().compared_count, 1);
    assert_eq!(session.canonical_index().unwrap().checksums().len(), 0);
}

#[test]
fn test_zero_length_files_are_absent_everywhere() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/empty.txt"), b"");
    write(&root.join("query/empty.txt"), b"");
    write(&root.join("query/full.txt"), b"full");

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    run_all(&mut session, MatchFlags::default());

    let empty = root.join("query/empty.txt");
    assert!(!session.query_scan().contains(&empty));
    assert!(!session.unique().contains(&empty));
    assert!(!session.actual_matches().contains_key(&empty));
    assert_eq!(session.query_scan().len(), 1);
}

#[test]
fn test_query_dir_equal_to_canonical_dir() {
    let (_tmp, root) = workspace();
    write(&root.join("shared/only.txt"), b"just me");

    let mut session =
        Session::new([root.join("shared")], root.join("shared"), &ScanOptions::default()).unwrap();
    run_all(&mut session, MatchFlags::default());

    let only = root.join("shared/only.txt");
    assert!(session.actual_matches().is_empty());
    assert!(session.unique().contains(&only));
    assert!(session.outcome().skipped_self.contains(&only));
}

#[test]
fn test_self_and_real_duplicate() {
    let (_tmp, root) = workspace();
    write(&root.join("shared/a.txt"), b"twin content");
    write(&root.join("shared/b.txt"), b"twin content");

    let mut session =
        Session::new([root.join("shared")], root.join("shared"), &ScanOptions::default()).unwrap();
    run_all(&mut session, MatchFlags::default());

    let a = root.join("shared/a.txt");
    let b = root.join("shared/b.txt");
    assert_eq!(session.actual_matches().get(&a), Some(&vec![b.clone()]));
    assert_eq!(session.actual_matches().get(&b), Some(&vec![a.clone()]));
    assert!(session.outcome().skipped_self.contains(&a));
    assert!(!session.unique().contains(&a));
    assert!(session.unique().is_empty());
}

#[test]
fn test_canonical_checksum_is_reused() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/master.dat"), b"payload payload");
    write(&root.join("query/one.dat"), b"payload payload");
    write(&root.join("query/two.dat"), b"payload payload");

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    run_all(&mut session, MatchFlags::default());

    let master = root.join("canon/master.dat");
    let index = session.canonical_index().unwrap();
    assert_eq!(
        index.get_checksum(&master),
        Some(blake3::hash(b"payload payload"))
    );
    assert_eq!(session.outcome().pre_computed_checksum_count, 1);
    assert_eq!(session.outcome().duplicate_count(), 2);
}

#[test]
fn test_compare_is_repeatable() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/a.txt"), b"alpha");
    write(&root.join("query/a.txt"), b"alpha");
    write(&root.join("query/b.txt"), b"bravo");

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    run_all(&mut session, MatchFlags::default());
    let first_matches = session.actual_matches().clone();
    let first_unique = session.unique().clone();

    session.do_compare(MatchFlags::default()).unwrap().for_each(drop);

    assert_eq!(session.actual_matches(), &first_matches);
    assert_eq!(session.unique(), &first_unique);
    // The second pass starts from the checksum cached by the first.
    assert_eq!(session.outcome().pre_computed_checksum_count, 1);
}

#[test]
fn test_skip_checksum_requires_name() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/a.txt"), b"AAAA");
    write(&root.join("query/a.txt"), b"BBBB");

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    run_scans(&mut session);

    let invalid = MatchFlags {
        skip_checksum: true,
        ..MatchFlags::default()
    };
    assert!(matches!(
        session.do_compare(invalid),
        Err(Error::InvalidOptions(_))
    ));

    // Same name and size is enough once content is not read.
    let trusting = MatchFlags {
        name: true,
        skip_checksum: true,
        ..MatchFlags::default()
    };
    session.do_compare(trusting).unwrap().for_each(drop);
    assert_eq!(
        session.actual_matches().get(&root.join("query/a.txt")),
        Some(&vec![root.join("canon/a.txt")])
    );
    assert_eq!(session.canonical_index().unwrap().checksums().len(), 0);
}

#[test]
fn test_phases_must_run_in_order() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/a.txt"), b"a");
    write(&root.join("query/a.txt"), b"a");

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    assert_eq!(session.phase(), Phase::QueryScan);
    assert!(matches!(session.do_canonical_scan(), Err(Error::PhaseOrder(_))));
    assert!(matches!(
        session.do_compare(MatchFlags::default()),
        Err(Error::PhaseOrder(_))
    ));

    session.do_query_scan().unwrap().for_each(drop);
    assert_eq!(session.phase(), Phase::CanonicalScan);
    assert!(matches!(session.do_query_scan(), Err(Error::PhaseOrder(_))));
    assert!(matches!(
        session.do_compare(MatchFlags::default()),
        Err(Error::PhaseOrder(_))
    ));

    session.do_canonical_scan().unwrap().for_each(drop);
    assert_eq!(session.phase(), Phase::Compare);
    assert!(matches!(session.do_canonical_scan(), Err(Error::PhaseOrder(_))));
}

#[test]
fn test_stopped_scan_cannot_resume() {
    let (_tmp, root) = workspace();
    for i in 0..12 {
        write(&root.join(format!("query/f{:02}.txt", i)), b"some data");
    }
    write(&root.join("canon/x.txt"), b"x");

    let options = ScanOptions {
        report_frequency: 5,
        ..ScanOptions::default()
    };
    let mut session = Session::new([root.join("query")], root.join("canon"), &options).unwrap();
    {
        let mut progress = session.do_query_scan().unwrap();
        assert_eq!(progress.next(), Some(5));
        assert_eq!(progress.result().map(|r| r.len()), Some(5));
    }
    assert_eq!(session.phase(), Phase::QueryScan);
    assert!(matches!(session.do_query_scan(), Err(Error::PhaseOrder(_))));
}

#[test]
fn test_invalid_roots() {
    let (_tmp, root) = workspace();
    write(&root.join("query/a.txt"), b"a");
    write(&root.join("canon/file.txt"), b"not a dir");

    let missing = Session::new([root.join("query")], root.join("nowhere"), &ScanOptions::default());
    assert!(matches!(missing, Err(Error::InvalidRoot { .. })));

    let not_dir = Session::new(
        [root.join("query")],
        root.join("canon/file.txt"),
        &ScanOptions::default(),
    );
    assert!(matches!(not_dir, Err(Error::InvalidRoot { .. })));

    let missing_item = Session::new(
        [root.join("query/missing.txt")],
        root.join("canon"),
        &ScanOptions::default(),
    );
    assert!(matches!(missing_item, Err(Error::InvalidRoot { .. })));

    let none: [PathBuf; 0] = [];
    let empty = Session::new(none, root.join("canon"), &ScanOptions::default());
    assert!(matches!(empty, Err(Error::InvalidOptions(_))));

    let bad_regex = ScanOptions {
        include_file_regexes: vec!["(".to_string()],
        ..ScanOptions::default()
    };
    let invalid = Session::new([root.join("query")], root.join("canon"), &bad_regex);
    assert!(matches!(invalid, Err(Error::InvalidPattern { .. })));
}

#[test]
fn test_canonical_file_removed_after_scan() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/gone.txt"), b"same size");
    write(&root.join("query/here.txt"), b"same size");

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    run_scans(&mut session);
    fs::remove_file(root.join("canon/gone.txt")).unwrap();
    session.do_compare(MatchFlags::default()).unwrap().for_each(drop);

    let outcome = session.outcome();
    assert!(outcome
        .possible_match_error_files
        .contains(&root.join("canon/gone.txt")));
    assert!(outcome.source_error_files.is_empty());
    assert!(outcome.actual_matches.is_empty());
}

#[test]
fn test_query_file_removed_after_scan() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/kept.txt"), b"same size");
    write(&root.join("query/gone.txt"), b"same size");

    let mut session =
        Session::new([root.join("query")], root.join("canon"), &ScanOptions::default()).unwrap();
    run_scans(&mut session);
    fs::remove_file(root.join("query/gone.txt")).unwrap();
    session.do_compare(MatchFlags::default()).unwrap().for_each(drop);

    let outcome = session.outcome();
    assert!(outcome.source_error_files.contains(&root.join("query/gone.txt")));
    assert!(outcome.possible_match_error_files.is_empty());
    assert!(outcome.actual_matches.is_empty());
}

#[test]
fn test_mixed_files_and_directories() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/doc.txt"), b"document");
    write(&root.join("canon/pic.png"), b"picture!");
    write(&root.join("query_dir/doc.txt"), b"document");
    write(&root.join("loose/pic.png"), b"picture!");
    write(&root.join("loose/other.png"), b"elsewise");

    let mut session = Session::new(
        [root.join("query_dir"), root.join("loose/pic.png")],
        root.join("canon"),
        &ScanOptions::default(),
    )
    .unwrap();
    run_all(&mut session, name_only());

    assert_eq!(session.query_scan().len(), 2);
    assert!(!session.query_scan().contains(&root.join("loose/other.png")));
    assert_eq!(
        session.actual_matches().get(&root.join("loose/pic.png")),
        Some(&vec![root.join("canon/pic.png")])
    );
    assert_eq!(
        session.actual_matches().get(&root.join("query_dir/doc.txt")),
        Some(&vec![root.join("canon/doc.txt")])
    );
}

#[test]
fn test_canonical_side_options() {
    let (_tmp, root) = workspace();
    write(&root.join("canon/keep/a.txt"), b"content a");
    write(&root.join("canon/ignored/a.txt"), b"content a");
    write(&root.join("query/a.txt"), b"content a");

    let canonical_options = ScanOptions {
        exclude_dir_regexes: vec!["ignored".to_string()],
        ..ScanOptions::default()
    };
    let mut session = Session::with_canonical_options(
        [root.join("query")],
        root.join("canon"),
        &ScanOptions::default(),
        &canonical_options,
    )
    .unwrap();
    run_all(&mut session, MatchFlags::default());

    assert_eq!(
        session.actual_matches().get(&root.join("query/a.txt")),
        Some(&vec![root.join("canon/keep/a.txt")])
    );
}

#[cfg(unix)]
#[test]
fn test_fifo_in_query_tree_does_not_block_compare() {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let (_tmp, root) = workspace();
    fs::create_dir_all(root.join("query")).unwrap();
    write(&root.join("canon/empty.txt"), b"");
    let pipe = root.join("query/pipe");
    let c_path = CString::new(pipe.as_os_str().as_bytes()).unwrap();
    assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) }, 0);

    let options = ScanOptions {
        skip_zero_len: false,
        ..ScanOptions::default()
    };
    let mut session = Session::new([root.join("query")], root.join("canon"), &options).unwrap();
    run_all(&mut session, MatchFlags::default());

    assert!(session.query_scan().is_empty());
    assert_eq!(session.query_scan().counters.files.special, 1);
    assert!(session.actual_matches().is_empty());
    assert!(session.unique().is_empty());
}
