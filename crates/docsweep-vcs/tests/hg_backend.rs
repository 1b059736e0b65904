mod common {
    pub mod hg;
}

use std::path::{Path, PathBuf};

use common::hg::HgFixture;
use docsweep_core::{DocsweepError, HistoryEnd, Hunk, VcsKind};
use docsweep_vcs::{MercurialBackend, VersionControl};

fn hg_available() -> bool {
    let available = HgFixture::installed();
    if !available {
        eprintln!("hg not installed, skipping");
    }
    available
}

fn open(fixture: &HgFixture) -> MercurialBackend {
    MercurialBackend::open(Path::new("hg"), fixture.root()).unwrap()
}

#[test]
fn open_finds_repository_root() {
    if !hg_available() {
        return;
    }
    let mut fixture = HgFixture::new();
    fixture.write("pkg/mod.py", "x = 1\n");
    fixture.commit("init");

    let hg = MercurialBackend::open(Path::new("hg"), &fixture.path("pkg/mod.py")).unwrap();
    assert_eq!(hg.kind(), VcsKind::Mercurial);
    assert_eq!(hg.root(), fixture.root().canonicalize().unwrap());
    assert_eq!(
        hg.relative_path(&fixture.path("pkg/mod.py")).unwrap(),
        PathBuf::from("pkg/mod.py")
    );
}

#[test]
fn open_outside_repository_is_not_tracked() {
    if !hg_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let result = MercurialBackend::open(Path::new("hg"), dir.path());
    assert!(matches!(result, Err(DocsweepError::NotTracked(_))));
}

#[test]
fn enumerates_and_reads_history() {
    if !hg_available() {
        return;
    }
    let mut fixture = HgFixture::new();
    fixture.write("a.py", "x = 1\n");
    let r0 = fixture.commit("create");
    fixture.write("b.py", "y = 1\n");
    fixture.commit("unrelated");
    fixture.write("a.py", "x = 2\n");
    let r2 = fixture.commit("edit");

    let hg = open(&fixture);
    let history = hg.enumerate_revisions(Path::new("a.py"), true).unwrap();
    let ids: Vec<_> = history.entries.iter().map(|e| e.revision.id.clone()).collect();
    assert_eq!(ids, vec![r2, r0]);
    assert!(history.entries[0].revision.is_tip);
    assert_eq!(history.end, HistoryEnd::Created);

    let old = history.get(1).unwrap();
    assert_eq!(hg.read_content(&old.path, &old.revision).unwrap(), "x = 1\n");
    let err = hg
        .read_content(Path::new("b.py"), &old.revision)
        .unwrap_err();
    assert!(matches!(err, DocsweepError::NotFound { .. }));
}

#[test]
fn untracked_file_has_empty_history() {
    if !hg_available() {
        return;
    }
    let mut fixture = HgFixture::new();
    fixture.write("a.py", "x = 1\n");
    fixture.commit("create");
    fixture.write("scratch.py", "pass\n");

    let hg = open(&fixture);
    let history = hg.enumerate_revisions(Path::new("scratch.py"), true).unwrap();
    assert!(history.is_empty());
}

#[test]
fn diff_hunks_match_git_conventions() {
    if !hg_available() {
        return;
    }
    let mut fixture = HgFixture::new();
    fixture.write("a.py", "a\nb\nc\nd\ne\n");
    fixture.commit("create");
    fixture.write("a.py", "top\na\nB1\nB2\nc\ne\n");
    fixture.commit("edit");

    let hg = open(&fixture);
    let history = hg.enumerate_revisions(Path::new("a.py"), true).unwrap();
    let hunks = hg
        .diff_hunks(history.get(0).unwrap(), history.get(1).unwrap())
        .unwrap();
    assert_eq!(
        hunks,
        vec![
            Hunk {
                old_start: 1,
                old_len: 0,
                new_start: 1,
                new_len: 1
            },
            Hunk {
                old_start: 2,
                old_len: 1,
                new_start: 3,
                new_len: 2
            },
            Hunk {
                old_start: 4,
                old_len: 1,
                new_start: 6,
                new_len: 0
            },
        ]
    );
}

#[test]
fn rename_is_followed_or_reported() {
    if !hg_available() {
        return;
    }
    let mut fixture = HgFixture::new();
    fixture.write("old.py", "def f():\n    return 1\n");
    let r0 = fixture.commit("create");
    fixture.rename("old.py", "new.py");
    let r1 = fixture.commit("move");
    fixture.write("new.py", "def f():\n    return 2\n");
    fixture.commit("edit");

    let hg = open(&fixture);
    let followed = hg.enumerate_revisions(Path::new("new.py"), true).unwrap();
    assert_eq!(followed.len(), 3);
    let oldest = followed.get(2).unwrap();
    assert_eq!(oldest.revision.id, r0);
    assert_eq!(oldest.path, PathBuf::from("old.py"));
    assert!(oldest.crossed_rename);

    let hunks = hg
        .diff_hunks(followed.get(1).unwrap(), oldest)
        .unwrap();
    assert!(hunks.is_empty());

    let truncated = hg.enumerate_revisions(Path::new("new.py"), false).unwrap();
    assert_eq!(truncated.len(), 2);
    match truncated.end {
        HistoryEnd::RenameBoundary(boundary) => {
            assert_eq!(boundary.revision, r1);
            assert_eq!(boundary.previous_path, PathBuf::from("old.py"));
        }
        HistoryEnd::Created => panic!("expected a rename boundary"),
    }
}
