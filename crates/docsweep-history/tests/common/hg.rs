//! Mercurial repositories, including branches and merges, built in temporary directories.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

/// A Mercurial repository driven through the `hg` executable.
pub struct HgFixture {
    dir: TempDir,
    time: i64,
}

impl HgFixture {
    /// Whether the `hg` executable is installed.
    pub fn installed() -> bool {
        Command::new("hg")
            .arg("--version")
            .output()
            .is_ok_and(|output| output.status.success())
    }

    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Self {
            dir,
            time: 1_700_000_000,
        };
        fixture.hg(&["init"]);
        fixture
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn hg(&self, args: &[&str]) -> String {
        let output = Command::new("hg")
            .arg("--cwd")
            .arg(self.dir.path())
            .args(["--config", "ui.username=Docsweep Test <test@example.com>"])
            .args(args)
            .env("HGPLAIN", "1")
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "hg {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    pub fn write(&self, relative: &str, content: &str) {
        fs::write(self.path(relative), content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    /// Commit everything in the working copy. Returns the full node id.
    pub fn commit(&mut self, message: &str) -> String {
        self.time += 60;
        let date = format!("{} 0", self.time);
        self.hg(&["commit", "--addremove", "-m", message, "-d", &date]);
        self.hg(&["log", "-r", ".", "-T", "{node}"])
    }

    /// Check out `revision` in the working copy.
    pub fn update(&self, revision: &str) {
        self.hg(&["update", "-r", revision]);
    }

    /// Merge `revision` into the working copy parent; the next commit is the merge.
    pub fn merge(&self, revision: &str) {
        self.hg(&["merge", "--tool", ":merge", "-r", revision]);
    }
}
