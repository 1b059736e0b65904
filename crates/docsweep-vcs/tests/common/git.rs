//! Git repositories built in temporary directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Repository, Signature, Time};
use tempfile::TempDir;

/// A git repository whose commits are made with `git2`, independent of any
/// user configuration.
pub struct GitFixture {
    dir: TempDir,
    repo: Repository,
    time: i64,
}

impl GitFixture {
    /// Whether the `git` executable the backend drives is installed.
    pub fn installed() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|output| output.status.success())
    }

    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self {
            dir,
            repo,
            time: 1_700_000_000,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write `files`, delete `removed`, and commit the result. Returns the commit id.
    pub fn commit(&mut self, message: &str, files: &[(&str, &str)], removed: &[&str]) -> String {
        let mut index = self.repo.index().unwrap();
        for (relative, content) in files {
            let path = self.path(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, content).unwrap();
            index.add_path(Path::new(relative)).unwrap();
        }
        for relative in removed {
            fs::remove_file(self.path(relative)).unwrap();
            index.remove_path(Path::new(relative)).unwrap();
        }
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

        self.time += 60;
        let signature =
            Signature::new("Docsweep Test", "test@example.com", &Time::new(self.time, 0)).unwrap();
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap()
            .to_string()
    }

    /// Move `from` to `to` with unchanged content and commit.
    pub fn rename(&mut self, message: &str, from: &str, to: &str) -> String {
        let content = fs::read_to_string(self.path(from)).unwrap();
        self.commit(message, &[(to, &content)], &[from])
    }
}
