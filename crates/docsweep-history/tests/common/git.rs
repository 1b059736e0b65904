//! Git repositories, including branches and merges, built in temporary directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Commit, Oid, Repository, Signature, Time, Tree};
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

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write `files`, delete `removed`, and commit the result on HEAD.
    /// Returns the commit id.
    pub fn commit(&mut self, message: &str, files: &[(&str, &str)], removed: &[&str]) -> String {
        let signature = self.next_signature();
        let tree = self.stage(files, removed);
        let head = self.head();
        let parents: Vec<&Commit> = head.iter().collect();
        self.write_commit(Some("HEAD"), &signature, message, &tree, &parents)
    }

    /// Move `from` to `to` with unchanged content and commit.
    pub fn rename(&mut self, message: &str, from: &str, to: &str) -> String {
        let content = fs::read_to_string(self.path(from)).unwrap();
        self.commit(message, &[(to, &content)], &[from])
    }

    /// Commit top-level `files` on top of `parent` without moving HEAD or
    /// touching the working tree. Returns the commit id.
    pub fn commit_on(&mut self, parent: &str, message: &str, files: &[(&str, &str)]) -> String {
        let signature = self.next_signature();
        let parent = self.find(parent);
        let base = parent.tree().unwrap();
        let mut builder = self.repo.treebuilder(Some(&base)).unwrap();
        for (name, content) in files {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            builder.insert(*name, blob, 0o100644).unwrap();
        }
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();
        self.write_commit(None, &signature, message, &tree, &[&parent])
    }

    /// Commit `files` on HEAD as a merge with `other` as second parent.
    pub fn merge(&mut self, message: &str, other: &str, files: &[(&str, &str)]) -> String {
        let signature = self.next_signature();
        let tree = self.stage(files, &[]);
        let head = self.head().unwrap();
        let other = self.find(other);
        self.write_commit(Some("HEAD"), &signature, message, &tree, &[&head, &other])
    }

    fn next_signature(&mut self) -> Signature<'static> {
        self.time += 60;
        Signature::new("Docsweep Test", "test@example.com", &Time::new(self.time, 0)).unwrap()
    }

    fn head(&self) -> Option<Commit<'_>> {
        self.repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok())
    }

    fn find(&self, id: &str) -> Commit<'_> {
        self.repo.find_commit(Oid::from_str(id).unwrap()).unwrap()
    }

    fn stage(&self, files: &[(&str, &str)], removed: &[&str]) -> Tree<'_> {
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
        self.repo.find_tree(index.write_tree().unwrap()).unwrap()
    }

    fn write_commit(
        &self,
        update_ref: Option<&str>,
        signature: &Signature<'_>,
        message: &str,
        tree: &Tree<'_>,
        parents: &[&Commit<'_>],
    ) -> String {
        self.repo
            .commit(update_ref, signature, signature, message, tree, parents)
            .unwrap()
            .to_string()
    }
}
