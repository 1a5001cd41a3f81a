//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use autocommit::llm::{Generated, MessageGenerator};
use autocommit::notify::{Level, Notifier};

/// Get the path to test fixtures directory.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Get the path to a generation API response fixture.
pub fn response_fixture(name: &str) -> PathBuf {
    fixtures_dir().join("responses").join(name)
}

/// Read a fixture file as a string.
pub fn read_fixture(path: PathBuf) -> String {
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {:?}: {}", path, e))
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    ///
    /// Identity is set in the repository config so `git commit` works
    /// without a global config.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
            config.set_bool("commit.gpgsign", false).unwrap();
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write `content` to a file relative to the repository root.
    pub fn write(&self, name: &str, content: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(path, content).expect("Failed to write test file");
    }

    /// Commit the current state of `name` directly through git2.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> Oid {
        self.write(name, content);

        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(name)).expect("Failed to add file");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let sig = self.signature();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Full message of the HEAD commit, if any.
    pub fn head_message(&self) -> Option<String> {
        let commit = self.repo.head().ok()?.peel_to_commit().ok()?;
        commit.message().map(|m| m.trim_end().to_string())
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> usize {
        let Ok(mut walk) = self.repo.revwalk() else {
            return 0;
        };
        if walk.push_head().is_err() {
            return 0;
        }
        walk.count()
    }

    /// Add a remote with the given URL.
    pub fn add_remote(&self, name: &str, url: &str) {
        self.repo.remote(name, url).expect("Failed to add remote");
    }

    /// Set a string value in the repository config.
    pub fn set_config(&self, key: &str, value: &str) {
        self.repo
            .config()
            .expect("Failed to open repo config")
            .set_str(key, value)
            .expect("Failed to set config value");
    }
}

/// Generator that returns a fixed reply and counts calls.
pub struct FakeGenerator {
    pub reply: Option<String>,
    pub calls: Mutex<Vec<Option<String>>>,
}

impl FakeGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageGenerator for FakeGenerator {
    async fn generate(&self, _diff: &str, api_key: Option<&str>, fallback: &str) -> Generated {
        self.calls.lock().unwrap().push(api_key.map(str::to_string));
        match &self.reply {
            Some(reply) => Generated::ok(reply.clone()),
            None => Generated::fallback(
                fallback,
                autocommit::GenerationError::EmptyResponse,
            ),
        }
    }
}

/// Notifier that keeps everything it is told.
#[derive(Default)]
pub struct RecordingNotifier(pub Mutex<Vec<(Level, String)>>);

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: Level, message: &str) {
        self.0.lock().unwrap().push((level, message.to_string()));
    }
}
