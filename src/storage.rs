//!
//! rostrum document store
//! ----------------------
//! This module implements the on-disk store for rostrum: one JSON file per
//! document under a configured root folder, `users/<id>.json`,
//! `articles/<id>.json`, plus `config/global.json` and `config/<user-id>.json`
//! for the free-form config documents.
//!
//! Key responsibilities:
//! - CRUD for user profiles, with by-username and by-email lookups.
//! - CRUD for articles, listed newest-first, with a by-tag filter.
//! - Free-form global and per-user configuration documents.
//!
//! The public API centers around `DocStore`, a cheap-clone handle shared
//! through the server state. An interior RwLock keeps multi-file scans
//! consistent with writes; individual calls are ordinary synchronous
//! filesystem operations and perform no caching.

pub mod article;
pub mod user;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

pub use article::Article;
pub use user::User;

#[derive(Clone)]
pub struct DocStore {
    inner: Arc<RwLock<Store>>,
}

struct Store {
    root: PathBuf,
}

impl DocStore {
    /// Open (or initialize) a store rooted at the given folder.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for sub in ["users", "articles", "config"] {
            fs::create_dir_all(root.join(sub))
                .with_context(|| format!("failed to create store folder under {}", root.display()))?;
        }
        Ok(Self { inner: Arc::new(RwLock::new(Store { root })) })
    }

    // -- users ------------------------------------------------------------

    pub fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let store = self.inner.read();
        let path = store.user_path(id);
        store.read_doc(&path)
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let store = self.inner.read();
        Ok(store
            .scan_docs::<User>("users")?
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username)))
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let store = self.inner.read();
        Ok(store
            .scan_docs::<User>("users")?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    /// Replace a user profile, or create one if it does not already exist.
    pub fn set_user(&self, user: &User) -> Result<()> {
        let store = self.inner.write();
        let path = store.user_path(user.id);
        store.write_doc(&path, user)
    }

    /// Remove a user profile and its config document. Idempotent.
    pub fn delete_user(&self, id: Uuid) -> Result<()> {
        let store = self.inner.write();
        remove_if_present(&store.user_path(id))?;
        remove_if_present(&store.user_config_path(id))?;
        Ok(())
    }

    // -- articles ---------------------------------------------------------

    pub fn article_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        let store = self.inner.read();
        let path = store.article_path(id);
        store.read_doc(&path)
    }

    /// All articles, in descending order by timestamp.
    pub fn articles(&self) -> Result<Vec<Article>> {
        let store = self.inner.read();
        let mut articles = store.scan_docs::<Article>("articles")?;
        articles.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(articles)
    }

    /// Articles carrying the given tag, in descending order by timestamp.
    pub fn articles_by_tag(&self, tag: &str) -> Result<Vec<Article>> {
        let mut articles = self.articles()?;
        articles.retain(|a| a.tags.contains(tag));
        Ok(articles)
    }

    /// Replace an article, or create one if it does not already exist.
    pub fn set_article(&self, article: &Article) -> Result<()> {
        let store = self.inner.write();
        let path = store.article_path(article.id);
        store.write_doc(&path, article)
    }

    /// Remove an article. Idempotent.
    pub fn delete_article(&self, id: Uuid) -> Result<()> {
        let store = self.inner.write();
        remove_if_present(&store.article_path(id))
    }

    // -- config documents -------------------------------------------------

    /// The public, site-wide config document. `{}` when none is stored.
    pub fn global_config(&self) -> Result<serde_json::Value> {
        let store = self.inner.read();
        let path = store.global_config_path();
        Ok(store.read_doc(&path)?.unwrap_or_else(empty_doc))
    }

    pub fn set_global_config(&self, doc: &serde_json::Value) -> Result<()> {
        let store = self.inner.write();
        let path = store.global_config_path();
        store.write_doc(&path, doc)
    }

    /// A user's private config document. `{}` when none is stored.
    pub fn user_config(&self, id: Uuid) -> Result<serde_json::Value> {
        let store = self.inner.read();
        let path = store.user_config_path(id);
        Ok(store.read_doc(&path)?.unwrap_or_else(empty_doc))
    }

    pub fn set_user_config(&self, id: Uuid, doc: &serde_json::Value) -> Result<()> {
        let store = self.inner.write();
        let path = store.user_config_path(id);
        store.write_doc(&path, doc)
    }
}

fn empty_doc() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn remove_if_present(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
    }
    Ok(())
}

impl Store {
    fn user_path(&self, id: Uuid) -> PathBuf {
        self.root.join("users").join(format!("{id}.json"))
    }

    fn article_path(&self, id: Uuid) -> PathBuf {
        self.root.join("articles").join(format!("{id}.json"))
    }

    fn global_config_path(&self) -> PathBuf {
        self.root.join("config").join("global.json")
    }

    fn user_config_path(&self, id: Uuid) -> PathBuf {
        self.root.join("config").join(format!("{id}.json"))
    }

    fn read_doc<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let doc = serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(doc))
    }

    fn write_doc<T: Serialize>(&self, path: &Path, doc: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(doc)?;
        fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Read every parseable `.json` document in a collection folder. Stray
    /// and unparsable files are skipped, not fatal.
    fn scan_docs<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let dir = self.root.join(collection);
        let mut docs = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("failed to list {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_doc::<T>(&path) {
                Ok(Some(doc)) => docs.push(doc),
                Ok(None) => {}
                Err(e) => {
                    debug!(target: "rostrum::storage", "skipping unreadable document {}: {}", path.display(), e);
                }
            }
        }
        Ok(docs)
    }
}
