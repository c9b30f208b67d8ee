//! Database handle: a sled instance holding one tree per collection and index.

use sled::{Db, Tree};

use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::index::IndexSpec;

/// Tree holding index declarations, keyed by `collection \0 index`.
const META_INDEXES_TREE: &str = "meta:indexes";

/// Prefix for collection document trees.
pub(crate) const DOCS_TREE_PREFIX: &str = "docs:";

/// Prefix for index trees.
pub(crate) const INDEX_TREE_PREFIX: &str = "idx:";

/// An open document database.
///
/// Cloning is cheap; clones share the same underlying sled instance.
#[derive(Clone)]
pub struct Database {
    db: Db,
    meta: Tree,
}

impl Database {
    /// Open or create a database with the given configuration.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let db = config.to_sled_config().open()?;
        let meta = db.open_tree(META_INDEXES_TREE)?;
        tracing::debug!(
            temporary = config.temporary,
            path = %config.path.display(),
            "document store opened"
        );
        Ok(Self { db, meta })
    }

    /// Open a temporary database, removed on drop.
    pub fn temporary() -> Result<Self> {
        Self::open(&StoreConfig::temporary())
    }

    /// Get a handle to a collection, creating it if needed.
    ///
    /// The handle snapshots the collection's index declarations; open a new
    /// handle after indexes are created elsewhere.
    pub fn collection(&self, name: &str) -> Result<Collection> {
        let docs = self.db.open_tree(docs_tree_name(name))?;
        let mut indexes = Vec::new();
        for spec in self.index_specs(name)? {
            let tree = self.db.open_tree(index_tree_name(name, &spec.name))?;
            indexes.push((spec, tree));
        }
        Ok(Collection::new(name.to_string(), self.clone(), docs, indexes))
    }

    /// Drop a collection together with its indexes.
    ///
    /// Returns false if the collection did not exist.
    pub fn drop_collection(&self, name: &str) -> Result<bool> {
        for spec in self.index_specs(name)? {
            self.db.drop_tree(index_tree_name(name, &spec.name))?;
            self.meta.remove(meta_key(name, &spec.name))?;
        }
        let existed = self.db.drop_tree(docs_tree_name(name))?;
        Ok(existed)
    }

    /// Flush dirty pages to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Generate a monotonic identifier.
    pub(crate) fn generate_id(&self) -> Result<u64> {
        Ok(self.db.generate_id()?)
    }

    /// Check that the underlying store answers.
    pub fn ping(&self) -> Result<()> {
        self.db.size_on_disk()?;
        Ok(())
    }

    pub(crate) fn index_specs(&self, collection: &str) -> Result<Vec<IndexSpec>> {
        let mut specs = Vec::new();
        for entry in self.meta.scan_prefix(meta_prefix(collection)) {
            let (_, value) = entry?;
            specs.push(serde_json::from_slice(&value)?);
        }
        Ok(specs)
    }

    pub(crate) fn open_index_tree(&self, collection: &str, spec: &IndexSpec) -> Result<Tree> {
        Ok(self.db.open_tree(index_tree_name(collection, &spec.name))?)
    }

    pub(crate) fn store_index_spec(&self, collection: &str, spec: &IndexSpec) -> Result<()> {
        self.meta
            .insert(meta_key(collection, &spec.name), serde_json::to_vec(spec)?)?;
        Ok(())
    }
}

fn docs_tree_name(collection: &str) -> String {
    format!("{}{}", DOCS_TREE_PREFIX, collection)
}

fn index_tree_name(collection: &str, index: &str) -> String {
    format!("{}{}:{}", INDEX_TREE_PREFIX, collection, index)
}

fn meta_prefix(collection: &str) -> Vec<u8> {
    let mut key = collection.as_bytes().to_vec();
    key.push(0x00);
    key
}

fn meta_key(collection: &str, index: &str) -> Vec<u8> {
    let mut key = meta_prefix(collection);
    key.extend_from_slice(index.as_bytes());
    key
}
