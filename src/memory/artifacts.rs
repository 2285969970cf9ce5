//! 保存的产物（如生成的菜谱）
//!
//! 以 JSON 数组形式存放在 KeyValueStore 的单个键下，最新保存的排在最前。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::memory::KeyValueStore;

/// 默认存储键
pub const DEFAULT_ARTIFACTS_KEY: &str = "saved_artifacts";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// 产物集合：save / list / get / remove
#[derive(Clone)]
pub struct SavedArtifacts {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SavedArtifacts {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, DEFAULT_ARTIFACTS_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn save(&self, title: impl Into<String>, content: impl Into<String>) -> anyhow::Result<Artifact> {
        let artifact = Artifact {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            created_at: Utc::now(),
        };
        let mut all = self.list()?;
        all.insert(0, artifact.clone());
        self.write(&all)?;
        tracing::info!(id = %artifact.id, title = %artifact.title, "Saved artifact");
        Ok(artifact)
    }

    pub fn list(&self) -> anyhow::Result<Vec<Artifact>> {
        match self.store.get(&self.key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get(&self, id: Uuid) -> anyhow::Result<Option<Artifact>> {
        Ok(self.list()?.into_iter().find(|a| a.id == id))
    }

    /// 返回是否确实删除了一条
    pub fn remove(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut all = self.list()?;
        let before = all.len();
        all.retain(|a| a.id != id);
        if all.len() == before {
            return Ok(false);
        }
        self.write(&all)?;
        Ok(true)
    }

    fn write(&self, all: &[Artifact]) -> anyhow::Result<()> {
        self.store.set(&self.key, &serde_json::to_string(all)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_save_list_newest_first() {
        let artifacts = SavedArtifacts::new(Arc::new(MemoryStore::new()));
        let first = artifacts.save("Pancakes", "flour, eggs, milk").unwrap();
        let second = artifacts.save("Omelette", "eggs, cheese").unwrap();

        let listed = artifacts.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(artifacts.get(first.id).unwrap(), Some(first));
    }

    #[test]
    fn test_remove_artifact() {
        let artifacts = SavedArtifacts::new(Arc::new(MemoryStore::new()));
        let saved = artifacts.save("Soup", "water").unwrap();

        assert!(artifacts.remove(saved.id).unwrap());
        assert!(!artifacts.remove(saved.id).unwrap());
        assert!(artifacts.list().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_payload_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.set(DEFAULT_ARTIFACTS_KEY, "{broken").unwrap();
        let artifacts = SavedArtifacts::new(store);

        assert!(artifacts.list().is_err());
    }
}
