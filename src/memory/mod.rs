//! 记忆层：对话轮次存储、键值持久化、保存的产物

pub mod artifacts;
pub mod conversation;
pub mod persistence;

pub use artifacts::{Artifact, SavedArtifacts, DEFAULT_ARTIFACTS_KEY};
pub use conversation::{Message, Role, Turn, TurnStore, DEFAULT_RETENTION_EXCHANGES};
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore};
