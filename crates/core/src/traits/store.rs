//! COLD-tier vector store interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MemoryRecord, ScoredRecord};

/// Backend holding embedded memories, one table per agent.
///
/// Tables are created implicitly on first insert. Implementations must keep
/// distinct tables fully isolated from each other.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a record into `table`, creating the table if absent.
    async fn insert(&self, table: &str, record: MemoryRecord) -> Result<()>;

    /// Return the `limit` nearest records by vector distance. An absent
    /// table yields an empty list, not an error.
    async fn search(&self, table: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>>;
}
