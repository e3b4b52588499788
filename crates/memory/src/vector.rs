//! On-disk COLD-tier vector store.
//!
//! One JSON-lines file per table under the store directory. The whole table
//! set is loaded into memory at open; inserts append to both the index and
//! the file. Search is cosine distance over the in-memory index.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use maestro_core::{
    error::{Error, Result},
    traits::VectorStore,
    types::{MemoryRecord, ScoredRecord},
};

/// File-backed vector store with an in-memory cosine index.
pub struct JsonlVectorStore {
    dir: PathBuf,
    tables: RwLock<HashMap<String, Vec<MemoryRecord>>>,
}

impl JsonlVectorStore {
    /// Open (or create) a store rooted at `dir`, loading any existing tables.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::memory(format!("create vector store dir failed: {}", e)))?;

        let mut tables = HashMap::new();
        for entry in std::fs::read_dir(&dir)
            .map_err(|e| Error::memory(format!("read vector store dir failed: {}", e)))?
        {
            let path = entry
                .map_err(|e| Error::memory(format!("read vector store entry failed: {}", e)))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(table) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            tables.insert(table.to_string(), load_table(&path)?);
        }

        Ok(Self {
            dir,
            tables: RwLock::new(tables),
        })
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", table))
    }
}

fn load_table(path: &Path) -> Result<Vec<MemoryRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::memory(format!("read vector table failed: {}", e)))?;
    let mut records = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<MemoryRecord>(line) {
            Ok(record) => records.push(record),
            // A torn trailing line is dropped rather than poisoning the table.
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping bad record"),
        }
    }
    Ok(records)
}

/// Cosine distance: 0.0 for identical directions, 2.0 for opposite.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::MAX;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return f32::MAX;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for JsonlVectorStore {
    async fn insert(&self, table: &str, record: MemoryRecord) -> Result<()> {
        let line = serde_json::to_string(&record)?;

        let mut tables = self.tables.write().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_path(table))
            .map_err(|e| Error::memory(format!("open vector table failed: {}", e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| Error::memory(format!("append vector record failed: {}", e)))?;

        tables.entry(table.to_string()).or_default().push(record);
        Ok(())
    }

    async fn search(&self, table: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>> {
        let tables = self.tables.read().await;
        let Some(records) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredRecord> = records
            .iter()
            .map(|r| ScoredRecord {
                distance: cosine_distance(vector, &r.vector),
                record: r.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }
}
