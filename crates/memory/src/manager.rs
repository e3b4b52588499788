//! Per-agent three-tier memory.
//!
//! HOT is `NOW.md` (current objective), WARM is `LOG.md` (append-only
//! activity), COLD is the vector store (semantic recall). Structured facts
//! and WARM bookkeeping live in `memory.db`.
//!
//! Every file write here is a single write-then-close operation, so an
//! externally cancelled run leaves both markdown files parseable.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use maestro_core::{
    error::{Error, Result},
    traits::{LlmClient, VectorStore},
    types::{EntryType, FactCategory, MemoryRecord, RecalledMemory, UserFact},
    RuntimeConfig,
};

use crate::vector::JsonlVectorStore;

const ENTRY_SEPARATOR: &str = "\n---\n";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_facts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL,
    category TEXT DEFAULT 'general',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS log_metadata (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    entry_type TEXT NOT NULL,
    content_hash TEXT,
    compacted BOOLEAN DEFAULT 0,
    line_number INTEGER,
    token_count INTEGER
);

CREATE TABLE IF NOT EXISTS compaction_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    compacted_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    entries_count INTEGER NOT NULL,
    summary TEXT,
    archive_id TEXT,
    original_size_kb REAL,
    new_size_kb REAL
);
"#;

/// Central memory orchestration for one agent. Each agent owns exactly one
/// manager; managers for distinct agents share nothing on disk.
pub struct MemoryManager {
    agent_name: String,
    now_file: PathBuf,
    log_file: PathBuf,
    db: Mutex<Connection>,
    cold: Option<Arc<dyn VectorStore>>,
    llm: Arc<dyn LlmClient>,
    embedding_model: String,
    embedding_dim: usize,
    log_max_size_kb: u64,
    log_max_entries: u64,
}

impl MemoryManager {
    /// Open (and lazily initialize) the memory of `agent_name` under
    /// `config.agents_root`. COLD-tier failures downgrade to a warning; the
    /// manager still works without semantic recall.
    pub fn new(agent_name: &str, config: &RuntimeConfig, llm: Arc<dyn LlmClient>) -> Result<Self> {
        let memory_dir = config.memory_dir(agent_name);
        let cold: Option<Arc<dyn VectorStore>> =
            match JsonlVectorStore::open(memory_dir.join("vectors")) {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    tracing::warn!(agent = agent_name, error = %e, "cold memory unavailable");
                    None
                }
            };
        Self::with_cold(agent_name, config, llm, cold)
    }

    /// As [`MemoryManager::new`], with an explicit COLD backend (or none).
    pub fn with_cold(
        agent_name: &str,
        config: &RuntimeConfig,
        llm: Arc<dyn LlmClient>,
        cold: Option<Arc<dyn VectorStore>>,
    ) -> Result<Self> {
        let memory_dir = config.memory_dir(agent_name);
        std::fs::create_dir_all(&memory_dir)
            .map_err(|e| Error::memory(format!("create memory dir failed: {}", e)))?;

        let now_file = memory_dir.join("NOW.md");
        let log_file = memory_dir.join("LOG.md");
        let db_file = memory_dir.join("memory.db");

        if !now_file.exists() {
            std::fs::write(
                &now_file,
                "# Current Status\n\nStatus: Idle\n\n## Next Steps\n- Awaiting user input\n",
            )
            .map_err(|e| Error::memory(format!("seed NOW.md failed: {}", e)))?;
        }

        if !log_file.exists() {
            std::fs::write(
                &log_file,
                format!(
                    "# Activity Log - {}\n\nStarted: {}\n\n---\n\n",
                    agent_name,
                    timestamp()
                ),
            )
            .map_err(|e| Error::memory(format!("seed LOG.md failed: {}", e)))?;
        }

        let conn = Connection::open(&db_file)
            .map_err(|e| Error::memory(format!("open memory.db failed: {}", e)))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::memory(format!("init memory.db schema failed: {}", e)))?;

        Ok(Self {
            agent_name: agent_name.to_string(),
            now_file,
            log_file,
            db: Mutex::new(conn),
            cold,
            llm,
            embedding_model: config.models.embedding.clone(),
            embedding_dim: config.embedding_dim,
            log_max_size_kb: config.log_max_size_kb,
            log_max_entries: config.log_max_entries,
        })
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// The COLD-tier table for this agent.
    fn cold_table(&self) -> String {
        format!("{}_memory", self.agent_name)
    }

    // ========================================================================
    // HOT memory (NOW.md)
    // ========================================================================

    /// Read the current status file verbatim.
    pub fn read_now(&self) -> String {
        std::fs::read_to_string(&self.now_file).unwrap_or_else(|_| "Status: Idle".to_string())
    }

    /// Overwrite NOW.md with a new status and optional next steps, and log
    /// the change.
    pub fn update_now(&self, status: &str, next_steps: Option<&[String]>) -> Result<()> {
        let mut content = String::from("# Current Status\n\n");
        content.push_str(&format!("Status: {}\n\n", status));
        content.push_str(&format!("Updated: {}\n\n", timestamp()));

        if let Some(steps) = next_steps {
            if !steps.is_empty() {
                content.push_str("## Next Steps\n");
                for step in steps {
                    content.push_str(&format!("- {}\n", step));
                }
            }
        }

        std::fs::write(&self.now_file, content)
            .map_err(|e| Error::memory(format!("write NOW.md failed: {}", e)))?;

        if let Err(e) = self.append_log(
            EntryType::System,
            &format!("Status updated: {}", status),
            None,
        ) {
            tracing::warn!(agent = %self.agent_name, error = %e, "status log entry lost");
        }
        Ok(())
    }

    // ========================================================================
    // WARM memory (LOG.md)
    // ========================================================================

    /// Read the activity log, optionally only the last `last_n` entries.
    pub fn read_log(&self, last_n: Option<usize>) -> String {
        let content = std::fs::read_to_string(&self.log_file).unwrap_or_default();
        match last_n {
            Some(n) => {
                let entries: Vec<&str> = content.split(ENTRY_SEPARATOR).collect();
                let start = entries.len().saturating_sub(n);
                entries[start..].join(ENTRY_SEPARATOR)
            }
            None => content,
        }
    }

    /// Append a timestamped entry block to LOG.md and record its metadata.
    pub fn append_log(
        &self,
        entry_type: EntryType,
        content: &str,
        metadata: Option<&Value>,
    ) -> Result<()> {
        let mut entry = format!("\n## [{}] {}\n\n{}\n", entry_type, timestamp(), content);
        if let Some(meta) = metadata {
            entry.push_str(&format!("\nMetadata: {}\n", serde_json::to_string(meta)?));
        }
        entry.push_str(ENTRY_SEPARATOR);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .map_err(|e| Error::memory(format!("open LOG.md failed: {}", e)))?;
        file.write_all(entry.as_bytes())
            .map_err(|e| Error::memory(format!("append LOG.md failed: {}", e)))?;

        let hash = content_hash(content);
        let token_count = content.split_whitespace().count() as i64;

        let conn = self.db.lock().unwrap();
        conn.execute(
            "INSERT INTO log_metadata (entry_type, content_hash, token_count) VALUES (?1, ?2, ?3)",
            params![entry_type.as_str(), hash, token_count],
        )
        .map_err(|e| Error::memory(format!("insert log_metadata failed: {}", e)))?;
        drop(conn);

        if self.compaction_needed()? {
            tracing::info!(agent = %self.agent_name, "activity log eligible for compaction");
        }
        Ok(())
    }

    /// Whether the WARM tier has crossed either compaction threshold.
    pub fn compaction_needed(&self) -> Result<bool> {
        let size_kb = std::fs::metadata(&self.log_file)
            .map(|m| m.len() / 1024)
            .unwrap_or(0);
        if size_kb > self.log_max_size_kb {
            return Ok(true);
        }

        Ok(self.uncompacted_entries()? > self.log_max_entries)
    }

    fn uncompacted_entries(&self) -> Result<u64> {
        let conn = self.db.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM log_metadata WHERE compacted = 0",
            [],
            |row| row.get::<_, u64>(0),
        )
        .map_err(|e| Error::memory(format!("count log_metadata failed: {}", e)))
    }

    /// Fold the WARM tier into COLD: archive the full log, mark entries
    /// compacted, record the compaction, and rewrite LOG.md around the
    /// caller-supplied summary.
    pub async fn compact_log(&self, summary: &str) -> Result<()> {
        let original_content = self.read_log(None);
        let original_size_kb = std::fs::metadata(&self.log_file)
            .map(|m| m.len() as f64 / 1024.0)
            .unwrap_or(0.0);

        let archive_id = self
            .store_memory(
                &original_content,
                Some(json!({
                    "type": "archived_log",
                    "archived_at": timestamp(),
                    "summary": summary,
                })),
            )
            .await;

        let entries_count = self.uncompacted_entries()?;

        let new_content = format!(
            "# Activity Log - {}\n\nCompacted: {}\n\n## Summary of Previous Activity\n\n{}\n\n---\n\n",
            self.agent_name,
            timestamp(),
            summary
        );
        std::fs::write(&self.log_file, &new_content)
            .map_err(|e| Error::memory(format!("rewrite LOG.md failed: {}", e)))?;
        let new_size_kb = new_content.len() as f64 / 1024.0;

        let conn = self.db.lock().unwrap();
        conn.execute("UPDATE log_metadata SET compacted = 1 WHERE compacted = 0", [])
            .map_err(|e| Error::memory(format!("mark compacted failed: {}", e)))?;
        conn.execute(
            "INSERT INTO compaction_history \
             (entries_count, summary, archive_id, original_size_kb, new_size_kb) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entries_count,
                summary,
                archive_id,
                original_size_kb,
                new_size_kb
            ],
        )
        .map_err(|e| Error::memory(format!("record compaction failed: {}", e)))?;

        tracing::info!(
            agent = %self.agent_name,
            entries = entries_count,
            from_kb = original_size_kb,
            to_kb = new_size_kb,
            "activity log compacted"
        );
        Ok(())
    }

    // ========================================================================
    // COLD memory (vector store)
    // ========================================================================

    /// Embed `content` and store it in the agent's COLD table. Returns the
    /// record id, or `None` when the COLD tier is degraded — never an error.
    pub async fn store_memory(&self, content: &str, metadata: Option<Value>) -> Option<String> {
        let Some(cold) = &self.cold else {
            tracing::warn!(agent = %self.agent_name, "cold memory unavailable; store skipped");
            return None;
        };

        let vector = match self.llm.embed(&self.embedding_model, content).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(agent = %self.agent_name, error = %e, "embedding failed; store skipped");
                return None;
            }
        };
        if vector.len() != self.embedding_dim {
            tracing::warn!(
                agent = %self.agent_name,
                got = vector.len(),
                expected = self.embedding_dim,
                "embedding dimension mismatch; store skipped"
            );
            return None;
        }

        let mut meta = match metadata {
            Some(Value::Object(map)) => map,
            Some(other) => json!({ "value": other }).as_object().cloned().unwrap_or_default(),
            None => Default::default(),
        };
        meta.insert("agent".into(), Value::String(self.agent_name.clone()));
        meta.insert("stored_at".into(), Value::String(timestamp()));

        let id = format!(
            "memory_{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let record = MemoryRecord {
            id: id.clone(),
            vector,
            text: content.to_string(),
            metadata: Value::Object(meta).to_string(),
        };

        match cold.insert(&self.cold_table(), record).await {
            Ok(()) => Some(id),
            Err(e) => {
                tracing::warn!(agent = %self.agent_name, error = %e, "cold store failed");
                None
            }
        }
    }

    /// Search COLD memory for the `n` entries nearest to `query`. Degraded
    /// tiers yield an empty list, never an error.
    pub async fn recall_memory(&self, query: &str, n: usize) -> Vec<RecalledMemory> {
        let Some(cold) = &self.cold else {
            tracing::warn!(agent = %self.agent_name, "cold memory unavailable; recall skipped");
            return Vec::new();
        };

        let vector = match self.llm.embed(&self.embedding_model, query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(agent = %self.agent_name, error = %e, "query embedding failed");
                return Vec::new();
            }
        };

        match cold.search(&self.cold_table(), &vector, n).await {
            Ok(results) => results
                .into_iter()
                .map(|scored| RecalledMemory {
                    content: scored.record.text,
                    metadata: serde_json::from_str(&scored.record.metadata)
                        .unwrap_or(Value::Object(Default::default())),
                    distance: scored.distance,
                })
                .collect(),
            Err(e) => {
                tracing::warn!(agent = %self.agent_name, error = %e, "cold recall failed");
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Facts store (SQL)
    // ========================================================================

    /// Upsert a user fact, bumping `updated_at`, and log the save.
    pub fn save_fact(&self, key: &str, value: &str, category: FactCategory) -> Result<()> {
        {
            let conn = self.db.lock().unwrap();
            conn.execute(
                "INSERT INTO user_facts (key, value, category) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET \
                   value = excluded.value, \
                   category = excluded.category, \
                   updated_at = CURRENT_TIMESTAMP",
                params![key, value, category.as_str()],
            )
            .map_err(|e| Error::memory(format!("save fact failed: {}", e)))?;
        }

        if let Err(e) = self.append_log(
            EntryType::System,
            &format!(
                "Saved fact: {} = {} (category: {})",
                key,
                value,
                category.as_str()
            ),
            None,
        ) {
            tracing::warn!(agent = %self.agent_name, error = %e, "fact log entry lost");
        }
        Ok(())
    }

    /// Retrieve one fact by key.
    pub fn get_fact(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db.lock().unwrap();
        conn.query_row(
            "SELECT value FROM user_facts WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::memory(format!("get fact failed: {}", e)))
    }

    /// All facts as an ordered key → value map, optionally filtered by
    /// category.
    pub fn get_all_facts(&self, category: Option<FactCategory>) -> Result<BTreeMap<String, String>> {
        let conn = self.db.lock().unwrap();
        let mut facts = BTreeMap::new();

        let sql = match category {
            Some(_) => "SELECT key, value FROM user_facts WHERE category = ?1",
            None => "SELECT key, value FROM user_facts",
        };
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::memory(format!("prepare facts query failed: {}", e)))?;

        let mut rows = match category {
            Some(cat) => stmt.query(params![cat.as_str()]),
            None => stmt.query([]),
        }
        .map_err(|e| Error::memory(format!("query facts failed: {}", e)))?;

        while let Some(row) = rows
            .next()
            .map_err(|e| Error::memory(format!("scan fact row failed: {}", e)))?
        {
            let key: String = row
                .get(0)
                .map_err(|e| Error::memory(format!("read fact key failed: {}", e)))?;
            let value: String = row
                .get(1)
                .map_err(|e| Error::memory(format!("read fact value failed: {}", e)))?;
            facts.insert(key, value);
        }

        Ok(facts)
    }

    /// Full row for one fact, including category and timestamps.
    pub fn get_fact_details(&self, key: &str) -> Result<Option<UserFact>> {
        let conn = self.db.lock().unwrap();
        conn.query_row(
            "SELECT key, value, category, created_at, updated_at FROM user_facts WHERE key = ?1",
            params![key],
            |row| {
                Ok(UserFact {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    category: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(|e| Error::memory(format!("get fact details failed: {}", e)))
    }

    // ========================================================================
    // Context injection
    // ========================================================================

    /// The canonical memory payload injected into planner system prompts:
    /// current mental state, recent activity, and known facts.
    pub fn format_context_for_prompt(&self) -> String {
        let mut context = String::from("=== CURRENT MENTAL STATE (Do not ignore) ===\n");
        context.push_str("You are currently working on:\n");
        context.push_str(&self.read_now());
        context.push_str("\n\n=== RECENT ACTIVITY LOG ===\n");
        context.push_str(&self.read_log(Some(20)));
        context.push_str("\n\n");

        if let Ok(facts) = self.get_all_facts(None) {
            if !facts.is_empty() {
                context.push_str("=== KNOWN USER FACTS ===\n");
                context.push_str(
                    &serde_json::to_string_pretty(&facts).unwrap_or_else(|_| "{}".into()),
                );
                context.push_str("\n\n");
            }
        }

        context
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// First 16 hex characters of the SHA-256 of `content`.
fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_16_hex_chars() {
        let hash = content_hash("hello");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, content_hash("hello"));
        assert_ne!(hash, content_hash("other"));
    }
}
