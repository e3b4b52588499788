//! Built-in runtimes for the shipped core skills.
//!
//! The skill *metadata* lives on disk (manifest files under the core skills
//! root); these are the compiled-in hooks the registry attaches by name.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use maestro_core::{
    error::{Error, Result},
    types::{EntryType, FactCategory},
};
use maestro_memory::MemoryManager;

use crate::registry::{RuntimeTable, SkillRuntime};

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::skill_execution(format!("parameter '{}' must be a string", name)))
}

// =============================================================================
// file-operations
// =============================================================================

/// Write, read, append, and delete files.
pub struct FileOperationsRuntime;

#[async_trait]
impl SkillRuntime for FileOperationsRuntime {
    async fn execute(&self, params: Value) -> Result<Value> {
        let operation = str_param(&params, "operation")?;
        let path = str_param(&params, "path")?;

        match operation {
            "write" | "append" => {
                let content = params
                    .get("content")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                if let Some(parent) = Path::new(path).parent() {
                    std::fs::create_dir_all(parent)?;
                }
                if operation == "write" {
                    std::fs::write(path, content)?;
                } else {
                    use std::io::Write;
                    let mut file = std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)?;
                    file.write_all(content.as_bytes())?;
                }
                Ok(json!({"ok": true, "path": path, "bytes": content.len()}))
            }
            "read" => {
                let content = std::fs::read_to_string(path)?;
                Ok(json!({"ok": true, "path": path, "content": content}))
            }
            "delete" => {
                std::fs::remove_file(path)?;
                Ok(json!({"ok": true, "path": path}))
            }
            other => Err(Error::skill_execution(format!(
                "unknown operation '{}'; expected write, read, append or delete",
                other
            ))),
        }
    }
}

// =============================================================================
// Memory skills
// =============================================================================

/// Upsert a user fact.
pub struct SaveFactRuntime {
    memory: Arc<MemoryManager>,
}

#[async_trait]
impl SkillRuntime for SaveFactRuntime {
    async fn execute(&self, params: Value) -> Result<Value> {
        let key = str_param(&params, "key")?;
        let value = str_param(&params, "value")?;
        let category = match params.get("category").and_then(|v| v.as_str()) {
            Some("preference") => FactCategory::Preference,
            Some("personal") => FactCategory::Personal,
            Some("config") => FactCategory::Config,
            _ => FactCategory::General,
        };
        self.memory.save_fact(key, value, category)?;
        Ok(json!(true))
    }
}

/// Retrieve a user fact by key.
pub struct GetFactRuntime {
    memory: Arc<MemoryManager>,
}

#[async_trait]
impl SkillRuntime for GetFactRuntime {
    async fn execute(&self, params: Value) -> Result<Value> {
        let key = str_param(&params, "key")?;
        Ok(match self.memory.get_fact(key)? {
            Some(value) => Value::String(value),
            None => Value::Null,
        })
    }
}

/// Semantic search over COLD memory.
pub struct RecallMemoryRuntime {
    memory: Arc<MemoryManager>,
}

#[async_trait]
impl SkillRuntime for RecallMemoryRuntime {
    async fn execute(&self, params: Value) -> Result<Value> {
        let query = str_param(&params, "query")?;
        let n = params
            .get("n_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(3) as usize;
        let memories = self.memory.recall_memory(query, n).await;
        Ok(serde_json::to_value(memories)?)
    }
}

/// Append an entry to the activity log.
pub struct LogActivityRuntime {
    memory: Arc<MemoryManager>,
}

#[async_trait]
impl SkillRuntime for LogActivityRuntime {
    async fn execute(&self, params: Value) -> Result<Value> {
        let entry_type = EntryType::from_label(str_param(&params, "entry_type")?);
        let content = str_param(&params, "content")?;
        self.memory
            .append_log(entry_type, content, params.get("metadata"))?;
        Ok(json!(true))
    }
}

/// Overwrite the current status (HOT tier).
pub struct UpdateStatusRuntime {
    memory: Arc<MemoryManager>,
}

#[async_trait]
impl SkillRuntime for UpdateStatusRuntime {
    async fn execute(&self, params: Value) -> Result<Value> {
        let status = str_param(&params, "status")?;
        let next_steps: Option<Vec<String>> = params.get("next_steps").and_then(|v| {
            v.as_array().map(|steps| {
                steps
                    .iter()
                    .filter_map(|s| s.as_str().map(String::from))
                    .collect()
            })
        });
        self.memory.update_now(status, next_steps.as_deref())?;
        Ok(json!(true))
    }
}

/// The full runtime table for the shipped core skills, bound to one agent's
/// memory manager.
pub fn core_runtimes(memory: Arc<MemoryManager>) -> RuntimeTable {
    let mut table: RuntimeTable = RuntimeTable::new();
    table.insert("file-operations".into(), Arc::new(FileOperationsRuntime));
    table.insert(
        "save_fact".into(),
        Arc::new(SaveFactRuntime {
            memory: memory.clone(),
        }),
    );
    table.insert(
        "get_fact".into(),
        Arc::new(GetFactRuntime {
            memory: memory.clone(),
        }),
    );
    table.insert(
        "recall_memory".into(),
        Arc::new(RecallMemoryRuntime {
            memory: memory.clone(),
        }),
    );
    table.insert(
        "log_activity".into(),
        Arc::new(LogActivityRuntime {
            memory: memory.clone(),
        }),
    );
    table.insert("update_status".into(), Arc::new(UpdateStatusRuntime { memory }));
    table
}
