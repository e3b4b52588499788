//! Integration tests for layered skill discovery from on-disk trees.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use maestro_core::error::Result;
use maestro_skills::{RuntimeTable, SkillRegistry, SkillRuntime};

struct TaggedRuntime(&'static str);

#[async_trait]
impl SkillRuntime for TaggedRuntime {
    async fn execute(&self, _params: Value) -> Result<Value> {
        Ok(json!({"ran": self.0}))
    }
}

fn write_manifest_dir(root: &Path, dir_name: &str, name: &str, description: &str) {
    let dir = root.join(dir_name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("SKILL.md"),
        format!(
            "---\nname: {}\ndescription: {}\ncategory: filesystem\ntags: [files]\n\
             parameters:\n  path:\n    type: str\n    required: true\n---\n\n\
             Use this skill for file work.\n",
            name, description
        ),
    )
    .unwrap();
}

fn write_single_file(root: &Path, file_stem: &str, name: &str) {
    std::fs::write(
        root.join(format!("{}.yaml", file_stem)),
        format!("name: {}\ndescription: single-file {}\ncategory: memory\n", name, name),
    )
    .unwrap();
}

#[test]
fn test_layered_loading_and_prompt_context() {
    let core = tempfile::tempdir().unwrap();
    let agent = tempfile::tempdir().unwrap();

    write_manifest_dir(core.path(), "file-operations", "file-operations", "core file skill");
    write_single_file(core.path(), "save_fact", "save_fact");
    write_manifest_dir(agent.path(), "db-upsert", "db-upsert", "agent database skill");

    let mut registry = SkillRegistry::new("finn");
    registry
        .initialize(core.path(), Some(agent.path()), &RuntimeTable::new())
        .unwrap();

    assert!(registry.has("file-operations"));
    assert!(registry.has("save_fact"));
    assert!(registry.has("db-upsert"));
    assert_eq!(registry.by_agent("core").len(), 2);
    assert_eq!(registry.by_agent("finn").len(), 1);
    assert_eq!(registry.by_category("filesystem").len(), 2);

    let skill = registry.get("file-operations").unwrap();
    assert!(skill.is_core);
    assert!(skill
        .prompt_instructions
        .as_deref()
        .unwrap()
        .contains("file work"));

    let context = registry.prompt_context(None);
    assert!(context.contains("db-upsert(path*)"));
    assert!(context.contains("(* = required parameter)"));
}

#[tokio::test]
async fn test_agent_override_wins_and_keeps_core_visible() {
    let core = tempfile::tempdir().unwrap();
    let agent = tempfile::tempdir().unwrap();

    write_manifest_dir(core.path(), "file-operations", "file-operations", "core version");
    write_manifest_dir(agent.path(), "file-operations", "file-operations", "agent version");

    let mut runtimes = RuntimeTable::new();
    runtimes.insert("file-operations".into(), Arc::new(TaggedRuntime("hook")));

    let mut registry = SkillRegistry::new("finn");
    registry
        .initialize(core.path(), Some(agent.path()), &runtimes)
        .unwrap();

    let skill = registry.get("file-operations").unwrap();
    assert!(skill.overrides_core);
    assert_eq!(skill.description, "agent version");
    assert_eq!(registry.get_core("file-operations").unwrap().description, "core version");

    let out = registry
        .execute("file-operations", json!({"path": "x"}))
        .await
        .unwrap();
    assert_eq!(out["ran"], "hook");
}

#[test]
fn test_core_registry_skips_agent_layer() {
    let core = tempfile::tempdir().unwrap();
    let agent = tempfile::tempdir().unwrap();

    write_manifest_dir(core.path(), "file-operations", "file-operations", "core");
    write_manifest_dir(agent.path(), "extra", "extra", "agent only");

    let mut registry = SkillRegistry::new("core");
    registry
        .initialize(core.path(), Some(agent.path()), &RuntimeTable::new())
        .unwrap();

    assert!(registry.has("file-operations"));
    assert!(!registry.has("extra"));
}

#[test]
fn test_dunder_and_duplicate_single_files_are_skipped() {
    let core = tempfile::tempdir().unwrap();

    write_manifest_dir(core.path(), "file-operations", "file-operations", "manifest dir");
    // Duplicates the manifest-dir skill: skipped.
    write_single_file(core.path(), "file-operations", "file-operations");
    // Private helper naming convention: skipped.
    write_single_file(core.path(), "__helpers", "__helpers");
    write_single_file(core.path(), "save_fact", "save_fact");

    let mut registry = SkillRegistry::new("finn");
    registry
        .initialize(core.path(), None, &RuntimeTable::new())
        .unwrap();

    assert_eq!(registry.stats().total, 2);
    assert_eq!(registry.get("file-operations").unwrap().description, "manifest dir");
    assert!(!registry.has("__helpers"));
}

#[test]
fn test_nested_directories_are_scanned() {
    let core = tempfile::tempdir().unwrap();
    let nested = core.path().join("memory");
    std::fs::create_dir_all(&nested).unwrap();
    write_single_file(&nested, "recall_memory", "recall_memory");

    let mut registry = SkillRegistry::new("finn");
    registry
        .initialize(core.path(), None, &RuntimeTable::new())
        .unwrap();

    assert!(registry.has("recall_memory"));
}

#[test]
fn test_broken_manifest_is_skipped_not_fatal() {
    let core = tempfile::tempdir().unwrap();
    let dir = core.path().join("broken");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("SKILL.md"), "no front matter here").unwrap();
    write_manifest_dir(core.path(), "good", "good", "still loads");

    let mut registry = SkillRegistry::new("finn");
    registry
        .initialize(core.path(), None, &RuntimeTable::new())
        .unwrap();

    assert_eq!(registry.stats().total, 1);
    assert!(registry.has("good"));
}
