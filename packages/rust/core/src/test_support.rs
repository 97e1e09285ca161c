//! Shared fixtures for engine and pipeline tests.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use notesgen_generation::GenerationClient;
use notesgen_shared::{NotesError, Result, SyllabusTree, TopicNode};
use notesgen_storage::Storage;

/// Deterministic client that records every prompt it receives.
///
/// Notes replies name the call number and topic, so every node gets distinct
/// text. Structure prompts receive an empty outline.
pub(crate) struct ScriptedClient {
    prompts: Mutex<Vec<String>>,
    fail_on: Option<usize>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Fails the `n`th call (1-based) with a transport-style error.
    pub(crate) fn failing_on(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            ..Self::new()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Breadcrumbs of the notes prompts, in call order.
    pub(crate) fn breadcrumbs(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| breadcrumb_of(p))
            .collect()
    }
}

fn breadcrumb_of(prompt: &str) -> Option<String> {
    let rest = prompt.split_once("Topic: \"")?.1;
    Some(rest.split_once('"')?.0.to_string())
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };

        if self.fail_on == Some(call) {
            return Err(NotesError::GenerationClient(
                "connection refused (scripted)".into(),
            ));
        }

        match breadcrumb_of(prompt) {
            Some(breadcrumb) => Ok(format!("Notes #{call} on {breadcrumb}")),
            None => Ok(r#"{"topic":"Unused","subtopics":[]}"#.into()),
        }
    }
}

pub(crate) async fn test_storage() -> Storage {
    let tmp = std::env::temp_dir().join(format!("notesgen_core_test_{}.db", Uuid::now_v7()));
    Storage::open(&tmp).await.expect("open test db")
}

/// `Introduction to Python` with Variables (int, float) and Loops.
pub(crate) fn python_tree() -> SyllabusTree {
    SyllabusTree::new(
        "Introduction to Python",
        vec![
            TopicNode::new(
                "Variables",
                vec![TopicNode::leaf("int"), TopicNode::leaf("float")],
            ),
            TopicNode::leaf("Loops"),
        ],
    )
}

/// Expected pre-order breadcrumbs, computed independently of the engine.
pub(crate) fn breadcrumbs_in_preorder(tree: &SyllabusTree) -> Vec<String> {
    fn visit(node: &TopicNode, prefix: &str, out: &mut Vec<String>) {
        let crumb = format!("{prefix} → {}", node.name);
        out.push(crumb.clone());
        for child in &node.children {
            visit(child, &crumb, out);
        }
    }

    let mut out = vec![tree.root_topic.clone()];
    for child in &tree.children {
        visit(child, &tree.root_topic, &mut out);
    }
    out
}
