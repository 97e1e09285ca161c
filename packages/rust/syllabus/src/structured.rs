//! Decoding of the model-generated JSON outline into a [`SyllabusTree`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use notesgen_shared::{NotesError, Result, SyllabusTree, TopicNode};

/// Characters of the raw response kept on a decode failure.
const MAX_RAW_EXCERPT_CHARS: usize = 2_000;

/// Matches a fenced block, with or without a `json` tag.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence regex"));

#[derive(Debug, Deserialize)]
struct RawSyllabus {
    topic: String,
    #[serde(default)]
    subtopics: Option<Vec<RawTopic>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTopic {
    topic_name: String,
    #[serde(default)]
    subtopics: Option<Vec<RawTopic>>,
}

impl RawTopic {
    fn into_node(self) -> Option<TopicNode> {
        let name = self.topic_name.trim();
        if name.is_empty() {
            return None;
        }
        Some(TopicNode::new(name, convert(self.subtopics)))
    }
}

fn convert(topics: Option<Vec<RawTopic>>) -> Vec<TopicNode> {
    topics
        .unwrap_or_default()
        .into_iter()
        .filter_map(RawTopic::into_node)
        .collect()
}

/// Decode a generated outline. Any `result` the model filled in is discarded.
pub(crate) fn decode_tree(raw: &str) -> Result<SyllabusTree> {
    let json = extract_object(raw).ok_or_else(|| {
        NotesError::malformed("response contains no JSON object", excerpt(raw))
    })?;

    let parsed: RawSyllabus = serde_json::from_str(json)
        .map_err(|e| NotesError::malformed(e.to_string(), excerpt(raw)))?;

    let topic = parsed.topic.trim();
    if topic.is_empty() {
        return Err(NotesError::parse("generated outline has an empty topic"));
    }

    Ok(SyllabusTree::new(topic, convert(parsed.subtopics)))
}

/// Locate the outermost `{...}` in a response, looking inside a code fence first.
fn extract_object(raw: &str) -> Option<&str> {
    let body = FENCE_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str());

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(MAX_RAW_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTLINE: &str = r#"{
        "topic": "Graph Theory",
        "subtopics": [
            { "topicName": "Basics", "result": "" },
            {
                "topicName": "Traversal",
                "subtopics": [
                    { "topicName": "BFS", "result": "already written?" },
                    { "topicName": "DFS", "result": "" }
                ]
            }
        ]
    }"#;

    #[test]
    fn decodes_nested_outline() {
        let tree = decode_tree(OUTLINE).unwrap();
        assert_eq!(tree.root_topic, "Graph Theory");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[1].name, "Traversal");
        assert_eq!(tree.children[1].children[1].name, "DFS");
    }

    #[test]
    fn generated_results_are_reset() {
        let tree = decode_tree(OUTLINE).unwrap();
        assert_eq!(tree.children[1].children[0].result, "");
        assert_eq!(tree.progress().resolved, 0);
    }

    #[test]
    fn tolerates_fences_and_prose() {
        let raw = format!("Here is the outline you asked for:\n```json\n{OUTLINE}\n```\nEnjoy!");
        let tree = decode_tree(&raw).unwrap();
        assert_eq!(tree.root_topic, "Graph Theory");
    }

    #[test]
    fn null_subtopics_and_blank_names() {
        let raw = r#"{"topic":"T","subtopics":[{"topicName":"A","subtopics":null},{"topicName":"  "}]}"#;
        let tree = decode_tree(raw).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = decode_tree("{ \"topic\": \"T\", subtopics: [ }").unwrap_err();
        assert!(matches!(err, NotesError::MalformedGenerationOutput { .. }));

        let err = decode_tree("I cannot help with that.").unwrap_err();
        match err {
            NotesError::MalformedGenerationOutput { raw, .. } => {
                assert_eq!(raw, "I cannot help with that.")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_topic_name_is_malformed() {
        let err = decode_tree(r#"{"topic":"T","subtopics":[{"name":"A"}]}"#).unwrap_err();
        assert!(matches!(err, NotesError::MalformedGenerationOutput { .. }));
    }

    #[test]
    fn blank_topic_is_a_parse_error() {
        let err = decode_tree(r#"{"topic":"  ","subtopics":[]}"#).unwrap_err();
        assert!(matches!(err, NotesError::Parse { .. }));
    }
}
