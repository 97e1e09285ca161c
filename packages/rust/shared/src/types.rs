//! Topic tree model: syllabi, their nested topics, and stable node addressing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator used when joining a node path into a human-readable breadcrumb.
pub const BREADCRUMB_SEPARATOR: &str = " → ";

// ---------------------------------------------------------------------------
// TreeId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for syllabus tree identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(pub Uuid);

impl TreeId {
    /// Generate a new time-sortable tree identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The nil identifier, which never names a stored tree.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this identifier is unusable as an external handle.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for TreeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TreeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TreeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

// ---------------------------------------------------------------------------
// TopicNode
// ---------------------------------------------------------------------------

/// One topic or subtopic. An empty `result` means "not yet generated".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicNode {
    /// Topic name; not guaranteed unique among siblings.
    pub name: String,
    /// Generated notes, empty until the node is resolved.
    #[serde(default)]
    pub result: String,
    /// Nested subtopics, in syllabus order.
    #[serde(default)]
    pub children: Vec<TopicNode>,
}

impl TopicNode {
    /// A node with no children and no result.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// A node with the given children and no result.
    pub fn new(name: impl Into<String>, children: Vec<TopicNode>) -> Self {
        Self {
            name: name.into(),
            result: String::new(),
            children,
        }
    }

    /// Whether notes have been generated for this node.
    pub fn is_resolved(&self) -> bool {
        !self.result.is_empty()
    }

    fn count(&self, progress: &mut TreeProgress) {
        progress.total += 1;
        if self.is_resolved() {
            progress.resolved += 1;
        }
        for child in &self.children {
            child.count(progress);
        }
    }
}

// ---------------------------------------------------------------------------
// SyllabusTree
// ---------------------------------------------------------------------------

/// A syllabus: the root topic, its own overview notes, and first-level subtopics.
///
/// This is also the persisted document shape, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusTree {
    /// Assigned once at creation; the only external handle to the tree.
    pub id: TreeId,
    /// Main topic of the syllabus.
    pub root_topic: String,
    /// Overview notes for the root topic.
    #[serde(default)]
    pub result: String,
    /// First-level subtopics.
    #[serde(default)]
    pub children: Vec<TopicNode>,
}

impl SyllabusTree {
    /// Create an unresolved tree with a fresh identifier.
    pub fn new(root_topic: impl Into<String>, children: Vec<TopicNode>) -> Self {
        Self {
            id: TreeId::new(),
            root_topic: root_topic.into(),
            result: String::new(),
            children,
        }
    }

    /// Index positions of every node in pre-order. The root is the empty position.
    pub fn preorder_positions(&self) -> Vec<Vec<usize>> {
        fn walk(nodes: &[TopicNode], prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
            for (i, node) in nodes.iter().enumerate() {
                prefix.push(i);
                out.push(prefix.clone());
                walk(&node.children, prefix, out);
                prefix.pop();
            }
        }

        let mut out = vec![Vec::new()];
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }

    /// Resolve an index position into a name-and-index path from the root.
    pub fn node_path(&self, position: &[usize]) -> Option<NodePath> {
        let mut path = NodePath::root(&self.root_topic);
        let mut siblings = &self.children;
        for &index in position {
            let node = siblings.get(index)?;
            path = path.child(index, &node.name);
            siblings = &node.children;
        }
        Some(path)
    }

    /// The result at a position, if the position exists.
    pub fn result_at(&self, position: &[usize]) -> Option<&str> {
        let Some((&last, parents)) = position.split_last() else {
            return Some(&self.result);
        };
        let mut siblings = &self.children;
        for &index in parents {
            siblings = &siblings.get(index)?.children;
        }
        siblings.get(last).map(|n| n.result.as_str())
    }

    /// Mutable access to the result at a position.
    pub fn result_at_mut(&mut self, position: &[usize]) -> Option<&mut String> {
        let Some((&last, parents)) = position.split_last() else {
            return Some(&mut self.result);
        };
        let mut siblings = &mut self.children;
        for &index in parents {
            siblings = &mut siblings.get_mut(index)?.children;
        }
        siblings.get_mut(last).map(|n| &mut n.result)
    }

    /// Count resolved nodes (root included).
    pub fn progress(&self) -> TreeProgress {
        let mut progress = TreeProgress {
            resolved: usize::from(!self.result.is_empty()),
            total: 1,
        };
        for child in &self.children {
            child.count(&mut progress);
        }
        progress
    }
}

/// Resolved vs. total node counts for a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeProgress {
    pub resolved: usize,
    pub total: usize,
}

impl TreeProgress {
    /// Whether every node has notes.
    pub fn is_complete(&self) -> bool {
        self.resolved == self.total
    }
}

// ---------------------------------------------------------------------------
// NodePath
// ---------------------------------------------------------------------------

/// One step below the root: the sibling index and the name expected there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub index: usize,
    pub name: String,
}

/// Address of a single node: the root topic followed by one step per depth.
///
/// The index disambiguates same-named siblings; the name guards against the
/// tree having been reshaped since the path was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePath {
    pub root: String,
    pub steps: Vec<PathStep>,
}

impl NodePath {
    /// Path addressing the root itself.
    pub fn root(topic: impl Into<String>) -> Self {
        Self {
            root: topic.into(),
            steps: Vec::new(),
        }
    }

    /// Extend this path by one level.
    pub fn child(&self, index: usize, name: impl Into<String>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep {
            index,
            name: name.into(),
        });
        Self {
            root: self.root.clone(),
            steps,
        }
    }

    /// Depth below the root (0 for the root itself).
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// Names from root to target.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.root.as_str()).chain(self.steps.iter().map(|s| s.name.as_str()))
    }

    /// Root-to-node names joined for display and prompt context.
    pub fn breadcrumb(&self) -> String {
        self.names().collect::<Vec<_>>().join(BREADCRUMB_SEPARATOR)
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.breadcrumb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> SyllabusTree {
        SyllabusTree::new(
            "Python",
            vec![
                TopicNode::new(
                    "Variables",
                    vec![TopicNode::leaf("int"), TopicNode::leaf("float")],
                ),
                TopicNode::leaf("Loops"),
            ],
        )
    }

    #[test]
    fn tree_id_roundtrip() {
        let id = TreeId::new();
        let parsed: TreeId = id.to_string().parse().expect("parse TreeId");
        assert_eq!(id, parsed);
        assert!(!id.is_nil());
        assert!(TreeId::nil().is_nil());
    }

    #[test]
    fn preorder_visits_parent_before_children() {
        let tree = sample_tree();
        let positions = tree.preorder_positions();
        assert_eq!(
            positions,
            vec![vec![], vec![0], vec![0, 0], vec![0, 1], vec![1]]
        );
    }

    #[test]
    fn node_path_breadcrumb() {
        let tree = sample_tree();
        let path = tree.node_path(&[0, 1]).expect("path exists");
        assert_eq!(path.breadcrumb(), "Python → Variables → float");
        assert_eq!(path.depth(), 2);
        assert_eq!(path.steps[1].index, 1);

        assert_eq!(tree.node_path(&[]).unwrap().breadcrumb(), "Python");
        assert!(tree.node_path(&[5]).is_none());
    }

    #[test]
    fn result_access_by_position() {
        let mut tree = sample_tree();
        *tree.result_at_mut(&[0, 0]).unwrap() = "ints are whole numbers".into();
        *tree.result_at_mut(&[]).unwrap() = "overview".into();

        assert_eq!(tree.result_at(&[0, 0]), Some("ints are whole numbers"));
        assert_eq!(tree.result, "overview");
        assert_eq!(tree.result_at(&[1]), Some(""));
        assert!(tree.result_at_mut(&[0, 7]).is_none());
    }

    #[test]
    fn progress_counts_root() {
        let mut tree = sample_tree();
        assert_eq!(tree.progress(), TreeProgress { resolved: 0, total: 5 });

        tree.children[1].result = "loops".into();
        tree.result = "python".into();
        let progress = tree.progress();
        assert_eq!(progress.resolved, 2);
        assert!(!progress.is_complete());
    }

    #[test]
    fn tree_serialization_shape() {
        let tree = sample_tree();
        let json = serde_json::to_value(&tree).expect("serialize");
        assert_eq!(json["root_topic"], "Python");
        assert_eq!(json["children"][0]["name"], "Variables");
        assert_eq!(json["children"][0]["children"][1]["result"], "");

        let parsed: SyllabusTree = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, tree);
    }

    #[test]
    fn syllabus_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/syllabus.fixture.json")
            .expect("read fixture");
        let parsed: SyllabusTree =
            serde_json::from_str(&fixture).expect("deserialize fixture syllabus");
        assert_eq!(parsed.root_topic, "Introduction to Python");
        assert_eq!(parsed.children.len(), 2);
        assert_eq!(parsed.children[0].children.len(), 2);
        assert_eq!(parsed.progress(), TreeProgress { resolved: 2, total: 5 });
    }
}
