//! Delimiter-based syllabus parser.
//!
//! Input shape: `Parent: child, child. Leaf. Parent: child.`
//! - `.` separates clauses
//! - the first `:` in a clause separates a parent topic from its children
//! - `,` separates children
//!
//! Produces at most two levels below the root.

use notesgen_shared::{SyllabusTree, TopicNode};

/// Ends a clause.
const CLAUSE_DELIMITER: char = '.';
/// Separates a topic from its children.
const CHILDREN_DELIMITER: char = ':';
/// Separates sibling children.
const LIST_DELIMITER: char = ',';

/// Whether `text` carries all the delimiters the local parser relies on.
pub(crate) fn looks_structured(text: &str) -> bool {
    text.contains(CHILDREN_DELIMITER)
        && text.contains(LIST_DELIMITER)
        && text.contains(CLAUSE_DELIMITER)
}

/// Parse delimited text into a tree rooted at `root_topic`.
pub(crate) fn parse(text: &str, root_topic: &str) -> SyllabusTree {
    let children = text
        .split(CLAUSE_DELIMITER)
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .filter_map(parse_clause)
        .collect();

    SyllabusTree::new(root_topic, children)
}

fn parse_clause(clause: &str) -> Option<TopicNode> {
    let Some((parent, rest)) = clause.split_once(CHILDREN_DELIMITER) else {
        return Some(TopicNode::leaf(clause));
    };

    let parent = parent.trim();
    let children: Vec<TopicNode> = rest
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(TopicNode::leaf)
        .collect();

    // ": a, b" has nowhere to attach its children.
    if parent.is_empty() {
        return None;
    }
    Some(TopicNode::new(parent, children))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parent_children_and_leaves() {
        let tree = parse("A: B, C. D.", "Root");

        assert_eq!(tree.root_topic, "Root");
        assert_eq!(tree.children.len(), 2);

        let a = &tree.children[0];
        assert_eq!(a.name, "A");
        assert_eq!(a.result, "");
        let names: Vec<_> = a.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["B", "C"]);
        assert!(a.children.iter().all(|c| c.children.is_empty() && c.result.is_empty()));

        let d = &tree.children[1];
        assert_eq!(d.name, "D");
        assert!(d.children.is_empty());
        assert_eq!(d.result, "");
    }

    #[test]
    fn trims_and_discards_empty_pieces() {
        let tree = parse("  Variables :  int ,, float , . . Loops  ..", "Python");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].name, "Variables");
        assert_eq!(tree.children[0].children.len(), 2);
        assert_eq!(tree.children[0].children[1].name, "float");
        assert_eq!(tree.children[1].name, "Loops");
    }

    #[test]
    fn only_first_colon_splits() {
        let tree = parse("Time: format: hh:mm, zones.", "Root");
        let time = &tree.children[0];
        assert_eq!(time.name, "Time");
        assert_eq!(time.children[0].name, "format: hh:mm");
        assert_eq!(time.children[1].name, "zones");
    }

    #[test]
    fn clause_without_parent_name_is_dropped() {
        let tree = parse(": orphan, child. Kept.", "Root");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].name, "Kept");
    }

    #[test]
    fn parent_with_no_children_is_a_leaf() {
        let tree = parse("Recursion:. Sorting: quick, merge.", "Root");
        assert_eq!(tree.children[0].name, "Recursion");
        assert!(tree.children[0].children.is_empty());
        assert_eq!(tree.children[1].children.len(), 2);
    }

    #[test]
    fn structure_detection() {
        assert!(looks_structured("Variables: int, float. Loops."));
        assert!(!looks_structured("An introductory course on graph theory"));
        assert!(!looks_structured("Loops. Functions."));
        assert!(!looks_structured("Types: int, float"));
    }
}
