//! Translation of a [`NodePath`] into a single guarded JSON update.
//!
//! Each path segment becomes a positional filter: segment 0 checks the
//! document's `root_topic`, and every later segment checks the `name` of the
//! element at its sibling index inside the enclosing `children` array. The
//! write itself is one `json_set` on the deepest node's `result`.

use notesgen_shared::NodePath;

/// A `json_set` target plus the `json_extract` equality filters guarding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TargetedUpdate {
    /// JSON path of the `result` field to overwrite.
    pub set_path: String,
    /// `(json_path, expected_name)` pairs, root first.
    pub filters: Vec<(String, String)>,
}

impl TargetedUpdate {
    /// Build the update for `path`.
    pub fn for_path(path: &NodePath) -> Self {
        let mut filters = Vec::with_capacity(path.depth() + 1);
        filters.push(("$.root_topic".to_string(), path.root.clone()));

        let mut prefix = String::from("$");
        for step in &path.steps {
            prefix.push_str(&format!(".children[{}]", step.index));
            filters.push((format!("{prefix}.name"), step.name.clone()));
        }

        Self {
            set_path: format!("{prefix}.result"),
            filters,
        }
    }

    /// The `WHERE` clause fragment for the filters, numbering placeholders from `first`.
    pub fn where_clause(&self, first: usize) -> String {
        self.filters
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let n = first + i * 2;
                format!("json_extract(document, ?{n}) = ?{}", n + 1)
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}
