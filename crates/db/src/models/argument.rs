//! The argument tree shared by the frontend and the persisted debate record.
//!
//! The tree is a persistent data structure: mutations return a new
//! `ArgumentTree` and reuse every untouched subtree by `Arc` reference, so a
//! consuming UI can detect change through reference identity and earlier
//! snapshots stay valid. Only the nodes on the path from a root to the
//! mutated node are rebuilt.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;

/// Which side of the statement an argument supports.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(type_name = "side", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    For,
    Against,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::For => Side::Against,
            Side::Against => Side::For,
        }
    }

    /// Side of a node `depth` hops below a root on this side. Children always
    /// argue the opposite side of their parent, so side alternates by depth.
    pub fn at_depth(self, depth: usize) -> Side {
        if depth % 2 == 0 { self } else { self.opposite() }
    }
}

/// A cited source backing an argument. Order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
}

/// One argument in the tree. `refutations` are the counterarguments raised
/// against this node, in insertion order; each argues the opposite side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ArgumentNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheading: Option<String>,
    pub text: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refutations: Vec<Arc<ArgumentNode>>,
}

impl ArgumentNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            title: None,
            subheading: None,
            text: text.into(),
            sources: Vec::new(),
            refutations: Vec::new(),
        }
    }
}

/// The full argument structure of one debate: root arguments for and against
/// the statement, each root owning its recursive refutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct ArgumentTree {
    #[serde(rename = "for", default)]
    pub supporting: Vec<Arc<ArgumentNode>>,
    #[serde(default)]
    pub against: Vec<Arc<ArgumentNode>>,
}

/// Tree navigation failure. Surfaced as a distinct condition so the API can
/// report "could not locate the argument" instead of a generic error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("no argument at path {path:?} on the {side} side")]
    NotFound { side: Side, path: Vec<usize> },
}

impl ArgumentTree {
    pub fn roots(&self, side: Side) -> &[Arc<ArgumentNode>] {
        match side {
            Side::For => &self.supporting,
            Side::Against => &self.against,
        }
    }

    fn roots_mut(&mut self, side: Side) -> &mut Vec<Arc<ArgumentNode>> {
        match side {
            Side::For => &mut self.supporting,
            Side::Against => &mut self.against,
        }
    }

    /// Walk `roots(side)[i0].refutations[i1]...refutations[ik]`. An empty
    /// path addresses no node and fails, as does any out-of-range index.
    pub fn resolve(&self, side: Side, path: &[usize]) -> Result<&Arc<ArgumentNode>, TreeError> {
        let not_found = || TreeError::NotFound {
            side,
            path: path.to_vec(),
        };
        let (&first, rest) = path.split_first().ok_or_else(not_found)?;
        let mut node = self.roots(side).get(first).ok_or_else(not_found)?;
        for &idx in rest {
            node = node.refutations.get(idx).ok_or_else(not_found)?;
        }
        Ok(node)
    }

    /// New tree with `node` appended to the root list of `side`.
    pub fn append_root(&self, side: Side, node: ArgumentNode) -> ArgumentTree {
        let mut tree = self.clone();
        tree.roots_mut(side).push(Arc::new(node));
        tree
    }

    /// New tree with `node` appended to the refutations of the node at
    /// `path`. Rebuilds only the nodes along the path; siblings and
    /// unrelated subtrees are shared with `self` by reference.
    pub fn append_child(
        &self,
        side: Side,
        path: &[usize],
        node: ArgumentNode,
    ) -> Result<ArgumentTree, TreeError> {
        let rebuilt = rebuild(self.roots(side), path, node).ok_or(TreeError::NotFound {
            side,
            path: path.to_vec(),
        })?;
        let mut tree = self.clone();
        *tree.roots_mut(side) = rebuilt;
        Ok(tree)
    }
}

fn rebuild(
    nodes: &[Arc<ArgumentNode>],
    path: &[usize],
    child: ArgumentNode,
) -> Option<Vec<Arc<ArgumentNode>>> {
    let (&idx, rest) = path.split_first()?;
    let target = nodes.get(idx)?;
    let mut patched = ArgumentNode::clone(target);
    if rest.is_empty() {
        patched.refutations.push(Arc::new(child));
    } else {
        patched.refutations = rebuild(&target.refutations, rest, child)?;
    }
    let mut out = nodes.to_vec();
    out[idx] = Arc::new(patched);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(text: &str) -> ArgumentNode {
        ArgumentNode::new(text)
    }

    fn sourced(text: &str, sources: &[(&str, &str)]) -> ArgumentNode {
        ArgumentNode {
            sources: sources
                .iter()
                .map(|(title, url)| SourceRef {
                    title: title.to_string(),
                    url: url.to_string(),
                })
                .collect(),
            ..ArgumentNode::new(text)
        }
    }

    #[test]
    fn append_child_under_root() {
        let tree = ArgumentTree::default().append_root(Side::For, node("A"));
        let tree = tree.append_child(Side::For, &[0], node("B")).unwrap();

        assert_eq!(tree.supporting.len(), 1);
        assert_eq!(tree.supporting[0].text, "A");
        assert_eq!(tree.supporting[0].refutations.len(), 1);
        assert_eq!(tree.supporting[0].refutations[0].text, "B");
        assert!(tree.against.is_empty());
    }

    #[test]
    fn resolve_nested_path() {
        let tree = ArgumentTree::default().append_root(Side::For, node("A"));
        let tree = tree.append_child(Side::For, &[0], node("B")).unwrap();

        let found = tree.resolve(Side::For, &[0, 0]).unwrap();
        assert_eq!(found.text, "B");
    }

    #[test]
    fn append_preserves_siblings_by_reference() {
        let tree = ArgumentTree::default()
            .append_root(Side::For, node("first"))
            .append_root(Side::For, node("second"))
            .append_root(Side::Against, node("counter"));
        let updated = tree.append_child(Side::For, &[0], node("refutation")).unwrap();

        // The mutated path is rebuilt, everything else is shared.
        assert!(!Arc::ptr_eq(&tree.supporting[0], &updated.supporting[0]));
        assert!(Arc::ptr_eq(&tree.supporting[1], &updated.supporting[1]));
        assert!(Arc::ptr_eq(&tree.against[0], &updated.against[0]));

        // Earlier snapshot is untouched.
        assert!(tree.supporting[0].refutations.is_empty());
    }

    #[test]
    fn deep_append_shares_untouched_branches() {
        let tree = ArgumentTree::default().append_root(Side::Against, node("root"));
        let tree = tree.append_child(Side::Against, &[0], node("child a")).unwrap();
        let tree = tree.append_child(Side::Against, &[0], node("child b")).unwrap();
        let updated = tree
            .append_child(Side::Against, &[0, 1], node("grandchild"))
            .unwrap();

        let untouched = &tree.against[0].refutations[0];
        let same = &updated.against[0].refutations[0];
        assert!(Arc::ptr_eq(untouched, same));
        assert_eq!(updated.against[0].refutations[1].refutations[0].text, "grandchild");
    }

    #[test]
    fn resolve_round_trips_appended_node() {
        let appended = sourced("C", &[("one", "https://a.example"), ("two", "https://b.example")]);
        let tree = ArgumentTree::default().append_root(Side::For, node("A"));
        let tree = tree.append_child(Side::For, &[0], node("B")).unwrap();
        let tree = tree.append_child(Side::For, &[0, 0], appended.clone()).unwrap();

        let found = tree.resolve(Side::For, &[0, 0, 0]).unwrap();
        assert_eq!(**found, appended);
        assert_eq!(found.sources[0].title, "one");
        assert_eq!(found.sources[1].title, "two");
    }

    #[test]
    fn resolve_out_of_range_is_not_found() {
        let tree = ArgumentTree::default()
            .append_root(Side::For, node("A"))
            .append_root(Side::For, node("B"));

        let err = tree.resolve(Side::For, &[99]).unwrap_err();
        assert_eq!(
            err,
            TreeError::NotFound {
                side: Side::For,
                path: vec![99],
            }
        );
    }

    #[test]
    fn resolve_empty_path_on_empty_side_is_not_found() {
        let tree = ArgumentTree::default().append_root(Side::For, node("A"));
        assert!(matches!(
            tree.resolve(Side::Against, &[]),
            Err(TreeError::NotFound { .. })
        ));
    }

    #[test]
    fn append_child_past_leaf_is_not_found() {
        let tree = ArgumentTree::default().append_root(Side::For, node("A"));
        let err = tree.append_child(Side::For, &[0, 0], node("B")).unwrap_err();
        assert_eq!(
            err,
            TreeError::NotFound {
                side: Side::For,
                path: vec![0, 0],
            }
        );
    }

    #[test]
    fn children_append_in_insertion_order() {
        let tree = ArgumentTree::default().append_root(Side::For, node("root"));
        let tree = tree.append_child(Side::For, &[0], node("one")).unwrap();
        let tree = tree.append_child(Side::For, &[0], node("two")).unwrap();
        let tree = tree.append_child(Side::For, &[0], node("three")).unwrap();

        let order: Vec<_> = tree.supporting[0]
            .refutations
            .iter()
            .map(|n| n.text.as_str())
            .collect();
        assert_eq!(order, ["one", "two", "three"]);
    }

    #[test]
    fn side_alternates_with_depth() {
        assert_eq!(Side::For.at_depth(0), Side::For);
        assert_eq!(Side::For.at_depth(1), Side::Against);
        assert_eq!(Side::For.at_depth(2), Side::For);
        assert_eq!(Side::Against.at_depth(1), Side::For);
    }

    #[test]
    fn serde_round_trip_preserves_structure() {
        let raw = serde_json::json!({
            "for": [{
                "title": "Headline",
                "text": "A",
                "sources": [{"title": "s", "url": "https://s.example"}],
                "refutations": [{"text": "B", "sources": []}],
            }],
            "against": [{"text": "C", "sources": []}],
        });
        let tree: ArgumentTree = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(tree.supporting[0].refutations[0].text, "B");

        let encoded = serde_json::to_value(&tree).unwrap();
        assert_eq!(encoded, raw);
    }

    #[test]
    fn empty_refutations_stay_absent_on_the_wire() {
        let encoded = serde_json::to_value(node("leaf")).unwrap();
        let object = encoded.as_object().unwrap();
        assert!(!object.contains_key("refutations"));
        assert!(!object.contains_key("title"));
        assert!(object.contains_key("sources"));
    }
}
