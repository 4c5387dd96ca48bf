//! Merge engine: folds layered content into one forest.
//!
//! Two passes run in order:
//! 1. Root merge. A root node whose file lives in the same directory as an
//!    earlier root node is folded into that node, whatever its name or kind.
//! 2. Child merge. Inside every block, a named child block is folded into the
//!    earlier sibling block of the same name. Runs at every depth.
//!
//! Folding drops the donor and, when both sides are blocks, appends the
//! donor's children to the retained node. The retained node keeps its
//! position, name and source. A leaf owner cannot take children, so a block
//! folded into it loses them; those are counted in `children_dropped`.
//! Below the root, leaves and anonymous nodes never merge.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::domain::entities::{Forest, Node, Value};

/// Counters reported after a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Root blocks folded into an earlier root from the same directory.
    pub roots_folded: usize,
    /// Child blocks folded into an earlier sibling of the same name.
    pub children_folded: usize,
    /// Children discarded because their block folded into a root leaf.
    pub children_dropped: usize,
}

/// Run root merge, then child merge on everything that survived.
#[instrument(level = "debug", skip_all, fields(roots = forest.roots.len()))]
pub fn merge(forest: &mut Forest) -> MergeStats {
    let roots = merge_roots(&mut forest.roots);
    let mut stats = MergeStats {
        roots_folded: roots.folded,
        children_folded: 0,
        children_dropped: roots.dropped,
    };
    for root in &mut forest.roots {
        if let Some(children) = root.children_mut() {
            stats.children_folded += merge_children(children);
        }
    }
    debug!(
        roots = forest.roots.len(),
        roots_folded = stats.roots_folded,
        children_folded = stats.children_folded,
        children_dropped = stats.children_dropped,
        "merge finished"
    );
    stats
}

/// Outcome of one fold plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Folded {
    /// Donor nodes removed.
    pub folded: usize,
    /// Donor children that had no block to land in.
    pub dropped: usize,
}

/// Fold every root into the first root from the same source directory.
pub fn merge_roots(roots: &mut Vec<Node>) -> Folded {
    let mut owners: HashMap<&Path, usize> = HashMap::new();
    let plan = roots
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let owner = *owners.entry(node.source_dir()).or_insert(index);
            (owner != index).then_some(owner)
        })
        .collect();
    apply(roots, plan)
}

/// Fold same-named child blocks, then recurse into the survivors.
/// Returns the number of folded blocks at this depth and below.
pub fn merge_children(children: &mut Vec<Node>) -> usize {
    let mut owners: HashMap<&str, usize> = HashMap::new();
    let mut plan = Vec::with_capacity(children.len());
    for (index, node) in children.iter().enumerate() {
        let target = match node.name() {
            Some(name) if node.is_block() => Some(*owners.entry(name).or_insert(index)),
            _ => None,
        };
        plan.push(target.filter(|&owner| owner != index));
    }

    let mut folded = apply(children, plan).folded;
    for child in children.iter_mut() {
        if let Some(grandchildren) = child.children_mut() {
            folded += merge_children(grandchildren);
        }
    }
    folded
}

/// Execute a fold plan. `plan[i]` names the earlier index node `i` folds into.
fn apply(nodes: &mut Vec<Node>, plan: Vec<Option<usize>>) -> Folded {
    let mut outcome = Folded::default();
    if plan.iter().all(Option::is_none) {
        return outcome;
    }

    let mut slots: Vec<Option<Node>> = std::mem::take(nodes).into_iter().map(Some).collect();
    for (index, target) in plan.into_iter().enumerate() {
        let Some(target) = target else { continue };
        let Some(donor) = slots[index].take() else {
            continue;
        };
        if let Some(owner) = slots[target].as_mut() {
            outcome.dropped += absorb(owner, donor);
            outcome.folded += 1;
        }
    }
    nodes.extend(slots.into_iter().flatten());
    outcome
}

/// Append the donor's children to the target block.
/// Returns how many donor children were discarded because the target is a leaf.
fn absorb(target: &mut Node, donor: Node) -> usize {
    let Value::Block(donated) = donor.value else {
        return 0;
    };
    if let Some(children) = target.children_mut() {
        children.extend(donated);
        return 0;
    }
    if !donated.is_empty() {
        warn!(
            owner = target.name().unwrap_or("<anonymous>"),
            source = %donor.source.display(),
            dropped = donated.len(),
            "block folded into a leaf; its children are discarded"
        );
    }
    donated.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ComparisonOperator, SourceId};
    use crate::domain::parser::parse_str;
    use crate::domain::serializer::{render_forest, RenderOptions};
    use std::sync::Arc;

    fn src(path: &str) -> SourceId {
        Arc::from(Path::new(path))
    }

    fn forest_of(files: &[(&str, &str)]) -> Forest {
        let mut forest = Forest::new();
        for (path, text) in files {
            forest.extend(parse_str(src(path), text).unwrap().forest);
        }
        forest
    }

    fn rendered(forest: &Forest) -> String {
        render_forest(forest, RenderOptions::default())
    }

    #[test]
    fn given_two_files_in_one_directory_when_merged_then_second_root_folds_into_first() {
        let mut forest = forest_of(&[("D/file1.txt", "a = { x = 1 }"), ("D/file2.txt", "b = { y = 2 }")]);

        let stats = merge(&mut forest);

        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.roots[0].name(), Some("a"));
        assert_eq!(rendered(&forest), "a = {\n\tx = 1\n\ty = 2\n}\n");
        assert_eq!(stats.roots_folded, 1);
    }

    #[test]
    fn given_roots_from_different_directories_when_merged_then_kept_apart() {
        let mut forest = forest_of(&[
            ("common/a.txt", "a = { x = 1 }"),
            ("events/b.txt", "a = { y = 2 }"),
            ("common/c.txt", "c = { z = 3 }"),
        ]);

        merge(&mut forest);

        assert_eq!(
            rendered(&forest),
            "a = {\n\tx = 1\n\tz = 3\n}\na = {\n\ty = 2\n}\n"
        );
    }

    #[test]
    fn given_root_leaf_in_same_directory_when_merged_then_later_root_removed() {
        let mut forest = forest_of(&[("D/1.txt", "version = 2\na = { x = 1 }"), ("D/2.txt", "version = 3")]);

        let stats = merge(&mut forest);

        assert_eq!(rendered(&forest), "version = 2\n");
        assert_eq!(stats.roots_folded, 2);
        assert_eq!(stats.children_dropped, 1);
    }

    #[test]
    fn given_leaf_after_block_owner_when_merged_then_leaf_removed_and_block_untouched() {
        let mut forest = forest_of(&[("D/1.txt", "a = { x = 1 }"), ("D/2.txt", "version = 3\nb = { y = 2 }")]);

        let stats = merge(&mut forest);

        assert_eq!(rendered(&forest), "a = {\n\tx = 1\n\ty = 2\n}\n");
        assert_eq!(stats.roots_folded, 2);
        assert_eq!(stats.children_dropped, 0);
    }

    #[test]
    fn given_root_leaves_in_different_directories_when_merged_then_each_kept() {
        let mut forest = forest_of(&[("D/1.txt", "version = 2"), ("E/1.txt", "version = 3")]);

        merge(&mut forest);

        assert_eq!(rendered(&forest), "version = 2\nversion = 3\n");
    }

    #[test]
    fn given_same_named_children_when_merged_then_fold_into_first_occurrence() {
        let mut forest = forest_of(&[("D/1.txt", "root = { p = { m = 1 } q = { n = 2 } p = { k = 3 } }")]);

        let stats = merge(&mut forest);

        let root = &forest.roots[0];
        let names: Vec<_> = root.children().unwrap().iter().filter_map(Node::name).collect();
        assert_eq!(names, vec!["p", "q"]);
        assert_eq!(
            rendered(&forest),
            "root = {\n\tp = {\n\t\tm = 1\n\t\tk = 3\n\t}\n\tq = {\n\t\tn = 2\n\t}\n}\n"
        );
        assert_eq!(stats.children_folded, 1);
    }

    #[test]
    fn given_three_duplicates_when_merged_then_children_keep_encounter_order() {
        let mut children = parse_str(src("D/1.txt"), "p = { a = 1 }\np = { b = 2 }\np = { c = 3 }")
            .unwrap()
            .forest
            .roots;

        let folded = merge_children(&mut children);

        assert_eq!(folded, 2);
        assert_eq!(children.len(), 1);
        let inner: Vec<_> = children[0].children().unwrap().iter().filter_map(Node::name).collect();
        assert_eq!(inner, vec!["a", "b", "c"]);
    }

    #[test]
    fn given_same_named_leaves_when_merged_then_all_kept() {
        let mut forest = forest_of(&[("D/1.txt", "root = { x = 1 x = 2 x = { y = 3 } x = { z = 4 } }")]);

        merge(&mut forest);

        assert_eq!(
            rendered(&forest),
            "root = {\n\tx = 1\n\tx = 2\n\tx = {\n\t\ty = 3\n\t\tz = 4\n\t}\n}\n"
        );
    }

    #[test]
    fn given_anonymous_blocks_when_merged_then_never_combined() {
        let mut forest = forest_of(&[("D/1.txt", "root = { { 1 2 } { 3 } }")]);

        merge(&mut forest);

        assert_eq!(forest.roots[0].children().unwrap().len(), 2);
    }

    #[test]
    fn given_duplicates_at_depth_when_merged_then_merged_recursively() {
        let mut forest = forest_of(&[
            ("D/1.txt", "a = { b = { c = { x = 1 } } }"),
            ("D/2.txt", "a = { b = { c = { y = 2 } } }"),
        ]);

        merge(&mut forest);

        assert_eq!(
            rendered(&forest),
            "a = {\n\tb = {\n\t\tc = {\n\t\t\tx = 1\n\t\t\ty = 2\n\t\t}\n\t}\n}\n"
        );
    }

    #[test]
    fn given_folded_root_when_merged_then_retained_node_keeps_its_source() {
        let mut forest = forest_of(&[("D/1.txt", "a = { x = 1 }"), ("D/2.txt", "b = { y = 2 }")]);

        merge(&mut forest);

        assert_eq!(&*forest.roots[0].source, Path::new("D/1.txt"));
        let y = forest.roots[0].child("y").unwrap();
        assert_eq!(&*y.source, Path::new("D/2.txt"));
        assert_eq!(
            y.value,
            Value::Number {
                op: ComparisonOperator::Eq,
                value: 2.into()
            }
        );
    }

    #[test]
    fn given_defines_when_merged_then_untouched() {
        let mut forest = forest_of(&[("D/1.txt", "@cost = 5\na = { x = 1 }"), ("D/2.txt", "@cost = 6")]);

        merge(&mut forest);

        assert_eq!(forest.defines.len(), 2);
    }
}
