use super::{Mapping, Node};

/// Deep-merges `overlay` on top of `base`.
///
/// - `Null` on either side yields the other side.
/// - Two sequences concatenate, `base` elements first.
/// - Two mappings merge key-wise; shared keys merge recursively and keep
///   their position in `base`, new keys are appended.
/// - Any other combination resolves to `overlay`.
///
/// Not associative: scalar collisions are right-biased.
pub fn merge(base: Node, overlay: Node) -> Node {
    match (base, overlay) {
        (base, Node::Null) => base,
        (Node::Null, overlay) => overlay,
        (Node::Sequence(mut items), Node::Sequence(more)) => {
            items.extend(more);
            Node::Sequence(items)
        }
        (Node::Mapping(mut base), Node::Mapping(overlay)) => {
            merge_mappings(&mut base, overlay);
            Node::Mapping(base)
        }
        (_, overlay) => overlay,
    }
}

fn merge_mappings(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => {
                let current = std::mem::replace(existing, Node::Null);
                *existing = merge(current, value);
            }
            None => {
                base.insert(key, value);
            }
        }
    }
}
