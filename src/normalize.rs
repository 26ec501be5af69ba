use std::collections::HashMap;

use crate::model::CareerNodeInput;

/// Translates every `next: B` on node A into "A appears in B.connections".
///
/// Existing `connections` are kept as-is; each back-reference is added at most
/// once, so running this on its own output changes nothing. A `next` naming an
/// unknown node is ignored.
pub fn normalize_connections(nodes: &[CareerNodeInput]) -> Vec<CareerNodeInput> {
    let mut normalized: Vec<CareerNodeInput> = nodes.to_vec();

    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();

    for node in nodes {
        let Some(target) = node.next.as_deref() else {
            continue;
        };
        let Some(&target_idx) = index.get(target) else {
            log::debug!("node '{}' points at unknown next '{target}'", node.id);
            continue;
        };
        let connections = &mut normalized[target_idx].connections;
        if !connections.iter().any(|existing| existing == &node.id) {
            connections.push(node.id.clone());
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<CareerNodeInput> {
        vec![
            CareerNodeInput::new("a", "A").with_next("b"),
            CareerNodeInput::new("b", "B").with_next("c"),
            CareerNodeInput::new("c", "C").with_connections(["x"]),
        ]
    }

    #[test]
    fn next_becomes_incoming_connection_on_target() {
        let normalized = normalize_connections(&chain());
        assert_eq!(normalized[1].connections, vec!["a".to_string()]);
        assert_eq!(normalized[2].connections, vec!["x".to_string(), "b".to_string()]);
        assert!(normalized[0].connections.is_empty());
    }

    #[test]
    fn normalizing_twice_adds_nothing() {
        let once = normalize_connections(&chain());
        let twice = normalize_connections(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_next_is_ignored_and_input_untouched() {
        let input = vec![CareerNodeInput::new("a", "A").with_next("ghost")];
        let normalized = normalize_connections(&input);
        assert_eq!(normalized, input);
        assert_eq!(input[0].next.as_deref(), Some("ghost"));
    }

    #[test]
    fn existing_back_reference_is_not_duplicated() {
        let input = vec![
            CareerNodeInput::new("a", "A").with_next("b"),
            CareerNodeInput::new("b", "B").with_connections(["a"]),
        ];
        let normalized = normalize_connections(&input);
        assert_eq!(normalized[1].connections, vec!["a".to_string()]);
    }
}
