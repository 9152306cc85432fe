//! Reachability checks over reliability-carrying edges

use crate::traits::HolonGraph;
use crate::Relation;
use std::collections::HashSet;

/// Whether inserting `relation` would close a dependency cycle
///
/// Walks dependency arcs depth-first from the new edge's dependency and
/// reports a cycle if the dependent is reachable. The visited set bounds the
/// walk even when the stored graph already contains a cycle. Informational
/// edges never create cycles.
pub fn would_create_cycle<G: HolonGraph>(graph: &G, relation: &Relation) -> Result<bool, G::Error> {
    let Some((dependent, dependency)) = relation.dependency_pair() else {
        return Ok(false);
    };

    if dependent == dependency {
        return Ok(true);
    }

    let mut visited = HashSet::new();
    let mut stack = vec![dependency.to_string()];

    while let Some(current) = stack.pop() {
        if current == dependent {
            return Ok(true);
        }
        if !visited.insert(current.clone()) {
            continue;
        }

        for edge in graph.get_dependencies(&current)? {
            if let Some((_, next)) = edge.dependency_pair() {
                if !visited.contains(next) {
                    stack.push(next.to_string());
                }
            }
        }
    }

    Ok(false)
}
