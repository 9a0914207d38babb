use std::collections::HashSet;

use super::graph::{Edge, Entity, EntityId};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subgraph {
    pub nodes: Vec<Entity>,
    pub edges: Vec<Edge>,
}

impl Subgraph {
    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }
}

/// Selects the `limit` entities with the largest combined flow and the edges
/// running between them.
///
/// Equal flows keep their input order. Repeated ids keep their first
/// occurrence. A non-positive `limit` yields an empty subgraph.
pub fn extract(entities: &[Entity], edges: &[Edge], limit: i64) -> Subgraph {
    let Ok(limit) = usize::try_from(limit) else {
        return Subgraph::default();
    };
    if limit == 0 || entities.is_empty() {
        return Subgraph::default();
    }

    let mut seen = HashSet::with_capacity(entities.len());
    let mut ranked = entities
        .iter()
        .filter(|entity| seen.insert(entity.id))
        .map(|entity| (entity.flow(), entity))
        .collect::<Vec<_>>();

    // `sort_by` is stable, which pins the tie-break to input order.
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(limit);

    let nodes = ranked
        .into_iter()
        .map(|(_flow, entity)| entity.clone())
        .collect::<Vec<_>>();
    let selected = nodes.iter().map(|node| node.id).collect::<HashSet<_>>();

    let edges = edges
        .iter()
        .filter(|edge| selected.contains(&edge.source) && selected.contains(&edge.target))
        .cloned()
        .collect::<Vec<_>>();

    Subgraph { nodes, edges }
}
