use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::aggregate::aggregate_disbursements;
use super::graph::{Edge, Entity, EntityKind, FinanceGraph};
use super::parse::{RawDocument, parse_document};

pub fn load_finance_graph(path: &Path) -> Result<FinanceGraph> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    let graph = parse_finance_graph(&raw)
        .with_context(|| format!("failed to load finance graph from {}", path.display()))?;

    info!(
        entities = graph.entity_count(),
        edges = graph.edge_count(),
        path = %path.display(),
        "finance graph loaded"
    );
    Ok(graph)
}

pub fn parse_finance_graph(raw: &str) -> Result<FinanceGraph> {
    let graph = match parse_document(raw)? {
        RawDocument::Disbursements(rows) => {
            if rows.is_empty() {
                return Err(anyhow!("disbursement list is empty"));
            }
            aggregate_disbursements(&rows)
        }
        RawDocument::Graph { entities, edges } => {
            let edges = edges
                .into_iter()
                .map(|edge| Edge {
                    id: edge.id,
                    source: edge.source,
                    target: edge.target,
                    amount: edge.amount,
                    relation_type: edge.relation_type,
                    first_date: edge.first_date,
                    last_date: edge.last_date,
                })
                .collect::<Vec<_>>();

            let totals = FinanceGraph::flow_totals(&edges);
            let entities = entities
                .into_iter()
                .map(|entity| {
                    let (derived_in, derived_out) =
                        totals.get(&entity.id).copied().unwrap_or_default();
                    Entity {
                        id: entity.id,
                        name: entity.name,
                        kind: EntityKind::from_raw(entity.kind.as_deref()),
                        party_raw: entity.party.filter(|party| !party.trim().is_empty()),
                        total_in: entity.total_in.unwrap_or(derived_in),
                        total_out: entity.total_out.unwrap_or(derived_out),
                    }
                })
                .collect::<Vec<_>>();

            FinanceGraph { entities, edges }
        }
    };

    Ok(graph)
}
