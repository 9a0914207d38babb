use std::io::Write;

use anyhow::{Context, Result};
use eframe::egui::Vec2;
use serde::Serialize;
use tracing::info;

use crate::finance::{FinanceGraph, extract};
use crate::physics::{LayoutConfig, LayoutSlot, Simulation, SimulationState};
use crate::scale::GraphScales;

pub struct HeadlessOptions {
    pub limit: i64,
    pub canvas: Vec2,
    pub config: LayoutConfig,
    pub every_tick: bool,
}

#[derive(Debug, Serialize)]
pub struct LaidOutNode {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub party: Option<&'static str>,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Serialize)]
pub struct LaidOutEdge {
    pub id: i64,
    pub source: i64,
    pub target: i64,
    pub amount: f64,
    pub width: f32,
}

#[derive(Debug, Serialize)]
pub struct LayoutDocument {
    pub ticks: usize,
    pub converged: bool,
    pub nodes: Vec<LaidOutNode>,
    pub edges: Vec<LaidOutEdge>,
}

/// Extracts, lays out and writes the result as JSON. With `every_tick` each
/// snapshot goes out as its own JSON line before the final document.
pub fn run_headless(
    graph: &FinanceGraph,
    options: &HeadlessOptions,
    out: &mut impl Write,
) -> Result<LayoutDocument> {
    let subgraph = extract(&graph.entities, &graph.edges, options.limit);
    let scales = GraphScales::for_subgraph(&subgraph);
    info!(
        nodes = subgraph.nodes.len(),
        edges = subgraph.edges.len(),
        limit = options.limit,
        "subgraph extracted"
    );

    let mut slot = LayoutSlot::default();
    let generation = slot.start(Simulation::new(
        &subgraph,
        &scales,
        options.canvas,
        options.config,
    ));

    if options.every_tick {
        for snapshot in slot.snapshots(generation).into_iter().flatten() {
            serde_json::to_writer(&mut *out, &snapshot).context("failed to write snapshot")?;
            writeln!(out).context("failed to write snapshot")?;
        }
    } else {
        while slot.advance(64) {}
    }

    let Some(simulation) = slot.current() else {
        return Ok(LayoutDocument {
            ticks: 0,
            converged: false,
            nodes: Vec::new(),
            edges: Vec::new(),
        });
    };

    let nodes = subgraph
        .nodes
        .iter()
        .filter_map(|entity| {
            let index = simulation.index_of(entity.id)?;
            let node = &simulation.nodes()[index];
            Some(LaidOutNode {
                id: entity.id,
                name: entity.name.clone(),
                kind: entity.kind.label(),
                party: entity.party().map(|party| party.code()),
                x: node.position.x,
                y: node.position.y,
                radius: node.radius,
            })
        })
        .collect::<Vec<_>>();

    let edges = simulation
        .edges()
        .iter()
        .map(|edge| LaidOutEdge {
            id: edge.id,
            source: simulation.nodes()[edge.source].id,
            target: simulation.nodes()[edge.target].id,
            amount: edge.amount,
            width: scales.amount.map(edge.amount),
        })
        .collect::<Vec<_>>();

    let document = LayoutDocument {
        ticks: simulation.tick_count(),
        converged: simulation.state() == SimulationState::Converged,
        nodes,
        edges,
    };
    info!(
        ticks = document.ticks,
        converged = document.converged,
        "layout complete"
    );

    serde_json::to_writer_pretty(&mut *out, &document).context("failed to write layout")?;
    writeln!(out).context("failed to write layout")?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;
    use serde_json::Value;

    use crate::finance::parse_finance_graph;

    use super::*;

    const DATA: &str = r#"{
        "entities": [
            {"id": 1, "name": "A", "type": "committee", "party": "Republican Party",
             "total_in": 100, "total_out": 0},
            {"id": 2, "name": "B", "type": "company", "total_in": 0, "total_out": 50},
            {"id": 3, "name": "C", "type": "person", "total_in": 0, "total_out": 0}
        ],
        "edges": [
            {"id": 1, "source": 3, "target": 1, "amount": 0},
            {"id": 2, "source": 1, "target": 2, "amount": 50}
        ]
    }"#;

    fn options(limit: i64, every_tick: bool) -> HeadlessOptions {
        HeadlessOptions {
            limit,
            canvas: vec2(600.0, 400.0),
            config: LayoutConfig::default().with_step_budget(40),
            every_tick,
        }
    }

    #[test]
    fn lays_out_the_top_entities() {
        let graph = parse_finance_graph(DATA).expect("fixture parses");
        let mut out = Vec::new();
        let document = run_headless(&graph, &options(2, false), &mut out).expect("layout runs");

        let ids = document.nodes.iter().map(|node| node.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(document.edges.len(), 1);
        assert_eq!(document.edges[0].width, 6.0);
        assert_eq!(document.nodes[0].party, Some("R"));
        assert_eq!(document.nodes[0].radius, 40.0);
        assert!(document.ticks <= 40);

        let written: Value = serde_json::from_slice(&out).expect("output is JSON");
        assert_eq!(written["nodes"][1]["type"], "company");
    }

    #[test]
    fn streams_one_line_per_tick() {
        let graph = parse_finance_graph(DATA).expect("fixture parses");
        let mut out = Vec::new();
        let document = run_headless(&graph, &options(3, true), &mut out).expect("layout runs");

        let text = String::from_utf8(out).expect("utf8");
        let snapshot_lines = text
            .lines()
            .take_while(|line| line.starts_with("{\"generation\""))
            .count();
        assert_eq!(snapshot_lines, document.ticks);
    }

    #[test]
    fn non_positive_limits_produce_an_empty_layout() {
        let graph = parse_finance_graph(DATA).expect("fixture parses");
        let document = run_headless(&graph, &options(0, false), &mut Vec::new()).expect("runs");
        assert!(document.nodes.is_empty());
        assert!(document.edges.is_empty());
    }
}
