use std::collections::HashMap;

use eframe::egui::Vec2;
use tracing::info;

use crate::finance::extract;
use crate::physics::Simulation;
use crate::scale::GraphScales;

use super::super::ViewModel;

impl ViewModel {
    /// Re-extracts the top entities, rebuilds the scales for the new set and
    /// replaces the running layout. Nodes that survive the change start from
    /// where they were.
    pub(in crate::app) fn rebuild_layout(&mut self) {
        self.graph_dirty = false;

        let seeds = self
            .layout
            .current()
            .map(|simulation| {
                simulation
                    .nodes()
                    .iter()
                    .map(|node| (node.id, node.position))
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();

        self.subgraph = extract(&self.graph.entities, &self.graph.edges, self.limit);
        self.scales = GraphScales::for_subgraph(&self.subgraph);
        self.entity_index = self
            .subgraph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, entity)| (entity.id, index))
            .collect();

        if self.selected.is_some_and(|id| !self.subgraph.contains(id)) {
            self.selected = None;
        }

        let simulation = Simulation::new(
            &self.subgraph,
            &self.scales,
            Vec2::ZERO,
            self.layout_config,
        )
        .with_seed_positions(&seeds);
        let generation = self.layout.start(simulation);
        self.view_scratch.draw_order.clear();

        info!(
            generation,
            limit = self.limit,
            nodes = self.subgraph.nodes.len(),
            edges = self.subgraph.edges.len(),
            "layout rebuilt"
        );
    }

    /// Drops remembered positions and lays the current selection out again.
    pub(in crate::app) fn restart_layout(&mut self) {
        self.layout.cancel();
        self.graph_dirty = true;
    }
}
