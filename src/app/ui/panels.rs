use std::collections::HashMap;
use std::path::Path;

use eframe::egui::{self, Align, Context, Layout, RichText, Ui, Vec2};

use crate::finance::{EntityId, FinanceGraph, Subgraph};
use crate::physics::{LayoutConfig, LayoutSlot, SimulationState, StopReason};
use crate::scale::{ColorMode, GraphScales};

use super::super::{ViewModel, ViewScratch};

impl ViewModel {
    pub(in crate::app) fn new(
        graph: FinanceGraph,
        limit: i64,
        layout_config: LayoutConfig,
    ) -> Self {
        Self {
            graph,
            limit: limit.max(1),
            layout_config,
            color_mode: ColorMode::default(),
            selected: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            graph_dirty: true,
            subgraph: Subgraph::default(),
            scales: GraphScales::for_subgraph(&Subgraph::default()),
            entity_index: HashMap::new(),
            layout: LayoutSlot::default(),
            view_scratch: ViewScratch::default(),
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        data_path: &Path,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        if self.graph_dirty {
            self.rebuild_layout();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Money Flow Explorer");
                    ui.separator();
                    ui.label(format!("data: {}", data_path.display()));
                    ui.label(format!("entities: {}", self.graph.entity_count()));
                    ui.label(format!("links: {}", self.graph.edge_count()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload data"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.layout_status());
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }

    fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("View");
        ui.add_space(6.0);

        ui.label(RichText::new("Top entities").strong());
        let mut limit = self.limit;
        ui.add(
            egui::DragValue::new(&mut limit)
                .range(1..=100_000)
                .speed(1.0)
                .prefix("K = "),
        );
        if limit != self.limit {
            self.limit = limit.max(1);
            self.graph_dirty = true;
        }
        ui.label(format!(
            "Showing {} entities and {} links",
            self.subgraph.nodes.len(),
            self.subgraph.edges.len()
        ));

        ui.separator();
        ui.label(RichText::new("Color by").strong());
        for mode in [ColorMode::EntityType, ColorMode::Party] {
            ui.radio_value(&mut self.color_mode, mode, mode.label());
        }

        ui.separator();
        ui.label(RichText::new("Layout").strong());
        ui.horizontal(|ui| {
            let label = if self.layout.is_running() {
                "Restart layout"
            } else {
                "Re-run layout"
            };
            if ui.button(label).clicked() {
                self.restart_layout();
            }
            if ui.button("Reset view").clicked() {
                self.reset_view();
            }
        });
        ui.add(
            egui::Slider::new(&mut self.layout_config.link_distance, 20.0..=400.0)
                .text("link distance"),
        );
        ui.add(
            egui::Slider::new(&mut self.layout_config.repulsion_strength, 0.0..=1000.0)
                .text("repulsion"),
        );
        ui.add(
            egui::Slider::new(&mut self.layout_config.step_budget, 1..=2000).text("step budget"),
        );
        ui.small("Slider changes apply on the next layout run.");

        ui.separator();
        ui.small("Scroll to zoom, drag to pan, click a node to select it.");
    }

    fn layout_status(&self) -> String {
        let Some(simulation) = self.layout.current() else {
            return "layout: idle".to_owned();
        };
        let state = match simulation.state() {
            SimulationState::Initializing => "starting",
            SimulationState::Stepping => "running",
            SimulationState::Converged => "converged",
            SimulationState::Stopped(StopReason::BudgetExhausted) => "step budget reached",
            SimulationState::Stopped(StopReason::Cancelled) => "cancelled",
        };
        format!(
            "layout #{}: {state}  |  tick {}  |  alpha {:.3}  |  motion {:.2}",
            simulation.generation(),
            simulation.tick_count(),
            simulation.alpha(),
            simulation.mean_displacement()
        )
    }

    /// Selection only sticks to entities in the current subgraph.
    pub(in crate::app) fn set_selected(&mut self, selected: Option<EntityId>) {
        self.selected = selected.filter(|id| self.entity_index.contains_key(id));
    }
}
