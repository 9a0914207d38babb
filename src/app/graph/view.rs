use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, vec2};

use crate::finance::EntityId;
use crate::scale::node_color;
use crate::util::format_amount;

use super::super::render_utils::{draw_background, edge_visible, world_to_screen};
use super::super::{ViewModel, ViewScratch};

const TICKS_PER_FRAME: usize = 2;

const EDGE_COLOR: Color32 = Color32::from_rgba_premultiplied(43, 51, 61, 150);
const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(0x06, 0xb6, 0xd4);
const NODE_OUTLINE: Color32 = Color32::from_rgb(0x0f, 0x17, 0x2a);

impl ViewModel {
    fn update_screen_space(&mut self, rect: Rect) {
        let scratch = &mut self.view_scratch;
        scratch.screen_positions.clear();
        scratch.screen_radii.clear();

        let Some(simulation) = self.layout.current() else {
            return;
        };
        for node in simulation.nodes() {
            scratch
                .screen_positions
                .push(world_to_screen(rect, self.pan, self.zoom, node.position));
            scratch
                .screen_radii
                .push((node.radius * self.zoom).max(1.5));
        }
    }

    /// Smaller nodes first so the heavy hitters end up on top.
    fn ensure_draw_order(&mut self) {
        let Some(simulation) = self.layout.current() else {
            return;
        };
        let scratch = &mut self.view_scratch;
        if scratch.draw_order.len() == simulation.nodes().len() {
            return;
        }

        let nodes = simulation.nodes();
        scratch.draw_order.clear();
        scratch.draw_order.extend(0..nodes.len());
        scratch
            .draw_order
            .sort_by(|a, b| nodes[*a].value.total_cmp(&nodes[*b].value));
    }

    fn is_incident(&self, source: EntityId, target: EntityId) -> bool {
        self.selected
            .is_some_and(|selected| selected == source || selected == target)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        if self.graph_dirty {
            self.rebuild_layout();
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        if self.layout.advance(TICKS_PER_FRAME) || response.dragged() {
            ui.ctx().request_repaint();
        }

        if self.subgraph.nodes.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No entities to show for the current limit.",
                FontId::proportional(14.0),
                Color32::from_gray(180),
            );
            return;
        }

        self.update_screen_space(rect);
        self.ensure_draw_order();

        let mut scratch = std::mem::take(&mut self.view_scratch);
        Self::collect_visible(
            rect,
            &scratch.screen_positions,
            &scratch.screen_radii,
            &mut scratch.visible_indices,
        );
        let hovered = Self::hovered_index(
            ui,
            &scratch.visible_indices,
            &scratch.screen_positions,
            &scratch.screen_radii,
        );
        if hovered.is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }

        self.draw_edges(&painter, rect, &scratch);
        self.draw_nodes(&painter, &scratch, hovered);

        if let Some(index) = hovered
            && let Some(entity) = self.subgraph.nodes.get(index)
        {
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!(
                    "{}  |  {}  |  {}",
                    entity.name,
                    entity.kind.label(),
                    format_amount(entity.flow())
                ),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        self.view_scratch = scratch;

        if response.clicked_by(egui::PointerButton::Primary) {
            let clicked = hovered.and_then(|index| self.subgraph.nodes.get(index).map(|e| e.id));
            self.set_selected(clicked);
        }
    }

    fn draw_edges(&self, painter: &egui::Painter, rect: Rect, scratch: &ViewScratch) {
        let Some(simulation) = self.layout.current() else {
            return;
        };
        let zoom_sqrt = self.zoom.sqrt();
        let nodes = simulation.nodes();

        for edge in simulation.edges() {
            let (Some(&start), Some(&end)) = (
                scratch.screen_positions.get(edge.source),
                scratch.screen_positions.get(edge.target),
            ) else {
                continue;
            };
            if !edge_visible(rect, start, end, 2.0) {
                continue;
            }

            let width = self.scales.amount.map(edge.amount) * zoom_sqrt;
            let color = if self.is_incident(nodes[edge.source].id, nodes[edge.target].id) {
                HIGHLIGHT_COLOR
            } else if self.selected.is_some() {
                EDGE_COLOR.gamma_multiply(0.5)
            } else {
                EDGE_COLOR
            };
            painter.line_segment([start, end], Stroke::new(width.max(0.5), color));
        }
    }

    fn draw_nodes(&self, painter: &egui::Painter, scratch: &ViewScratch, hovered: Option<usize>) {
        let visible = |index: usize| scratch.visible_indices.binary_search(&index).is_ok();

        for &index in &scratch.draw_order {
            if !visible(index) {
                continue;
            }
            let Some(entity) = self.subgraph.nodes.get(index) else {
                continue;
            };
            let position = scratch.screen_positions[index];
            let radius = scratch.screen_radii[index];
            let is_selected = self.selected == Some(entity.id);
            let is_hovered = hovered == Some(index);

            let base = node_color(entity.kind, entity.party(), self.color_mode);
            let fill = if is_hovered {
                base.lerp_to_gamma(Color32::WHITE, 0.25)
            } else {
                base
            };
            painter.circle_filled(position, radius, fill);

            let stroke = if is_selected {
                Stroke::new(3.0, HIGHLIGHT_COLOR)
            } else {
                Stroke::new(1.5, NODE_OUTLINE)
            };
            painter.circle_stroke(position, radius, stroke);

            if is_selected || is_hovered || radius > 17.0 || self.zoom > 1.35 {
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    &entity.name,
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }
    }
}
