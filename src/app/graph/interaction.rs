use eframe::egui::{self, Pos2, Rect, Ui, Vec2};

use super::super::ViewModel;
use super::super::render_utils::{circle_visible, screen_to_world};

const MIN_ZOOM: f32 = 0.05;
const MAX_ZOOM: f32 = 5.0;

/// Applies one wheel step to a view, keeping the world point under `pointer`
/// fixed on screen. Returns the new pan and zoom.
fn zoom_about(rect: Rect, pan: Vec2, zoom: f32, pointer: Pos2, scroll: f32) -> (Vec2, f32) {
    let anchor = screen_to_world(rect, pan, zoom, pointer);
    let zoom = (zoom * 2.0_f32.powf(scroll * 0.002)).clamp(MIN_ZOOM, MAX_ZOOM);
    (pointer - rect.center() - anchor * zoom, zoom)
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if !response.hovered() || scroll == 0.0 {
            return;
        }
        let pointer = response.hover_pos().unwrap_or_else(|| rect.center());
        (self.pan, self.zoom) = zoom_about(rect, self.pan, self.zoom, pointer, scroll);
    }

    /// Any drag on the canvas pans; clicks without movement still select.
    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged() {
            self.pan += response.drag_delta();
        }
    }

    pub(in crate::app) fn reset_view(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }

    pub(in crate::app) fn collect_visible(
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
        visible: &mut Vec<usize>,
    ) {
        visible.clear();
        visible.extend((0..screen_positions.len()).filter(|&index| {
            circle_visible(rect, screen_positions[index], screen_radii[index])
        }));
    }

    /// Index of the visible node under the pointer, nearest center first.
    pub(in crate::app) fn hovered_index(
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        visible_indices
            .iter()
            .filter_map(|&index| {
                let distance = screen_positions[index].distance(pointer);
                (distance <= screen_radii[index]).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}
