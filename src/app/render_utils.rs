use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

const BACKGROUND: Color32 = Color32::from_rgb(3, 7, 18);
const GRID_LINE: Color32 = Color32::from_rgba_premultiplied(12, 15, 20, 60);

/// Dark canvas with a grid that follows pan and zoom.
pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let spacing = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, GRID_LINE);

    let first_x = rect.left() + (origin.x - rect.left()).rem_euclid(spacing);
    for x in grid_steps(first_x, rect.right(), spacing) {
        painter.vline(x, rect.y_range(), stroke);
    }
    let first_y = rect.top() + (origin.y - rect.top()).rem_euclid(spacing);
    for y in grid_steps(first_y, rect.bottom(), spacing) {
        painter.hline(rect.x_range(), y, stroke);
    }
}

fn grid_steps(first: f32, end: f32, spacing: f32) -> impl Iterator<Item = f32> {
    std::iter::successors(Some(first), move |at| Some(at + spacing)).take_while(move |at| *at < end)
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Exact segment against rectangle test: the bounding boxes must overlap and
/// the segment's line must not leave all four corners on one side.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let rect = rect.expand(padding);
    if !Rect::from_two_pos(start, end).intersects(rect) {
        return false;
    }

    let direction = end - start;
    let side = |corner: Pos2| {
        let offset = corner - start;
        direction.x * offset.y - direction.y * offset.x
    };
    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ];
    let above = corners.iter().any(|&corner| side(corner) >= 0.0);
    let below = corners.iter().any(|&corner| side(corner) <= 0.0);
    above && below
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}
