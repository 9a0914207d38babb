use eframe::egui::{self, RichText, Ui};

use crate::finance::{Edge, Entity, EntityId};
use crate::util::format_amount;

use super::super::ViewModel;

const MAX_LINK_ROWS: usize = 200;

impl ViewModel {
    fn entity_in_view(&self, id: EntityId) -> Option<&Entity> {
        let index = *self.entity_index.get(&id)?;
        self.subgraph.nodes.get(index)
    }

    /// Links of the current subgraph touching `id`, largest amount first.
    fn incident_links(&self, id: EntityId) -> Vec<&Edge> {
        let mut links = self
            .subgraph
            .edges
            .iter()
            .filter(|edge| edge.source == id || edge.target == id)
            .collect::<Vec<_>>();
        links.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
        links
    }

    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected else {
            ui.label("Click an entity in the graph to inspect it.");
            return;
        };

        let Some(entity) = self.entity_in_view(selected_id) else {
            ui.label("The selected entity is no longer in view.");
            return;
        };

        ui.label(RichText::new(entity.name.as_str()).strong());
        ui.small(format!("id {}", entity.id));
        ui.add_space(6.0);
        ui.label(format!("Type: {}", entity.kind.label()));
        match entity.party() {
            Some(party) => ui.label(format!("Party: {}", party.code())),
            None => ui.label("Party: none"),
        };
        ui.label(format!("Received: {}", format_amount(entity.total_in)));
        ui.label(format!("Spent: {}", format_amount(entity.total_out)));
        ui.label(format!("Total flow: {}", format_amount(entity.flow())));

        let links = self
            .incident_links(selected_id)
            .into_iter()
            .map(|edge| {
                let (direction, other) = if edge.source == selected_id {
                    ("to", edge.target)
                } else {
                    ("from", edge.source)
                };
                let other_name = self
                    .entity_in_view(other)
                    .map_or_else(|| other.to_string(), |entity| entity.name.clone());
                let mut label = format!("{direction} {other_name}  {}", format_amount(edge.amount));
                if let Some(relation) = &edge.relation_type {
                    label.push_str(&format!("  [{relation}]"));
                }
                match (&edge.first_date, &edge.last_date) {
                    (Some(first), Some(last)) if first != last => {
                        label.push_str(&format!("  {first} to {last}"));
                    }
                    (Some(date), _) | (None, Some(date)) => label.push_str(&format!("  {date}")),
                    (None, None) => {}
                }
                (other, label)
            })
            .collect::<Vec<_>>();

        ui.separator();
        ui.label(RichText::new(format!("Links in view ({})", links.len())).strong());
        let mut pending = None;
        if links.is_empty() {
            ui.label("No links to other entities in view.");
        } else {
            egui::ScrollArea::vertical()
                .id_salt("incident_links_scroll")
                .max_height(360.0)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for (other, label) in links.iter().take(MAX_LINK_ROWS) {
                        if ui.link(label.as_str()).clicked() {
                            pending = Some(*other);
                        }
                    }
                    if links.len() > MAX_LINK_ROWS {
                        ui.small(format!("and {} more", links.len() - MAX_LINK_ROWS));
                    }
                });
        }

        ui.add_space(8.0);
        if ui.button("Clear selection").clicked() {
            self.set_selected(None);
        } else if pending.is_some() {
            self.set_selected(pending);
        }
    }
}
