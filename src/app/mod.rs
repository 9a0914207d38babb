use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Pos2, Vec2};
use tracing::{error, info};

use crate::finance::{EntityId, FinanceGraph, Subgraph, load_finance_graph};
use crate::physics::{LayoutConfig, LayoutSlot};
use crate::scale::{ColorMode, GraphScales};

mod graph;
mod render_utils;
mod ui;

pub struct MoneyFlowApp {
    data_path: PathBuf,
    initial_limit: i64,
    layout_config: LayoutConfig,
    state: AppState,
    reload_rx: Option<Receiver<Result<FinanceGraph, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<FinanceGraph, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    graph: FinanceGraph,
    limit: i64,
    layout_config: LayoutConfig,
    color_mode: ColorMode,
    selected: Option<EntityId>,
    pan: Vec2,
    zoom: f32,
    graph_dirty: bool,
    subgraph: Subgraph,
    scales: GraphScales,
    entity_index: HashMap<EntityId, usize>,
    layout: LayoutSlot,
    view_scratch: ViewScratch,
}

#[derive(Default)]
struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    visible_indices: Vec<usize>,
    draw_order: Vec<usize>,
}

impl MoneyFlowApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        data_path: PathBuf,
        initial_limit: i64,
        layout_config: LayoutConfig,
    ) -> Self {
        let state = Self::start_load(data_path.clone());
        Self {
            data_path,
            initial_limit,
            layout_config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(data_path: PathBuf) -> Receiver<Result<FinanceGraph, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_finance_graph(&data_path).map_err(|error| format!("{error:#}"));
            if let Err(message) = &result {
                error!(%message, "failed to load finance graph");
            }
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(data_path: PathBuf) -> AppState {
        info!(path = %data_path.display(), "loading finance graph");
        AppState::Loading {
            rx: Self::spawn_load(data_path),
        }
    }

    fn settle(
        result: Result<FinanceGraph, String>,
        limit: i64,
        layout_config: LayoutConfig,
    ) -> AppState {
        match result {
            Ok(graph) => AppState::Ready(Box::new(ViewModel::new(graph, limit, layout_config))),
            Err(error) => AppState::Error(error),
        }
    }
}

impl eframe::App for MoneyFlowApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let (limit, layout_config) = (self.initial_limit, self.layout_config);

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => transition = Some(Self::settle(result, limit, layout_config)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error(
                            "Background load worker disconnected".to_owned(),
                        ));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading network data...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the money-flow graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.data_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.data_path, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.data_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            let (limit, layout_config) = (model.limit, model.layout_config);
                            transition = Some(Self::settle(result, limit, layout_config));
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(AppState::Error(
                                "Background load worker disconnected".to_owned(),
                            ));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
