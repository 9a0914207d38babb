mod app;
mod finance;
mod headless;
mod physics;
mod scale;
mod util;

use std::io;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use eframe::egui::vec2;
use tracing_subscriber::EnvFilter;

use headless::HeadlessOptions;
use physics::LayoutConfig;

/// Explore who pays whom in campaign finance data.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph JSON (`entities`/`edges`) or a list of disbursement records.
    #[arg(long)]
    data: PathBuf,

    /// Number of highest-flow entities to lay out.
    #[arg(long, short = 'k', default_value_t = 150)]
    limit: i64,

    /// Skip the window and print the computed layout as JSON.
    #[arg(long)]
    headless: bool,

    /// Maximum number of layout ticks per run.
    #[arg(long, default_value_t = 300)]
    steps: usize,

    #[arg(long, default_value_t = 1200.0)]
    width: f32,

    #[arg(long, default_value_t = 800.0)]
    height: f32,

    /// With --headless, also print a position snapshot per tick.
    #[arg(long)]
    every_tick: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let limit = args.limit.max(1);
    let layout_config = LayoutConfig::default().with_step_budget(args.steps);

    if args.headless {
        let graph = finance::load_finance_graph(&args.data)?;
        let options = HeadlessOptions {
            limit,
            canvas: vec2(args.width, args.height),
            config: layout_config,
            every_tick: args.every_tick,
        };
        headless::run_headless(&graph, &options, &mut io::stdout().lock())?;
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.width.max(640.0), args.height.max(480.0)]),
        ..Default::default()
    };

    eframe::run_native(
        "Money Flow Explorer",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::MoneyFlowApp::new(
                cc,
                args.data.clone(),
                limit,
                layout_config,
            )))
        }),
    )
    .map_err(|error| anyhow!("failed to run the viewer: {error}"))
}
