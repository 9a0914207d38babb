use tracing::debug;

use super::{Simulation, Snapshots};

/// Holds the single authoritative layout run for one view.
///
/// Every `start` bumps the generation and stops whatever ran before, so a
/// caller still holding an older generation number gets nothing back.
#[derive(Default)]
pub struct LayoutSlot {
    generation: u64,
    current: Option<Simulation>,
}

impl LayoutSlot {
    pub fn start(&mut self, simulation: Simulation) -> u64 {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        debug!(
            generation = self.generation,
            nodes = simulation.nodes().len(),
            edges = simulation.edges().len(),
            "layout started"
        );
        self.current = Some(simulation.with_generation(self.generation));
        self.generation
    }

    pub fn cancel(&mut self) {
        if let Some(mut previous) = self.current.take() {
            previous.stop();
        }
    }

    pub fn current(&self) -> Option<&Simulation> {
        self.current.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(Simulation::is_running)
    }

    /// Snapshot stream of the run identified by `generation`, or `None` once
    /// a newer run has replaced it.
    pub fn snapshots(&mut self, generation: u64) -> Option<Snapshots<'_>> {
        if generation != self.generation {
            return None;
        }
        self.current.as_mut().map(Simulation::snapshots)
    }

    /// Advances the current run by up to `ticks` ticks without building
    /// snapshots. Returns whether the run is still going.
    pub fn advance(&mut self, ticks: usize) -> bool {
        let Some(simulation) = self.current.as_mut() else {
            return false;
        };
        for _ in 0..ticks {
            if !simulation.tick() {
                break;
            }
        }
        simulation.is_running()
    }
}
