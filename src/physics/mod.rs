mod forces;
mod quadtree;
mod slot;

use std::collections::{BTreeMap, HashMap};
use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};
use serde::Serialize;
use tracing::{debug, warn};

use crate::finance::{EntityId, Subgraph};
use crate::scale::GraphScales;
use crate::util::stable_pair;
use forces::{
    CollisionParams, accumulate_collision_pairs, accumulate_repulsion_for_node, apply_links,
};
use quadtree::QuadNode;
pub use slot::LayoutSlot;

/// Tuning for one layout run. The defaults are empirically chosen for graphs
/// of a few hundred entities on a desktop-sized canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConfig {
    pub link_distance: f32,
    pub repulsion_strength: f32,
    pub barnes_hut_theta: f32,
    pub center_strength: f32,
    pub gravity: f32,
    pub collision_padding: f32,
    pub collision_strength: f32,
    pub velocity_retention: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    /// Converged once the mean distance a node moved during one tick, centring
    /// shift included, drops below this.
    pub settle_displacement: f32,
    pub max_speed: f32,
    pub step_budget: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance: 120.0,
            repulsion_strength: 200.0,
            barnes_hut_theta: 0.8,
            center_strength: 0.1,
            gravity: 0.01,
            collision_padding: 6.0,
            collision_strength: 0.7,
            velocity_retention: 0.6,
            alpha_min: 0.001,
            // Reaches `alpha_min` after roughly 300 ticks.
            alpha_decay: 1.0 - 0.001_f32.powf(1.0 / 300.0),
            settle_displacement: 0.01,
            max_speed: 80.0,
            step_budget: 300,
        }
    }
}

impl LayoutConfig {
    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    BudgetExhausted,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
    Initializing,
    Stepping,
    Converged,
    Stopped(StopReason),
}

impl SimulationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Stopped(_))
    }
}

#[derive(Clone, Debug)]
pub struct SimulationNode {
    pub id: EntityId,
    pub value: f64,
    pub radius: f32,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Edge bound to its endpoints by index into the node arena.
#[derive(Clone, Debug)]
pub struct SimulationEdge {
    pub id: i64,
    pub source: usize,
    pub target: usize,
    pub amount: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PositionSnapshot {
    pub generation: u64,
    pub tick: usize,
    pub positions: BTreeMap<EntityId, Point>,
}

#[derive(Default)]
struct Scratch {
    origins: Vec<Vec2>,
    velocities: Vec<Vec2>,
    positions: Vec<Vec2>,
    collision_radii: Vec<f32>,
    delta_v: Vec<Vec2>,
    corrections: Vec<Vec2>,
}

pub struct Simulation {
    generation: u64,
    config: LayoutConfig,
    center: Vec2,
    nodes: Vec<SimulationNode>,
    edges: Vec<SimulationEdge>,
    degrees: Vec<usize>,
    index_by_id: HashMap<EntityId, usize>,
    state: SimulationState,
    alpha: f32,
    tick_count: usize,
    mean_displacement: f32,
    scratch: Scratch,
}

impl Simulation {
    /// Binds a subgraph to physical state. Repeated node ids keep their first
    /// occurrence and edges with an unknown endpoint are dropped.
    pub fn new(
        subgraph: &Subgraph,
        scales: &GraphScales,
        canvas: Vec2,
        config: LayoutConfig,
    ) -> Self {
        let center = canvas * 0.5;
        let mut index_by_id = HashMap::with_capacity(subgraph.nodes.len());
        let mut nodes = Vec::with_capacity(subgraph.nodes.len());
        for entity in &subgraph.nodes {
            if index_by_id.contains_key(&entity.id) {
                continue;
            }
            let index = nodes.len();
            index_by_id.insert(entity.id, index);

            let value = entity.value();
            nodes.push(SimulationNode {
                id: entity.id,
                value,
                radius: scales.radius.map(value),
                position: initial_position(center, index, entity.id),
                velocity: Vec2::ZERO,
            });
        }

        let mut degrees = vec![0usize; nodes.len()];
        let edges = subgraph
            .edges
            .iter()
            .filter_map(|edge| {
                let source = *index_by_id.get(&edge.source)?;
                let target = *index_by_id.get(&edge.target)?;
                Some(SimulationEdge {
                    id: edge.id,
                    source,
                    target,
                    amount: edge.weight(),
                })
            })
            .collect::<Vec<_>>();
        for edge in &edges {
            if edge.source != edge.target {
                degrees[edge.source] += 1;
                degrees[edge.target] += 1;
            }
        }

        Self {
            generation: 0,
            config,
            center,
            nodes,
            edges,
            degrees,
            index_by_id,
            state: SimulationState::Initializing,
            alpha: 1.0,
            tick_count: 0,
            mean_displacement: 0.0,
            scratch: Scratch::default(),
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Starts matching nodes from previously computed positions instead of the
    /// default spiral. Ignored once the run has started stepping.
    pub fn with_seed_positions(mut self, seeds: &HashMap<EntityId, Vec2>) -> Self {
        if self.state != SimulationState::Initializing {
            return self;
        }
        for node in &mut self.nodes {
            if let Some(seed) = seeds.get(&node.id).filter(|seed| seed.is_finite()) {
                node.position = *seed;
            }
        }
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn tick_count(&self) -> usize {
        self.tick_count
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Average distance moved per node during the latest tick.
    pub fn mean_displacement(&self) -> f32 {
        self.mean_displacement
    }

    pub fn nodes(&self) -> &[SimulationNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SimulationEdge] {
        &self.edges
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.index_by_id.get(&id).copied()
    }

    #[cfg(test)]
    pub fn position_of(&self, id: EntityId) -> Option<Vec2> {
        self.index_of(id).map(|index| self.nodes[index].position)
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            generation: self.generation,
            tick: self.tick_count,
            positions: self
                .nodes
                .iter()
                .map(|node| {
                    (
                        node.id,
                        Point {
                            x: node.position.x,
                            y: node.position.y,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Cancels the run. Velocities and force accumulators are released and no
    /// further ticks happen; positions stay as last emitted.
    pub fn stop(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = SimulationState::Stopped(StopReason::Cancelled);
        self.release();
        debug!(generation = self.generation, ticks = self.tick_count, "layout cancelled");
    }

    /// Advances one tick and returns the resulting positions, or `None` once
    /// the run is terminal.
    pub fn step(&mut self) -> Option<PositionSnapshot> {
        self.tick().then(|| self.snapshot())
    }

    pub fn snapshots(&mut self) -> Snapshots<'_> {
        Snapshots { simulation: self }
    }

    /// Runs to a terminal state without producing snapshots.
    #[cfg(test)]
    pub fn run_to_end(&mut self) -> SimulationState {
        while self.tick() {}
        self.state
    }

    /// Advances one tick. Returns `false` without doing anything when the run
    /// is already terminal.
    pub fn tick(&mut self) -> bool {
        match self.state {
            SimulationState::Converged | SimulationState::Stopped(_) => return false,
            SimulationState::Initializing => {
                if self.config.step_budget == 0 {
                    self.finish(SimulationState::Stopped(StopReason::BudgetExhausted));
                    return false;
                }
                self.state = SimulationState::Stepping;
            }
            SimulationState::Stepping => {}
        }

        self.alpha += (0.0 - self.alpha) * self.config.alpha_decay;
        self.apply_forces();
        self.tick_count += 1;

        if self.tick_count >= self.config.step_budget {
            self.finish(SimulationState::Stopped(StopReason::BudgetExhausted));
        } else if self.alpha < self.config.alpha_min
            || self.mean_displacement < self.config.settle_displacement
        {
            self.finish(SimulationState::Converged);
        }
        true
    }

    fn finish(&mut self, state: SimulationState) {
        self.state = state;
        self.release();
        debug!(
            generation = self.generation,
            ticks = self.tick_count,
            ?state,
            "layout finished"
        );
    }

    fn release(&mut self) {
        self.scratch = Scratch::default();
        for node in &mut self.nodes {
            node.velocity = Vec2::ZERO;
        }
    }

    fn apply_forces(&mut self) {
        let node_count = self.nodes.len();
        if node_count == 0 {
            self.mean_displacement = 0.0;
            return;
        }

        let config = self.config;
        let alpha = self.alpha;
        let scratch = &mut self.scratch;
        scratch.origins.clear();
        scratch.velocities.clear();
        scratch.collision_radii.clear();
        scratch.delta_v.clear();
        scratch.delta_v.resize(node_count, Vec2::ZERO);
        scratch.corrections.clear();
        scratch.corrections.resize(node_count, Vec2::ZERO);
        let mut max_radius = 0.0_f32;
        for node in &self.nodes {
            scratch.origins.push(node.position);
            scratch.velocities.push(node.velocity);
            let radius = node.radius + config.collision_padding;
            scratch.collision_radii.push(radius);
            max_radius = max_radius.max(radius);
        }

        if let Some(tree) = QuadNode::build(&scratch.origins) {
            let strength = config.repulsion_strength * alpha;
            for (index, delta_v) in scratch.delta_v.iter_mut().enumerate() {
                accumulate_repulsion_for_node(
                    &tree,
                    index,
                    &scratch.origins,
                    strength,
                    config.barnes_hut_theta,
                    delta_v,
                );
            }
        }

        apply_links(
            &self.edges,
            &self.degrees,
            &scratch.origins,
            &scratch.velocities,
            config.link_distance,
            alpha,
            &mut scratch.delta_v,
        );

        for (delta_v, origin) in scratch.delta_v.iter_mut().zip(&scratch.origins) {
            *delta_v += (self.center - *origin) * (config.gravity * alpha);
        }

        let max_speed_sq = config.max_speed * config.max_speed;
        let mut clamped = 0usize;
        scratch.positions.clear();
        for (node, delta_v) in self.nodes.iter_mut().zip(&scratch.delta_v) {
            let mut velocity = (node.velocity + *delta_v) * config.velocity_retention;
            if !velocity.is_finite() {
                velocity = Vec2::ZERO;
                clamped += 1;
            }
            let speed_sq = velocity.length_sq();
            if speed_sq > max_speed_sq {
                velocity *= config.max_speed / speed_sq.sqrt();
                clamped += 1;
            }
            node.velocity = velocity;
            node.position += velocity;
            scratch.positions.push(node.position);
        }

        // Overlaps are measured on the integrated positions.
        if let Some(tree) = QuadNode::build(&scratch.positions) {
            let reach = max_radius * 2.0;
            accumulate_collision_pairs(
                &tree,
                &tree,
                true,
                &scratch.positions,
                &scratch.collision_radii,
                CollisionParams {
                    strength: config.collision_strength,
                    max_reach_sq: reach * reach,
                },
                &mut scratch.corrections,
            );
        }

        let mut centroid = Vec2::ZERO;
        for (node, correction) in self.nodes.iter_mut().zip(&scratch.corrections) {
            let mut correction = *correction;
            if !correction.is_finite() {
                correction = Vec2::ZERO;
                clamped += 1;
            }
            let length = correction.length();
            if length > config.max_speed {
                correction *= config.max_speed / length;
                clamped += 1;
            }
            node.position += correction;
            centroid += node.position;
        }
        centroid /= node_count as f32;

        let shift = (self.center - centroid) * config.center_strength;
        let mut displacement = 0.0_f32;
        for (node, origin) in self.nodes.iter_mut().zip(&scratch.origins) {
            node.position += shift;
            if !node.position.is_finite() {
                node.position = *origin;
                node.velocity = Vec2::ZERO;
                clamped += 1;
            }
            displacement += (node.position - *origin).length();
        }
        self.mean_displacement = displacement / node_count as f32;

        if clamped > 0 {
            warn!(
                generation = self.generation,
                tick = self.tick_count,
                clamped,
                "clamped runaway layout motion"
            );
        }
    }
}

/// Ticks the simulation on demand, one snapshot per tick, until it is terminal.
pub struct Snapshots<'a> {
    simulation: &'a mut Simulation,
}

impl Iterator for Snapshots<'_> {
    type Item = PositionSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        self.simulation.step()
    }
}

/// Phyllotaxis spiral around the canvas centre, nudged by a stable per-id
/// jitter so that coincident starts cannot happen.
fn initial_position(center: Vec2, index: usize, id: EntityId) -> Vec2 {
    const INITIAL_RADIUS: f32 = 10.0;
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());

    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * golden_angle;
    let (jx, jy) = stable_pair(&id);
    center + vec2(angle.cos(), angle.sin()) * radius + vec2(jx, jy)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::finance::{Edge, Entity, entity};

    use super::*;

    const CANVAS: Vec2 = vec2(1200.0, 800.0);

    fn ring(count: usize) -> Subgraph {
        let nodes = (0..count as i64)
            .map(|id| entity(id, 10.0 * (id as f64 + 1.0), 5.0))
            .collect::<Vec<_>>();
        let edges = (0..count as i64)
            .map(|id| Edge::new(id, id, (id + 1) % count as i64, 3.0))
            .collect::<Vec<_>>();
        Subgraph { nodes, edges }
    }

    fn simulation(subgraph: &Subgraph, config: LayoutConfig) -> Simulation {
        let scales = GraphScales::for_subgraph(subgraph);
        Simulation::new(subgraph, &scales, CANVAS, config)
    }

    fn all_finite(snapshot: &PositionSnapshot) -> bool {
        snapshot
            .positions
            .values()
            .all(|point| point.x.is_finite() && point.y.is_finite())
    }

    #[test]
    fn dangling_edges_are_dropped_at_bind_time() {
        let subgraph = Subgraph {
            nodes: vec![entity(1, 1.0, 0.0), entity(2, 1.0, 0.0)],
            edges: vec![Edge::new(1, 1, 2, 1.0), Edge::new(2, 1, 77, 1.0)],
        };
        let simulation = simulation(&subgraph, LayoutConfig::default());
        assert_eq!(simulation.edges().len(), 1);
        assert_eq!(simulation.edges()[0].id, 1);
    }

    #[test]
    fn starts_in_initializing_and_steps() {
        let mut simulation = simulation(&ring(6), LayoutConfig::default());
        assert_eq!(simulation.state(), SimulationState::Initializing);
        assert_eq!(simulation.snapshot().positions.len(), 6);

        let snapshot = simulation.step().expect("first tick");
        assert_eq!(snapshot.tick, 1);
        assert_eq!(simulation.state(), SimulationState::Stepping);
    }

    #[test]
    fn emits_at_most_the_step_budget() {
        let mut simulation = simulation(&ring(12), LayoutConfig::default().with_step_budget(25));
        let emitted = simulation.snapshots().count();
        assert!(emitted <= 25);
        assert!(simulation.state().is_terminal());
        assert!(simulation.step().is_none());
    }

    #[test]
    fn settling_is_judged_on_per_tick_displacement() {
        let config = LayoutConfig {
            alpha_min: 0.0,
            settle_displacement: f32::MAX,
            ..LayoutConfig::default()
        };
        let mut settled = simulation(&ring(6), config);
        assert_eq!(settled.run_to_end(), SimulationState::Converged);
        assert_eq!(settled.tick_count(), 1);

        let config = LayoutConfig {
            alpha_min: 0.0,
            settle_displacement: 0.0,
            ..LayoutConfig::default().with_step_budget(5)
        };
        let mut restless = simulation(&ring(6), config);
        assert_eq!(
            restless.run_to_end(),
            SimulationState::Stopped(StopReason::BudgetExhausted)
        );
        assert_eq!(restless.tick_count(), 5);
    }

    #[test]
    fn zero_budget_never_ticks() {
        let mut simulation = simulation(&ring(3), LayoutConfig::default().with_step_budget(0));
        assert!(simulation.step().is_none());
        assert_eq!(
            simulation.state(),
            SimulationState::Stopped(StopReason::BudgetExhausted)
        );
    }

    #[test]
    fn stop_halts_further_updates() {
        let mut simulation = simulation(&ring(10), LayoutConfig::default());
        let emitted = simulation.snapshots().take(5).collect::<Vec<_>>();
        assert_eq!(emitted.len(), 5);

        simulation.stop();
        let frozen = simulation.snapshot();
        assert_eq!(simulation.state(), SimulationState::Stopped(StopReason::Cancelled));
        assert!(simulation.step().is_none());
        assert_eq!(simulation.snapshot(), frozen);
        assert_eq!(emitted[4].tick, 5);
    }

    #[test]
    fn empty_graph_terminates() {
        let mut simulation = simulation(&Subgraph::default(), LayoutConfig::default());
        let state = simulation.run_to_end();
        assert!(state.is_terminal());
        assert!(simulation.snapshot().positions.is_empty());
    }

    #[test]
    fn motion_dies_down_over_the_run() {
        let mut simulation = simulation(&ring(40), LayoutConfig::default().with_step_budget(300));
        let mut displacements = Vec::new();
        while simulation.tick() {
            displacements.push(simulation.mean_displacement());
        }

        assert!(displacements.len() >= 40);
        let window = displacements.len() / 5;
        let early = displacements[..window].iter().sum::<f32>() / window as f32;
        let late = displacements[displacements.len() - window..]
            .iter()
            .sum::<f32>()
            / window as f32;
        assert!(late < early, "late {late} >= early {early}");
    }

    #[test]
    fn isolated_nodes_settle_near_the_graph() {
        let mut subgraph = ring(8);
        subgraph.nodes.push(entity(99, 0.0, 0.0));
        let mut simulation = simulation(&subgraph, LayoutConfig::default());
        simulation.run_to_end();

        let position = simulation.position_of(99).expect("isolated node is laid out");
        assert!(position.is_finite());
        assert!((position - CANVAS * 0.5).length() < 1000.0);
    }

    #[test]
    fn collisions_separate_overlapping_nodes() {
        let subgraph = Subgraph {
            nodes: vec![entity(1, 5000.0, 0.0), entity(2, 5000.0, 0.0)],
            edges: vec![Edge::new(1, 1, 2, 1.0)],
        };
        let mut seeds = HashMap::new();
        seeds.insert(1, CANVAS * 0.5);
        seeds.insert(2, CANVAS * 0.5 + vec2(1.0, 0.0));
        let mut simulation =
            simulation(&subgraph, LayoutConfig::default()).with_seed_positions(&seeds);
        simulation.run_to_end();

        let nodes = simulation.nodes();
        let distance = (nodes[0].position - nodes[1].position).length();
        let min_distance = nodes[0].radius + nodes[1].radius;
        assert!(distance >= min_distance * 0.95, "{distance} < {min_distance}");
    }

    #[test]
    fn coincident_starts_do_not_produce_nan() {
        let nodes = (0..30).map(|id| entity(id, 1.0, 1.0)).collect::<Vec<Entity>>();
        let subgraph = Subgraph { nodes, edges: Vec::new() };
        let seeds = (0..30).map(|id| (id, vec2(10.0, 10.0))).collect::<HashMap<_, _>>();
        let mut simulation =
            simulation(&subgraph, LayoutConfig::default()).with_seed_positions(&seeds);

        for snapshot in simulation.snapshots().take(50) {
            assert!(all_finite(&snapshot));
        }
    }

    #[test]
    fn centroid_is_pulled_toward_canvas_center() {
        let mut simulation = simulation(&ring(20), LayoutConfig::default());
        simulation.run_to_end();

        let centroid = simulation
            .nodes()
            .iter()
            .fold(Vec2::ZERO, |sum, node| sum + node.position)
            / simulation.nodes().len() as f32;
        assert!((centroid - CANVAS * 0.5).length() < 25.0);
    }

    #[test]
    fn runs_are_reproducible() {
        let subgraph = ring(15);
        let mut first = simulation(&subgraph, LayoutConfig::default());
        let mut second = simulation(&subgraph, LayoutConfig::default());
        first.run_to_end();
        second.run_to_end();
        assert_eq!(first.snapshot(), second.snapshot());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn layout_always_terminates_within_budget(
            node_count in 0usize..40,
            raw_edges in prop::collection::vec((0i64..40, 0i64..40), 0..60),
            budget in 0usize..120,
        ) {
            let nodes = (0..node_count as i64).map(|id| entity(id, id as f64, 1.0)).collect();
            let edges = raw_edges
                .into_iter()
                .enumerate()
                .map(|(index, (source, target))| Edge::new(index as i64, source, target, 1.0))
                .collect();
            let subgraph = Subgraph { nodes, edges };

            let config = LayoutConfig::default().with_step_budget(budget);
            let mut simulation = simulation(&subgraph, config);
            let mut emitted = 0usize;
            for snapshot in simulation.snapshots() {
                emitted += 1;
                prop_assert!(all_finite(&snapshot));
            }
            prop_assert!(emitted <= budget);
            prop_assert!(simulation.state().is_terminal());
        }
    }
}
