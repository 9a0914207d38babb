use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;
use super::SimulationEdge;

const MIN_DISTANCE_SQ: f32 = 1.0;

/// Direction used when two points coincide, derived from their indices so that
/// the split is deterministic.
fn separation_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * TAU;
    vec2(angle.cos(), angle.sin())
}

fn repulsion_between(
    point: Vec2,
    other: Vec2,
    index: usize,
    other_index: usize,
    strength: f32,
) -> Vec2 {
    let delta = point - other;
    let length_sq = delta.length_sq();
    if length_sq <= 1e-8 {
        return separation_direction(index, other_index) * strength;
    }
    // |delta| * strength / |delta|^2 falls off with the inverse distance.
    delta * (strength / length_sq.max(MIN_DISTANCE_SQ))
}

pub(super) fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    strength: f32,
    theta: f32,
    delta_v: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let other = positions[other_index];
            *delta_v += repulsion_between(point, other, index, other_index, strength);
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance_sq = delta.length_sq().max(MIN_DISTANCE_SQ);
    let distance = distance_sq.sqrt();
    let can_approximate = !node.bounds.contains(point)
        && (node.bounds.side_length() / distance) < theta
        && node.mass > 1.0;

    if can_approximate {
        *delta_v += delta * (strength * node.mass / distance_sq);
        return;
    }

    for child in node.children.iter() {
        accumulate_repulsion_for_node(child, index, positions, strength, theta, delta_v);
    }
}

/// Spring toward `rest_length`, evaluated on velocity-predicted positions.
/// The pull on each endpoint is split by degree so hubs move less.
pub(super) fn apply_links(
    edges: &[SimulationEdge],
    degrees: &[usize],
    positions: &[Vec2],
    velocities: &[Vec2],
    rest_length: f32,
    alpha: f32,
    delta_v: &mut [Vec2],
) {
    for edge in edges {
        let (source, target) = (edge.source, edge.target);
        if source == target {
            continue;
        }

        let mut delta = (positions[target] + velocities[target] + delta_v[target])
            - (positions[source] + velocities[source] + delta_v[source]);
        let mut distance = delta.length();
        if distance <= 1e-4 {
            delta = separation_direction(source, target) * 1e-2;
            distance = delta.length();
        }

        let source_degree = degrees[source].max(1) as f32;
        let target_degree = degrees[target].max(1) as f32;
        let strength = 1.0 / source_degree.min(target_degree);
        let bias = source_degree / (source_degree + target_degree);

        let pull = delta * ((distance - rest_length) / distance * alpha * strength);
        delta_v[target] -= pull * bias;
        delta_v[source] += pull * (1.0 - bias);
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) max_reach_sq: f32,
}

fn resolve_overlap(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    corrections: &mut [Vec2],
) {
    let delta = positions[from] - positions[to];
    let distance = delta.length();
    let min_distance = radii[from] + radii[to];
    if distance >= min_distance {
        return;
    }

    let direction = if distance > 1e-4 {
        delta / distance
    } else {
        separation_direction(from, to)
    };

    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let from_share = to_sq / (from_sq + to_sq).max(f32::EPSILON);
    let push = direction * ((min_distance - distance) * params.strength);
    corrections[from] += push * from_share;
    corrections[to] -= push * (1.0 - from_share);
}

pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    corrections: &mut [Vec2],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_reach_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    resolve_overlap(from, to, positions, radii, params, corrections);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    resolve_overlap(from, to, positions, radii, params, corrections);
                }
            }
        }
        return;
    }

    if same_node {
        for (offset, child_a) in node_a.children.iter().enumerate() {
            accumulate_collision_pairs(
                child_a,
                child_a,
                true,
                positions,
                radii,
                params,
                corrections,
            );
            for child_b in &node_a.children[offset + 1..] {
                accumulate_collision_pairs(
                    child_a,
                    child_b,
                    false,
                    positions,
                    radii,
                    params,
                    corrections,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter() {
            accumulate_collision_pairs(child, node_b, false, positions, radii, params, corrections);
        }
    } else {
        for child in node_b.children.iter() {
            accumulate_collision_pairs(node_a, child, false, positions, radii, params, corrections);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_repulsion(positions: &[Vec2], strength: f32) -> Vec<Vec2> {
        (0..positions.len())
            .map(|index| {
                (0..positions.len())
                    .filter(|&other| other != index)
                    .fold(Vec2::ZERO, |sum, other| {
                        let (point, other_point) = (positions[index], positions[other]);
                        sum + repulsion_between(point, other_point, index, other, strength)
                    })
            })
            .collect()
    }

    fn scattered(count: usize) -> Vec<Vec2> {
        (0..count)
            .map(|index| {
                let angle = index as f32 * 2.399_963;
                vec2(angle.cos(), angle.sin()) * (12.0 * (index as f32 + 0.5).sqrt())
            })
            .collect()
    }

    #[test]
    fn exact_when_theta_is_zero() {
        let positions = scattered(60);
        let tree = QuadNode::build(&positions).expect("tree");
        let expected = brute_force_repulsion(&positions, 200.0);

        for (index, expected) in expected.iter().enumerate() {
            let mut delta_v = Vec2::ZERO;
            accumulate_repulsion_for_node(&tree, index, &positions, 200.0, 0.0, &mut delta_v);
            assert!((delta_v - *expected).length() <= 1e-3 * expected.length().max(1.0));
        }
    }

    #[test]
    fn distant_cluster_is_approximated_by_its_center_of_mass() {
        let mut positions = scattered(100);
        positions.push(vec2(2000.0, 0.0));
        let probe = positions.len() - 1;
        let tree = QuadNode::build(&positions).expect("tree");
        let expected = brute_force_repulsion(&positions, 200.0)[probe];

        let mut delta_v = Vec2::ZERO;
        accumulate_repulsion_for_node(&tree, probe, &positions, 200.0, 0.8, &mut delta_v);

        assert!((delta_v - expected).length() <= 0.01 * expected.length());
    }

    #[test]
    fn repulsion_pushes_points_apart() {
        let push = repulsion_between(vec2(10.0, 0.0), Vec2::ZERO, 0, 1, 100.0);
        assert!(push.x > 0.0);
        assert!((push.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn overlapping_circles_are_pushed_apart_by_size() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let radii = vec![20.0, 10.0];
        let mut corrections = vec![Vec2::ZERO; 2];
        let params = CollisionParams {
            strength: 1.0,
            max_reach_sq: f32::INFINITY,
        };

        resolve_overlap(0, 1, &positions, &radii, params, &mut corrections);

        assert!(corrections[0].x < 0.0);
        assert!(corrections[1].x > 0.0);
        assert!(corrections[1].x > -corrections[0].x);
        assert!(((corrections[1].x - corrections[0].x) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn spring_pulls_long_edges_together() {
        let edges = vec![SimulationEdge {
            id: 1,
            source: 0,
            target: 1,
            amount: 1.0,
        }];
        let positions = vec![vec2(0.0, 0.0), vec2(300.0, 0.0)];
        let velocities = vec![Vec2::ZERO; 2];
        let mut delta_v = vec![Vec2::ZERO; 2];

        apply_links(&edges, &[1, 1], &positions, &velocities, 120.0, 1.0, &mut delta_v);

        assert!(delta_v[0].x > 0.0);
        assert!(delta_v[1].x < 0.0);
        assert!((delta_v[0].x - 90.0).abs() < 1e-3);
    }
}
