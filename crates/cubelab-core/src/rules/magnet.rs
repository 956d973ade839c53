//! Magnetic alignment: spins drift towards their neighbors' average direction,
//! nudged by external fields, vortices and thermal noise.

use std::f32::consts::{PI, TAU};

use rand::Rng;

use super::RuleContext;
use crate::config::MagnetConfig;
use crate::state::{MagnetCell, Vec3};
use crate::{COLOR_COUNT, Color, CubeTopology, Grid};

/// Weight of the uniform global field added to every spin.
const GLOBAL_FIELD_WEIGHT: f32 = 0.1;
/// Weight of the tangential pull of each vortex centre.
const VORTEX_WEIGHT: f32 = 0.2;
/// Per-tick geometric cooling of the informational temperature.
const COOLING: f32 = 0.99;
/// Spins weaker than this keep their current colour.
const COLOR_STRENGTH_THRESHOLD: f32 = 0.1;

/// Colour bucket for a spin direction, from its hue around the Y axis.
#[must_use]
pub fn spin_color(spin: Vec3) -> Color {
    let hue = (spin.z.atan2(spin.x) + PI) / TAU;
    let bucket = (hue * COLOR_COUNT as f32).floor();
    if bucket.is_finite() {
        Color(bucket.clamp(0.0, (COLOR_COUNT - 1) as f32) as u8)
    } else {
        Color(0)
    }
}

/// Unit tangent of a circle around the vertical axis through `center`.
fn vortex_pull(position: Vec3, center: Vec3) -> Vec3 {
    let offset = position - center;
    Vec3::new(-offset.z, 0.0, offset.x).normalized()
}

/// Produce the next generation under magnetic alignment.
///
/// Living cells never die and empty cells are never born; only spins and
/// colours evolve.
pub fn step(
    grid: &Grid,
    cells: &[MagnetCell],
    topology: &CubeTopology,
    config: &MagnetConfig,
    ctx: &mut RuleContext<'_>,
) -> (Grid, Vec<MagnetCell>) {
    let mut next = grid.clone();
    let mut next_cells = vec![MagnetCell::default(); grid.len()];
    let blend = (config.alignment_strength * (1.0 - config.viscosity)).clamp(0.0, 1.0);
    let radius = config.alignment_radius.max(1);

    for index in 0..grid.len() {
        let Some(color) = grid.get(index) else {
            continue;
        };
        let current = cells.get(index).copied().unwrap_or_default();

        let mut weighted = Vec3::ZERO;
        let mut total_weight = 0.0_f32;
        topology.neighbors_within(index, radius, &mut |neighbor, distance| {
            if !grid.is_alive(neighbor) {
                return;
            }
            let weight = 1.0 / distance;
            let spin = cells.get(neighbor).map_or(Vec3::ZERO, |cell| cell.spin);
            weighted += spin * weight;
            total_weight += weight;
        });
        let average = if total_weight > 0.0 {
            weighted * (1.0 / total_weight)
        } else {
            Vec3::ZERO
        };

        let mut spin = current.spin;
        if total_weight > 0.0 {
            spin += (average - spin) * blend;
        }
        if let Some(field) = config.global_field {
            spin += field * GLOBAL_FIELD_WEIGHT;
        }
        if !config.vortex_centers.is_empty() {
            let [x, y, z] = topology.coord(index).to_f32();
            let position = Vec3::new(x, y, z);
            for &center in &config.vortex_centers {
                spin += vortex_pull(position, center) * VORTEX_WEIGHT;
            }
        }
        if config.turbulence > 0.0 {
            spin += Vec3::new(
                ctx.rng.random_range(-1.0..=1.0),
                ctx.rng.random_range(-1.0..=1.0),
                ctx.rng.random_range(-1.0..=1.0),
            ) * config.turbulence;
        }
        let spin = spin.normalized();
        let spin_strength = average.length();

        let color = if spin_strength > COLOR_STRENGTH_THRESHOLD {
            spin_color(spin)
        } else {
            color
        };
        next.set(index, Some(color));
        next_cells[index] = MagnetCell {
            spin,
            spin_strength,
            temperature: current.temperature * COOLING,
        };
    }

    (next, next_cells)
}
