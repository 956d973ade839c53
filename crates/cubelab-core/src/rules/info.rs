//! Information processing: every living cell is a logic gate fed by the decayed
//! outputs of its living neighbors.

use std::time::{SystemTime, UNIX_EPOCH};

use super::RuleContext;
use crate::config::{GateKind, InfoConfig, OscillatorClock};
use crate::state::InfoCell;
use crate::{COLOR_COUNT, Color, CubeTopology, Grid};

/// Decayed signals at or below this level are not seen as inputs.
const INPUT_FLOOR: f32 = 0.01;
/// Output level above which a gate shows its "active" colour.
const ACTIVE_LEVEL: f32 = 0.5;

/// Visible colour of a gate: its own hue when active, the opposite hue otherwise.
#[must_use]
pub fn gate_color(gate: u8, signal: f32) -> Color {
    let hue = gate as usize % COLOR_COUNT;
    if signal > ACTIVE_LEVEL {
        Color(hue as u8)
    } else {
        Color::wrapping(hue + COLOR_COUNT / 2)
    }
}

fn bool_signal(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

fn oscillator_phase(clock: OscillatorClock, generation: u64) -> f32 {
    match clock {
        OscillatorClock::Generation { radians_per_tick } => generation as f32 * radians_per_tick,
        OscillatorClock::WallClock => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64() as f32),
    }
}

/// Output of a gate for one tick. `buffer` is the DELAY line and is updated in place.
#[must_use]
pub fn evaluate_gate(
    kind: GateKind,
    inputs: &[f32],
    buffer: &mut std::collections::VecDeque<f32>,
    config: &InfoConfig,
    generation: u64,
) -> f32 {
    let threshold = config.signal_threshold;
    let high = inputs.iter().filter(|&&signal| signal > threshold).count();
    let strongest = inputs.iter().copied().fold(0.0_f32, f32::max);
    match kind {
        GateKind::Wire => strongest,
        GateKind::And => bool_signal(!inputs.is_empty() && high == inputs.len()),
        GateKind::Or => bool_signal(high > 0),
        GateKind::Xor => bool_signal(high % 2 == 1),
        GateKind::Not => bool_signal(high == 0),
        GateKind::Threshold => bool_signal(high >= 2),
        GateKind::Source => 1.0,
        GateKind::Sink => 0.0,
        GateKind::Delay => {
            buffer.push_back(strongest);
            if buffer.len() > config.propagation_delay.max(1) {
                buffer.pop_front().unwrap_or(0.0)
            } else {
                0.0
            }
        }
        GateKind::Oscillator => {
            bool_signal(oscillator_phase(config.oscillator, generation).sin() > 0.0)
        }
    }
}

/// Produce the next generation under the information-processing rule.
///
/// Cells never die and are never born; only signals and colours change.
pub fn step(
    grid: &Grid,
    cells: &[InfoCell],
    topology: &CubeTopology,
    config: &InfoConfig,
    ctx: &mut RuleContext<'_>,
) -> (Grid, Vec<InfoCell>) {
    let mut next = grid.clone();
    let mut next_cells = vec![InfoCell::default(); grid.len()];
    let carry = 1.0 - config.signal_decay;
    let mut inputs = Vec::with_capacity(26);

    for index in 0..grid.len() {
        if !grid.is_alive(index) {
            continue;
        }
        let mut cell = cells.get(index).cloned().unwrap_or_default();

        inputs.clear();
        for &neighbor in topology.neighbors(index) {
            if !grid.is_alive(neighbor) {
                continue;
            }
            let signal = cells.get(neighbor).map_or(0.0, |n| n.output_signal) * carry;
            if signal > INPUT_FLOOR {
                inputs.push(signal);
            }
        }

        let kind = config.gate_kind(cell.gate);
        if kind != GateKind::Delay {
            cell.input_buffer.clear();
        }
        cell.output_signal = evaluate_gate(
            kind,
            &inputs,
            &mut cell.input_buffer,
            config,
            ctx.generation,
        );
        next.set(index, Some(gate_color(cell.gate, cell.output_signal)));
        next_cells[index] = cell;
    }

    (next, next_cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::init_info;
    use rand::{SeedableRng, rngs::SmallRng};
    use std::collections::VecDeque;

    fn eval(kind: GateKind, inputs: &[f32]) -> f32 {
        let mut buffer = VecDeque::new();
        evaluate_gate(kind, inputs, &mut buffer, &InfoConfig::default(), 1)
    }

    #[test]
    fn truth_tables() {
        assert_eq!(eval(GateKind::Wire, &[0.2, 0.7]), 0.7);
        assert_eq!(eval(GateKind::Wire, &[]), 0.0);
        assert_eq!(eval(GateKind::And, &[0.9, 0.8]), 1.0);
        assert_eq!(eval(GateKind::And, &[0.9, 0.3]), 0.0);
        assert_eq!(eval(GateKind::And, &[]), 0.0);
        assert_eq!(eval(GateKind::Or, &[0.1, 0.6]), 1.0);
        assert_eq!(eval(GateKind::Or, &[0.1]), 0.0);
        assert_eq!(eval(GateKind::Xor, &[0.9, 0.9, 0.9]), 1.0);
        assert_eq!(eval(GateKind::Xor, &[0.9, 0.9]), 0.0);
        assert_eq!(eval(GateKind::Not, &[0.3]), 1.0);
        assert_eq!(eval(GateKind::Not, &[0.6]), 0.0);
        assert_eq!(eval(GateKind::Threshold, &[0.6, 0.7, 0.1]), 1.0);
        assert_eq!(eval(GateKind::Threshold, &[0.6]), 0.0);
        assert_eq!(eval(GateKind::Source, &[]), 1.0);
        assert_eq!(eval(GateKind::Sink, &[1.0]), 0.0);
    }

    #[test]
    fn delay_replays_previous_input() {
        let config = InfoConfig::default();
        let mut buffer = VecDeque::new();
        assert_eq!(evaluate_gate(GateKind::Delay, &[0.8], &mut buffer, &config, 1), 0.0);
        assert_eq!(evaluate_gate(GateKind::Delay, &[0.3], &mut buffer, &config, 2), 0.8);
        assert_eq!(evaluate_gate(GateKind::Delay, &[], &mut buffer, &config, 3), 0.3);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn generation_oscillator_is_deterministic() {
        let config = InfoConfig {
            oscillator: OscillatorClock::Generation {
                radians_per_tick: std::f32::consts::FRAC_PI_2,
            },
            ..InfoConfig::default()
        };
        let mut buffer = VecDeque::new();
        let outputs: Vec<f32> = (1..=4)
            .map(|g| evaluate_gate(GateKind::Oscillator, &[], &mut buffer, &config, g))
            .collect();
        // Phases π/2, π, 3π/2, 2π: only the first is clearly positive.
        assert_eq!(outputs[0], 1.0);
        assert_eq!(outputs[2], 0.0);
    }

    #[test]
    fn gate_colour_flips_with_activity() {
        assert_eq!(gate_color(1, 1.0), Color(1));
        assert_eq!(gate_color(1, 0.0), Color(4));
        assert_eq!(gate_color(7, 0.9), Color(1));
        assert_eq!(gate_color(5, 0.2), Color(2));
    }

    #[test]
    fn source_drives_adjacent_wire() {
        let topology = CubeTopology::new(2).expect("topology");
        let mut grid = Grid::empty(2);
        grid.set(0, Some(Color(5)));
        grid.set(1, Some(Color(0)));
        let cells = init_info(&grid, &InfoConfig::default());
        let mut rng = SmallRng::seed_from_u64(0);
        let mut ctx = RuleContext {
            generation: 1,
            rng: &mut rng,
        };
        let config = InfoConfig::default();
        let (g1, c1) = step(&grid, &cells, &topology, &config, &mut ctx);
        assert_eq!(c1[0].output_signal, 1.0);
        assert_eq!(g1.get(0), Some(Color(5)));
        assert_eq!(g1.get(1), Some(Color(3)), "wire idle on the first tick");

        ctx.generation = 2;
        let (g2, c2) = step(&g1, &c1, &topology, &config, &mut ctx);
        assert!((c2[1].output_signal - 0.9).abs() < 1e-6);
        assert_eq!(g2.get(1), Some(Color(0)));
        assert_eq!(g2.population(), 2);
    }

    #[test]
    fn remapped_colour_runs_a_delay_gate() {
        let topology = CubeTopology::new(2).expect("topology");
        let mut grid = Grid::empty(2);
        grid.set(0, Some(Color(5)));
        grid.set(1, Some(Color(2)));
        let mut config = InfoConfig::default();
        config.gate_types.insert(2, GateKind::Delay);
        let cells = init_info(&grid, &config);
        assert_eq!(config.gate_kind(cells[1].gate), GateKind::Delay);

        let mut rng = SmallRng::seed_from_u64(0);
        let mut ctx = RuleContext {
            generation: 1,
            rng: &mut rng,
        };
        let (g1, c1) = step(&grid, &cells, &topology, &config, &mut ctx);
        ctx.generation = 2;
        let (g2, c2) = step(&g1, &c1, &topology, &config, &mut ctx);
        assert_eq!(c2[1].output_signal, 0.0, "source reaches the line one tick late");
        assert_eq!(g2.get(1), Some(Color(5)));
        ctx.generation = 3;
        let (g3, c3) = step(&g2, &c2, &topology, &config, &mut ctx);
        assert!((c3[1].output_signal - 0.9).abs() < 1e-6);
        assert_eq!(g3.get(1), Some(Color(2)));
    }
}
