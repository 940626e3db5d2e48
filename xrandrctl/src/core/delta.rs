//! Brightness/gamma arithmetic for adjustment directions.
//!
//! No clamping: values may go negative or above 1.0, matching what the
//! display tool itself accepts.

use crate::core::types::{Deltas, Direction, Gamma, Levels};

/// Apply a single direction to `levels`.
pub fn apply(levels: Levels, deltas: &Deltas, direction: Direction) -> Levels {
    match direction {
        Direction::Brighter => Levels {
            brightness: levels.brightness + deltas.brightness_delta,
            ..levels
        },
        Direction::Dimmer => Levels {
            brightness: levels.brightness - deltas.brightness_delta,
            ..levels
        },
        Direction::Redder => Levels {
            gamma: combine(levels.gamma, deltas.gamma_delta, |value, delta| {
                value - delta
            }),
            ..levels
        },
        Direction::Bluer => Levels {
            gamma: combine(levels.gamma, deltas.gamma_delta, |value, delta| {
                value + delta
            }),
            ..levels
        },
        Direction::Reset => Levels::RESET,
    }
}

/// Apply every direction to the same base, in order.
///
/// `Reset` anywhere in `directions` wins: the result is the reset levels and
/// the remaining directions are ignored.
pub fn apply_all(levels: Levels, deltas: &Deltas, directions: &[Direction]) -> Levels {
    if directions.contains(&Direction::Reset) {
        return Levels::RESET;
    }
    directions
        .iter()
        .fold(levels, |acc, direction| apply(acc, deltas, *direction))
}

fn combine(gamma: Gamma, delta: Gamma, op: impl Fn(f64, f64) -> f64) -> Gamma {
    [
        op(gamma[0], delta[0]),
        op(gamma[1], delta[1]),
        op(gamma[2], delta[2]),
    ]
}
