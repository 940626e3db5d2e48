//! Argument lists for the display tool.

use crate::core::types::Levels;

/// Fixed-point precision for rendered brightness/gamma values.
pub const DECIMAL_PLACES: usize = 3;

/// Build the arguments that set `output` to `levels`.
///
/// The program name is not included; the runner prepends it.
pub fn build(output: &str, levels: &Levels) -> Vec<String> {
    vec![
        "--output".to_string(),
        output.to_string(),
        "--brightness".to_string(),
        format_value(levels.brightness),
        "--gamma".to_string(),
        format_gamma(levels),
    ]
}

fn format_gamma(levels: &Levels) -> String {
    levels
        .gamma
        .iter()
        .map(|value| format_value(*value))
        .collect::<Vec<_>>()
        .join(":")
}

fn format_value(value: f64) -> String {
    format!("{:.*}", DECIMAL_PLACES, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_orders_output_brightness_gamma() {
        let levels = Levels {
            brightness: 1.1,
            gamma: [1.0, 1.025, 1.05],
        };
        assert_eq!(
            build("HDMI-1", &levels),
            vec![
                "--output",
                "HDMI-1",
                "--brightness",
                "1.100",
                "--gamma",
                "1.000:1.025:1.050",
            ]
        );
    }

    #[test]
    fn build_renders_accumulated_float_noise_cleanly() {
        let levels = Levels {
            brightness: 0.1 + 0.2,
            gamma: [1.0, 1.0 - 0.025 - 0.025, 1.0],
        };
        let args = build("DVI-1", &levels);
        assert_eq!(args[3], "0.300");
        assert_eq!(args[5], "1.000:0.950:1.000");
    }

    #[test]
    fn build_keeps_negative_values() {
        let levels = Levels {
            brightness: -0.05,
            gamma: [1.0, 1.0, 1.0],
        };
        assert_eq!(build("eDP-1", &levels)[3], "-0.050");
    }
}
