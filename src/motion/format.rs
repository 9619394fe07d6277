//! Fixed-precision rendering of sensor vectors.

use super::types::{Channel, Vector3};

pub const RAW_PRECISION: usize = 4;
pub const FUSED_PRECISION: usize = 6;

const RAW_SEPARATOR: &str = " | ";
const FUSED_SEPARATOR: &str = ", ";

/// How one channel renders its vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatStyle {
    pub precision: usize,
    pub separator: &'static str,
}

impl FormatStyle {
    pub const RAW: FormatStyle = FormatStyle {
        precision: RAW_PRECISION,
        separator: RAW_SEPARATOR,
    };

    pub const FUSED: FormatStyle = FormatStyle {
        precision: FUSED_PRECISION,
        separator: FUSED_SEPARATOR,
    };

    pub fn for_channel(channel: Channel) -> Self {
        if channel.is_fused() {
            Self::FUSED
        } else {
            Self::RAW
        }
    }

    pub fn with_precision(self, precision: usize) -> Self {
        Self { precision, ..self }
    }

    /// Renders `x`, `y`, `z` in that order.
    pub fn format(&self, vector: &Vector3) -> String {
        format!(
            "{:.prec$}{sep}{:.prec$}{sep}{:.prec$}",
            vector.x,
            vector.y,
            vector.z,
            prec = self.precision,
            sep = self.separator,
        )
    }
}

pub fn format_vector(channel: Channel, vector: &Vector3) -> String {
    FormatStyle::for_channel(channel).format(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_channels_use_four_decimals() {
        let text = format_vector(Channel::Accelerometer, &Vector3::new(0.1, 0.2, 9.8));
        assert_eq!(text, "0.1000 | 0.2000 | 9.8000");
    }

    #[test]
    fn fused_channels_use_six_decimals() {
        let text = format_vector(Channel::Rotation, &Vector3::new(-0.5, 0.0, 1.25));
        assert_eq!(text, "-0.500000, 0.000000, 1.250000");
    }

    #[test]
    fn custom_precision_keeps_separator() {
        let style = FormatStyle::RAW.with_precision(1);
        assert_eq!(style.format(&Vector3::new(1.04, 2.0, -3.06)), "1.0 | 2.0 | -3.1");
    }

    #[test]
    fn large_values_do_not_panic() {
        let text = format_vector(Channel::Gyroscope, &Vector3::new(f64::MAX, f64::MIN, 0.0));
        assert_eq!(text.matches(" | ").count(), 2);
    }
}
