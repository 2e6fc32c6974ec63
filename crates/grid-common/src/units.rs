//! Unit transformation from native data units to display units.

use serde::{Deserialize, Serialize};

/// Offset between the Kelvin and Celsius scales.
pub const KELVIN_CELSIUS_OFFSET: f64 = 273.15;

/// Transformation applied to raw values before display.
///
/// Every variant is a total affine map, so it is defined for all finite inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum UnitTransform {
    /// No transformation
    Identity,
    /// K → °F: `value * 1.8 - 459.67`
    KelvinToFahrenheit,
    /// K → °C: `value - 273.15`
    KelvinToCelsius,
    /// Linear transform: value * scale + offset
    Linear { scale: f64, offset: f64 },
}

impl UnitTransform {
    /// Apply the transformation to a value
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::KelvinToFahrenheit => value * 1.8 - 459.67,
            Self::KelvinToCelsius => value - KELVIN_CELSIUS_OFFSET,
            Self::Linear { scale, offset } => value * scale + offset,
        }
    }

    /// Display unit label for titles and colorbars.
    ///
    /// `native` is returned for transforms that keep the input unit.
    pub fn display_units(&self, native: &str) -> String {
        match self {
            Self::Identity => native.to_string(),
            Self::KelvinToFahrenheit => "\u{00b0}F".to_string(),
            Self::KelvinToCelsius => "\u{00b0}C".to_string(),
            Self::Linear { .. } => native.to_string(),
        }
    }

    /// Parse the short names accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "identity" | "none" | "native" => Some(Self::Identity),
            "fahrenheit" | "f" | "degf" => Some(Self::KelvinToFahrenheit),
            "celsius" | "c" | "degc" => Some(Self::KelvinToCelsius),
            _ => None,
        }
    }
}

impl Default for UnitTransform {
    fn default() -> Self {
        Self::KelvinToFahrenheit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fahrenheit_fixed_points() {
        let t = UnitTransform::KelvinToFahrenheit;
        assert!((t.apply(273.15) - 32.0).abs() < 1e-9);
        assert!((t.apply(373.15) - 212.0).abs() < 1e-9);
        assert!((t.apply(0.0) - -459.67).abs() < 1e-9);
    }

    #[test]
    fn test_celsius() {
        assert!((UnitTransform::KelvinToCelsius.apply(300.0) - 26.85).abs() < 1e-9);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            UnitTransform::from_name("Fahrenheit"),
            Some(UnitTransform::KelvinToFahrenheit)
        );
        assert_eq!(UnitTransform::from_name("kelvin-ish"), None);
    }

    #[test]
    fn test_display_units() {
        assert_eq!(UnitTransform::Identity.display_units("K"), "K");
        assert_eq!(UnitTransform::KelvinToFahrenheit.display_units("K"), "\u{00b0}F");
    }
}
