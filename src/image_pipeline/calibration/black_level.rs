use ndarray::Array2;
use serde::Deserialize;

/// Sensor offset removal and normalisation into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlackLevel {
    pub level: f64,
    pub max_value: f64,
}

impl Default for BlackLevel {
    fn default() -> Self {
        Self {
            level: 4096.0,
            max_value: 65535.0,
        }
    }
}

impl BlackLevel {
    /// Clips to `[level, max_value]`, subtracts `level`, divides by `max_value`.
    pub fn normalize(&self, counts: &Array2<f64>) -> Array2<f64> {
        counts.mapv(|v| (v.clamp(self.level, self.max_value) - self.level) / self.max_value)
    }
}
