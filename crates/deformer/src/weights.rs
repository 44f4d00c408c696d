//! Per-vertex influence weights.

/// Externally authored per-vertex influence.
pub trait WeightSource {
    /// Weight of `index` in [0, 1]. Zero means the vertex is never moved.
    fn weight(&self, index: usize) -> f32;
}

/// Same weight for every vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformWeight(pub f32);

impl Default for UniformWeight {
    fn default() -> Self {
        Self(1.0)
    }
}

impl WeightSource for UniformWeight {
    fn weight(&self, _index: usize) -> f32 {
        sanitize(self.0)
    }
}

/// Painted weights. Vertices past the end of the buffer were never painted
/// and keep full influence.
impl WeightSource for [f32] {
    fn weight(&self, index: usize) -> f32 {
        self.get(index).copied().map_or(1.0, sanitize)
    }
}

impl WeightSource for Vec<f32> {
    fn weight(&self, index: usize) -> f32 {
        self.as_slice().weight(index)
    }
}

pub(crate) fn sanitize(weight: f32) -> f32 {
    if weight.is_finite() {
        weight.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_weight() {
        assert_eq!(UniformWeight::default().weight(42), 1.0);
        assert_eq!(UniformWeight(0.25).weight(0), 0.25);
        assert_eq!(UniformWeight(3.0).weight(0), 1.0);
    }

    #[test]
    fn test_painted_weights() {
        let weights = vec![0.0, 0.5, -1.0, f32::NAN];
        assert_eq!(weights.weight(0), 0.0);
        assert_eq!(weights.weight(1), 0.5);
        assert_eq!(weights.weight(2), 0.0);
        assert_eq!(weights.weight(3), 0.0);
        // Unpainted
        assert_eq!(weights.weight(10), 1.0);
    }
}
