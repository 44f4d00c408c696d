//! Bulge falloff curve.
//!
//! The curve maps normalized distance from a collider surface (0 at the
//! surface, 1 at the bulge boundary) to a displacement multiplier. It is an
//! authored ramp of keys, each carrying the interpolation used up to the next
//! key.

use serde::{Deserialize, Serialize};

/// Source of bulge falloff values.
pub trait FalloffCurveSource {
    /// Multiplier at normalized distance `t` in [0, 1]
    fn evaluate(&self, t: f32) -> f32;
}

/// How a ramp key blends toward the next key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum RampInterpolation {
    /// Hold this key's value until the next key
    None = 0,
    /// Straight line to the next key
    Linear = 1,
    /// Hermite ease-in/ease-out to the next key
    Smooth = 2,
    /// Catmull-Rom spline through the neighboring keys
    #[default]
    Spline = 3,
}

/// A single authored point on the curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampKey {
    /// Normalized distance in [0, 1]
    pub position: f32,
    pub value: f32,
    pub interpolation: RampInterpolation,
}

impl RampKey {
    pub fn new(position: f32, value: f32, interpolation: RampInterpolation) -> Self {
        Self {
            position: position.clamp(0.0, 1.0),
            value,
            interpolation,
        }
    }

    /// Key with spline interpolation
    pub fn spline(position: f32, value: f32) -> Self {
        Self::new(position, value, RampInterpolation::Spline)
    }
}

/// Authored falloff ramp, keys kept sorted by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalloffCurve {
    keys: Vec<RampKey>,
}

impl Default for FalloffCurve {
    /// Rises from zero at the surface to a 0.9 peak at a quarter of the bulge
    /// distance, then eases back to zero at the boundary.
    fn default() -> Self {
        Self::from_keys([
            RampKey::spline(0.0, 0.0),
            RampKey::spline(0.25, 0.9),
            RampKey::spline(1.0, 0.0),
        ])
    }
}

impl FalloffCurve {
    /// Build a curve from keys in any order.
    pub fn from_keys(keys: impl IntoIterator<Item = RampKey>) -> Self {
        let mut curve = Self { keys: Vec::new() };
        for key in keys {
            curve.add_key(key);
        }
        curve
    }

    /// Insert a key, keeping positions sorted. A key at an existing position
    /// replaces the old one.
    pub fn add_key(&mut self, key: RampKey) {
        let key = RampKey::new(key.position, key.value, key.interpolation);
        match self
            .keys
            .binary_search_by(|k| k.position.total_cmp(&key.position))
        {
            Ok(existing) => self.keys[existing] = key,
            Err(slot) => self.keys.insert(slot, key),
        }
    }

    pub fn keys(&self) -> &[RampKey] {
        &self.keys
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Value at normalized distance `t`.
    ///
    /// Outside the keyed range the nearest end key's value is held. A curve
    /// with no keys evaluates to zero everywhere.
    pub fn value_at(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        let t = t.clamp(0.0, 1.0);
        if t <= first.position {
            return first.value;
        }
        if t >= last.position {
            return last.value;
        }

        // First key strictly after t; t >= first.position guarantees segment >= 1
        let next = self.keys.partition_point(|k| k.position <= t);
        let segment = next - 1;
        let start = self.keys[segment];
        let end = self.keys[next];

        let u = (t - start.position) / (end.position - start.position);
        match start.interpolation {
            RampInterpolation::None => start.value,
            RampInterpolation::Linear => lerp(start.value, end.value, u),
            RampInterpolation::Smooth => lerp(start.value, end.value, u * u * (3.0 - 2.0 * u)),
            RampInterpolation::Spline => {
                let before = self.keys[segment.saturating_sub(1)].value;
                let after = self.keys.get(next + 1).map_or(end.value, |k| k.value);
                catmull_rom(before, start.value, end.value, after, u)
            }
        }
    }
}

impl FalloffCurveSource for FalloffCurve {
    fn evaluate(&self, t: f32) -> f32 {
        self.value_at(t)
    }
}

fn lerp(a: f32, b: f32, u: f32) -> f32 {
    a + (b - a) * u
}

/// Uniform Catmull-Rom segment between `p1` and `p2`.
fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, u: f32) -> f32 {
    let u2 = u * u;
    let u3 = u2 * u;
    0.5 * (2.0 * p1
        + (p2 - p0) * u
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * u3)
}
