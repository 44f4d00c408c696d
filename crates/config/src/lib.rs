//! Shared configuration for pushback
//!
//! This crate is the single source of truth for the collision deformer's
//! tunable parameters, their defaults and the ranges they are clamped to.
//! Hosts can persist a [`DeformerConfig`] as JSON and load it back.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default envelope (full effect)
pub const DEFAULT_ENVELOPE: f32 = 1.0;

/// Default number of smoothing passes (smoothing disabled)
pub const DEFAULT_SMOOTH_ITERATIONS: u32 = 0;

/// Upper bound for smoothing passes
pub const MAX_SMOOTH_ITERATIONS: u32 = 5;

/// Default bulge falloff distance in world units (bulge disabled)
pub const DEFAULT_BULGE_DISTANCE: f32 = 0.0;

/// Default bulge strength multiplier
pub const DEFAULT_BULGE_STRENGTH: f32 = 1.0;

/// Upper bound for the bulge strength multiplier
pub const MAX_BULGE_STRENGTH: f32 = 10.0;

/// Tolerance handed to ray intersection queries, in world units.
pub const RAY_TOLERANCE: f32 = 1e-6;

/// Fraction of the neighbor offset removed per smoothing pass.
pub const SMOOTH_FACTOR: f32 = 0.5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse deformer config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parameters for one collision deformer.
///
/// Values outside their documented range are accepted on construction and
/// normalized by [`DeformerConfig::clamped`], which the deformer applies
/// before every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct DeformerConfig {
    /// Global effect multiplier in [0, 1]. Zero passes geometry through.
    pub envelope: f32,
    /// Boundary smoothing passes in [0, 5]. Zero disables smoothing.
    pub smooth_iterations: u32,
    /// Distance from a collider within which vertices bulge. Zero disables bulge.
    pub bulge_distance: f32,
    /// Bulge multiplier in [0, 10]. Zero disables bulge.
    pub bulge_strength: f32,
}

impl Default for DeformerConfig {
    fn default() -> Self {
        Self {
            envelope: DEFAULT_ENVELOPE,
            smooth_iterations: DEFAULT_SMOOTH_ITERATIONS,
            bulge_distance: DEFAULT_BULGE_DISTANCE,
            bulge_strength: DEFAULT_BULGE_STRENGTH,
        }
    }
}

impl DeformerConfig {
    /// Create a config with bulge enabled at the given distance and strength
    pub fn with_bulge(distance: f32, strength: f32) -> Self {
        Self {
            bulge_distance: distance,
            bulge_strength: strength,
            ..Default::default()
        }
    }

    /// Return a copy with every field forced into its valid range.
    ///
    /// Non-finite floats collapse to zero, which disables the feature they
    /// control.
    pub fn clamped(&self) -> Self {
        Self {
            envelope: finite_or_zero(self.envelope).clamp(0.0, 1.0),
            smooth_iterations: self.smooth_iterations.min(MAX_SMOOTH_ITERATIONS),
            bulge_distance: finite_or_zero(self.bulge_distance).max(0.0),
            bulge_strength: finite_or_zero(self.bulge_strength).clamp(0.0, MAX_BULGE_STRENGTH),
        }
    }

    /// Whether the bulge stage can run at all with these parameters
    pub fn bulge_enabled(&self) -> bool {
        self.bulge_distance != 0.0 && self.bulge_strength != 0.0
    }

    /// Load a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the config to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}
