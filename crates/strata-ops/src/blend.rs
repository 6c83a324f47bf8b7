//! Layer blend modes.
//!
//! A blend mode mixes a source color sample with the destination sample it
//! lands on. The mixed value is then alpha-composited over the destination
//! by the area kernels in [`crate::area`]; blend modes never touch alpha.
//!
//! # Example
//!
//! ```rust
//! use strata_ops::BlendMode;
//!
//! assert!((BlendMode::Multiply.mix(0.8, 0.2) - 0.16).abs() < 1e-6);
//! assert_eq!(BlendMode::Normal.mix(0.8, 0.2), 0.8);
//! assert_eq!("screen".parse::<BlendMode>().unwrap(), BlendMode::Screen);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OpsError;

/// Blend mode of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Source replaces destination (plain "over").
    #[default]
    Normal,
    Multiply,
    Screen,
    /// Linear dodge, clamped to 1.
    Add,
    /// Destination minus source, clamped to 0.
    Subtract,
    Overlay,
    SoftLight,
    HardLight,
    Difference,
    Exclusion,
    /// Keeps the darker of both samples.
    Darken,
    /// Keeps the lighter of both samples.
    Lighten,
}

impl BlendMode {
    /// All modes, in declaration order.
    pub const ALL: [BlendMode; 12] = [
        Self::Normal,
        Self::Multiply,
        Self::Screen,
        Self::Add,
        Self::Subtract,
        Self::Overlay,
        Self::SoftLight,
        Self::HardLight,
        Self::Difference,
        Self::Exclusion,
        Self::Darken,
        Self::Lighten,
    ];

    /// Mixes source sample `s` onto destination sample `d`.
    #[inline]
    pub fn mix(self, s: f32, d: f32) -> f32 {
        match self {
            Self::Normal => s,
            Self::Multiply => s * d,
            Self::Screen => 1.0 - (1.0 - s) * (1.0 - d),
            Self::Add => (s + d).min(1.0),
            Self::Subtract => (d - s).max(0.0),
            Self::Overlay => {
                if d < 0.5 {
                    2.0 * s * d
                } else {
                    1.0 - 2.0 * (1.0 - s) * (1.0 - d)
                }
            }
            Self::SoftLight => {
                if s < 0.5 {
                    d - (1.0 - 2.0 * s) * d * (1.0 - d)
                } else {
                    let g = if d < 0.25 {
                        ((16.0 * d - 12.0) * d + 4.0) * d
                    } else {
                        d.sqrt()
                    };
                    d + (2.0 * s - 1.0) * (g - d)
                }
            }
            Self::HardLight => {
                if s < 0.5 {
                    2.0 * s * d
                } else {
                    1.0 - 2.0 * (1.0 - s) * (1.0 - d)
                }
            }
            Self::Difference => (s - d).abs(),
            Self::Exclusion => s + d - 2.0 * s * d,
            Self::Darken => s.min(d),
            Self::Lighten => s.max(d),
        }
    }

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Overlay => "overlay",
            Self::SoftLight => "soft_light",
            Self::HardLight => "hard_light",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|m| m.name() == key)
            .ok_or_else(|| OpsError::InvalidParameter(format!("unknown blend mode '{s}'")))
    }
}
