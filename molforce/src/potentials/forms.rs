use std::f64::consts::PI;

use log::warn;

use crate::Error;

/// Conversion factor for Coulomb interactions between elementary charges at
/// distances in Å, giving energies in kJ/mol
pub const COULOMB_CONVERSION: f64 = 1389.35444426359;

/// Functional form and parameters of the short-range interaction for an atom
/// type, or for a pair of atom types after combination
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum ShortRangeForm {
    /// No short-range interaction
    None,
    /// Lennard-Jones 12-6 potential, combined with Lorentz-Berthelot rules
    LennardJones {
        /// Depth of the potential well, in kJ/mol
        epsilon: f64,
        /// Distance at which the potential is zero, in Å
        sigma: f64,
    },
    /// Lennard-Jones 12-6 potential, combined with geometric rules
    LennardJonesGeometric {
        /// Depth of the potential well, in kJ/mol
        epsilon: f64,
        /// Distance at which the potential is zero, in Å
        sigma: f64,
    },
}

impl ShortRangeForm {
    pub fn validate(&self) -> Result<(), Error> {
        match *self {
            ShortRangeForm::None => {}
            ShortRangeForm::LennardJones { epsilon, sigma } |
            ShortRangeForm::LennardJonesGeometric { epsilon, sigma } => {
                if !(epsilon >= 0.0 && epsilon.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "expected positive epsilon for Lennard-Jones potential, got {}", epsilon
                    )));
                }

                if !(sigma >= 0.0 && sigma.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "expected positive sigma for Lennard-Jones potential, got {}", sigma
                    )));
                }
            }
        }
        return Ok(());
    }

    /// Combine the short-range parameters of two atom types. Lennard-Jones
    /// parameters are combined with Lorentz-Berthelot rules, unless both
    /// types use geometric combination.
    pub fn combine(&self, other: &ShortRangeForm) -> Result<ShortRangeForm, Error> {
        match (*self, *other) {
            (ShortRangeForm::None, ShortRangeForm::None) => Ok(ShortRangeForm::None),
            (
                ShortRangeForm::LennardJones { epsilon: epsilon_i, sigma: sigma_i },
                ShortRangeForm::LennardJones { epsilon: epsilon_j, sigma: sigma_j },
            ) => Ok(ShortRangeForm::LennardJones {
                epsilon: f64::sqrt(epsilon_i * epsilon_j),
                sigma: 0.5 * (sigma_i + sigma_j),
            }),
            (
                ShortRangeForm::LennardJonesGeometric { epsilon: epsilon_i, sigma: sigma_i },
                ShortRangeForm::LennardJonesGeometric { epsilon: epsilon_j, sigma: sigma_j },
            ) => Ok(ShortRangeForm::LennardJonesGeometric {
                epsilon: f64::sqrt(epsilon_i * epsilon_j),
                sigma: f64::sqrt(sigma_i * sigma_j),
            }),
            (
                ShortRangeForm::LennardJones { epsilon: epsilon_i, sigma: sigma_i } |
                ShortRangeForm::LennardJonesGeometric { epsilon: epsilon_i, sigma: sigma_i },
                ShortRangeForm::LennardJones { epsilon: epsilon_j, sigma: sigma_j } |
                ShortRangeForm::LennardJonesGeometric { epsilon: epsilon_j, sigma: sigma_j },
            ) => {
                warn!("combining Lennard-Jones parameters with different rules, defaulting to Lorentz-Berthelot");
                Ok(ShortRangeForm::LennardJones {
                    epsilon: f64::sqrt(epsilon_i * epsilon_j),
                    sigma: 0.5 * (sigma_i + sigma_j),
                })
            }
            (first, second) => Err(Error::InvalidParameter(format!(
                "can not combine short-range interactions {:?} and {:?}", first, second
            ))),
        }
    }

    /// Get the energy at distance `r`, without any truncation
    #[inline]
    pub fn energy(&self, r: f64) -> f64 {
        match *self {
            ShortRangeForm::None => 0.0,
            ShortRangeForm::LennardJones { epsilon, sigma } |
            ShortRangeForm::LennardJonesGeometric { epsilon, sigma } => {
                let sigma_r6 = (sigma / r).powi(6);
                4.0 * epsilon * (sigma_r6 * sigma_r6 - sigma_r6)
            }
        }
    }

    /// Get the derivative of the energy with respect to `r` at distance `r`,
    /// without any truncation
    #[inline]
    pub fn derivative(&self, r: f64) -> f64 {
        match *self {
            ShortRangeForm::None => 0.0,
            ShortRangeForm::LennardJones { epsilon, sigma } |
            ShortRangeForm::LennardJonesGeometric { epsilon, sigma } => {
                let sigma_r6 = (sigma / r).powi(6);
                48.0 * epsilon * sigma_r6 * (-sigma_r6 + 0.5) / r
            }
        }
    }
}

/// Truncation scheme for the short-range part of pair potentials
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum ShortRangeTruncation {
    /// No truncation, the potential is used as-is up to the range
    None,
    /// Shift the energy and the force, making both zero at the range
    Shifted,
    /// Smoothly bring the energy to zero with `(1 + cos(π x)) / 2` over the
    /// last `width` Å before the range
    Cosine {
        /// Width of the truncation region
        width: f64,
    },
}

impl ShortRangeTruncation {
    pub fn validate(&self, range: f64) -> Result<(), Error> {
        if let ShortRangeTruncation::Cosine { width } = *self {
            if !(width > 0.0 && width <= range) {
                return Err(Error::InvalidParameter(format!(
                    "expected width of cosine truncation between 0 and the range ({}), got {}",
                    range, width
                )));
            }
        }
        return Ok(());
    }

    /// Get the value and derivative of the cosine switching function at `r`
    pub(crate) fn cosine_switch(width: f64, range: f64, r: f64) -> (f64, f64) {
        let x = r - (range - width);
        if x <= 0.0 {
            return (1.0, 0.0);
        }

        let s = PI * x / width;
        let value = 0.5 * (f64::cos(s) + 1.0);
        let derivative = -0.5 * PI * f64::sin(s) / width;
        return (value, derivative);
    }
}

/// Truncation scheme for the Coulomb part of pair potentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum CoulombTruncation {
    /// Plain Coulomb interaction
    None,
    /// Shifted-force Coulomb, where both energy and force go to zero at the
    /// range
    Shifted,
}
