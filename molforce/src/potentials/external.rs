use crate::{Error, Vector3D};
use crate::geometry::SimulationBox;

/// External potential acting on single atoms, restraining them to a region
/// of space with an harmonic wall.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum ExternalPotential {
    /// Harmonic restraint acting on atoms further than `radius` from `origin`
    Spherical {
        /// Center of the sphere
        origin: [f64; 3],
        /// Radius of the sphere, in Å
        radius: f64,
        /// Force constant of the harmonic restraint, in kJ/mol/Å²
        force_constant: f64,
    },
    /// Harmonic restraint acting on atoms further than `radius` from the
    /// infinite line going through `origin` along `axis`
    Cylindrical {
        /// A point on the axis of the cylinder
        origin: [f64; 3],
        /// Direction of the cylinder axis
        axis: [f64; 3],
        /// Radius of the cylinder, in Å
        radius: f64,
        /// Force constant of the harmonic restraint, in kJ/mol/Å²
        force_constant: f64,
    },
}

impl ExternalPotential {
    pub fn validate(&self) -> Result<(), Error> {
        let (radius, force_constant) = match *self {
            ExternalPotential::Spherical { radius, force_constant, .. } => (radius, force_constant),
            ExternalPotential::Cylindrical { radius, force_constant, axis, .. } => {
                if !(Vector3D::from(axis).norm2() > 0.0) {
                    return Err(Error::InvalidParameter(
                        "the axis of a cylindrical potential can not be zero".into()
                    ));
                }
                (radius, force_constant)
            }
        };

        if !(radius >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "expected positive radius for external potential, got {}", radius
            )));
        }

        if !(force_constant >= 0.0 && force_constant.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected positive force constant for external potential, got {}", force_constant
            )));
        }

        return Ok(());
    }

    /// Get the vector going from the restraint region to the `position`, and
    /// the radius of the region
    fn displacement(&self, simulation_box: &SimulationBox, position: Vector3D) -> (Vector3D, f64) {
        match *self {
            ExternalPotential::Spherical { origin, radius, .. } => {
                (simulation_box.minimum_vector(origin.into(), position), radius)
            }
            ExternalPotential::Cylindrical { origin, axis, radius, .. } => {
                let axis = Vector3D::from(axis).normalized();
                let vector = simulation_box.minimum_vector(origin.into(), position);
                (vector - (vector * axis) * axis, radius)
            }
        }
    }

    fn force_constant(&self) -> f64 {
        match *self {
            ExternalPotential::Spherical { force_constant, .. } |
            ExternalPotential::Cylindrical { force_constant, .. } => force_constant,
        }
    }

    /// Get the energy of an atom at `position`
    pub fn energy(&self, simulation_box: &SimulationBox, position: Vector3D) -> f64 {
        let (vector, radius) = self.displacement(simulation_box, position);
        let distance = vector.norm();
        if distance <= radius {
            return 0.0;
        }

        let delta = distance - radius;
        return 0.5 * self.force_constant() * delta * delta;
    }

    /// Get the force acting on an atom at `position`
    pub fn force(&self, simulation_box: &SimulationBox, position: Vector3D) -> Vector3D {
        let (vector, radius) = self.displacement(simulation_box, position);
        let distance = vector.norm();
        if distance <= radius {
            return Vector3D::zero();
        }

        return -self.force_constant() * (distance - radius) / distance * vector;
    }
}

/// An external potential acting only on some atoms of a configuration
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TargetedPotential {
    pub potential: ExternalPotential,
    /// Indexes of the atoms affected by the potential
    pub targets: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_relative_eq, assert_ulps_eq};

    #[test]
    fn spherical() {
        let simulation_box = SimulationBox::cubic(20.0).unwrap();
        let potential = ExternalPotential::Spherical { origin: [5.0, 5.0, 5.0], radius: 3.0, force_constant: 10.0 };
        potential.validate().unwrap();

        assert_eq!(potential.energy(&simulation_box, Vector3D::new(6.0, 6.0, 6.0)), 0.0);
        assert_eq!(potential.force(&simulation_box, Vector3D::new(6.0, 6.0, 6.0)), Vector3D::zero());

        assert_ulps_eq!(potential.energy(&simulation_box, Vector3D::new(10.0, 5.0, 5.0)), 20.0);
        assert_ulps_eq!(potential.force(&simulation_box, Vector3D::new(10.0, 5.0, 5.0)), Vector3D::new(-20.0, 0.0, 0.0));

        // minimum image convention
        assert_ulps_eq!(potential.energy(&simulation_box, Vector3D::new(20.0, 5.0, 5.0)), 20.0);
        assert_ulps_eq!(potential.force(&simulation_box, Vector3D::new(20.0, 5.0, 5.0)), Vector3D::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn cylindrical() {
        let simulation_box = SimulationBox::cubic(20.0).unwrap();
        let potential = ExternalPotential::Cylindrical {
            origin: [10.0, 10.0, 0.0],
            axis: [0.0, 0.0, 2.0],
            radius: 2.0,
            force_constant: 4.0,
        };
        potential.validate().unwrap();

        // the position along the axis does not matter
        for z in [0.0, 3.0, 17.5] {
            assert_ulps_eq!(potential.energy(&simulation_box, Vector3D::new(10.0, 14.0, z)), 8.0);
            assert_ulps_eq!(potential.force(&simulation_box, Vector3D::new(10.0, 14.0, z)), Vector3D::new(0.0, -8.0, 0.0));
        }
        assert_eq!(potential.energy(&simulation_box, Vector3D::new(11.0, 11.0, 3.0)), 0.0);

        let position = Vector3D::new(13.0, 12.5, 4.0);
        let delta = 1e-6;
        for k in 0..3 {
            let mut plus = position;
            plus[k] += delta;
            let mut minus = position;
            minus[k] -= delta;
            let numerical = -(potential.energy(&simulation_box, plus) - potential.energy(&simulation_box, minus)) / (2.0 * delta);
            assert_relative_eq!(potential.force(&simulation_box, position)[k], numerical, epsilon = 1e-6);
        }
    }

    #[test]
    fn validation() {
        assert!(ExternalPotential::Spherical { origin: [0.0; 3], radius: -1.0, force_constant: 1.0 }.validate().is_err());
        assert!(ExternalPotential::Spherical { origin: [0.0; 3], radius: 1.0, force_constant: -1.0 }.validate().is_err());
        assert!(ExternalPotential::Cylindrical { origin: [0.0; 3], axis: [0.0; 3], radius: 1.0, force_constant: 1.0 }.validate().is_err());

        let targeted: TargetedPotential = serde_json::from_str(r#"{
            "potential": {"type": "Spherical", "origin": [0, 0, 0], "radius": 2.0, "force_constant": 1.5},
            "targets": [1, 4]
        }"#).unwrap();
        assert_eq!(targeted.targets, [1, 4]);
        assert!(targeted.potential.validate().is_ok());
    }
}
