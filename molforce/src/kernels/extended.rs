use crate::Vector3D;
use crate::configuration::Configuration;

/// Additional per-atom energy terms computed by the kernels, on top of the
/// pair potentials and the bonded geometry terms.
///
/// Implementations must be usable from multiple threads at once, since the
/// kernels evaluate atoms in parallel.
pub trait ExtendedTerms: Sync {
    /// Get the name of these terms, for logging
    fn name(&self) -> &str;

    /// Get the energy of `atom` in `configuration` due to these terms
    fn atom_energy(&self, configuration: &Configuration, atom: usize) -> f64;

    /// Get the force acting on `atom` in `configuration` due to these terms
    fn atom_force(&self, configuration: &Configuration, atom: usize) -> Vector3D;
}

/// Extended terms that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtendedTerms;

impl ExtendedTerms for NoExtendedTerms {
    fn name(&self) -> &str {
        "none"
    }

    fn atom_energy(&self, _: &Configuration, _: usize) -> f64 {
        0.0
    }

    fn atom_force(&self, _: &Configuration, _: usize) -> Vector3D {
        Vector3D::zero()
    }
}

/// Extended terms applying the external potentials of a configuration, both
/// the global ones acting on every atom and the ones targeting specific atoms.
#[derive(Debug, Clone)]
pub struct ExternalPotentialTerms {
    /// For each atom, indexes of the targeted potentials acting on it
    targeted: Vec<Vec<usize>>,
}

impl ExternalPotentialTerms {
    /// Gather the external potentials acting on each atom of `configuration`
    pub fn new(configuration: &Configuration) -> ExternalPotentialTerms {
        let mut targeted = vec![Vec::new(); configuration.n_atoms()];
        for (index, potential) in configuration.targeted_potentials().iter().enumerate() {
            for &atom in &potential.targets {
                targeted[atom].push(index);
            }
        }

        ExternalPotentialTerms {
            targeted: targeted,
        }
    }
}

impl ExtendedTerms for ExternalPotentialTerms {
    fn name(&self) -> &str {
        "external potentials"
    }

    fn atom_energy(&self, configuration: &Configuration, atom: usize) -> f64 {
        let simulation_box = configuration.simulation_box();
        let position = configuration.atom(atom).position();

        let mut energy = 0.0;
        for potential in configuration.global_potentials() {
            energy += potential.energy(simulation_box, position);
        }

        let targeted = configuration.targeted_potentials();
        for &index in &self.targeted[atom] {
            energy += targeted[index].potential.energy(simulation_box, position);
        }

        return energy;
    }

    fn atom_force(&self, configuration: &Configuration, atom: usize) -> Vector3D {
        let simulation_box = configuration.simulation_box();
        let position = configuration.atom(atom).position();

        let mut force = Vector3D::zero();
        for potential in configuration.global_potentials() {
            force += potential.force(simulation_box, position);
        }

        let targeted = configuration.targeted_potentials();
        for &index in &self.targeted[atom] {
            force += targeted[index].potential.force(simulation_box, position);
        }

        return force;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    use crate::potentials::{ExternalPotential, TargetedPotential};
    use crate::configuration::test_utils::test_configuration;

    #[test]
    fn external_potentials() {
        let mut configuration = test_configuration("three-molecules");
        let sphere = ExternalPotential::Spherical { origin: [10.0, 5.0, 6.0], radius: 0.5, force_constant: 2.0 };
        configuration.add_targeted_potential(TargetedPotential { potential: sphere, targets: vec![1, 3] }).unwrap();

        let terms = ExternalPotentialTerms::new(&configuration);
        assert_eq!(terms.name(), "external potentials");

        // atom 0 is at the center of the sphere, and not targeted anyway
        assert_eq!(terms.atom_energy(&configuration, 0), 0.0);
        assert_eq!(terms.atom_energy(&configuration, 2), 0.0);

        // atom 1 is 1 Å away from the center
        assert_ulps_eq!(terms.atom_energy(&configuration, 1), 0.25);
        assert_ulps_eq!(terms.atom_force(&configuration, 1), Vector3D::new(-1.0, 0.0, 0.0));

        let wall = ExternalPotential::Spherical { origin: [10.0, 5.0, 6.0], radius: 0.0, force_constant: 2.0 };
        configuration.add_global_potential(wall).unwrap();
        let terms = ExternalPotentialTerms::new(&configuration);
        assert_ulps_eq!(terms.atom_energy(&configuration, 1), 1.25);
        assert_ulps_eq!(terms.atom_energy(&configuration, 2), 1.0);
        assert_eq!(terms.atom_energy(&configuration, 0), 0.0);

        let none = NoExtendedTerms;
        assert_eq!(none.atom_energy(&configuration, 1), 0.0);
        assert_eq!(none.atom_force(&configuration, 1), Vector3D::zero());
    }
}
