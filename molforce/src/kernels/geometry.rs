use crate::Vector3D;
use crate::configuration::{Angle, Bond, Configuration};

/// Angles with a sinus smaller than this do not produce forces
const SIN_THETA_EPSILON: f64 = 1e-8;

/// Kernel computing the energy and forces of the bonded (geometry) terms of
/// molecules: harmonic bonds and harmonic angles. All vectors between atoms
/// use the minimum image convention.
#[derive(Clone, Copy)]
pub struct GeometryKernel<'a> {
    configuration: &'a Configuration,
}

impl<'a> GeometryKernel<'a> {
    pub fn new(configuration: &'a Configuration) -> GeometryKernel<'a> {
        GeometryKernel {
            configuration: configuration,
        }
    }

    #[inline]
    fn position(&self, molecule: usize, species_atom: usize) -> Vector3D {
        let atom = self.configuration.molecule(molecule).atoms()[species_atom];
        self.configuration.atom(atom).position()
    }

    /// Get the energy of the `bond` in `molecule`
    pub fn bond_energy(&self, molecule: usize, bond: &Bond) -> f64 {
        let distance = self.configuration.simulation_box().minimum_distance(
            self.position(molecule, bond.i),
            self.position(molecule, bond.j),
        );
        return bond.energy(distance);
    }

    /// Get the energy of the `angle` in `molecule`
    pub fn angle_energy(&self, molecule: usize, angle: &Angle) -> f64 {
        let theta = self.configuration.simulation_box().angle_in_degrees(
            self.position(molecule, angle.i),
            self.position(molecule, angle.j),
            self.position(molecule, angle.k),
        );
        return angle.energy(theta);
    }

    /// Get the energy of all bonded terms in `molecule`
    pub fn molecule_energy(&self, molecule: usize) -> f64 {
        let species = self.configuration.molecule_species(molecule);

        let mut energy = 0.0;
        for bond in species.bonds() {
            energy += self.bond_energy(molecule, bond);
        }
        for angle in species.angles() {
            energy += self.angle_energy(molecule, angle);
        }
        return energy;
    }

    /// Add the forces coming from the `bond` in `molecule` to `forces`, which
    /// is indexed by atoms in the configuration.
    pub fn bond_forces(&self, molecule: usize, bond: &Bond, forces: &mut [Vector3D]) {
        let atoms = self.configuration.molecule(molecule).atoms();
        let vector = self.configuration.simulation_box().minimum_vector(
            self.position(molecule, bond.i),
            self.position(molecule, bond.j),
        );
        let distance = vector.norm();
        if distance == 0.0 {
            return;
        }

        let force = bond.derivative(distance) / distance * vector;
        forces[atoms[bond.i]] += force;
        forces[atoms[bond.j]] -= force;
    }

    /// Add the forces coming from the `angle` in `molecule` to `forces`, which
    /// is indexed by atoms in the configuration.
    pub fn angle_forces(&self, molecule: usize, angle: &Angle, forces: &mut [Vector3D]) {
        let simulation_box = self.configuration.simulation_box();
        let atoms = self.configuration.molecule(molecule).atoms();

        let center = self.position(molecule, angle.j);
        let v1 = simulation_box.minimum_vector(center, self.position(molecule, angle.i));
        let v2 = simulation_box.minimum_vector(center, self.position(molecule, angle.k));
        let (r1, r2) = (v1.norm(), v2.norm());
        let (u1, u2) = (v1 / r1, v2 / r2);

        let cos_theta = f64::clamp(u1 * u2, -1.0, 1.0);
        let theta = f64::acos(cos_theta);
        let sin_theta = f64::sin(theta);
        if sin_theta < SIN_THETA_EPSILON {
            return;
        }

        let prefactor = angle.derivative(theta.to_degrees()) / sin_theta;
        let force_i = prefactor * (u2 - cos_theta * u1) / r1;
        let force_k = prefactor * (u1 - cos_theta * u2) / r2;

        forces[atoms[angle.i]] += force_i;
        forces[atoms[angle.k]] += force_k;
        forces[atoms[angle.j]] -= force_i + force_k;
    }

    /// Add the forces from all bonded terms in `molecule` to `forces`
    pub fn molecule_forces(&self, molecule: usize, forces: &mut [Vector3D]) {
        let species = self.configuration.molecule_species(molecule);
        for bond in species.bonds() {
            self.bond_forces(molecule, bond, forces);
        }
        for angle in species.angles() {
            self.angle_forces(molecule, angle, forces);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_relative_eq, assert_ulps_eq};

    use crate::configuration::test_utils::test_configuration;

    fn energy_with_atom_moved(configuration: &Configuration, atom: usize, delta: Vector3D) -> f64 {
        let mut configuration = configuration.clone();
        let position = configuration.atom(atom).position();
        configuration.move_atom(atom, position + delta).unwrap();

        let kernel = GeometryKernel::new(&configuration);
        return (0..configuration.molecules().len()).map(|m| kernel.molecule_energy(m)).sum();
    }

    #[test]
    fn bond_and_angle_energies() {
        let configuration = test_configuration("three-molecules");
        let kernel = GeometryKernel::new(&configuration);

        // the first water molecule has O-H distances of 1.0 Å and an H-O-H
        // angle of 90°
        let species = configuration.molecule_species(0);
        assert_ulps_eq!(kernel.bond_energy(0, &species.bonds()[0]), 0.0);

        let angle = species.angles()[0];
        let delta = (90.0 - angle.equilibrium).to_radians();
        assert_relative_eq!(kernel.angle_energy(0, &angle), 0.5 * angle.force_constant * delta * delta, max_relative = 1e-12);
    }

    #[test]
    fn forces_are_energy_derivatives() {
        let configuration = test_configuration("three-molecules");
        let kernel = GeometryKernel::new(&configuration);

        let mut forces = vec![Vector3D::zero(); configuration.n_atoms()];
        for molecule in 0..configuration.molecules().len() {
            kernel.molecule_forces(molecule, &mut forces);
        }

        // total force on each molecule is zero
        for molecule in configuration.molecules() {
            let total = molecule.atoms().iter().map(|&atom| forces[atom]).sum::<Vector3D>();
            assert_relative_eq!(total, Vector3D::zero(), epsilon = 1e-9);
        }

        let delta = 1e-6;
        for atom in 0..configuration.n_atoms() {
            for k in 0..3 {
                let mut displacement = Vector3D::zero();
                displacement[k] = delta;
                let plus = energy_with_atom_moved(&configuration, atom, displacement);
                let minus = energy_with_atom_moved(&configuration, atom, -displacement);
                let numerical = -(plus - minus) / (2.0 * delta);
                assert_relative_eq!(forces[atom][k], numerical, epsilon = 1e-3, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn linear_angles() {
        let mut configuration = test_configuration("three-molecules");

        // align the first hydrogen with the second one, through the oxygen
        let oxygen = configuration.atom(0).position();
        let hydrogen = configuration.atom(2).position();
        configuration.move_atom(1, oxygen - (hydrogen - oxygen)).unwrap();

        let kernel = GeometryKernel::new(&configuration);
        let angle = configuration.molecule_species(0).angles()[0];
        let mut forces = vec![Vector3D::zero(); configuration.n_atoms()];
        kernel.angle_forces(0, &angle, &mut forces);
        assert!(forces.iter().all(|&force| force == Vector3D::zero()));
    }
}
