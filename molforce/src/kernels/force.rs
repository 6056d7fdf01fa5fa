use std::cell::RefCell;

use log::debug;
use rayon::prelude::*;
use thread_local::ThreadLocal;

use crate::{Error, Vector3D};
use crate::configuration::{Configuration, ScalingType};
use crate::parallel::{DivisionStrategy, ProcessPool};
use crate::potentials::PotentialMap;

use super::energy::check_kernel_setup;
use super::{ExtendedTerms, NoExtendedTerms, GeometryKernel, KernelFlags};

/// Per-thread force buffers, each containing one entry per atom
type ForceBuffers = ThreadLocal<RefCell<Vec<Vector3D>>>;

/// Add all the per-thread `buffers` to `forces`
fn reduce_buffers(buffers: ForceBuffers, forces: &mut [Vector3D]) {
    for local in buffers {
        for (force, partial) in forces.iter_mut().zip(local.into_inner()) {
            *force += partial;
        }
    }
}

/// Kernel computing the forces acting on all atoms of a configuration.
///
/// Forces are split between two buffers: the "unbound" buffer receives the
/// forces from inter-molecular pair potentials, and the "bound" buffer
/// receives the molecule-level forces (intra-molecular pair potentials,
/// bonded geometry terms and extended terms). Forces are always added to the
/// existing values in the buffers.
///
/// Each rayon thread accumulates into its own private buffer, and all
/// buffers are added together once at the end of each loop.
pub struct ForceKernel<'a> {
    configuration: &'a Configuration,
    potential_map: &'a PotentialMap,
    pool: &'a ProcessPool,
    cutoff_squared: f64,
    geometry: GeometryKernel<'a>,
    extended: Box<dyn ExtendedTerms + 'a>,
}

impl<'a> ForceKernel<'a> {
    /// Create a new force kernel for the given `configuration` and
    /// `potential_map`. Pairs further apart than `cutoff` do not contribute to
    /// the forces; the range of the potential map is used if `cutoff` is
    /// `None`.
    pub fn new(
        configuration: &'a Configuration,
        potential_map: &'a PotentialMap,
        pool: &'a ProcessPool,
        cutoff: Option<f64>,
    ) -> Result<ForceKernel<'a>, Error> {
        let cutoff = check_kernel_setup(configuration, potential_map, cutoff)?;

        return Ok(ForceKernel {
            configuration: configuration,
            potential_map: potential_map,
            pool: pool,
            cutoff_squared: cutoff * cutoff,
            geometry: GeometryKernel::new(configuration),
            extended: Box::new(NoExtendedTerms),
        });
    }

    /// Use the given `extended` terms with this kernel
    pub fn with_extended_terms(mut self, extended: Box<dyn ExtendedTerms + 'a>) -> ForceKernel<'a> {
        debug!("using '{}' extended terms in the force kernel", extended.name());
        self.extended = extended;
        return self;
    }

    /// Get the name of the extended terms used by this kernel
    pub fn extended_terms_name(&self) -> &str {
        self.extended.name()
    }

    fn check_buffer(&self, forces: &[Vector3D]) -> Result<(), Error> {
        if forces.len() != self.configuration.n_atoms() {
            return Err(Error::InvalidParameter(format!(
                "force buffer contains {} entries, but the configuration contains {} atoms",
                forces.len(), self.configuration.n_atoms()
            )));
        }
        return Ok(());
    }

    /// Add the force between atoms `i` and `j`, separated by `vector` (going
    /// from `i` to `j`), to `forces`
    #[inline]
    fn pair_force(&self, i: usize, j: usize, vector: Vector3D, forces: &mut [Vector3D]) {
        let distance_squared = vector.norm2();
        if distance_squared >= self.cutoff_squared {
            return;
        }

        let distance = distance_squared.sqrt();
        let first = self.configuration.atom(i);
        let second = self.configuration.atom(j);
        let force = self.potential_map.force(first, second, distance) / distance * vector;
        forces[i] += force;
        forces[j] -= force;
    }

    /// Add the pair potential forces between all atoms in `cell` to `forces`,
    /// ignoring pairs in the same molecule
    pub fn cell_forces(&self, cell: usize, forces: &mut [Vector3D]) {
        let atoms = self.configuration.cells().cell(cell).atoms();
        for (position, &i) in atoms.iter().enumerate() {
            let first = self.configuration.atom(i);
            for &j in &atoms[position + 1..] {
                let second = self.configuration.atom(j);
                if first.molecule() == second.molecule() {
                    continue;
                }

                self.pair_force(i, j, second.position() - first.position(), forces);
            }
        }
    }

    /// Add the pair potential forces between atoms in `cell` and atoms in
    /// `other` to `forces`, ignoring pairs in the same molecule
    pub fn cell_to_cell_forces(&self, cell: usize, other: usize, minimum_image: bool, forces: &mut [Vector3D]) {
        let simulation_box = self.configuration.simulation_box();
        let cells = self.configuration.cells();

        for &i in cells.cell(cell).atoms() {
            let first = self.configuration.atom(i);
            for &j in cells.cell(other).atoms() {
                let second = self.configuration.atom(j);
                if first.molecule() == second.molecule() {
                    continue;
                }

                let vector = if minimum_image {
                    simulation_box.minimum_vector(first.position(), second.position())
                } else {
                    second.position() - first.position()
                };
                self.pair_force(i, j, vector, forces);
            }
        }
    }

    /// Add the scaled pair potential forces between atoms in `molecule` to
    /// `forces`
    pub fn intra_molecular_forces(&self, molecule: usize, forces: &mut [Vector3D]) {
        let simulation_box = self.configuration.simulation_box();
        let atoms = self.configuration.molecule(molecule).atoms();

        for (position, &i) in atoms.iter().enumerate() {
            let first = self.configuration.atom(i);
            for &j in &atoms[position + 1..] {
                let scaling = self.configuration.scaling(i, j);
                if scaling == ScalingType::Excluded {
                    continue;
                }

                let second = self.configuration.atom(j);
                let vector = simulation_box.minimum_vector(first.position(), second.position());
                let distance_squared = vector.norm2();
                if distance_squared >= self.cutoff_squared {
                    continue;
                }

                let distance = distance_squared.sqrt();
                let derivative = match scaling {
                    ScalingType::NotScaled => self.potential_map.force(first, second, distance),
                    ScalingType::Scaled { elec, vdw } => {
                        self.potential_map.force_scaled(first, second, distance, elec, vdw)
                    }
                    ScalingType::Excluded => 0.0,
                };

                let force = derivative / distance * vector;
                forces[i] += force;
                forces[j] -= force;
            }
        }
    }

    /// Run `function` in parallel for all iterations assigned to this
    /// process in a loop over `count` items, and add the resulting forces to
    /// `forces`
    fn parallel_loop<F>(&self, strategy: DivisionStrategy, count: usize, forces: &mut [Vector3D], function: F)
        where F: Fn(usize, &mut [Vector3D]) + Sync
    {
        let n_atoms = self.configuration.n_atoms();
        let buffers = ForceBuffers::new();

        self.pool.loop_range(strategy).collect(count).into_par_iter().for_each(|index| {
            let mut local = buffers.get_or(|| RefCell::new(vec![Vector3D::zero(); n_atoms])).borrow_mut();
            function(index, &mut local);
        });

        reduce_buffers(buffers, forces);
    }

    /// Add the inter-molecular pair potential forces to `forces`
    #[time_graph::instrument(name = "ForceKernel::total_inter_molecular_forces")]
    pub fn total_inter_molecular_forces(&self, strategy: DivisionStrategy, forces: &mut [Vector3D]) -> Result<(), Error> {
        self.check_buffer(forces)?;

        let cells = self.configuration.cells();
        self.parallel_loop(strategy, cells.n_cells(), forces, |cell, local| {
            self.cell_forces(cell, local);
            for neighbour in cells.cell(cell).neighbours() {
                if neighbour.index > cell {
                    self.cell_to_cell_forces(cell, neighbour.index, neighbour.minimum_image, local);
                }
            }
        });

        return Ok(());
    }

    /// Add the scaled intra-molecular pair potential forces to `forces`
    #[time_graph::instrument(name = "ForceKernel::total_intra_molecular_forces")]
    pub fn total_intra_molecular_forces(&self, strategy: DivisionStrategy, forces: &mut [Vector3D]) -> Result<(), Error> {
        self.check_buffer(forces)?;

        let n_molecules = self.configuration.molecules().len();
        self.parallel_loop(strategy, n_molecules, forces, |molecule, local| {
            self.intra_molecular_forces(molecule, local);
        });

        return Ok(());
    }

    /// Add the forces from bonded terms to `forces`
    #[time_graph::instrument(name = "ForceKernel::total_geometry_forces")]
    pub fn total_geometry_forces(&self, strategy: DivisionStrategy, forces: &mut [Vector3D]) -> Result<(), Error> {
        self.check_buffer(forces)?;

        let n_molecules = self.configuration.molecules().len();
        self.parallel_loop(strategy, n_molecules, forces, |molecule, local| {
            self.geometry.molecule_forces(molecule, local);
        });

        return Ok(());
    }

    /// Add the forces from the extended terms to `forces`
    #[time_graph::instrument(name = "ForceKernel::total_extended_forces")]
    pub fn total_extended_forces(&self, strategy: DivisionStrategy, forces: &mut [Vector3D]) -> Result<(), Error> {
        self.check_buffer(forces)?;

        let range = self.pool.loop_range(strategy);
        let atom_forces = range.collect(self.configuration.n_atoms()).into_par_iter()
            .map(|atom| (atom, self.extended.atom_force(self.configuration, atom)))
            .collect::<Vec<_>>();

        for (atom, force) in atom_forces {
            forces[atom] += force;
        }

        return Ok(());
    }

    /// Add the forces from all categories enabled in `flags`. Inter-molecular
    /// forces go to `unbound`; intra-molecular, geometry and extended forces
    /// go to `bound`.
    pub fn total_forces(
        &self,
        flags: KernelFlags,
        strategy: DivisionStrategy,
        unbound: &mut [Vector3D],
        bound: &mut [Vector3D],
    ) -> Result<(), Error> {
        self.check_buffer(unbound)?;
        self.check_buffer(bound)?;

        if flags.inter_molecular {
            self.total_inter_molecular_forces(strategy, unbound)?;
        }
        if flags.intra_molecular {
            self.total_intra_molecular_forces(strategy, bound)?;
        }
        if flags.geometry {
            self.total_geometry_forces(strategy, bound)?;
        }
        if flags.extended {
            self.total_extended_forces(strategy, bound)?;
        }

        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::kernels::{EnergyKernel, ExternalPotentialTerms};
    use crate::potentials::ExternalPotential;
    use crate::configuration::test_utils::{test_configuration, test_potentials};

    fn total_energy(configuration: &Configuration, map: &PotentialMap, flags: KernelFlags) -> f64 {
        let pool = ProcessPool::serial();
        let kernel = EnergyKernel::new(configuration, map, &pool, None).unwrap()
            .with_extended_terms(Box::new(ExternalPotentialTerms::new(configuration)));
        return kernel.total_energy(flags, DivisionStrategy::Pool).total();
    }

    fn with_external_potential() -> Configuration {
        let mut configuration = test_configuration("three-molecules");
        configuration.add_global_potential(ExternalPotential::Cylindrical {
            origin: [10.0, 10.0, 10.0],
            axis: [0.0, 0.0, 1.0],
            radius: 5.0,
            force_constant: 2.0,
        }).unwrap();
        return configuration;
    }

    #[test]
    fn buffer_size() {
        let configuration = test_configuration("three-molecules");
        let map = test_potentials(&configuration);
        let pool = ProcessPool::serial();
        let kernel = ForceKernel::new(&configuration, &map, &pool, None).unwrap();

        let mut good = vec![Vector3D::zero(); configuration.n_atoms()];
        let mut bad = vec![Vector3D::zero(); 3];
        assert!(kernel.total_forces(KernelFlags::all(), DivisionStrategy::Pool, &mut good, &mut bad).is_err());
        assert!(kernel.total_inter_molecular_forces(DivisionStrategy::Pool, &mut bad).is_err());
    }

    #[test]
    fn categories_are_independent() {
        let configuration = with_external_potential();
        let map = test_potentials(&configuration);
        let pool = ProcessPool::serial();
        let kernel = ForceKernel::new(&configuration, &map, &pool, None).unwrap()
            .with_extended_terms(Box::new(ExternalPotentialTerms::new(&configuration)));

        let n_atoms = configuration.n_atoms();
        let mut unbound = vec![Vector3D::zero(); n_atoms];
        let mut bound = vec![Vector3D::zero(); n_atoms];
        kernel.total_forces(KernelFlags::all(), DivisionStrategy::Pool, &mut unbound, &mut bound).unwrap();

        let mut sum_unbound = vec![Vector3D::zero(); n_atoms];
        let mut sum_bound = vec![Vector3D::zero(); n_atoms];
        for flags in [
            KernelFlags::none().with_inter_molecular(),
            KernelFlags::none().with_intra_molecular(),
            KernelFlags::none().with_geometry(),
            KernelFlags::none().with_extended(),
        ] {
            kernel.total_forces(flags, DivisionStrategy::Pool, &mut sum_unbound, &mut sum_bound).unwrap();
        }

        for atom in 0..n_atoms {
            assert_relative_eq!(unbound[atom], sum_unbound[atom], epsilon = 1e-9, max_relative = 1e-12);
            assert_relative_eq!(bound[atom], sum_bound[atom], epsilon = 1e-9, max_relative = 1e-12);
        }

        // molecule-level forces only go to the bound buffer
        for flags in [
            KernelFlags::none().with_geometry().with_intra_molecular(),
            KernelFlags::none().with_extended(),
        ] {
            let mut unbound = vec![Vector3D::zero(); n_atoms];
            let mut bound = vec![Vector3D::zero(); n_atoms];
            kernel.total_forces(flags, DivisionStrategy::Pool, &mut unbound, &mut bound).unwrap();
            assert!(unbound.iter().all(|&force| force == Vector3D::zero()));
            assert!(bound.iter().any(|&force| force != Vector3D::zero()));
        }

        // and inter-molecular forces only go to the unbound buffer
        let mut unbound = vec![Vector3D::zero(); n_atoms];
        let mut bound = vec![Vector3D::zero(); n_atoms];
        let flags = KernelFlags::none().with_inter_molecular();
        kernel.total_forces(flags, DivisionStrategy::Pool, &mut unbound, &mut bound).unwrap();
        assert!(bound.iter().all(|&force| force == Vector3D::zero()));
        assert!(unbound.iter().any(|&force| force != Vector3D::zero()));
    }

    #[test]
    fn forces_are_energy_derivatives() {
        let configuration = with_external_potential();
        let map = test_potentials(&configuration);
        let pool = ProcessPool::serial();
        let kernel = ForceKernel::new(&configuration, &map, &pool, None).unwrap()
            .with_extended_terms(Box::new(ExternalPotentialTerms::new(&configuration)));

        let n_atoms = configuration.n_atoms();
        let mut unbound = vec![Vector3D::zero(); n_atoms];
        let mut bound = vec![Vector3D::zero(); n_atoms];
        kernel.total_forces(KernelFlags::all(), DivisionStrategy::Pool, &mut unbound, &mut bound).unwrap();

        let delta = 1e-5;
        for atom in 0..n_atoms {
            let force = unbound[atom] + bound[atom];
            for k in 0..3 {
                let mut moved = configuration.clone();
                let mut position = configuration.atom(atom).position();
                position[k] += delta;
                moved.move_atom(atom, position).unwrap();
                let plus = total_energy(&moved, &map, KernelFlags::all());

                let mut moved = configuration.clone();
                let mut position = configuration.atom(atom).position();
                position[k] -= delta;
                moved.move_atom(atom, position).unwrap();
                let minus = total_energy(&moved, &map, KernelFlags::all());

                let numerical = -(plus - minus) / (2.0 * delta);
                assert_relative_eq!(force[k], numerical, epsilon = 1e-2, max_relative = 1e-3);
            }
        }
    }

    #[test]
    fn newton_third_law() {
        let configuration = test_configuration("three-molecules");
        let map = test_potentials(&configuration);
        let pool = ProcessPool::serial();
        let kernel = ForceKernel::new(&configuration, &map, &pool, None).unwrap();

        let n_atoms = configuration.n_atoms();
        let mut unbound = vec![Vector3D::zero(); n_atoms];
        let mut bound = vec![Vector3D::zero(); n_atoms];
        kernel.total_forces(KernelFlags::all(), DivisionStrategy::Pool, &mut unbound, &mut bound).unwrap();

        let total_unbound = unbound.iter().sum::<Vector3D>();
        let total_bound = bound.iter().sum::<Vector3D>();
        assert_relative_eq!(total_unbound, Vector3D::zero(), epsilon = 1e-8);
        assert_relative_eq!(total_bound, Vector3D::zero(), epsilon = 1e-8);
    }
}
