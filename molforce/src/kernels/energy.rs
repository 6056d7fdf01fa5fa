use log::debug;
use rayon::prelude::*;

use crate::{Error, Vector3D};
use crate::configuration::{Configuration, ScalingType};
use crate::parallel::{DivisionStrategy, ProcessPool};
use crate::potentials::PotentialMap;

use super::{ExtendedTerms, NoExtendedTerms, GeometryKernel, KernelFlags, EnergyResult};

/// Kernel computing the potential energy of a configuration.
///
/// The energy is split in four categories:
/// - inter-molecular pair potential energy, found through the cell array;
/// - intra-molecular pair potential energy, scaled according to the number
///   of bonds separating the atoms;
/// - bonded geometry terms;
/// - extended terms, such as external potentials.
///
/// Loops over cells, molecules and atoms are split between the processes in
/// the pool according to a [`DivisionStrategy`], and the iterations assigned
/// to the current process run in parallel with rayon. The `total_*`
/// functions only include the iterations assigned to the current process.
pub struct EnergyKernel<'a> {
    configuration: &'a Configuration,
    potential_map: &'a PotentialMap,
    pool: &'a ProcessPool,
    cutoff_squared: f64,
    geometry: GeometryKernel<'a>,
    extended: Box<dyn ExtendedTerms + 'a>,
}

/// Check that the configuration and potentials can be used together with the
/// given `cutoff`, returning the cutoff to use
pub(super) fn check_kernel_setup(
    configuration: &Configuration,
    potential_map: &PotentialMap,
    cutoff: Option<f64>,
) -> Result<f64, Error> {
    let cutoff = cutoff.unwrap_or_else(|| potential_map.range());
    if !(cutoff > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "kernel cutoff must be positive, got {}", cutoff
        )));
    }

    if cutoff > potential_map.range() {
        return Err(Error::InvalidParameter(format!(
            "kernel cutoff ({}) is larger than the range of pair potentials ({})",
            cutoff, potential_map.range()
        )));
    }

    let cells_cutoff = configuration.cells().cutoff();
    if cutoff > cells_cutoff {
        return Err(Error::InvalidParameter(format!(
            "kernel cutoff ({}) is larger than the cell array cutoff ({})",
            cutoff, cells_cutoff
        )));
    }

    if potential_map.n_types() < configuration.atom_types().len() {
        return Err(Error::InvalidParameter(format!(
            "the potential map contains {} atom types, but the configuration uses {}",
            potential_map.n_types(), configuration.atom_types().len()
        )));
    }

    return Ok(cutoff);
}

impl<'a> EnergyKernel<'a> {
    /// Create a new energy kernel for the given `configuration` and
    /// `potential_map`. Pairs further apart than `cutoff` do not contribute to
    /// the energy; the range of the potential map is used if `cutoff` is
    /// `None`.
    pub fn new(
        configuration: &'a Configuration,
        potential_map: &'a PotentialMap,
        pool: &'a ProcessPool,
        cutoff: Option<f64>,
    ) -> Result<EnergyKernel<'a>, Error> {
        let cutoff = check_kernel_setup(configuration, potential_map, cutoff)?;

        return Ok(EnergyKernel {
            configuration: configuration,
            potential_map: potential_map,
            pool: pool,
            cutoff_squared: cutoff * cutoff,
            geometry: GeometryKernel::new(configuration),
            extended: Box::new(NoExtendedTerms),
        });
    }

    /// Use the given `extended` terms with this kernel
    pub fn with_extended_terms(mut self, extended: Box<dyn ExtendedTerms + 'a>) -> EnergyKernel<'a> {
        debug!("using '{}' extended terms in the energy kernel", extended.name());
        self.extended = extended;
        return self;
    }

    /// Get the name of the extended terms used by this kernel
    pub fn extended_terms_name(&self) -> &str {
        self.extended.name()
    }

    #[inline]
    fn pair_energy(&self, i: usize, j: usize, vector: Vector3D) -> f64 {
        let distance_squared = vector.norm2();
        if distance_squared >= self.cutoff_squared {
            return 0.0;
        }

        let first = self.configuration.atom(i);
        let second = self.configuration.atom(j);
        return self.potential_map.energy(first, second, distance_squared.sqrt());
    }

    /// Get the pair potential energy between all atoms in `cell`, ignoring
    /// pairs in the same molecule
    pub fn cell_energy(&self, cell: usize) -> f64 {
        let atoms = self.configuration.cells().cell(cell).atoms();

        let mut energy = 0.0;
        for (position, &i) in atoms.iter().enumerate() {
            let first = self.configuration.atom(i);
            for &j in &atoms[position + 1..] {
                let second = self.configuration.atom(j);
                if first.molecule() == second.molecule() {
                    continue;
                }

                energy += self.pair_energy(i, j, second.position() - first.position());
            }
        }
        return energy;
    }

    /// Get the pair potential energy between atoms in `cell` and atoms in
    /// `other`, ignoring pairs in the same molecule.
    pub fn cell_to_cell_energy(&self, cell: usize, other: usize, minimum_image: bool) -> f64 {
        let simulation_box = self.configuration.simulation_box();
        let cells = self.configuration.cells();

        let mut energy = 0.0;
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
                energy += self.pair_energy(i, j, vector);
            }
        }
        return energy;
    }

    /// Get the inter-molecular pair potential energy between `atom` and all
    /// other atoms in the configuration
    pub fn atom_energy(&self, atom: usize) -> f64 {
        let simulation_box = self.configuration.simulation_box();
        let first = self.configuration.atom(atom);
        let cell = self.configuration.cells().cell(first.cell());

        let mut energy = 0.0;
        for &j in cell.atoms().iter().chain(cell.near_atoms()) {
            let second = self.configuration.atom(j);
            if first.molecule() == second.molecule() {
                continue;
            }
            energy += self.pair_energy(atom, j, second.position() - first.position());
        }

        for &j in cell.mim_atoms() {
            let second = self.configuration.atom(j);
            if first.molecule() == second.molecule() {
                continue;
            }
            let vector = simulation_box.minimum_vector(first.position(), second.position());
            energy += self.pair_energy(atom, j, vector);
        }

        return energy;
    }

    /// Get the pair potential energy between atoms in `molecule`, scaled
    /// according to the bonds separating them
    pub fn intra_molecular_energy(&self, molecule: usize) -> f64 {
        let simulation_box = self.configuration.simulation_box();
        let atoms = self.configuration.molecule(molecule).atoms();

        let mut energy = 0.0;
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
                energy += match scaling {
                    ScalingType::NotScaled => self.potential_map.energy(first, second, distance),
                    ScalingType::Scaled { elec, vdw } => {
                        self.potential_map.energy_scaled(first, second, distance, elec, vdw)
                    }
                    ScalingType::Excluded => 0.0,
                };
            }
        }
        return energy;
    }

    /// Get the energy of `molecule` with the rest of the configuration and
    /// with itself, including only the categories enabled in `flags`
    pub fn molecule_energy(&self, molecule: usize, flags: KernelFlags) -> EnergyResult {
        let atoms = self.configuration.molecule(molecule).atoms();

        let mut result = EnergyResult::default();
        if flags.inter_molecular {
            result.inter_molecular = atoms.iter().map(|&atom| self.atom_energy(atom)).sum();
        }
        if flags.intra_molecular {
            result.intra_molecular = self.intra_molecular_energy(molecule);
        }
        if flags.geometry {
            result.geometry = self.geometry.molecule_energy(molecule);
        }
        if flags.extended {
            result.extended = atoms.iter()
                .map(|&atom| self.extended.atom_energy(self.configuration, atom))
                .sum();
        }
        return result;
    }

    /// Get the total inter-molecular pair potential energy, going over all
    /// cells and their neighbors with a higher index
    #[time_graph::instrument(name = "EnergyKernel::total_inter_molecular_energy")]
    pub fn total_inter_molecular_energy(&self, strategy: DivisionStrategy) -> f64 {
        let cells = self.configuration.cells();
        let range = self.pool.loop_range(strategy);

        return range.collect(cells.n_cells()).into_par_iter()
            .map(|cell| {
                let mut energy = self.cell_energy(cell);
                for neighbour in cells.cell(cell).neighbours() {
                    if neighbour.index > cell {
                        energy += self.cell_to_cell_energy(cell, neighbour.index, neighbour.minimum_image);
                    }
                }
                energy
            })
            .sum();
    }

    /// Get the total scaled intra-molecular pair potential energy
    #[time_graph::instrument(name = "EnergyKernel::total_intra_molecular_energy")]
    pub fn total_intra_molecular_energy(&self, strategy: DivisionStrategy) -> f64 {
        let range = self.pool.loop_range(strategy);
        return range.collect(self.configuration.molecules().len()).into_par_iter()
            .map(|molecule| self.intra_molecular_energy(molecule))
            .sum();
    }

    /// Get the total energy of bonded terms
    #[time_graph::instrument(name = "EnergyKernel::total_geometry_energy")]
    pub fn total_geometry_energy(&self, strategy: DivisionStrategy) -> f64 {
        let range = self.pool.loop_range(strategy);
        return range.collect(self.configuration.molecules().len()).into_par_iter()
            .map(|molecule| self.geometry.molecule_energy(molecule))
            .sum();
    }

    /// Get the total energy of the extended terms
    #[time_graph::instrument(name = "EnergyKernel::total_extended_energy")]
    pub fn total_extended_energy(&self, strategy: DivisionStrategy) -> f64 {
        let range = self.pool.loop_range(strategy);
        return range.collect(self.configuration.n_atoms()).into_par_iter()
            .map(|atom| self.extended.atom_energy(self.configuration, atom))
            .sum();
    }

    /// Get the total energy of the configuration, including only the
    /// categories enabled in `flags`
    pub fn total_energy(&self, flags: KernelFlags, strategy: DivisionStrategy) -> EnergyResult {
        let mut result = EnergyResult::default();
        if flags.inter_molecular {
            result.inter_molecular = self.total_inter_molecular_energy(strategy);
        }
        if flags.intra_molecular {
            result.intra_molecular = self.total_intra_molecular_energy(strategy);
        }
        if flags.geometry {
            result.geometry = self.total_geometry_energy(strategy);
        }
        if flags.extended {
            result.extended = self.total_extended_energy(strategy);
        }
        return result;
    }
}
