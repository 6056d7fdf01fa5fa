use indexmap::IndexMap;
use log::info;
use ndarray::Array2;

use crate::Error;
use crate::configuration::{Atom, AtomType};

use super::{PairPotential, PairPotentialParameters, CoulombTruncation};

/// Map from pairs of atom types to the corresponding `PairPotential`.
///
/// Each unordered pair of atom types is tabulated once, and used for both
/// `(i, j)` and `(j, i)`. When atom type charges are not included in the
/// tabulated potentials, the Coulomb interaction is computed analytically from
/// the charges of the atoms.
#[derive(Debug, Clone)]
pub struct PotentialMap {
    /// Unique pair potentials, indexed by the pair of atom types indexes
    potentials: IndexMap<(usize, usize), PairPotential>,
    /// Index of the potential to use for each pair of atom types
    indexes: Array2<usize>,
    range: f64,
    include_atom_type_charges: bool,
    coulomb_truncation: CoulombTruncation,
}

impl PotentialMap {
    /// Tabulate the pair potentials between all the `atom_types`
    #[time_graph::instrument(name = "PotentialMap::new")]
    pub fn new(atom_types: &[AtomType], parameters: &PairPotentialParameters) -> Result<PotentialMap, Error> {
        parameters.validate()?;

        let n_types = atom_types.len();
        let mut potentials = IndexMap::new();
        let mut indexes = Array2::zeros((n_types, n_types));
        for i in 0..n_types {
            for j in i..n_types {
                let potential = PairPotential::new(&atom_types[i], &atom_types[j], parameters)?;
                let (position, _) = potentials.insert_full((i, j), potential);
                indexes[[i, j]] = position;
                indexes[[j, i]] = position;
            }
        }

        info!(
            "tabulated {} pair potentials between {} atom types, up to {} Å with {} points each",
            potentials.len(), n_types, parameters.range, parameters.n_points()
        );

        return Ok(PotentialMap {
            potentials: potentials,
            indexes: indexes,
            range: parameters.range,
            include_atom_type_charges: parameters.include_atom_type_charges,
            coulomb_truncation: parameters.coulomb_truncation,
        });
    }

    /// Get the range of all potentials in this map
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Get the number of atom types in this map
    pub fn n_types(&self) -> usize {
        self.indexes.nrows()
    }

    /// Get the pair potential between the atom types with indexes `i` and `j`
    pub fn potential(&self, i: usize, j: usize) -> &PairPotential {
        &self.potentials[self.indexes[[i, j]]]
    }

    /// Get mutable access to the pair potential between the atom types with
    /// indexes `i` and `j`, for example to modify the additional potential
    pub fn potential_mut(&mut self, i: usize, j: usize) -> &mut PairPotential {
        let index = self.indexes[[i, j]];
        &mut self.potentials[index]
    }

    /// Iterate over all unique pair potentials, with the indexes of the
    /// corresponding atom types
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &PairPotential)> + '_ {
        self.potentials.iter().map(|(&types, potential)| (types, potential))
    }

    /// Get the energy between atoms `i` and `j` at distance `r`
    #[inline]
    pub fn energy(&self, i: &Atom, j: &Atom, r: f64) -> f64 {
        let potential = self.potential(i.atom_type(), j.atom_type());
        let mut energy = potential.energy(r);
        if !self.include_atom_type_charges {
            energy += potential.analytic_coulomb_energy(i.charge() * j.charge(), r, self.coulomb_truncation);
        }
        return energy;
    }

    /// Get the energy between atoms `i` and `j` at distance `r`, scaling the
    /// Coulomb part by `elec_scale` and the short-range part by `vdw_scale`
    #[inline]
    pub fn energy_scaled(&self, i: &Atom, j: &Atom, r: f64, elec_scale: f64, vdw_scale: f64) -> f64 {
        let potential = self.potential(i.atom_type(), j.atom_type());
        let mut energy = potential.energy_scaled(r, elec_scale, vdw_scale);
        if !self.include_atom_type_charges {
            energy += elec_scale * potential.analytic_coulomb_energy(i.charge() * j.charge(), r, self.coulomb_truncation);
        }
        return energy;
    }

    /// Get the derivative of the energy between atoms `i` and `j` at
    /// distance `r`
    #[inline]
    pub fn force(&self, i: &Atom, j: &Atom, r: f64) -> f64 {
        let potential = self.potential(i.atom_type(), j.atom_type());
        let mut force = potential.force(r);
        if !self.include_atom_type_charges {
            force += potential.analytic_coulomb_force(i.charge() * j.charge(), r, self.coulomb_truncation);
        }
        return force;
    }

    /// Get the derivative of the energy between atoms `i` and `j` at
    /// distance `r`, scaling the Coulomb part by `elec_scale` and the
    /// short-range part by `vdw_scale`
    #[inline]
    pub fn force_scaled(&self, i: &Atom, j: &Atom, r: f64, elec_scale: f64, vdw_scale: f64) -> f64 {
        let potential = self.potential(i.atom_type(), j.atom_type());
        let mut force = potential.force_scaled(r, elec_scale, vdw_scale);
        if !self.include_atom_type_charges {
            force += elec_scale * potential.analytic_coulomb_force(i.charge() * j.charge(), r, self.coulomb_truncation);
        }
        return force;
    }
}
