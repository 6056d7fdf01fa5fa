use std::collections::VecDeque;

use ndarray::Array2;

use crate::{Error, Vector3D};
use crate::potentials::ShortRangeForm;

/// Atom types define the short-range interactions and default charge of atoms
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AtomType {
    /// Unique name of this atom type
    pub name: String,
    /// Charge of atoms with this type, in elementary charges
    #[serde(default)]
    pub charge: f64,
    /// Short-range interaction for this atom type
    pub short_range: ShortRangeForm,
}

impl AtomType {
    /// Parse a list of atom types from JSON
    pub fn list_from_json(json: &str) -> Result<Vec<AtomType>, Error> {
        let atom_types: Vec<AtomType> = serde_json::from_str(json)?;
        for atom_type in &atom_types {
            atom_type.validate()?;
        }
        return Ok(atom_types);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::InvalidParameter("atom type name can not be empty".into()));
        }

        if !self.charge.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "invalid charge for atom type '{}': {}", self.name, self.charge
            )));
        }

        return self.short_range.validate();
    }
}

/// How pair potentials between two atoms of the same molecule are scaled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalingType {
    /// The pair potential is used as-is
    NotScaled,
    /// The Coulomb part of the pair potential is scaled by `elec`, and the
    /// short-range part by `vdw`
    Scaled {
        elec: f64,
        vdw: f64,
    },
    /// There is no pair potential interaction between these atoms
    Excluded,
}

/// Harmonic bond between two atoms: `U = k/2 (r - r_0)^2`
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Bond {
    pub i: usize,
    pub j: usize,
    /// Force constant `k`, in kJ/mol/Å²
    pub force_constant: f64,
    /// Equilibrium distance `r_0`, in Å
    pub equilibrium: f64,
}

impl Bond {
    /// Get the energy of this bond at the given `distance`
    #[inline]
    pub fn energy(&self, distance: f64) -> f64 {
        let delta = distance - self.equilibrium;
        0.5 * self.force_constant * delta * delta
    }

    /// Get the derivative of the energy with respect to the distance
    #[inline]
    pub fn derivative(&self, distance: f64) -> f64 {
        self.force_constant * (distance - self.equilibrium)
    }
}

/// Harmonic angle `i-j-k`, centered on `j`: `U = k/2 (θ - θ_0)^2`, with angles
/// in radians
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Angle {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    /// Force constant `k`, in kJ/mol/rad²
    pub force_constant: f64,
    /// Equilibrium angle `θ_0`, in degrees
    pub equilibrium: f64,
}

impl Angle {
    /// Get the energy of this angle for the given `angle` in degrees
    #[inline]
    pub fn energy(&self, angle: f64) -> f64 {
        let delta = (angle - self.equilibrium).to_radians();
        0.5 * self.force_constant * delta * delta
    }

    /// Get the derivative of the energy with respect to the angle in radians,
    /// for the given `angle` in degrees
    #[inline]
    pub fn derivative(&self, angle: f64) -> f64 {
        self.force_constant * (angle - self.equilibrium).to_radians()
    }
}

/// Pairs of atoms separated by this many bonds or more are not scaled
const UNCONNECTED: u8 = 4;

/// A species is the template used to create molecules: it contains the atoms
/// of the molecule with their types and charges, a reference geometry, and
/// the bonded terms between the atoms.
///
/// Pair potential interactions inside a molecule depend on the number of
/// bonds separating the atoms: atoms directly bonded (1-2) or sharing a common
/// neighbor (1-3) do not interact, atoms separated by three bonds (1-4)
/// interact with scaled Coulomb and short-range potentials, and all other
/// pairs interact normally.
#[derive(Debug, Clone)]
pub struct Species {
    name: String,
    atom_types: Vec<usize>,
    charges: Vec<f64>,
    positions: Vec<Vector3D>,
    bonds: Vec<Bond>,
    angles: Vec<Angle>,
    elec_14: f64,
    vdw_14: f64,
    /// Number of bonds separating each pair of atoms, saturating at
    /// `UNCONNECTED`
    separations: Array2<u8>,
}

impl Species {
    /// Create a new empty species
    pub fn new(name: impl Into<String>) -> Species {
        Species {
            name: name.into(),
            atom_types: Vec::new(),
            charges: Vec::new(),
            positions: Vec::new(),
            bonds: Vec::new(),
            angles: Vec::new(),
            elec_14: 0.5,
            vdw_14: 0.5,
            separations: Array2::zeros((0, 0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an atom with the given `atom_type` index, `charge` and reference
    /// `position`, returning the index of the new atom.
    pub fn add_atom(&mut self, atom_type: usize, charge: f64, position: Vector3D) -> usize {
        self.atom_types.push(atom_type);
        self.charges.push(charge);
        self.positions.push(position);
        self.update_separations();
        return self.atom_types.len() - 1;
    }

    pub fn n_atoms(&self) -> usize {
        self.atom_types.len()
    }

    /// Get the atom type index of all atoms
    pub fn atom_types(&self) -> &[usize] {
        &self.atom_types
    }

    pub fn charges(&self) -> &[f64] {
        &self.charges
    }

    /// Get the reference positions of all atoms
    pub fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    fn check_atom(&self, atom: usize) -> Result<(), Error> {
        if atom >= self.n_atoms() {
            return Err(Error::InvalidParameter(format!(
                "invalid atom index {} for species '{}' with {} atoms", atom, self.name, self.n_atoms()
            )));
        }
        return Ok(());
    }

    /// Add an harmonic bond between atoms `i` and `j`
    pub fn add_bond(&mut self, bond: Bond) -> Result<(), Error> {
        self.check_atom(bond.i)?;
        self.check_atom(bond.j)?;
        if bond.i == bond.j {
            return Err(Error::InvalidParameter(format!(
                "can not bond atom {} with itself in species '{}'", bond.i, self.name
            )));
        }

        if self.bonds.iter().any(|b| (b.i, b.j) == (bond.i, bond.j) || (b.i, b.j) == (bond.j, bond.i)) {
            return Err(Error::InvalidParameter(format!(
                "atoms {} and {} are already bonded in species '{}'", bond.i, bond.j, self.name
            )));
        }

        self.bonds.push(bond);
        self.update_separations();
        return Ok(());
    }

    /// Add an harmonic angle between atoms `i`, `j` and `k`
    pub fn add_angle(&mut self, angle: Angle) -> Result<(), Error> {
        self.check_atom(angle.i)?;
        self.check_atom(angle.j)?;
        self.check_atom(angle.k)?;
        if angle.i == angle.j || angle.j == angle.k || angle.i == angle.k {
            return Err(Error::InvalidParameter(format!(
                "angle {}-{}-{} in species '{}' must use three different atoms",
                angle.i, angle.j, angle.k, self.name
            )));
        }

        self.angles.push(angle);
        return Ok(());
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn angles(&self) -> &[Angle] {
        &self.angles
    }

    /// Set the scaling factors for Coulomb and short-range interactions
    /// between atoms separated by three bonds
    pub fn set_scaling_factors(&mut self, elec_14: f64, vdw_14: f64) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&elec_14) || !(0.0..=1.0).contains(&vdw_14) {
            return Err(Error::InvalidParameter(format!(
                "1-4 scaling factors must be between 0 and 1, got {} and {}", elec_14, vdw_14
            )));
        }
        self.elec_14 = elec_14;
        self.vdw_14 = vdw_14;
        return Ok(());
    }

    /// Get the Coulomb and short-range scaling factors for 1-4 interactions
    pub fn scaling_factors(&self) -> (f64, f64) {
        (self.elec_14, self.vdw_14)
    }

    /// Get the number of bonds separating atoms `i` and `j`, or `None` if
    /// they are separated by more than three bonds or not connected at all.
    pub fn bond_separation(&self, i: usize, j: usize) -> Option<u8> {
        let separation = self.separations[[i, j]];
        if separation >= UNCONNECTED {
            None
        } else {
            Some(separation)
        }
    }

    /// Get the scaling of pair potential interactions between atoms `i` and
    /// `j` of this species
    #[inline]
    pub fn scaling(&self, i: usize, j: usize) -> ScalingType {
        match self.separations[[i, j]] {
            0..=2 => ScalingType::Excluded,
            3 => ScalingType::Scaled { elec: self.elec_14, vdw: self.vdw_14 },
            _ => ScalingType::NotScaled,
        }
    }

    /// Check that all atom types indexes are below `n_types`
    pub(crate) fn validate(&self, n_types: usize) -> Result<(), Error> {
        if self.n_atoms() == 0 {
            return Err(Error::InvalidParameter(format!("species '{}' does not contain any atom", self.name)));
        }

        for (atom, &atom_type) in self.atom_types.iter().enumerate() {
            if atom_type >= n_types {
                return Err(Error::InvalidParameter(format!(
                    "atom {} of species '{}' uses atom type {}, but there are only {} atom types",
                    atom, self.name, atom_type, n_types
                )));
            }
        }
        return Ok(());
    }

    /// Recompute the number of bonds between all pairs of atoms with a
    /// breadth-first search from each atom
    fn update_separations(&mut self) {
        let n_atoms = self.n_atoms();
        let mut neighbors = vec![Vec::new(); n_atoms];
        for bond in &self.bonds {
            neighbors[bond.i].push(bond.j);
            neighbors[bond.j].push(bond.i);
        }

        self.separations = Array2::from_elem((n_atoms, n_atoms), UNCONNECTED);
        let mut queue = VecDeque::new();
        for start in 0..n_atoms {
            self.separations[[start, start]] = 0;
            queue.clear();
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                let separation = self.separations[[start, current]];
                if separation + 1 >= UNCONNECTED {
                    continue;
                }

                for &next in &neighbors[current] {
                    if self.separations[[start, next]] == UNCONNECTED {
                        self.separations[[start, next]] = separation + 1;
                        queue.push_back(next);
                    }
                }
            }
        }
    }
}
