use log::{info, debug};

use crate::{Error, Vector3D};
use crate::cells::CellArray;
use crate::geometry::SimulationBox;
use crate::potentials::{ExternalPotential, TargetedPotential};

use super::{AtomType, Species, ScalingType};

/// A single atom in a configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Position of the atom, folded inside the box
    position: Vector3D,
    /// Index of the molecule containing this atom
    molecule: usize,
    /// Index of the corresponding atom in the molecule species
    species_atom: usize,
    atom_type: usize,
    charge: f64,
    /// Index of the cell containing this atom
    cell: usize,
}

impl Atom {
    pub(crate) fn new(atom_type: usize, charge: f64, position: Vector3D) -> Atom {
        Atom {
            position: position,
            molecule: 0,
            species_atom: 0,
            atom_type: atom_type,
            charge: charge,
            cell: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> Vector3D {
        self.position
    }

    #[inline]
    pub fn molecule(&self) -> usize {
        self.molecule
    }

    #[inline]
    pub fn species_atom(&self) -> usize {
        self.species_atom
    }

    #[inline]
    pub fn atom_type(&self) -> usize {
        self.atom_type
    }

    #[inline]
    pub fn charge(&self) -> f64 {
        self.charge
    }

    #[inline]
    pub fn cell(&self) -> usize {
        self.cell
    }
}

/// A molecule in a configuration, created from a `Species`
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    species: usize,
    /// Indexes of the atoms in this molecule, in the same order as in the
    /// species
    atoms: Vec<usize>,
}

impl Molecule {
    pub fn species(&self) -> usize {
        self.species
    }

    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }
}

/// A `Configuration` contains a set of molecules inside a simulation box,
/// together with the cell array used to find interacting atoms and the
/// external potentials acting on the atoms.
///
/// All atoms and molecules are stored in flat lists, and refer to each other
/// by index. Atoms positions are always folded inside the box.
#[derive(Debug, Clone)]
pub struct Configuration {
    atom_types: Vec<AtomType>,
    species: Vec<Species>,
    atoms: Vec<Atom>,
    molecules: Vec<Molecule>,
    cells: CellArray,
    global_potentials: Vec<ExternalPotential>,
    targeted_potentials: Vec<TargetedPotential>,
    /// Incremented every time atoms, molecules or the box change
    contents_version: u64,
}

impl Configuration {
    /// Create an empty configuration in the given box, using cells of roughly
    /// `cell_size` to find atoms closer than `cutoff`.
    pub fn new(simulation_box: SimulationBox, cell_size: f64, cutoff: f64) -> Result<Configuration, Error> {
        let cells = CellArray::new(simulation_box, cell_size, cutoff)?;
        return Ok(Configuration {
            atom_types: Vec::new(),
            species: Vec::new(),
            atoms: Vec::new(),
            molecules: Vec::new(),
            cells: cells,
            global_potentials: Vec::new(),
            targeted_potentials: Vec::new(),
            contents_version: 0,
        });
    }

    pub fn simulation_box(&self) -> &SimulationBox {
        self.cells.simulation_box()
    }

    pub fn cells(&self) -> &CellArray {
        &self.cells
    }

    pub fn contents_version(&self) -> u64 {
        self.contents_version
    }

    pub fn atom_types(&self) -> &[AtomType] {
        &self.atom_types
    }

    /// Add a new atom type, returning its index
    pub fn add_atom_type(&mut self, atom_type: AtomType) -> Result<usize, Error> {
        atom_type.validate()?;
        if self.atom_types.iter().any(|existing| existing.name == atom_type.name) {
            return Err(Error::InvalidParameter(format!(
                "there is already an atom type named '{}'", atom_type.name
            )));
        }

        self.atom_types.push(atom_type);
        return Ok(self.atom_types.len() - 1);
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// Add a new species, returning its index. All the atom types used by the
    /// species must already be defined.
    pub fn add_species(&mut self, species: Species) -> Result<usize, Error> {
        species.validate(self.atom_types.len())?;
        self.species.push(species);
        return Ok(self.species.len() - 1);
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    #[inline]
    pub fn atom(&self, index: usize) -> &Atom {
        &self.atoms[index]
    }

    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn molecule(&self, index: usize) -> &Molecule {
        &self.molecules[index]
    }

    /// Get the species of the given `molecule`
    pub fn molecule_species(&self, molecule: usize) -> &Species {
        &self.species[self.molecules[molecule].species]
    }

    /// Add a new molecule of the given `species`, with atoms at `positions`.
    /// The positions are folded inside the box. This returns the index of the
    /// new molecule.
    pub fn add_molecule(&mut self, species: usize, positions: &[Vector3D]) -> Result<usize, Error> {
        if species >= self.species.len() {
            return Err(Error::InvalidParameter(format!(
                "invalid species index {}, there are only {} species", species, self.species.len()
            )));
        }

        let template = &self.species[species];
        if positions.len() != template.n_atoms() {
            return Err(Error::InvalidParameter(format!(
                "species '{}' contains {} atoms, but got {} positions",
                template.name(), template.n_atoms(), positions.len()
            )));
        }

        let molecule = self.molecules.len();
        let mut atoms = Vec::with_capacity(positions.len());
        for (species_atom, &position) in positions.iter().enumerate() {
            let position = self.cells.simulation_box().fold(position);
            let cell = self.cells.cell_index_for_position(position);

            let index = self.atoms.len();
            self.atoms.push(Atom {
                position: position,
                molecule: molecule,
                species_atom: species_atom,
                atom_type: template.atom_types()[species_atom],
                charge: template.charges()[species_atom],
                cell: cell,
            });
            self.cells.add_atom(index, cell);
            atoms.push(index);
        }

        self.molecules.push(Molecule {
            species: species,
            atoms: atoms,
        });
        self.contents_version += 1;

        return Ok(molecule);
    }

    /// Get the scaling of pair potential interactions between atoms `i` and
    /// `j`, which must belong to the same molecule
    #[inline]
    pub fn scaling(&self, i: usize, j: usize) -> ScalingType {
        let first = &self.atoms[i];
        let second = &self.atoms[j];
        debug_assert_eq!(first.molecule, second.molecule);

        let species = self.molecules[first.molecule].species;
        return self.species[species].scaling(first.species_atom, second.species_atom);
    }

    /// Move `atom` to a new `position`, updating the cell containing it. The
    /// cells involved must not be locked.
    pub fn move_atom(&mut self, atom: usize, position: Vector3D) -> Result<(), Error> {
        let position = self.cells.simulation_box().fold(position);
        let from = self.atoms[atom].cell;
        let to = self.cells.cell_index_for_position(position);

        if from != to {
            if !self.cells.can_lock(to) {
                return Err(Error::Locked(format!(
                    "can not move atom {} to cell {} which is currently locked", atom, to
                )));
            }

            self.cells.lock(from, true)?;
            let result = self.cells.move_atom(atom, from, to);
            self.cells.unlock(from, true)?;
            result?;

            self.atoms[atom].cell = to;
        }

        self.atoms[atom].position = position;
        return Ok(());
    }

    /// Translate all atoms of `molecule` by `delta`
    pub fn translate_molecule(&mut self, molecule: usize, delta: Vector3D) -> Result<(), Error> {
        for position in 0..self.molecules[molecule].atoms.len() {
            let atom = self.molecules[molecule].atoms[position];
            let new_position = self.atoms[atom].position + delta;
            self.move_atom(atom, new_position)?;
        }
        return Ok(());
    }

    /// Make sure all atoms are in the right cell after their position was
    /// changed, returning the number of atoms which changed cell
    pub fn update_cell_locations(&mut self) -> Result<usize, Error> {
        let mut moved = 0;
        for atom in 0..self.atoms.len() {
            let cell = self.cells.cell_index_for_position(self.atoms[atom].position);
            if cell != self.atoms[atom].cell {
                self.cells.move_atom(atom, self.atoms[atom].cell, cell).map_err(|e| Error::Internal(format!(
                    "cell membership is out of sync with atom positions: {}", e
                )))?;
                self.atoms[atom].cell = cell;
                moved += 1;
            }
        }

        debug!("{} atoms changed cell", moved);
        return Ok(moved);
    }

    /// Get the center of geometry of `molecule`, using the minimum image
    /// convention relative to the first atom
    pub fn molecule_centre(&self, molecule: usize) -> Vector3D {
        let simulation_box = self.cells.simulation_box();
        let atoms = &self.molecules[molecule].atoms;
        let reference = self.atoms[atoms[0]].position;

        let mut shift = Vector3D::zero();
        for &atom in &atoms[1..] {
            shift += simulation_box.minimum_vector(reference, self.atoms[atom].position);
        }
        return reference + shift / atoms.len() as f64;
    }

    /// Scale the box by `factors` along each axis. Molecules are moved
    /// rigidly, keeping the fractional coordinates of their center.
    pub fn scale_box(&mut self, factors: Vector3D) -> Result<(), Error> {
        let old_box = self.cells.simulation_box().clone();
        let centres = (0..self.molecules.len()).map(|m| self.molecule_centre(m)).collect::<Vec<_>>();

        self.cells.scale(factors)?;

        let new_box = self.cells.simulation_box().clone();
        for (molecule, centre) in self.molecules.iter().zip(centres) {
            let new_centre = new_box.frac_to_real(old_box.real_to_frac(centre));
            for &atom in &molecule.atoms {
                let offset = old_box.minimum_vector(centre, self.atoms[atom].position);
                let position = new_box.fold(new_centre + offset);
                let cell = self.cells.cell_index_for_position(position);
                self.atoms[atom].position = position;
                self.atoms[atom].cell = cell;
                self.cells.add_atom(atom, cell);
            }
        }
        self.contents_version += 1;

        info!(
            "scaled box by ({}, {}, {}), the volume is now {:.3} Å^3",
            factors[0], factors[1], factors[2], new_box.volume()
        );

        return Ok(());
    }
}

/// External potentials
impl Configuration {
    /// Add an external potential acting on all atoms
    pub fn add_global_potential(&mut self, potential: ExternalPotential) -> Result<(), Error> {
        potential.validate()?;
        self.global_potentials.push(potential);
        return Ok(());
    }

    /// Add an external potential acting only on some atoms
    pub fn add_targeted_potential(&mut self, potential: TargetedPotential) -> Result<(), Error> {
        potential.potential.validate()?;
        if let Some(&target) = potential.targets.iter().find(|&&target| target >= self.atoms.len()) {
            return Err(Error::InvalidParameter(format!(
                "invalid target atom {} for external potential, there are only {} atoms",
                target, self.atoms.len()
            )));
        }

        self.targeted_potentials.push(potential);
        return Ok(());
    }

    pub fn global_potentials(&self) -> &[ExternalPotential] {
        &self.global_potentials
    }

    pub fn targeted_potentials(&self) -> &[TargetedPotential] {
        &self.targeted_potentials
    }

    /// Check if any external potential acts on the atoms
    pub fn has_external_potentials(&self) -> bool {
        !self.global_potentials.is_empty() || !self.targeted_potentials.is_empty()
    }
}
