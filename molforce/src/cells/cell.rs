use std::sync::atomic::{AtomicI32, Ordering};

use crate::Vector3D;

/// Value of the lock counter for a cell which is being modified
const MODIFICATION_LOCK: i32 = -1;

/// A neighboring cell, as seen from another cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellNeighbour {
    /// index of the neighboring cell in the `CellArray`
    pub index: usize,
    /// do we need to apply the minimum image convention when computing
    /// distances between atoms in the two cells?
    pub minimum_image: bool,
}

/// A single cell in a `CellArray`.
///
/// Each cell knows which atoms it contains, which other cells are close
/// enough to contain interacting atoms, and which atoms are contained in these
/// neighboring cells. All references are indexes into the `CellArray` (for
/// cells) and into the configuration (for atoms).
#[derive(Debug)]
pub struct Cell {
    /// Index of this cell in the `CellArray`
    index: usize,
    /// Position of this cell in the grid
    grid_reference: [usize; 3],
    /// Real space position of the center of the cell
    centre: Vector3D,
    /// Sorted list of atoms in this cell
    atoms: Vec<usize>,
    /// Sorted list of neighboring cells
    neighbours: Vec<CellNeighbour>,
    /// Sorted list of atoms in neighboring cells not requiring minimum image
    near_atoms: Vec<usize>,
    /// Sorted list of atoms in neighboring cells requiring minimum image
    mim_atoms: Vec<usize>,
    /// 0 when unlocked, -1 when locked for modification, and the number of
    /// read locks otherwise
    lock_count: AtomicI32,
}

impl Clone for Cell {
    fn clone(&self) -> Cell {
        Cell {
            index: self.index,
            grid_reference: self.grid_reference,
            centre: self.centre,
            atoms: self.atoms.clone(),
            neighbours: self.neighbours.clone(),
            near_atoms: self.near_atoms.clone(),
            mim_atoms: self.mim_atoms.clone(),
            lock_count: AtomicI32::new(self.lock_count.load(Ordering::Acquire)),
        }
    }
}

/// Insert `value` in the sorted `list`, keeping it sorted
fn sorted_insert(list: &mut Vec<usize>, value: usize) -> bool {
    match list.binary_search(&value) {
        Ok(_) => false,
        Err(position) => {
            list.insert(position, value);
            true
        }
    }
}

/// Remove `value` from the sorted `list`
fn sorted_remove(list: &mut Vec<usize>, value: usize) -> bool {
    match list.binary_search(&value) {
        Ok(position) => {
            list.remove(position);
            true
        }
        Err(_) => false,
    }
}

impl Cell {
    pub(crate) fn new(index: usize, grid_reference: [usize; 3], centre: Vector3D) -> Cell {
        Cell {
            index: index,
            grid_reference: grid_reference,
            centre: centre,
            atoms: Vec::new(),
            neighbours: Vec::new(),
            near_atoms: Vec::new(),
            mim_atoms: Vec::new(),
            lock_count: AtomicI32::new(0),
        }
    }

    /// Get the index of this cell in the `CellArray`
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the position of this cell in the grid
    pub fn grid_reference(&self) -> [usize; 3] {
        self.grid_reference
    }

    /// Get the real space position of the center of this cell
    pub fn centre(&self) -> Vector3D {
        self.centre
    }

    /// Get the sorted list of atoms in this cell
    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    /// Get all neighboring cells, sorted by index
    pub fn neighbours(&self) -> &[CellNeighbour] {
        &self.neighbours
    }

    /// Get the indexes of neighboring cells where atoms can be used directly,
    /// without applying the minimum image convention
    pub fn near_neighbours(&self) -> impl Iterator<Item = usize> + '_ {
        self.neighbours.iter().filter(|n| !n.minimum_image).map(|n| n.index)
    }

    /// Get the indexes of neighboring cells for which the minimum image
    /// convention must be applied
    pub fn mim_neighbours(&self) -> impl Iterator<Item = usize> + '_ {
        self.neighbours.iter().filter(|n| n.minimum_image).map(|n| n.index)
    }

    /// Get the sorted list of atoms in neighboring cells not requiring the
    /// minimum image convention
    pub fn near_atoms(&self) -> &[usize] {
        &self.near_atoms
    }

    /// Get the sorted list of atoms in neighboring cells requiring the minimum
    /// image convention
    pub fn mim_atoms(&self) -> &[usize] {
        &self.mim_atoms
    }

    pub(crate) fn set_neighbours(&mut self, neighbours: Vec<CellNeighbour>) {
        debug_assert!(neighbours.windows(2).all(|w| w[0].index < w[1].index));
        self.neighbours = neighbours;
    }

    pub(crate) fn add_atom(&mut self, atom: usize) -> bool {
        sorted_insert(&mut self.atoms, atom)
    }

    pub(crate) fn remove_atom(&mut self, atom: usize) -> bool {
        sorted_remove(&mut self.atoms, atom)
    }

    /// Register `atom` as living in a neighboring cell
    pub(crate) fn add_neighbour_atom(&mut self, atom: usize, minimum_image: bool) {
        if minimum_image {
            sorted_insert(&mut self.mim_atoms, atom);
        } else {
            sorted_insert(&mut self.near_atoms, atom);
        }
    }

    /// Remove `atom` from the list of atoms in neighboring cells
    pub(crate) fn remove_neighbour_atom(&mut self, atom: usize, minimum_image: bool) {
        if minimum_image {
            sorted_remove(&mut self.mim_atoms, atom);
        } else {
            sorted_remove(&mut self.near_atoms, atom);
        }
    }

    pub(crate) fn clear_atoms(&mut self) {
        self.atoms.clear();
        self.near_atoms.clear();
        self.mim_atoms.clear();
    }
}

/// Lock counter manipulation
impl Cell {
    /// Get the current value of the lock counter: 0 if the cell is not locked,
    /// -1 if it is locked for modification and the number of read locks
    /// otherwise.
    pub fn lock_count(&self) -> i32 {
        self.lock_count.load(Ordering::Acquire)
    }

    /// Try to take the modification lock on this cell, which is only possible
    /// if nobody else holds any lock on it.
    pub(crate) fn try_lock_for_modification(&self) -> bool {
        self.lock_count.compare_exchange(0, MODIFICATION_LOCK, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    /// Release the modification lock on this cell
    pub(crate) fn release_modification_lock(&self) -> bool {
        self.lock_count.compare_exchange(MODIFICATION_LOCK, 0, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    /// Add a read lock, failing if the cell is being modified
    pub(crate) fn add_lock(&self) -> bool {
        self.lock_count.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            if count == MODIFICATION_LOCK { None } else { Some(count + 1) }
        }).is_ok()
    }

    /// Remove a read lock, failing if the cell is being modified or not locked
    pub(crate) fn remove_lock(&self) -> bool {
        self.lock_count.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            if count <= 0 { None } else { Some(count - 1) }
        }).is_ok()
    }

    /// Reset the lock counter, returning the previous value
    pub(crate) fn clear_locks(&self) -> i32 {
        self.lock_count.swap(0, Ordering::AcqRel)
    }
}
