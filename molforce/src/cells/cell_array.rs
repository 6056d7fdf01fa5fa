use log::{info, debug, warn};

use crate::{Error, Matrix3, Vector3D};
use crate::geometry::{SimulationBox, BoxType};

use super::{Cell, CellNeighbour};

/// Maximal number of cells, we need to use this to prevent having too many
/// cells with a large box and a small cell size
const MAX_NUMBER_OF_CELLS: usize = 100_000;

/// Minimal number of cells along each side of the box. With at least three
/// cells per side, two atoms in the same cell are always closer than half the
/// box, and never need the minimum image convention.
const MIN_CELLS_PER_SIDE: usize = 3;

/// Relative tolerance used to accept a non-integer number of cells along an
/// axis
const DIVISION_TOLERANCE: f64 = 0.01;

/// A pair of neighboring cells, produced by [`CellArray::neighbour_pairs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPair {
    /// index of the first cell in the pair
    pub first: usize,
    /// index of the second cell in the pair, always larger or equal to `first`
    pub second: usize,
    /// do we need to apply the minimum image convention between these cells?
    pub minimum_image: bool,
}

/// The cell array partitions a `SimulationBox` into a grid of cells, to
/// quickly find all pairs of atoms closer than a given cutoff.
///
/// Each cell stores the list of neighboring cells that can contain atoms
/// within the cutoff of one of its own atoms. Neighbors are split between
/// cells where the vector between atoms can be used directly and cells where
/// the minimum image convention must be applied. A neighboring cell requires
/// the minimum image convention as soon as one of the grid paths going from
/// one cell to the other within the cutoff crosses the box boundary.
#[derive(Debug, Clone)]
pub struct CellArray {
    /// The box being partitioned
    simulation_box: SimulationBox,
    /// Requested cell size
    cell_size: f64,
    /// Interaction cutoff
    cutoff: f64,
    /// Number of cells along each axis
    divisions: [usize; 3],
    /// Length of the cells along each axis
    real_cell_size: Vector3D,
    /// Size of the cells in fractional coordinates
    fractional_cell_size: Vector3D,
    /// How many cells we need to look at in each direction to include all
    /// neighbors below cutoff
    extents: [usize; 3],
    /// Axes of a single cell, one per row
    cell_axes: Matrix3,
    /// All the cells, with index `x * ny * nz + y * nz + z`
    cells: Vec<Cell>,
}

impl CellArray {
    /// Partition `simulation_box` into cells of roughly `cell_size`, and find
    /// all neighboring cells for the given interaction `cutoff`.
    #[time_graph::instrument(name = "CellArray::new")]
    pub fn new(simulation_box: SimulationBox, cell_size: f64, cutoff: f64) -> Result<CellArray, Error> {
        if !(cell_size > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "cell size must be positive, got {}", cell_size
            )));
        }
        simulation_box.validate_cutoff(cutoff)?;

        let lengths = simulation_box.lengths();
        let mut effective_cell_size = cell_size;
        let divisions = loop {
            let divisions = compute_divisions(lengths, effective_cell_size);
            let n_cells = divisions[0] * divisions[1] * divisions[2];
            if n_cells <= MAX_NUMBER_OF_CELLS {
                break divisions;
            }

            // limit memory consumption by growing the cells until we have less
            // than `MAX_NUMBER_OF_CELLS` of them
            effective_cell_size *= 1.01 * f64::cbrt(n_cells as f64 / MAX_NUMBER_OF_CELLS as f64);
            debug!("too many cells ({}), increasing cell size to {:.3}", n_cells, effective_cell_size);
        };

        let real_cell_size = Vector3D::new(
            lengths[0] / divisions[0] as f64,
            lengths[1] / divisions[1] as f64,
            lengths[2] / divisions[2] as f64,
        );
        let fractional_cell_size = Vector3D::new(
            1.0 / divisions[0] as f64,
            1.0 / divisions[1] as f64,
            1.0 / divisions[2] as f64,
        );

        let axes = simulation_box.axes();
        let mut cell_axes = Matrix3::zero();
        for n in 0..3 {
            for k in 0..3 {
                cell_axes[n][k] = axes[n][k] * fractional_cell_size[n];
            }
        }

        let mut cells = Vec::with_capacity(divisions[0] * divisions[1] * divisions[2]);
        for x in 0..divisions[0] {
            for y in 0..divisions[1] {
                for z in 0..divisions[2] {
                    let fractional_centre = Vector3D::new(
                        (x as f64 + 0.5) * fractional_cell_size[0],
                        (y as f64 + 0.5) * fractional_cell_size[1],
                        (z as f64 + 0.5) * fractional_cell_size[2],
                    );
                    let centre = simulation_box.frac_to_real(fractional_centre);
                    cells.push(Cell::new(cells.len(), [x, y, z], centre));
                }
            }
        }

        let mut cell_array = CellArray {
            simulation_box: simulation_box,
            cell_size: cell_size,
            cutoff: cutoff,
            divisions: divisions,
            real_cell_size: real_cell_size,
            fractional_cell_size: fractional_cell_size,
            extents: [0; 3],
            cell_axes: cell_axes,
            cells: cells,
        };
        cell_array.build_neighbour_lists();

        info!(
            "{} box partitioned into {}x{}x{} cells of {:.3}x{:.3}x{:.3} Å, with extents ({}, {}, {}) for a cutoff of {} Å",
            cell_array.simulation_box.box_type(),
            divisions[0], divisions[1], divisions[2],
            real_cell_size[0], real_cell_size[1], real_cell_size[2],
            cell_array.extents[0], cell_array.extents[1], cell_array.extents[2],
            cutoff,
        );

        return Ok(cell_array);
    }

    /// Lower bound on the distance between any point in a cell and any point
    /// in the cell separated from it by `offset` along the grid.
    fn minimal_separation(&self, offset: [i32; 3]) -> f64 {
        let widths = self.simulation_box.distances_between_faces();
        let mut gaps = [0.0; 3];
        for n in 0..3 {
            let cells_in_between = i32::max(offset[n].abs() - 1, 0) as f64;
            gaps[n] = cells_in_between * widths[n] / self.divisions[n] as f64;
        }

        match self.simulation_box.box_type() {
            BoxType::NonPeriodic | BoxType::Cubic | BoxType::Orthorhombic => {
                f64::sqrt(gaps[0] * gaps[0] + gaps[1] * gaps[1] + gaps[2] * gaps[2])
            }
            // with non-orthogonal axes, only the separation between the
            // planes containing the cell faces is guaranteed
            BoxType::Monoclinic | BoxType::Triclinic => {
                f64::max(gaps[0], f64::max(gaps[1], gaps[2]))
            }
        }
    }

    /// Find the neighbors of all cells
    fn build_neighbour_lists(&mut self) {
        let widths = self.simulation_box.distances_between_faces();
        let periodic = self.simulation_box.is_periodic();

        for n in 0..3 {
            let cell_width = widths[n] / self.divisions[n] as f64;
            let extent = usize::max(f64::ceil(self.cutoff / cell_width) as usize, 1);
            // never look further than a full box away, so that a path between
            // two cells wraps around the box at most once
            self.extents[n] = if periodic {
                usize::min(extent, self.divisions[n])
            } else {
                usize::min(extent, self.divisions[n] - 1)
            };
        }

        let extents = [self.extents[0] as i32, self.extents[1] as i32, self.extents[2] as i32];
        let mut offsets = Vec::new();
        for x in -extents[0]..=extents[0] {
            for y in -extents[1]..=extents[1] {
                for z in -extents[2]..=extents[2] {
                    if x == 0 && y == 0 && z == 0 {
                        continue;
                    }

                    if self.minimal_separation([x, y, z]) < self.cutoff {
                        offsets.push([x, y, z]);
                    }
                }
            }
        }

        let mut total_neighbours = 0;
        let mut total_mim = 0;
        for cell_i in 0..self.cells.len() {
            let grid = self.cells[cell_i].grid_reference();

            let mut candidates = Vec::with_capacity(offsets.len());
            'offsets: for offset in &offsets {
                let mut wrapped = false;
                let mut neighbour_grid = [0; 3];
                for n in 0..3 {
                    let (quotient, remainder) = divmod(grid[n] as i32 + offset[n], self.divisions[n]);
                    if quotient != 0 {
                        if !periodic {
                            continue 'offsets;
                        }
                        wrapped = true;
                    }
                    neighbour_grid[n] = remainder;
                }

                let index = self.grid_index(neighbour_grid);
                if index != cell_i {
                    candidates.push(CellNeighbour { index: index, minimum_image: wrapped });
                }
            }

            // the same cell can be reached through multiple paths, it
            // requires minimum image if any of the paths does
            candidates.sort_unstable_by_key(|neighbour| (neighbour.index, !neighbour.minimum_image));
            candidates.dedup_by_key(|neighbour| neighbour.index);

            total_neighbours += candidates.len();
            total_mim += candidates.iter().filter(|n| n.minimum_image).count();
            self.cells[cell_i].set_neighbours(candidates);
        }

        debug!(
            "{} neighbor offsets in range, {:.1} neighbors per cell on average ({:.1} requiring minimum image)",
            offsets.len(),
            total_neighbours as f64 / self.cells.len() as f64,
            total_mim as f64 / self.cells.len() as f64,
        );
    }

    /// Get the index of the cell at the given grid position
    #[inline]
    fn grid_index(&self, grid: [usize; 3]) -> usize {
        grid[0] * self.divisions[1] * self.divisions[2] + grid[1] * self.divisions[2] + grid[2]
    }
}

/// Compute the number of cells along each axis of a box with the given axis
/// `lengths`, trying to get cells as cubic as possible.
///
/// The shortest axis is split into cells of `cell_size` (with at least
/// `MIN_CELLS_PER_SIDE` cells), and the other axes are split into cells with
/// roughly the same length.
fn compute_divisions(lengths: Vector3D, cell_size: f64) -> [usize; 3] {
    let mut shortest = 0;
    for n in 1..3 {
        if lengths[n] < lengths[shortest] {
            shortest = n;
        }
    }

    let mut divisions = [0; 3];
    let initial = f64::trunc(lengths[shortest] / cell_size) as usize;
    if initial < MIN_CELLS_PER_SIDE {
        warn!(
            "box size only allows for {} divisions of the cell size ({}) along axis {}, using {} instead",
            initial, cell_size, shortest, MIN_CELLS_PER_SIDE
        );
        divisions[shortest] = MIN_CELLS_PER_SIDE;
    } else {
        divisions[shortest] = initial;
    }
    let real_cell_size = lengths[shortest] / divisions[shortest] as f64;

    for n in 1..3 {
        let axis = (shortest + n) % 3;
        let ratio = lengths[axis] / real_cell_size;
        let whole = f64::trunc(ratio);
        let remainder = ratio - whole;

        let count = if remainder > 1.0 - DIVISION_TOLERANCE {
            whole + 1.0
        } else if remainder < 0.5 {
            whole
        } else if lengths[axis] / (whole + 1.0) < cell_size {
            // adding one more cell would make them smaller than requested
            whole
        } else {
            whole + 1.0
        };

        divisions[axis] = usize::max(count as usize, MIN_CELLS_PER_SIDE);
    }

    return divisions;
}

/// Function to compute both quotient and remainder of the division of a by b.
/// This function follows Python convention, making sure the remainder have the
/// same sign as `b`.
fn divmod(a: i32, b: usize) -> (i32, usize) {
    debug_assert!(b < (i32::MAX as usize));
    let b = b as i32;
    let mut quotient = a / b;
    let mut remainder = a % b;
    if remainder < 0 {
        remainder += b;
        quotient -= 1;
    }
    return (quotient, remainder as usize);
}

/// Grid information and cell lookup
impl CellArray {
    /// Get the box partitioned by this cell array
    pub fn simulation_box(&self) -> &SimulationBox {
        &self.simulation_box
    }

    /// Get the interaction cutoff used to find neighboring cells
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Get the cell size requested when creating this cell array
    pub fn requested_cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Get the number of cells along each axis
    pub fn divisions(&self) -> [usize; 3] {
        self.divisions
    }

    /// Get the number of cells to search in each direction
    pub fn extents(&self) -> [usize; 3] {
        self.extents
    }

    /// Get the length of the cells along each axis
    pub fn real_cell_size(&self) -> Vector3D {
        self.real_cell_size
    }

    /// Get the size of the cells in fractional coordinates
    pub fn fractional_cell_size(&self) -> Vector3D {
        self.fractional_cell_size
    }

    /// Get the axes of a single cell, one per row
    pub fn cell_axes(&self) -> Matrix3 {
        self.cell_axes
    }

    /// Get the total number of cells
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Get all the cells
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Get the cell with the given `index`
    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    /// Get the index of the cell at position `grid`, wrapping the grid
    /// position inside the array.
    pub fn cell_index_at(&self, grid: [i32; 3]) -> usize {
        let (_, x) = divmod(grid[0], self.divisions[0]);
        let (_, y) = divmod(grid[1], self.divisions[1]);
        let (_, z) = divmod(grid[2], self.divisions[2]);
        return self.grid_index([x, y, z]);
    }

    /// Get the index of the cell containing the real space `position`.
    /// Positions outside of a non-periodic box are assigned to the closest
    /// cell on the box boundary.
    pub fn cell_index_for_position(&self, position: Vector3D) -> usize {
        let fractional = self.simulation_box.fold_frac(position);

        let mut grid = [0; 3];
        for n in 0..3 {
            let max = (self.divisions[n] - 1) as f64;
            let value = f64::floor(fractional[n] * self.divisions[n] as f64);
            grid[n] = f64::clamp(value, 0.0, max) as usize;
        }

        return self.grid_index(grid);
    }

    /// Get the neighbor information of cell `other` as seen from cell `cell`,
    /// or `None` if these cells are not neighbors.
    pub fn neighbour(&self, cell: usize, other: usize) -> Option<CellNeighbour> {
        let neighbours = self.cells[cell].neighbours();
        neighbours.binary_search_by_key(&other, |neighbour| neighbour.index)
            .ok()
            .map(|position| neighbours[position])
    }

    /// Check if the minimum image convention is required to compute distances
    /// between atoms in `cell` and atoms in `other`. This is always the case
    /// for cells which are not neighbors, and never for atoms in the same
    /// cell.
    pub fn minimum_image_required(&self, cell: usize, other: usize) -> bool {
        if cell == other {
            return false;
        }

        match self.neighbour(cell, other) {
            Some(neighbour) => neighbour.minimum_image,
            None => self.simulation_box.is_periodic(),
        }
    }

    /// Get all pairs of neighboring cells, including each cell with itself.
    /// Each pair is included only once, with `first <= second`.
    pub fn neighbour_pairs(&self) -> Vec<CellPair> {
        let mut pairs = Vec::new();
        for cell in &self.cells {
            pairs.push(CellPair {
                first: cell.index(),
                second: cell.index(),
                minimum_image: false,
            });

            for neighbour in cell.neighbours() {
                if neighbour.index > cell.index() {
                    pairs.push(CellPair {
                        first: cell.index(),
                        second: neighbour.index,
                        minimum_image: neighbour.minimum_image,
                    });
                }
            }
        }
        return pairs;
    }

    /// Scale the underlying box by `factors` and rebuild the cells with the
    /// same cell size and cutoff. All atoms are removed from the cells, and
    /// must be added back by the caller.
    pub fn scale(&mut self, factors: Vector3D) -> Result<(), Error> {
        let mut simulation_box = self.simulation_box.clone();
        simulation_box.scale(factors)?;
        *self = CellArray::new(simulation_box, self.cell_size, self.cutoff)?;
        return Ok(());
    }
}

/// Atom membership
impl CellArray {
    /// Add `atom` to `cell`, and register it in the neighboring cells
    pub fn add_atom(&mut self, atom: usize, cell: usize) {
        if !self.cells[cell].add_atom(atom) {
            return;
        }

        for position in 0..self.cells[cell].neighbours().len() {
            let neighbour = self.cells[cell].neighbours()[position];
            self.cells[neighbour.index].add_neighbour_atom(atom, neighbour.minimum_image);
        }
    }

    /// Remove `atom` from `cell`, and from the neighboring cells
    pub fn remove_atom(&mut self, atom: usize, cell: usize) -> Result<(), Error> {
        if !self.cells[cell].remove_atom(atom) {
            return Err(Error::InvalidParameter(format!(
                "atom {} is not in cell {}", atom, cell
            )));
        }

        for position in 0..self.cells[cell].neighbours().len() {
            let neighbour = self.cells[cell].neighbours()[position];
            self.cells[neighbour.index].remove_neighbour_atom(atom, neighbour.minimum_image);
        }

        return Ok(());
    }

    /// Move `atom` from the cell `from` to the cell `to`. If the atom is not
    /// in `from`, nothing is modified and an error is returned.
    pub fn move_atom(&mut self, atom: usize, from: usize, to: usize) -> Result<(), Error> {
        if from == to {
            return Ok(());
        }

        self.remove_atom(atom, from)?;
        self.add_atom(atom, to);
        return Ok(());
    }

    /// Remove all atoms from all cells
    pub fn clear_atoms(&mut self) {
        for cell in &mut self.cells {
            cell.clear_atoms();
        }
    }
}

/// Cell locking, used to prevent modifications of atoms in a region of space
/// while other code is reading it
impl CellArray {
    /// Lock `cell`. If `will_be_modified` is true, all the neighboring cells
    /// are also locked for reading, and locking fails if any of them is
    /// currently being modified.
    pub fn lock(&self, cell: usize, will_be_modified: bool) -> Result<(), Error> {
        let target = &self.cells[cell];
        if !target.try_lock_for_modification() {
            return Err(Error::Locked(format!(
                "can not lock cell {} since it is already locked (lock count = {})",
                cell, target.lock_count()
            )));
        }

        if will_be_modified {
            let neighbours = target.neighbours();
            for (position, neighbour) in neighbours.iter().enumerate() {
                if !self.cells[neighbour.index].add_lock() {
                    for previous in &neighbours[..position] {
                        self.cells[previous.index].remove_lock();
                    }
                    target.release_modification_lock();

                    return Err(Error::Locked(format!(
                        "can not lock cell {} since its neighbor {} is being modified",
                        cell, neighbour.index
                    )));
                }
            }
        }

        return Ok(());
    }

    /// Unlock `cell`, which must have been locked with the same value of
    /// `was_modified`.
    pub fn unlock(&self, cell: usize, was_modified: bool) -> Result<(), Error> {
        let target = &self.cells[cell];
        if !target.release_modification_lock() {
            return Err(Error::Locked(format!(
                "can not unlock cell {} since it is not locked (lock count = {})",
                cell, target.lock_count()
            )));
        }

        if was_modified {
            for neighbour in target.neighbours() {
                if !self.cells[neighbour.index].remove_lock() {
                    return Err(Error::Locked(format!(
                        "neighbor {} of cell {} was not locked", neighbour.index, cell
                    )));
                }
            }
        }

        return Ok(());
    }

    /// Check if `cell` could be locked for modification right now
    pub fn can_lock(&self, cell: usize) -> bool {
        let target = &self.cells[cell];
        if target.lock_count() != 0 {
            return false;
        }

        return target.neighbours().iter().all(|neighbour| self.cells[neighbour.index].lock_count() != -1);
    }

    /// Remove all the locks on all cells
    pub fn clear_locks(&self) {
        for cell in &self.cells {
            let previous = cell.clear_locks();
            if previous != 0 {
                warn!("cleared existing lock ({}) from cell {}", previous, cell.index());
            }
        }
    }
}
