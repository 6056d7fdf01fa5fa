//! Spatial partitioning of a `SimulationBox` into a grid of cells, used to
//! find all pairs of atoms within an interaction cutoff.

mod cell;
pub use self::cell::{Cell, CellNeighbour};

mod cell_array;
pub use self::cell_array::{CellArray, CellPair};
