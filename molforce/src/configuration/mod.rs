//! Atoms, molecules and the simulation configuration containing them

mod species;
pub use self::species::{AtomType, Species, Bond, Angle, ScalingType};

mod contents;
pub use self::contents::{Atom, Molecule, Configuration};

#[cfg(test)]
pub(crate) mod test_utils;
