//! Pair potentials between atom types, and external potentials acting on
//! single atoms.

mod forms;
pub use self::forms::{ShortRangeForm, ShortRangeTruncation, CoulombTruncation, COULOMB_CONVERSION};

mod pair_potential;
pub use self::pair_potential::{PairPotential, PairPotentialParameters};

mod potential_map;
pub use self::potential_map::PotentialMap;

mod external;
pub use self::external::{ExternalPotential, TargetedPotential};
