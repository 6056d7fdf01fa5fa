//! Kernels computing the energy and forces of a configuration.
//!
//! Kernels borrow a [`Configuration`](crate::configuration::Configuration)
//! and a [`PotentialMap`](crate::potentials::PotentialMap), and never modify
//! them. Use the [`KernelProducer`] to get kernels including the external
//! potentials of the configuration.

mod geometry;
pub use self::geometry::GeometryKernel;

mod extended;
pub use self::extended::{ExtendedTerms, NoExtendedTerms, ExternalPotentialTerms};

mod energy;
pub use self::energy::EnergyKernel;

mod force;
pub use self::force::ForceKernel;

mod producer;
pub use self::producer::KernelProducer;

/// Categories of interactions to include in a kernel calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelFlags {
    /// Pair potentials between atoms in different molecules
    pub inter_molecular: bool,
    /// Scaled pair potentials between atoms in the same molecule
    pub intra_molecular: bool,
    /// Bonded terms inside molecules
    pub geometry: bool,
    /// Extended terms, e.g. external potentials
    pub extended: bool,
}

impl Default for KernelFlags {
    fn default() -> Self {
        KernelFlags::all()
    }
}

impl KernelFlags {
    /// Include all categories
    pub fn all() -> KernelFlags {
        KernelFlags {
            inter_molecular: true,
            intra_molecular: true,
            geometry: true,
            extended: true,
        }
    }

    /// Do not include any category
    pub fn none() -> KernelFlags {
        KernelFlags {
            inter_molecular: false,
            intra_molecular: false,
            geometry: false,
            extended: false,
        }
    }

    pub fn with_inter_molecular(mut self) -> KernelFlags {
        self.inter_molecular = true;
        self
    }

    pub fn with_intra_molecular(mut self) -> KernelFlags {
        self.intra_molecular = true;
        self
    }

    pub fn with_geometry(mut self) -> KernelFlags {
        self.geometry = true;
        self
    }

    pub fn with_extended(mut self) -> KernelFlags {
        self.extended = true;
        self
    }
}

/// Energy of a configuration, split by category. All energies are in kJ/mol.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyResult {
    pub inter_molecular: f64,
    pub intra_molecular: f64,
    pub geometry: f64,
    pub extended: f64,
}

impl EnergyResult {
    /// Get the sum of all categories
    pub fn total(&self) -> f64 {
        self.inter_molecular + self.intra_molecular + self.geometry + self.extended
    }
}
