use log::debug;

use crate::Error;
use crate::configuration::Configuration;
use crate::parallel::ProcessPool;
use crate::potentials::PotentialMap;

use super::{EnergyKernel, ForceKernel, ExternalPotentialTerms};

/// Create energy and force kernels for a configuration, including the
/// external potentials only when the configuration contains some.
pub struct KernelProducer;

impl KernelProducer {
    /// Create an energy kernel for `configuration`, see [`EnergyKernel::new`]
    pub fn energy_kernel<'a>(
        configuration: &'a Configuration,
        potential_map: &'a PotentialMap,
        pool: &'a ProcessPool,
        cutoff: Option<f64>,
    ) -> Result<EnergyKernel<'a>, Error> {
        let kernel = EnergyKernel::new(configuration, potential_map, pool, cutoff)?;
        if configuration.has_external_potentials() {
            debug!("configuration contains external potentials, using them in the energy kernel");
            return Ok(kernel.with_extended_terms(Box::new(ExternalPotentialTerms::new(configuration))));
        }
        return Ok(kernel);
    }

    /// Create a force kernel for `configuration`, see [`ForceKernel::new`]
    pub fn force_kernel<'a>(
        configuration: &'a Configuration,
        potential_map: &'a PotentialMap,
        pool: &'a ProcessPool,
        cutoff: Option<f64>,
    ) -> Result<ForceKernel<'a>, Error> {
        let kernel = ForceKernel::new(configuration, potential_map, pool, cutoff)?;
        if configuration.has_external_potentials() {
            debug!("configuration contains external potentials, using them in the force kernel");
            return Ok(kernel.with_extended_terms(Box::new(ExternalPotentialTerms::new(configuration))));
        }
        return Ok(kernel);
    }
}
