use rand::SeedableRng;
use rand::rngs::StdRng;

use molforce::{SimulationBox, Vector3D};
use molforce::configuration::{AtomType, Configuration, Species};
use molforce::kernels::{KernelFlags, KernelProducer};
use molforce::parallel::ProcessPool;
use molforce::potentials::{PairPotentialParameters, PotentialMap, ShortRangeForm};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n_atoms = match std::env::args().nth(1) {
        Some(value) => value.parse()?,
        None => 2000,
    };

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    // run the calculation
    let (energy, forces) = compute_energy_and_forces(n_atoms)?;
    println!("total energy: {} kJ/mol", energy);
    println!("largest force: {} kJ/mol/Å", forces.iter().map(|f| f.norm()).fold(0.0, f64::max));

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Compute the energy and forces of `n_atoms` randomly placed ions
fn compute_energy_and_forces(n_atoms: usize) -> Result<(f64, Vec<Vector3D>), Box<dyn std::error::Error>> {
    let length = f64::cbrt(n_atoms as f64 / 0.02);
    let mut configuration = Configuration::new(SimulationBox::cubic(length)?, 3.0, 10.0)?;

    let sodium = configuration.add_atom_type(AtomType {
        name: "Na".into(),
        charge: 1.0,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.5, sigma: 2.5 },
    })?;
    let chlorine = configuration.add_atom_type(AtomType {
        name: "Cl".into(),
        charge: -1.0,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.4, sigma: 4.4 },
    })?;

    let mut species = Vec::new();
    for (name, atom_type, charge) in [("sodium", sodium, 1.0), ("chlorine", chlorine, -1.0)] {
        let mut ion = Species::new(name);
        ion.add_atom(atom_type, charge, Vector3D::zero());
        species.push(configuration.add_species(ion)?);
    }

    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..n_atoms {
        let position = configuration.simulation_box().random_coordinate(&mut rng);
        configuration.add_molecule(species[i % 2], &[position])?;
    }

    let parameters = PairPotentialParameters {
        range: configuration.cells().cutoff(),
        ..Default::default()
    };
    let potentials = time_graph::spanned!("Tabulation", {
        PotentialMap::new(configuration.atom_types(), &parameters)?
    });

    let pool = ProcessPool::serial();
    let energy = time_graph::spanned!("Energy", {
        let kernel = KernelProducer::energy_kernel(&configuration, &potentials, &pool, None)?;
        kernel.total_energy(KernelFlags::all(), pool.best_strategy()).total()
    });

    let mut unbound = vec![Vector3D::zero(); n_atoms];
    let mut bound = vec![Vector3D::zero(); n_atoms];
    time_graph::spanned!("Forces", {
        let kernel = KernelProducer::force_kernel(&configuration, &potentials, &pool, None)?;
        kernel.total_forces(KernelFlags::all(), pool.best_strategy(), &mut unbound, &mut bound)?;
    });

    let forces = unbound.iter().zip(&bound).map(|(&a, &b)| a + b).collect();
    Ok((energy, forces))
}
