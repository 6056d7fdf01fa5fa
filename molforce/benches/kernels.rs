#![allow(clippy::needless_return)]

use rand::SeedableRng;
use rand::rngs::StdRng;

use molforce::{SimulationBox, Vector3D};
use molforce::configuration::{AtomType, Configuration, Species};
use molforce::kernels::{KernelFlags, KernelProducer};
use molforce::parallel::ProcessPool;
use molforce::potentials::{PairPotentialParameters, PotentialMap, ShortRangeForm};

use criterion::{Criterion, criterion_group, criterion_main};

/// Argon fluid at liquid density, with `n_atoms` atoms in a cubic box
fn argon(n_atoms: usize) -> Configuration {
    let length = f64::cbrt(n_atoms as f64 / 0.021);
    let simulation_box = SimulationBox::cubic(length).unwrap();
    let mut configuration = Configuration::new(simulation_box, 3.0, 9.0).unwrap();

    configuration.add_atom_type(AtomType {
        name: "Ar".into(),
        charge: 0.0,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.99, sigma: 3.4 },
    }).unwrap();

    let mut argon = Species::new("argon");
    argon.add_atom(0, 0.0, Vector3D::zero());
    let argon = configuration.add_species(argon).unwrap();

    let mut rng = StdRng::seed_from_u64(0x1234);
    for _ in 0..n_atoms {
        let position = configuration.simulation_box().random_coordinate(&mut rng);
        configuration.add_molecule(argon, &[position]).unwrap();
    }

    return configuration;
}

fn potentials(configuration: &Configuration) -> PotentialMap {
    let parameters = PairPotentialParameters {
        range: configuration.cells().cutoff(),
        ..Default::default()
    };
    return PotentialMap::new(configuration.atom_types(), &parameters).unwrap();
}

fn energy(c: &mut Criterion) {
    let mut group = c.benchmark_group("Total energy");
    group.noise_threshold(0.05);

    let pool = ProcessPool::serial();
    for &n_atoms in &[1000, 4000] {
        let configuration = argon(n_atoms);
        let potentials = potentials(&configuration);
        let kernel = KernelProducer::energy_kernel(&configuration, &potentials, &pool, None).unwrap();

        group.bench_function(&format!("{} argon atoms", n_atoms), |b| b.iter(|| {
            kernel.total_energy(KernelFlags::all(), pool.best_strategy())
        }));
    }
}

fn forces(c: &mut Criterion) {
    let mut group = c.benchmark_group("Total forces");
    group.noise_threshold(0.05);

    let pool = ProcessPool::serial();
    for &n_atoms in &[1000, 4000] {
        let configuration = argon(n_atoms);
        let potentials = potentials(&configuration);
        let kernel = KernelProducer::force_kernel(&configuration, &potentials, &pool, None).unwrap();

        let mut unbound = vec![Vector3D::zero(); n_atoms];
        let mut bound = vec![Vector3D::zero(); n_atoms];
        group.bench_function(&format!("{} argon atoms", n_atoms), |b| b.iter(|| {
            kernel.total_forces(KernelFlags::all(), pool.best_strategy(), &mut unbound, &mut bound).unwrap();
        }));
    }
}

criterion_group!(kernels, energy, forces);
criterion_main!(kernels);
