use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::Vector3D;
use crate::geometry::SimulationBox;
use crate::potentials::{PotentialMap, PairPotentialParameters, ShortRangeForm};

use super::{AtomType, Angle, Bond, Configuration, Species};

pub fn test_configuration(name: &str) -> Configuration {
    match name {
        "three-molecules" => get_three_molecules(),
        "ions" => get_ions(),
        _ => panic!("unknown test configuration {}", name)
    }
}

/// Tabulate the pair potentials for all atom types in `configuration`, up to
/// the cutoff of the cell array
pub fn test_potentials(configuration: &Configuration) -> PotentialMap {
    let parameters = PairPotentialParameters {
        range: configuration.cells().cutoff(),
        ..Default::default()
    };
    return PotentialMap::new(configuration.atom_types(), &parameters).unwrap();
}

fn add_water_types(configuration: &mut Configuration) {
    configuration.add_atom_type(AtomType {
        name: "OW".into(),
        charge: -0.82,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.65, sigma: 3.166 },
    }).unwrap();
    configuration.add_atom_type(AtomType {
        name: "HW".into(),
        charge: 0.41,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.0, sigma: 0.0 },
    }).unwrap();
}

/// Water molecule with atom types `OW` (0) and `HW` (1)
fn water() -> Species {
    let mut species = Species::new("water");
    species.add_atom(0, -0.82, Vector3D::new(0.0, 0.0, 0.0));
    species.add_atom(1, 0.41, Vector3D::new(1.0, 0.0, 0.0));
    species.add_atom(1, 0.41, Vector3D::new(-0.333, 0.943, 0.0));

    species.add_bond(Bond { i: 0, j: 1, force_constant: 4431.53, equilibrium: 1.0 }).unwrap();
    species.add_bond(Bond { i: 0, j: 2, force_constant: 4431.53, equilibrium: 1.0 }).unwrap();
    species.add_angle(Angle { i: 1, j: 0, k: 2, force_constant: 317.5656, equilibrium: 113.24 }).unwrap();
    return species;
}

/// Five atoms zig-zag chain, alternating atom types `CA` (2) and `CB` (3)
fn chain() -> Species {
    let mut species = Species::new("chain");
    for i in 0..5 {
        let (atom_type, charge) = if i % 2 == 0 { (2, 0.1) } else { (3, -0.1) };
        let y = if i % 2 == 0 { 0.0 } else { 0.84 };
        species.add_atom(atom_type, charge, Vector3D::new(1.29 * i as f64, y, 0.0));
    }

    for i in 0..4 {
        species.add_bond(Bond { i: i, j: i + 1, force_constant: 2242.6, equilibrium: 1.53 }).unwrap();
    }
    for i in 0..3 {
        species.add_angle(Angle { i: i, j: i + 1, k: i + 2, force_constant: 488.3, equilibrium: 112.7 }).unwrap();
    }
    return species;
}

/// Two water molecules and a short chain in a cubic box. The second water
/// molecule crosses the periodic boundary.
fn get_three_molecules() -> Configuration {
    let simulation_box = SimulationBox::cubic(20.0).unwrap();
    let mut configuration = Configuration::new(simulation_box, 4.0, 8.0).unwrap();

    add_water_types(&mut configuration);
    configuration.add_atom_type(AtomType {
        name: "CA".into(),
        charge: 0.1,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.38, sigma: 3.9 },
    }).unwrap();
    configuration.add_atom_type(AtomType {
        name: "CB".into(),
        charge: -0.1,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.38, sigma: 3.9 },
    }).unwrap();

    let water = configuration.add_species(water()).unwrap();
    let chain = configuration.add_species(chain()).unwrap();

    configuration.add_molecule(water, &[
        Vector3D::new(10.0, 5.0, 6.0),
        Vector3D::new(11.0, 5.0, 6.0),
        Vector3D::new(10.0, 6.0, 6.0),
    ]).unwrap();

    configuration.add_molecule(water, &[
        Vector3D::new(19.5, 4.0, 3.0),
        Vector3D::new(20.3, 4.2, 3.0),
        Vector3D::new(19.2, 4.9, 3.1),
    ]).unwrap();

    let positions = (0..5).map(|i| {
        let y = if i % 2 == 0 { 8.0 } else { 8.84 };
        Vector3D::new(4.0 + 1.29 * i as f64, y, 8.0)
    }).collect::<Vec<_>>();
    configuration.add_molecule(chain, &positions).unwrap();

    return configuration;
}

/// Random arrangement of 40 single-atom ions in a cubic box, with atom types
/// `Na` (0) and `Cl` (1)
fn get_ions() -> Configuration {
    let simulation_box = SimulationBox::cubic(15.0).unwrap();
    return random_ions(simulation_box, 40, 0xdead_beef);
}

/// Random arrangement of `n_atoms` single-atom ions in `simulation_box`,
/// using a cutoff of 7 Å
pub fn random_ions(simulation_box: SimulationBox, n_atoms: usize, seed: u64) -> Configuration {
    let mut configuration = Configuration::new(simulation_box, 2.5, 7.0).unwrap();

    configuration.add_atom_type(AtomType {
        name: "Na".into(),
        charge: 1.0,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.5, sigma: 2.5 },
    }).unwrap();
    configuration.add_atom_type(AtomType {
        name: "Cl".into(),
        charge: -1.0,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.4, sigma: 4.4 },
    }).unwrap();

    let mut sodium = Species::new("sodium");
    sodium.add_atom(0, 1.0, Vector3D::zero());
    let sodium = configuration.add_species(sodium).unwrap();

    let mut chlorine = Species::new("chlorine");
    chlorine.add_atom(1, -1.0, Vector3D::zero());
    let chlorine = configuration.add_species(chlorine).unwrap();

    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..n_atoms {
        let species = if i % 2 == 0 { sodium } else { chlorine };
        let position = configuration.simulation_box().random_coordinate(&mut rng);
        configuration.add_molecule(species, &[position]).unwrap();
    }

    return configuration;
}
