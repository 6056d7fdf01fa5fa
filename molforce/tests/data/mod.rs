#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;

use molforce::{SimulationBox, Vector3D};
use molforce::configuration::{AtomType, Angle, Bond, Configuration, Species};
use molforce::potentials::{PairPotentialParameters, PotentialMap, ShortRangeForm};

#[derive(serde::Deserialize)]
struct BoxInput {
    lengths: [f64; 3],
    angles: [f64; 3],
}

#[derive(serde::Deserialize)]
struct AtomInput {
    #[serde(rename = "type")]
    atom_type: usize,
    charge: f64,
}

#[derive(serde::Deserialize)]
struct SpeciesInput {
    name: String,
    atoms: Vec<AtomInput>,
    #[serde(default)]
    bonds: Vec<Bond>,
    #[serde(default)]
    angles: Vec<Angle>,
}

#[derive(serde::Deserialize)]
struct MoleculeInput {
    species: usize,
    positions: Vec<[f64; 3]>,
}

#[derive(serde::Deserialize)]
struct ConfigurationInput {
    #[serde(rename = "box")]
    simulation_box: BoxInput,
    cell_size: f64,
    cutoff: f64,
    atom_types: Vec<AtomType>,
    species: Vec<SpeciesInput>,
    molecules: Vec<MoleculeInput>,
}

/// Load a configuration from the JSON file at `tests/data/<path>`
pub fn load_configuration(path: &str) -> Configuration {
    let json = std::fs::read_to_string(format!("tests/data/{}", path))
        .expect("failed to read input file");
    let input: ConfigurationInput = serde_json::from_str(&json).expect("failed to parse JSON");

    let simulation_box = SimulationBox::from_lengths_and_angles(
        input.simulation_box.lengths,
        input.simulation_box.angles,
    ).expect("invalid box");

    let mut configuration = Configuration::new(simulation_box, input.cell_size, input.cutoff)
        .expect("invalid cell array parameters");

    for atom_type in input.atom_types {
        configuration.add_atom_type(atom_type).expect("invalid atom type");
    }

    for species_input in input.species {
        let mut species = Species::new(species_input.name);
        for atom in &species_input.atoms {
            species.add_atom(atom.atom_type, atom.charge, Vector3D::zero());
        }
        for bond in species_input.bonds {
            species.add_bond(bond).expect("invalid bond");
        }
        for angle in species_input.angles {
            species.add_angle(angle).expect("invalid angle");
        }
        configuration.add_species(species).expect("invalid species");
    }

    for molecule in input.molecules {
        let positions = molecule.positions.iter().map(|&p| Vector3D::from(p)).collect::<Vec<_>>();
        configuration.add_molecule(molecule.species, &positions).expect("invalid molecule");
    }

    return configuration;
}

/// Tabulate pair potentials for all the atom types in `configuration`, up to
/// the cutoff of the cell array
pub fn potentials(configuration: &Configuration) -> PotentialMap {
    let parameters = PairPotentialParameters {
        range: configuration.cells().cutoff(),
        ..Default::default()
    };
    return PotentialMap::new(configuration.atom_types(), &parameters).expect("invalid potentials");
}

/// Create a configuration containing `n_atoms` argon atoms at random
/// positions in `simulation_box`, with a cutoff of `cutoff`
pub fn random_argon(simulation_box: SimulationBox, n_atoms: usize, cutoff: f64, seed: u64) -> Configuration {
    let mut configuration = Configuration::new(simulation_box, cutoff / 3.0, cutoff).expect("invalid cell array");
    configuration.add_atom_type(AtomType {
        name: "Ar".into(),
        charge: 0.0,
        short_range: ShortRangeForm::LennardJones { epsilon: 0.99, sigma: 3.4 },
    }).expect("invalid atom type");

    let mut argon = Species::new("argon");
    argon.add_atom(0, 0.0, Vector3D::zero());
    let argon = configuration.add_species(argon).expect("invalid species");

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..n_atoms {
        let position = configuration.simulation_box().random_coordinate(&mut rng);
        configuration.add_molecule(argon, &[position]).expect("invalid molecule");
    }

    return configuration;
}

/// One box of each type, all large enough for a cutoff of 6 Å
pub fn all_boxes() -> Vec<SimulationBox> {
    vec![
        SimulationBox::cubic(14.0).expect("invalid box"),
        SimulationBox::orthorhombic(13.0, 14.0, 15.0).expect("invalid box"),
        SimulationBox::monoclinic(14.0, 15.0, 16.0, 105.0).expect("invalid box"),
        SimulationBox::triclinic(14.0, 15.0, 16.0, 80.0, 95.0, 102.0).expect("invalid box"),
        SimulationBox::non_periodic(19.0, 19.0, 19.0).expect("invalid box"),
    ]
}
