use approx::assert_ulps_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use molforce::{BoxType, SimulationBox, Vector3D};
use molforce::cells::CellArray;

mod data;

#[test]
fn minimum_distance_is_symmetric() {
    let mut rng = StdRng::seed_from_u64(42);
    for simulation_box in data::all_boxes() {
        for _ in 0..100 {
            // include points outside of the box
            let i = 2.0 * simulation_box.random_coordinate(&mut rng) - simulation_box.lengths();
            let j = simulation_box.random_coordinate(&mut rng);

            assert_ulps_eq!(
                simulation_box.minimum_distance(i, j),
                simulation_box.minimum_distance(j, i),
                max_ulps = 8
            );
        }
    }
}

#[test]
fn fold_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    for simulation_box in data::all_boxes() {
        for _ in 0..100 {
            let position = 3.0 * simulation_box.random_coordinate(&mut rng) - simulation_box.lengths();
            let folded = simulation_box.fold(position);
            assert_ulps_eq!(simulation_box.fold(folded), folded, epsilon = 1e-12);

            if simulation_box.is_periodic() {
                let fractional = simulation_box.fold_frac(position);
                for k in 0..3 {
                    assert!(fractional[k] >= 0.0 && fractional[k] < 1.0);
                }

                // folding only moves the position by whole box vectors
                assert_ulps_eq!(simulation_box.minimum_distance(position, folded), 0.0, epsilon = 1e-10);
            } else {
                assert_eq!(folded, position);
            }
        }
    }
}

#[test]
fn cubic_minimum_image() {
    let simulation_box = SimulationBox::cubic(10.0).unwrap();
    assert_eq!(simulation_box.box_type(), BoxType::Cubic);

    let distance = simulation_box.minimum_distance(Vector3D::zero(), Vector3D::new(9.0, 0.0, 0.0));
    assert_ulps_eq!(distance, 1.0);

    assert_ulps_eq!(simulation_box.volume(), 1000.0);
    assert_ulps_eq!(simulation_box.inscribed_sphere_radius(), 5.0);
}

#[test]
fn cutoff_validation() {
    for simulation_box in data::all_boxes() {
        assert!(simulation_box.validate_cutoff(6.0).is_ok());
        assert!(simulation_box.validate_cutoff(-1.0).is_err());

        let too_large = if simulation_box.is_periodic() {
            simulation_box.inscribed_sphere_radius() + 0.1
        } else {
            simulation_box.volume().cbrt()
        };
        assert!(simulation_box.validate_cutoff(too_large).is_err());
        assert!(CellArray::new(simulation_box, 2.0, too_large).is_err());
    }
}

#[test]
fn box_types() {
    let boxes = data::all_boxes();
    let types = boxes.iter().map(|b| b.box_type()).collect::<Vec<_>>();
    assert_eq!(types, [
        BoxType::Cubic,
        BoxType::Orthorhombic,
        BoxType::Monoclinic,
        BoxType::Triclinic,
        BoxType::NonPeriodic,
    ]);

    for simulation_box in boxes.iter().filter(|b| b.is_periodic()) {
        let lengths = simulation_box.lengths();
        let angles = simulation_box.angles();
        let rebuilt = SimulationBox::from_lengths_and_angles(lengths.into(), angles.into()).unwrap();
        assert_eq!(rebuilt.box_type(), simulation_box.box_type());
        assert_ulps_eq!(rebuilt.volume(), simulation_box.volume(), epsilon = 1e-9);
    }
}
