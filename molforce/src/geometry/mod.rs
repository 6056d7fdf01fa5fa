mod simulation_box;
pub use self::simulation_box::{SimulationBox, BoxType};
