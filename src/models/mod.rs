pub mod milp;
pub mod plant_location;
pub mod utils;
