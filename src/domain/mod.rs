pub mod geo;
pub mod loyalty;
pub mod orders;
pub mod slots;
pub mod status;
