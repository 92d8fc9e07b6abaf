pub mod demand;
pub mod input;
pub mod reporting;
