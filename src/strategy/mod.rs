pub mod constraints;
pub mod implementations;
pub mod traits;
