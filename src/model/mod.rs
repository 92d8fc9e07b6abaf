pub mod cycle;
pub mod family;
pub mod network;
pub mod normal;
pub mod plant;
