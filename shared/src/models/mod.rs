//! Domain models for the heat-unit engine

mod season;
mod trial;
mod weather;

pub use season::*;
pub use trial::*;
pub use weather::*;
