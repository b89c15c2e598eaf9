pub mod error;
pub mod intake;
pub mod placement;
pub mod resolver;
