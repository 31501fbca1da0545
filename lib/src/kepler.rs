pub mod lambert;
pub mod orbits;
