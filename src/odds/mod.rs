pub mod calculator;
pub mod consensus;

pub use consensus::build_consensus;
