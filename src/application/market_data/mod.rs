// Technical indicator engine
pub mod indicators;
