pub mod cli;
pub mod repo;
pub mod simulate;
