pub mod generate;
pub mod modules;
