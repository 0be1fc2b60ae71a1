mod config;

pub use config::{KeyConfig, PreviousConfig, PublicAuxInfo};
