mod production;
mod traits;

pub use production::ProductionParams112;
pub use traits::SchemeParams;
