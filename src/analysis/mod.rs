//! Risk scoring and spread path ranking

pub mod risk;
pub mod spread;

pub use risk::{score_risk, RiskEntry};
pub use spread::{detect_spread_paths, SpreadPathEntry};
