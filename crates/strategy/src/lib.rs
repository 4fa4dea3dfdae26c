pub mod config;
pub mod indicators;
pub mod position;

pub use config::{LegConfig, StrategyFileConfig};
pub use indicators::{classify_relationship, moving_average, MovingAverageSample, Relationship};
pub use position::{Decision, PositionMachine, PositionState, TradeParams};
