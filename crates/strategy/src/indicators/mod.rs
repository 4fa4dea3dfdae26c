pub mod moving_average;

pub use moving_average::{classify_relationship, moving_average, MovingAverageSample, Relationship};
