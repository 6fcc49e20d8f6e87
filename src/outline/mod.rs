pub mod aggregator;
pub mod merge;
pub mod model;
