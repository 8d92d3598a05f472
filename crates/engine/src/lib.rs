pub mod advisory;
pub mod capital_flow;
pub mod distribution;
pub mod indicator;
pub mod scoring;
pub mod technical;
