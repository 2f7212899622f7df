pub mod baseline;
pub mod greedy;
pub mod objective;
pub mod order;
pub mod similarity;
