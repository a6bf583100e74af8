pub mod contract;
pub mod criteria;
pub mod recommendation;
