pub mod grouping;
pub mod orient;
pub mod shelf;
pub mod solver;
pub mod types;
