pub mod order;
pub mod project;
