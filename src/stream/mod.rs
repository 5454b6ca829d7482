pub mod chunks;
pub mod evaluate;
pub mod generator;
