pub mod database;
pub mod delivery;
pub mod memory;
