pub mod errors;
pub mod gateway;
pub mod linker;
pub mod models;
pub mod ports;
