pub mod analysis;
pub mod classification;
pub mod config;
pub mod inference;
pub mod routes;
pub mod storage;
