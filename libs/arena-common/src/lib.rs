pub mod catalog;
pub mod config;
pub mod languages;
pub mod types;
