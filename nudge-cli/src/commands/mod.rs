pub mod config;
pub mod eligible;
