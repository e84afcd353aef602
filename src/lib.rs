pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod parsers;
pub mod services;
