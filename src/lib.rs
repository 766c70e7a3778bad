pub mod cli;
pub mod config;
pub mod db;
pub mod graph;
pub mod indexer;
pub mod loader;
pub mod model;
pub mod util;
