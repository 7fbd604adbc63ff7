pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod jobs;
pub mod logstream;
pub mod runner;
