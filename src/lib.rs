pub mod app;
pub mod collector;
pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod poster;
pub mod prompts;
pub mod scheduler;
pub mod summarize;
