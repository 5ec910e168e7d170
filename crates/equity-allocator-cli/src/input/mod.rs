pub mod config;
pub mod file;
pub mod stdin;
pub mod universe_csv;
pub mod universe_source;
