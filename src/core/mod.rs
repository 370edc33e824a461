pub mod catalog;
pub mod engine;
pub mod format;
pub mod matcher;
pub mod parser;
pub mod renderer;
