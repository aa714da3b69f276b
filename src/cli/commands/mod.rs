pub mod cache;
pub mod config;
pub mod diff;
pub mod parse;
pub mod parsers;
