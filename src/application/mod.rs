pub mod almanac;
pub mod bootstrap;
pub mod commands;
pub mod generation;
pub mod store;
