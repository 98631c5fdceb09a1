pub mod cli;
mod config;
mod run;

pub use self::run::{run, start};
