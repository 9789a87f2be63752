pub mod error;

pub mod config;
pub mod driver;

pub mod exchange;
pub mod exec;

mod component;
pub use component::*;
