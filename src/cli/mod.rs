//! CLI layer - argument parsing, output, and the app runner

pub mod app;
pub mod args;
pub mod presenter;
pub mod prompt;
pub mod signals;

pub use args::{Cli, Mode};
pub use presenter::Presenter;
