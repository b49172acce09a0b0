pub mod boundary;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod hg;
pub mod publish;
pub mod query;
pub mod resolver;
pub mod ui;

pub use error::{HgResourceError, Result};
