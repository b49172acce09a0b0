//! Operator-facing output.
//!
//! stdout carries only the JSON response, so everything here goes to stderr.

pub mod formatter;

pub use formatter::{
    display_backend_output, display_boundary_warning, display_error, display_status,
    display_success,
};
