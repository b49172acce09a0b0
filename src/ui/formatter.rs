//! Formatting of log lines written to stderr.
//!
//! The `format_*` functions are pure; the `display_*` wrappers print them.

use crate::boundary::BoundaryWarning;
use console::style;

pub fn format_error(message: &str) -> String {
    format!("{} {}", style("ERROR:").red().bold(), message)
}

pub fn format_success(message: &str) -> String {
    format!("{} {}", style("✓").green(), message)
}

pub fn format_status(message: &str) -> String {
    format!("{} {}", style("→").yellow(), message)
}

pub fn format_boundary_warning(warning: &BoundaryWarning) -> String {
    format!("{} {}", style("⚠ WARNING:").yellow(), warning)
}

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{}", format_error(message));
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    eprintln!("{}", format_success(message));
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    eprintln!("{}", format_status(message));
}

/// Display a boundary warning to the operator.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{}", format_boundary_warning(warning));
}

/// Echo combined backend output verbatim; blank output prints nothing.
pub fn display_backend_output(output: &str) {
    if output.trim().is_empty() {
        return;
    }
    if output.ends_with('\n') {
        eprint!("{}", output);
    } else {
        eprintln!("{}", output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_keeps_message() {
        console::set_colors_enabled(false);
        assert_eq!(format_error("boom"), "ERROR: boom");
        assert_eq!(format_status("Cloning"), "→ Cloning");
        assert_eq!(format_success("Pushed"), "✓ Pushed");
    }

    #[test]
    fn test_format_boundary_warning() {
        console::set_colors_enabled(false);
        let warning = BoundaryWarning::NoQualifyingCommits {
            branch: "default".to_string(),
        };
        assert!(format_boundary_warning(&warning)
            .ends_with("No qualifying commits on branch 'default'"));
    }

    #[test]
    fn test_display_backend_output() {
        // Visual verification test - output is printed to stderr
        display_backend_output("pushing to /tmp/dest\n");
        display_backend_output("   \n");
    }
}
