//! Display utilities for command results.

use std::path::Path;

use bytesize::ByteSize;
use console::style;

use crate::processor::{ApplySummary, CreateSummary};
use crate::store::TemplateInfo;

/// Formats a byte count for humans.
pub fn format_bytes(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

pub fn show_created(name: &str, path: &Path, summary: &CreateSummary) {
    println!();
    println!("{} {}", style("✓").green(), style(format!("Template '{name}' created successfully.")).bold());
    println!(
        "  {} file(s), {} empty dir(s), {} captured -> {}",
        summary.files,
        summary.dirs,
        format_bytes(summary.bytes),
        path.display()
    );

    for ambiguous in &summary.ambiguous {
        show_warning(&format!("'{ambiguous}' contains archive markers and may not be readable by older tdmcli versions"));
    }
}

pub fn show_applied(name: &str, destination: &Path, summary: &ApplySummary) {
    println!();
    println!("{} {}", style("✓").green(), style(format!("Template '{name}' applied successfully.")).bold());
    println!("  {} file(s), {} dir(s) written into {}", summary.files, summary.dirs, destination.display());

    if summary.duplicates > 0 {
        show_warning(&format!("{} duplicate path(s) in the archive; the last occurrence of each was kept", summary.duplicates));
    }
}

/// Prints the names in the template store.
pub fn show_templates(templates: &[TemplateInfo]) {
    if templates.is_empty() {
        println!("{}", style("No templates found.").yellow());
        return;
    }

    println!("{}", style("Available templates:").bold());
    for template in templates {
        println!("  - {:32} {:>10}", style(&template.name).green(), format_bytes(template.size));
    }
}

pub fn show_info(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

pub fn show_warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), style(message).yellow());
}

pub fn show_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert!(format_bytes(100_000).contains("KiB") || format_bytes(100_000).contains("kB"));
    }
}
