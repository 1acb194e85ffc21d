//! Terminal output formatting for the glia-fn CLI.
//!
//! All user-facing text goes through here; diagnostics go through `tracing`.

use console::style;

/// Print a bold cyan header with an underline separator.
pub fn print_header(text: &str) {
    println!("\n{}", style(text).bold().cyan());
    println!("{}", style("=".repeat(text.chars().count())).dim());
}

pub fn print_success(text: &str) {
    println!("{} {}", style("[OK]").green().bold(), text);
}

pub fn print_warning(text: &str) {
    println!("{} {}", style("[WARN]").yellow().bold(), text);
}

pub fn print_error(text: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), text);
}

/// Print a progress step indicator like `[1/3] Collecting variables`.
pub fn print_step(step: u32, total: u32, text: &str) {
    println!("{} {}", style(format!("[{step}/{total}]")).dim(), text);
}

pub fn print_key_value(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Print an indented bullet under a key/value section.
pub fn print_item(text: &str) {
    println!("    - {text}");
}
