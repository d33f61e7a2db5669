use std::fmt::Display;

use colored::Colorize;
use serde::Serialize;

pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{json}");
    Ok(())
}

pub fn print_success(message: impl Display) {
    eprintln!("{} {}", "✓".green(), message);
}

pub fn print_info(message: impl Display) {
    eprintln!("{} {}", "ℹ".blue(), message);
}

pub fn print_error(message: impl Display) {
    eprintln!("{} {}", "✗".red(), message);
}
