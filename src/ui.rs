// src/ui.rs

use crate::{constants, symbols};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn print_header(title: &str) {
    println!("\n{}", "═".repeat(constants::UI_WIDTH));
    println!(" {}", title.cyan().bold());
    println!("{}", "═".repeat(constants::UI_WIDTH));
}

pub fn print_sub_header(title: &str) {
    println!("\n--- {} ---", title.bold());
}

pub fn plain(message: &str) {
    println!("{}", message);
}

pub fn info(message: &str) {
    println!("{} {}", *symbols::INFO, message);
}

pub fn warn(message: &str) {
    println!("{} {}", *symbols::WARN, message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", *symbols::ERROR, message.red());
}

pub fn new_tasks_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pbar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{prefix:.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    pbar.set_style(style);
    pbar.set_prefix(prefix.to_string());
    pbar.enable_steady_tick(Duration::from_millis(200));
    pbar
}
