use colored::Colorize;
use indicatif::ProgressStyle;

/// Spinner shown while an operation is running.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.yellow} {wide_msg}")
        .unwrap()
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"])
}

/// Final style for an operation that finished cleanly.
pub fn ok_style() -> ProgressStyle {
    ProgressStyle::with_template(&format!("{} {{wide_msg}}", "✔".green())).unwrap()
}

/// Final style for an operation that failed.
pub fn err_style() -> ProgressStyle {
    ProgressStyle::with_template(&format!("{} {{wide_msg}}", "✘".red())).unwrap()
}
