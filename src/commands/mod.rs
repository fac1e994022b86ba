pub mod extract;
pub mod index;
pub mod init;
pub mod list;
pub mod search;
pub mod semantic_search;
pub mod similar;
pub mod status;

use colored::{ColoredString, Colorize};

/// Truncate for display (char-aware for Unicode)
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}

pub fn colored_score(score: f32) -> ColoredString {
    let score_str = format!("{:.2}", score);
    if score > 0.8 {
        score_str.green()
    } else if score > 0.6 {
        score_str.yellow()
    } else {
        score_str.dimmed()
    }
}
