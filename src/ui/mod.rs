pub mod icons;
pub mod progress;
pub mod results;

pub use progress::VerifyUI;
pub use results::render_result;

/// Truncate a string to `max_chars` characters with an ellipsis.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
