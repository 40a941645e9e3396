//! Terminal capability detection and utilities

use owo_colors::{colors::css, OwoColorize};
use saher::LifecycleStatus;

/// Detects whether colored output should be enabled
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Check if terminal is narrow (< 60 columns)
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|w| w < 60)
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Color as success (green)
    fn success(&self) -> String;
    /// Color as warning (amber)
    fn warning(&self) -> String;
    /// Color as error (red)
    fn error(&self) -> String;
    /// Color as info (blue)
    fn info(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        if supports_color() {
            self.fg::<css::Green>().to_string()
        } else {
            self.to_string()
        }
    }

    fn warning(&self) -> String {
        if supports_color() {
            self.fg::<css::Orange>().to_string()
        } else {
            self.to_string()
        }
    }

    fn error(&self) -> String {
        if supports_color() {
            self.fg::<css::Crimson>().to_string()
        } else {
            self.to_string()
        }
    }

    fn info(&self) -> String {
        if supports_color() {
            self.fg::<css::LightBlue>().to_string()
        } else {
            self.to_string()
        }
    }

    fn dim(&self) -> String {
        if supports_color() {
            self.dimmed().to_string()
        } else {
            self.to_string()
        }
    }
}

impl Colorize for String {
    fn success(&self) -> String {
        self.as_str().success()
    }

    fn warning(&self) -> String {
        self.as_str().warning()
    }

    fn error(&self) -> String {
        self.as_str().error()
    }

    fn info(&self) -> String {
        self.as_str().info()
    }

    fn dim(&self) -> String {
        self.as_str().dim()
    }
}

/// Renders text in the color of a lifecycle status.
pub fn paint(text: &str, status: LifecycleStatus) -> String {
    match status {
        LifecycleStatus::Active => text.success(),
        LifecycleStatus::SoonToExpire => text.warning(),
        LifecycleStatus::Expired => text.error(),
    }
}

/// Renders a status label, padded to `width` before coloring so that
/// escape codes do not break column alignment.
pub fn status_cell(status: LifecycleStatus, width: usize) -> String {
    paint(&format!("{:<width$}", status.to_string()), status)
}

/// Formats a cost with thousands separators and no decimals.
pub fn format_cost(cost: f64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let whole = cost.round() as i64;
    let digits = whole.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if whole < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Truncates text to at most `width` characters, marking the cut with an
/// ellipsis.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0.0, "0")]
    #[test_case(999.0, "999")]
    #[test_case(1500.0, "1,500")]
    #[test_case(250_000.0, "250,000")]
    #[test_case(1_234_567.4, "1,234,567")]
    #[test_case(-4200.0, "-4,200")]
    fn costs_are_grouped(cost: f64, expected: &str) {
        assert_eq!(format_cost(cost), expected);
    }

    #[test]
    fn truncation_marks_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer name", 6), "a lon…");
    }
}
