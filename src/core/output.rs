//! Terminal output helpers for CLI surfaces.
//!
//! Keeps command output bounded and readable while preserving signal.

use colored::Colorize;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Section heading for interactive workflows.
pub fn heading(text: &str) {
    println!();
    println!("{}", text.bright_cyan().bold());
}

/// Success line, used after a commit.
pub fn ok(text: &str) {
    println!("{} {}", "ok:".green().bold(), text);
}

/// Non-fatal notice (constraint rejections, skipped writes, no-op features).
pub fn notice(text: &str) {
    println!("{} {}", "note:".yellow().bold(), text);
}

#[cfg(test)]
mod tests {
    use super::compact_line;

    #[test]
    fn compact_line_collapses_and_bounds() {
        assert_eq!(compact_line("a\n b\tc", 10), "a b c");
        assert_eq!(compact_line("abcdef", 3), "abc...");
        assert_eq!(compact_line("abc", 3), "abc");
    }
}
