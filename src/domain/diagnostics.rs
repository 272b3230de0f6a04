//! Error excerpts scraped from toolchain transcripts.

/// Maximum number of lines kept from a transcript.
pub const MAX_EXCERPT_LINES: usize = 10;

/// The first error-looking lines of a toolchain log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogExcerpt {
    lines: Vec<String>,
}

impl LogExcerpt {
    /// Keep up to [`MAX_EXCERPT_LINES`] lines containing `!` or `Error`, in order.
    pub fn from_log(log: &str) -> Self {
        let lines = log
            .lines()
            .filter(|line| is_error_line(line))
            .take(MAX_EXCERPT_LINES)
            .map(str::to_owned)
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }
}

fn is_error_line(line: &str) -> bool {
    line.contains('!') || line.contains("Error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_error_lines_in_order() {
        let log = "This is pdfTeX\n! Undefined control sequence.\nl.3 \\foo\nLaTeX Error: File `x.sty' not found.\n";
        let excerpt = LogExcerpt::from_log(log);

        assert_eq!(
            excerpt.lines(),
            &[
                "! Undefined control sequence.".to_string(),
                "LaTeX Error: File `x.sty' not found.".to_string(),
            ]
        );
    }

    #[test]
    fn caps_excerpt_length() {
        let log = (0..25)
            .map(|i| format!("! error {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let excerpt = LogExcerpt::from_log(&log);

        assert_eq!(excerpt.lines().len(), MAX_EXCERPT_LINES);
        assert_eq!(excerpt.lines()[0], "! error 0");
        assert_eq!(excerpt.lines()[9], "! error 9");
    }

    #[test]
    fn clean_log_yields_empty_excerpt() {
        let excerpt = LogExcerpt::from_log("Output written on document.pdf (1 page).");
        assert!(excerpt.is_empty());
        assert_eq!(excerpt.joined(), "");
    }

    #[test]
    fn error_token_is_case_sensitive() {
        let excerpt = LogExcerpt::from_log("no error here\nan Error here");
        assert_eq!(excerpt.lines(), &["an Error here".to_string()]);
    }
}
