use std::fmt::{self, Write};

/// Outcome of one validation check
#[derive(Debug, Clone, PartialEq)]
pub enum CheckStatus {
    /// Check passed
    Ok,
    /// Check passed with warnings
    Warning(String),
    /// Check failed
    Failed(String),
}

impl CheckStatus {
    fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "✓",
            CheckStatus::Warning(_) => "⚠",
            CheckStatus::Failed(_) => "✗",
        }
    }

    fn detail(&self) -> Option<(&'static str, &str)> {
        match self {
            CheckStatus::Ok => None,
            CheckStatus::Warning(msg) => Some(("WARNING", msg)),
            CheckStatus::Failed(msg) => Some(("FAILED", msg)),
        }
    }
}

/// One named check and its outcome
#[derive(Debug, Clone)]
pub struct ValidationCheck {
    /// Check name
    pub name: String,
    /// Outcome
    pub status: CheckStatus,
}

impl ValidationCheck {
    pub(crate) fn ok(name: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Ok)
    }

    pub(crate) fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Warning(message.into()))
    }

    pub(crate) fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Failed(message.into()))
    }

    fn with_status(name: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// All checks run against one cache file
#[derive(Debug)]
pub struct ValidationReport {
    /// Individual check results, in execution order
    pub checks: Vec<ValidationCheck>,
    /// Validated file
    pub file_path: String,
}

impl ValidationReport {
    /// Empty report for `file_path`
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            checks: Vec::new(),
            file_path: file_path.into(),
        }
    }

    /// Record a check result
    pub fn add_check(&mut self, check: ValidationCheck) {
        self.checks.push(check);
    }

    /// Whether any check failed
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Whether any check warned
    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    /// Number of passed checks
    pub fn success_count(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Ok))
    }

    /// Number of warnings
    pub fn warning_count(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Warning(_)))
    }

    /// Number of failures
    pub fn failure_count(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&CheckStatus) -> bool) -> usize {
        self.checks.iter().filter(|c| pred(&c.status)).count()
    }

    /// Status that summarizes the whole report
    fn overall(&self) -> CheckStatus {
        if self.has_failures() {
            CheckStatus::Failed(String::new())
        } else if self.has_warnings() {
            CheckStatus::Warning(String::new())
        } else {
            CheckStatus::Ok
        }
    }

    fn verdict(&self) -> &'static str {
        match self.overall() {
            CheckStatus::Failed(_) => "Validation FAILED",
            CheckStatus::Warning(_) => "Validation PASSED with warnings",
            CheckStatus::Ok => "Validation PASSED",
        }
    }

    /// Render the report with terminal colors
    ///
    /// Without the `colorized_output` feature this equals the
    /// [`Display`](fmt::Display) rendering.
    pub fn format_colored(&self) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail
        let _ = self.render(&mut output, true);
        output
    }

    fn render(&self, out: &mut impl Write, colored: bool) -> fmt::Result {
        writeln!(out, "mzcache Validation Report")?;
        writeln!(out, "=========================")?;
        writeln!(out, "File: {}", self.file_path)?;
        writeln!(out)?;

        for check in &self.checks {
            let name = paint(&check.name, &check.status, colored);
            match check.status.detail() {
                None => writeln!(out, "[{}] {}", check.status.symbol(), name)?,
                Some((label, msg)) => writeln!(
                    out,
                    "[{}] {} - {}: {}",
                    check.status.symbol(),
                    name,
                    paint(label, &check.status, colored),
                    msg
                )?,
            }
        }

        writeln!(out)?;
        writeln!(
            out,
            "Summary: {} passed, {} warnings, {} failed",
            self.success_count(),
            self.warning_count(),
            self.failure_count()
        )?;
        writeln!(out)?;
        writeln!(out, "{}", paint(self.verdict(), &self.overall(), colored))
    }
}

#[cfg(feature = "colorized_output")]
fn paint(text: &str, status: &CheckStatus, colored: bool) -> String {
    use console::style;

    if !colored {
        return text.to_string();
    }
    match status {
        CheckStatus::Ok => style(text).green().to_string(),
        CheckStatus::Warning(_) => style(text).yellow().to_string(),
        CheckStatus::Failed(_) => style(text).red().bold().to_string(),
    }
}

#[cfg(not(feature = "colorized_output"))]
fn paint(text: &str, _status: &CheckStatus, _colored: bool) -> String {
    text.to_string()
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_verdict() {
        let mut report = ValidationReport::new("run.mzcache");
        report.add_check(ValidationCheck::ok("File exists"));
        assert_eq!(report.verdict(), "Validation PASSED");

        report.add_check(ValidationCheck::warning("Header", "no footer"));
        assert!(report.has_warnings());
        assert!(!report.has_failures());
        assert_eq!(report.verdict(), "Validation PASSED with warnings");

        report.add_check(ValidationCheck::failed("Offset index", "bad checksum"));
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.verdict(), "Validation FAILED");
    }

    #[test]
    fn test_display_lists_checks() {
        let mut report = ValidationReport::new("run.mzcache");
        report.add_check(ValidationCheck::ok("File exists"));
        report.add_check(ValidationCheck::warning("Header", "no footer"));
        report.add_check(ValidationCheck::failed("Offset index", "bad checksum"));

        let text = report.to_string();
        assert!(text.contains("File: run.mzcache"));
        assert!(text.contains("[✓] File exists\n"));
        assert!(text.contains("[⚠] Header - WARNING: no footer"));
        assert!(text.contains("[✗] Offset index - FAILED: bad checksum"));
        assert!(text.contains("1 passed, 1 warnings, 1 failed"));
        assert!(text.ends_with("Validation FAILED\n"));
    }

    #[test]
    fn test_colored_rendering_keeps_content() {
        let mut report = ValidationReport::new("run.mzcache");
        report.add_check(ValidationCheck::failed("Offset index", "bad checksum"));

        let colored = strip_ansi(&report.format_colored());
        assert_eq!(colored, report.to_string());
    }

    /// Drop ANSI escape sequences
    fn strip_ansi(text: &str) -> String {
        let mut out = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }
}
