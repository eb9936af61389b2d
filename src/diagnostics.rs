//! Diagnostic formatting for the Kava CLI.

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};

use crate::Error;

/// Get the display color for a failing stage.
pub fn stage_color(error: &Error) -> Color {
    match error {
        Error::Syntax(_) | Error::Construction(_) => Color::Red,
        Error::Evaluation(_) => Color::Magenta,
        Error::Execution(_) => Color::Yellow,
    }
}

/// Clamp a span into `len` bytes, with end > start (required by ariadne).
pub fn normalize_span(start: usize, end: usize, len: usize) -> (usize, usize) {
    let start = start.min(len);
    (start, end.min(len).max(start + 1))
}

fn report<'a>(
    error: &Error,
    path: &'a str,
    source: &str,
    config: Config,
) -> Report<'a, (&'a str, std::ops::Range<usize>)> {
    let span = error.span();
    let (start, end) = normalize_span(span.start, span.end, source.len());
    let kind = match error {
        Error::Execution(_) => ReportKind::Custom("Exception", Color::Yellow),
        _ => ReportKind::Error,
    };
    let label = match error {
        Error::Evaluation(e) => format!("in this {}", e.node),
        Error::Execution(e) => format!("{} thrown here", e.ty),
        _ => error.to_string(),
    };
    Report::build(kind, (path, start..end))
        .with_config(config.with_index_type(IndexType::Byte))
        .with_code(error.stage())
        .with_message(error.to_string())
        .with_label(
            Label::new((path, start..end))
                .with_message(label)
                .with_color(stage_color(error)),
        )
        .finish()
}

/// Print a diagnostic using ariadne for pretty output.
pub fn print_diagnostic(error: &Error, path: &str, source: &str) {
    report(error, path, source, Config::default())
        .eprint((path, Source::from(source)))
        .ok();
}

/// Render a diagnostic as plain text, without colors.
pub fn render_diagnostic(error: &Error, path: &str, source: &str) -> String {
    let mut out = Vec::new();
    report(error, path, source, Config::default().with_color(false))
        .write((path, Source::from(source)), &mut out)
        .ok();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Session, SessionConfig};

    #[test]
    fn test_normalize_span_valid() {
        assert_eq!(normalize_span(0, 10, 20), (0, 10));
        assert_eq!(normalize_span(5, 15, 20), (5, 15));
    }

    #[test]
    fn test_normalize_span_zero_length() {
        assert_eq!(normalize_span(5, 5, 20), (5, 6));
    }

    #[test]
    fn test_normalize_span_past_end() {
        assert_eq!(normalize_span(30, 40, 20), (20, 21));
    }

    #[test]
    fn rendered_report_names_the_problem() {
        let source = "int n = true;";
        let error = Session::captured(SessionConfig::default())
            .check(source)
            .unwrap_err();
        let rendered = render_diagnostic(&error, "demo.kava", source);
        assert!(rendered.contains("[evaluation]"), "{rendered}");
        assert!(rendered.contains("type mismatch"), "{rendered}");
        assert!(rendered.contains("demo.kava"), "{rendered}");
    }

    #[test]
    fn exceptions_use_their_own_color() {
        let mut session = Session::captured(SessionConfig::default());
        let error = session.run("int[] a = new int[1]; a[3];").unwrap_err();
        assert_eq!(stage_color(&error), Color::Yellow);
    }
}
