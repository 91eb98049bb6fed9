//! Terminal output for the command-line interface.

use indicatif::{ProgressBar, ProgressStyle};

use crate::models::{Paper, RetrievedArtifact};

/// Outcome icons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Search,
}

pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Search => "🔍",
    }
}

/// Truncate `text` to at most `max` characters, marking the cut with `...`
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let head: String = text.chars().take(keep).collect();
    format!("{}...", head)
}

/// Progress bar for a batch of resolutions; hidden when `quiet`
pub fn create_progress_bar(len: u64, msg: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{msg}: {bar:40.cyan/blue} {pos}/{len} ({percent}%)")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb
}

/// One line per identifier of a batch download
pub fn format_download_line(identifier: &str, artifact: &RetrievedArtifact, saved_to: Option<&str>) -> String {
    match (artifact.soft_error(), saved_to) {
        (None, Some(path)) => format!(
            "{} {} -> {} ({} bytes)",
            status_icon(Status::Success),
            identifier,
            path,
            artifact.content().len()
        ),
        (None, None) => format!(
            "{} {} ({} bytes)",
            status_icon(Status::Success),
            identifier,
            artifact.content().len()
        ),
        (Some(error), _) => format!("{} {}: {}", status_icon(Status::Error), identifier, error),
    }
}

/// Multi-line summary of a search hit
pub fn format_paper(index: usize, paper: &Paper) -> String {
    let mut lines = vec![format!("{:>3}. {}", index, truncate_with_ellipsis(&paper.title, 100))];

    let authors = paper.author_list();
    if !authors.is_empty() {
        let shown = if authors.len() > 3 {
            format!("{} et al.", authors[..3].join(", "))
        } else {
            authors.join(", ")
        };
        lines.push(format!("     {}", shown));
    }

    let details: Vec<&str> = [paper.year.as_deref(), paper.venue.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !details.is_empty() {
        lines.push(format!("     {}", details.join(" · ")));
    }

    lines.push(format!("     {}", paper.url));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperBuilder;

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert_eq!(status_icon(Status::Search), "🔍");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Hello", 10), "Hello");
        assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
        assert_eq!(truncate_with_ellipsis("Hello", 3), "...");
    }

    #[test]
    fn test_format_download_line() {
        let ok = RetrievedArtifact::success(b"%PDF-1.4".to_vec(), "https://m/x", "x.pdf");
        assert_eq!(
            format_download_line("10.1/x", &ok, Some("downloads/x.pdf")),
            "✓ 10.1/x -> downloads/x.pdf (8 bytes)"
        );

        let failed = RetrievedArtifact::failed("10.1/y", "No available servers: no mirrors discovered");
        assert_eq!(
            format_download_line("10.1/y", &failed, None),
            "✗ 10.1/y: No available servers: no mirrors discovered"
        );
    }

    #[test]
    fn test_format_paper() {
        let paper = PaperBuilder::new("Deep learning", "https://doi.org/10.1038/nature14539")
            .authors("A; B; C; D")
            .year("2015")
            .venue("Nature")
            .build();

        let text = format_paper(1, &paper);
        assert!(text.starts_with("  1. Deep learning"));
        assert!(text.contains("A, B, C et al."));
        assert!(text.contains("2015 · Nature"));
        assert!(text.ends_with("https://doi.org/10.1038/nature14539"));
    }

    #[test]
    fn test_hidden_progress_bar() {
        let pb = create_progress_bar(3, "Downloading", true);
        pb.inc(1);
        assert!(pb.is_hidden());
    }
}
