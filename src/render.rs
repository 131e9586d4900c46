//! Report rendering: HTML email body and Markdown archive section. Only
//! published items appear in rendered output; the email also carries a short
//! run summary so a partially-failed run reads as normal, not broken.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::report::RunReport;

pub fn email_subject(report: &RunReport) -> String {
    format!(
        "[{}] Market watcher: {} new brief(s)",
        report.started_at.format("%Y-%m-%d"),
        report.published_count()
    )
}

pub fn email_html(report: &RunReport) -> String {
    let mut html = String::new();
    html.push_str(
        "<html><body style=\"font-family: -apple-system, 'Segoe UI', sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto;\">\n",
    );
    html.push_str(
        "<h1 style=\"color: #0366d6; border-bottom: 2px solid #eaecef; padding-bottom: 10px;\">Market Watcher</h1>\n",
    );
    html.push_str(&format!(
        "<p><strong>Run:</strong> {} UTC<br><strong>Published:</strong> {} / <strong>Skipped duplicates:</strong> {} / <strong>Failed:</strong> {}</p>\n",
        report.started_at.format("%Y-%m-%d %H:%M"),
        report.published_count(),
        report.skipped_count(),
        report.failed_count(),
    ));

    for item in report.published() {
        let Some(result) = &item.result else { continue };
        html.push_str(&format!(
            "<h2 style=\"color: #24292e; background-color: #f6f8fa; padding: 5px 10px; border-radius: 5px;\">{}</h2>\n",
            encode_text(&item.keyword)
        ));
        html.push_str(&format!(
            "<p><a href=\"{}\" style=\"color: #0366d6; font-weight: bold; text-decoration: none;\">{}</a></p>\n",
            encode_double_quoted_attribute(&result.item.url),
            encode_text(&result.item.title)
        ));
        if let Some(img) = &result.image_url {
            html.push_str(&format!(
                "<p><img src=\"{}\" alt=\"generated illustration\" style=\"max-width: 100%; border-radius: 5px;\"></p>\n",
                encode_double_quoted_attribute(img)
            ));
        }
        for variant in result.variants.values() {
            html.push_str(&format!(
                "<h3 style=\"color: #1a73e8; margin-bottom: 4px;\">{}</h3>\n",
                encode_text(&variant.style)
            ));
            for para in variant.body.split("\n\n") {
                html.push_str(&format!("<p>{}</p>\n", encode_text(para.trim())));
            }
        }
    }

    html.push_str(
        "<div style=\"margin-top: 30px; font-size: 12px; color: #6a737d; border-top: 1px solid #eaecef; padding-top: 10px;\">This report was generated automatically.</div>\n",
    );
    html.push_str("</body></html>\n");
    html
}

/// Dated Markdown section for the archive file, newest runs stacked on top by
/// the archive writer.
pub fn archive_section(report: &RunReport) -> String {
    let mut md = format!("## {}\n\n", report.started_at.format("%Y-%m-%d"));
    for item in report.published() {
        let Some(result) = &item.result else { continue };
        md.push_str(&format!("### {}\n", item.keyword));
        md.push_str(&format!("- [{}]({})\n", result.item.title, result.item.url));
        if let Some(img) = &result.image_url {
            md.push_str(&format!("- ![illustration]({img})\n"));
        }
        md.push('\n');
        for variant in result.variants.values() {
            md.push_str(&format!("**{}**\n\n{}\n\n", variant.style, variant.body));
        }
    }
    md.push_str("---\n\n");
    md
}
