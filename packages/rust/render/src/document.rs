//! Final document rendering (HTML page or Markdown file).

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use modbind_shared::{ModbindError, OutputFormat, Result};

use crate::assemble::{MergedContent, MergedNode};
use crate::cleanup;

/// Print stylesheet: every page break starts a new printed page.
const PRINT_CSS: &str = "\
body { font-family: sans-serif; max-width: 48rem; margin: 0 auto; padding: 1rem; line-height: 1.5; }
.pagebreak { border-top: 1px dashed #999; margin: 2rem 0; }
@media print {
  .pagebreak { border: 0; margin: 0; page-break-after: always; break-after: page; }
}";

/// Options for rendering a merged document.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Document title.
    pub title: String,
    pub format: OutputFormat,
    /// Timestamp recorded in the output.
    pub generated_at: DateTime<Utc>,
}

/// A rendered document ready to be written out.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub format: OutputFormat,
    pub body: String,
}

/// Render merged content in the requested format.
#[instrument(skip_all, fields(format = ?opts.format, nodes = merged.nodes().len()))]
pub fn render(merged: &MergedContent, opts: &RenderOptions) -> Result<RenderedDocument> {
    let body = match opts.format {
        OutputFormat::Html => render_html(merged, opts),
        OutputFormat::Markdown => render_markdown(merged, opts)?,
    };

    debug!(len = body.len(), "document rendered");

    Ok(RenderedDocument {
        format: opts.format,
        body,
    })
}

fn render_html(merged: &MergedContent, opts: &RenderOptions) -> String {
    let title = escape_html(&opts.title);
    let generated_at = opts.generated_at.to_rfc3339();

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"generator\" content=\"modbind\">\n\
         <meta name=\"generated-at\" content=\"{generated_at}\">\n\
         <title>{title}</title>\n\
         <style>\n{PRINT_CSS}\n</style>\n\
         </head>\n\
         <body>\n\
         <main>\n{}\n</main>\n\
         </body>\n\
         </html>\n",
        merged.inner_html()
    )
}

fn render_markdown(merged: &MergedContent, opts: &RenderOptions) -> Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
        .build();

    let mut sections = Vec::with_capacity(merged.nodes().len());
    for node in merged.nodes() {
        match node {
            MergedNode::Element(html) => {
                let md = converter.convert(html).map_err(|e| {
                    ModbindError::Conversion(format!("htmd conversion failed: {e}"))
                })?;
                if !md.trim().is_empty() {
                    sections.push(md);
                }
            }
            MergedNode::Separator => sections.push("---".to_string()),
        }
    }

    let frontmatter = format!(
        "---\ntitle: \"{}\"\ngenerated_at: \"{}\"\npages: {}\n---\n",
        escape_yaml_string(&opts.title),
        opts.generated_at.to_rfc3339(),
        merged.merged_documents()
    );

    Ok(format!(
        "{frontmatter}\n{}",
        cleanup::tidy(&sections.join("\n\n"))
    ))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use modbind_shared::RegionPolicy;

    use super::*;
    use crate::assemble::{PAGE_BREAK_HTML, assemble};

    fn merged() -> MergedContent {
        let docs = vec![
            "<main><h1>Week 1</h1><p>Hello &amp; welcome</p></main>".to_string(),
            "<main><h2>Week 2</h2></main>".to_string(),
        ];
        assemble(&docs, RegionPolicy::Fail).unwrap()
    }

    fn opts(format: OutputFormat) -> RenderOptions {
        RenderOptions {
            title: "Module <1>".into(),
            format,
            generated_at: Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn html_output_is_a_standalone_page() {
        let doc = render(&merged(), &opts(OutputFormat::Html)).unwrap();

        assert_eq!(doc.format, OutputFormat::Html);
        assert!(doc.body.starts_with("<!DOCTYPE html>"));
        assert!(doc.body.contains("<title>Module &lt;1&gt;</title>"));
        assert!(doc.body.contains("page-break-after: always"));
        assert!(doc.body.contains(PAGE_BREAK_HTML));
        assert!(doc.body.contains("2026-01-15T12:00:00+00:00"));

        let main_start = doc.body.find("<main>").unwrap();
        let week1 = doc.body.find("Week 1").unwrap();
        let week2 = doc.body.find("Week 2").unwrap();
        assert!(main_start < week1 && week1 < week2);
    }

    #[test]
    fn markdown_output_uses_thematic_breaks() {
        let doc = render(&merged(), &opts(OutputFormat::Markdown)).unwrap();

        assert!(doc.body.starts_with("---\ntitle: \"Module <1>\""));
        assert!(doc.body.contains("pages: 2"));
        assert!(doc.body.contains("# Week 1"));
        assert!(doc.body.contains("## Week 2"));

        let body = doc.body.split_once("---\n\n").map(|(_, b)| b).unwrap();
        let week1 = body.find("Week 1").unwrap();
        let brk = body.find("\n---\n").unwrap();
        let week2 = body.find("Week 2").unwrap();
        assert!(week1 < brk && brk < week2);
        assert!(body.ends_with('\n') && !body.ends_with("\n\n"));
    }

    #[test]
    fn yaml_title_is_escaped() {
        assert_eq!(escape_yaml_string(r#"a "quoted" \ title"#), r#"a \"quoted\" \\ title"#);
    }
}
