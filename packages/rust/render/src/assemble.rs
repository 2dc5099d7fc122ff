//! Fragment assembly: merge the `<main>` regions of many documents into one.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

use modbind_shared::{ModbindError, RegionPolicy, Result};

/// Markup inserted between the content of consecutive source documents.
pub const PAGE_BREAK_HTML: &str = r#"<div class="pagebreak"></div>"#;

/// One entry of the merged `<main>` region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergedNode {
    /// Serialized outer HTML of a child element of a source `<main>`.
    Element(String),
    /// Boundary between two source documents.
    Separator,
}

/// The combined `<main>` content of an ordered set of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedContent {
    nodes: Vec<MergedNode>,
    merged_documents: usize,
    skipped: Vec<usize>,
}

impl MergedContent {
    pub fn nodes(&self) -> &[MergedNode] {
        &self.nodes
    }

    /// Number of source documents whose content made it into the merge.
    pub fn merged_documents(&self) -> usize {
        self.merged_documents
    }

    /// Zero-based positions of documents dropped for lacking a `<main>` region.
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    /// Inner HTML of the merged `<main>` region.
    pub fn inner_html(&self) -> String {
        self.nodes
            .iter()
            .map(|node| match node {
                MergedNode::Element(html) => html.as_str(),
                MergedNode::Separator => PAGE_BREAK_HTML,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Merge the `<main>` regions of `documents`, in order.
///
/// Each document's immediate element children are appended in their original
/// order; a [`MergedNode::Separator`] goes between documents, never after the
/// last one. A document without `<main>` either fails the merge or is skipped
/// entirely, per `policy`.
#[instrument(skip_all, fields(documents = documents.len(), policy = ?policy))]
pub fn assemble(documents: &[String], policy: RegionPolicy) -> Result<MergedContent> {
    let main_sel = Selector::parse("main").expect("valid selector");
    let mut merged = MergedContent::default();

    for (position, text) in documents.iter().enumerate() {
        let doc = Html::parse_document(text);

        let Some(main) = doc.select(&main_sel).next() else {
            match policy {
                RegionPolicy::Fail => {
                    return Err(ModbindError::assembly(format!(
                        "document {} of {} has no <main> region",
                        position + 1,
                        documents.len()
                    )));
                }
                RegionPolicy::Skip => {
                    warn!(position, "document has no <main> region, skipping");
                    merged.skipped.push(position);
                    continue;
                }
            }
        };

        if merged.merged_documents > 0 {
            merged.nodes.push(MergedNode::Separator);
        }

        let before = merged.nodes.len();
        merged.nodes.extend(
            main.children()
                .filter_map(ElementRef::wrap)
                .map(|child| MergedNode::Element(child.html())),
        );
        merged.merged_documents += 1;

        debug!(position, children = merged.nodes.len() - before, "merged document");
    }

    info!(
        merged = merged.merged_documents,
        skipped = merged.skipped.len(),
        "assembly complete"
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn element_tags(merged: &MergedContent) -> Vec<String> {
        merged
            .nodes()
            .iter()
            .map(|node| match node {
                MergedNode::Element(html) => html.clone(),
                MergedNode::Separator => "|".to_string(),
            })
            .collect()
    }

    #[test]
    fn separator_goes_between_documents_only() {
        let docs = vec![
            "<html><body><main><p>a</p><p>b</p></main></body></html>".to_string(),
            "<html><body><main><p>c</p></main></body></html>".to_string(),
        ];

        let merged = assemble(&docs, RegionPolicy::Fail).unwrap();

        assert_eq!(
            merged.nodes(),
            &[
                MergedNode::Element("<p>a</p>".into()),
                MergedNode::Element("<p>b</p>".into()),
                MergedNode::Separator,
                MergedNode::Element("<p>c</p>".into()),
            ]
        );
        assert_eq!(merged.merged_documents(), 2);
    }

    #[test]
    fn single_document_has_no_separator() {
        let docs = vec!["<main><h1>Only</h1></main>".to_string()];
        let merged = assemble(&docs, RegionPolicy::Fail).unwrap();
        assert!(!merged.nodes().contains(&MergedNode::Separator));
        assert_eq!(merged.nodes().len(), 1);
    }

    #[test]
    fn only_immediate_element_children_move() {
        let docs = vec![
            "<main>loose text<section><p>nested</p></section><!-- note --><ul><li>x</li></ul></main>"
                .to_string(),
        ];
        let merged = assemble(&docs, RegionPolicy::Fail).unwrap();

        assert_eq!(
            element_tags(&merged),
            vec![
                "<section><p>nested</p></section>".to_string(),
                "<ul><li>x</li></ul>".to_string(),
            ]
        );
    }

    #[test]
    fn empty_input_merges_to_nothing() {
        let merged = assemble(&[], RegionPolicy::Fail).unwrap();
        assert!(merged.nodes().is_empty());
        assert_eq!(merged.inner_html(), "");
    }

    #[test]
    fn missing_main_fails_by_default() {
        let docs = vec![load_fixture("beeline-intro.html"), load_fixture("no-main.html")];
        let err = assemble(&docs, RegionPolicy::Fail).unwrap_err();
        assert!(matches!(err, ModbindError::Assembly { .. }));
        assert!(err.to_string().contains("document 2 of 2"));
    }

    #[test]
    fn skip_policy_drops_document_and_its_separator() {
        let docs = vec![
            load_fixture("no-main.html"),
            load_fixture("beeline-intro.html"),
            load_fixture("no-main.html"),
            load_fixture("beeline-summary.html"),
        ];

        let merged = assemble(&docs, RegionPolicy::Skip).unwrap();

        assert_eq!(merged.skipped(), &[0, 2]);
        assert_eq!(merged.merged_documents(), 2);
        let separators = merged
            .nodes()
            .iter()
            .filter(|n| **n == MergedNode::Separator)
            .count();
        assert_eq!(separators, 1);
        assert_ne!(merged.nodes().first(), Some(&MergedNode::Separator));
    }

    #[test]
    fn fixtures_merge_in_order() {
        let docs = vec![load_fixture("beeline-intro.html"), load_fixture("beeline-summary.html")];
        let merged = assemble(&docs, RegionPolicy::Fail).unwrap();

        let html = merged.inner_html();
        let intro = html.find("Introduction").expect("intro heading");
        let brk = html.find(PAGE_BREAK_HTML).expect("page break");
        let summary = html.find("Summary").expect("summary heading");
        assert!(intro < brk && brk < summary);
        assert!(!html.contains("Alternative format"));
        assert!(!html.ends_with(PAGE_BREAK_HTML));
    }
}
