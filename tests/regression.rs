//! Regression tests for layout bugs found while paginating real chapters.

use mu_chapter::{
    Alignment, ChapterConfig, ChapterParser, FixedWidthMetrics, MarkupMode, Page, TextBlock,
};

fn run(config: ChapterConfig, html: &str) -> Vec<Page> {
    let metrics = FixedWidthMetrics::default();
    let mut pages = Vec::new();
    ChapterParser::new(config, &metrics)
        .parse_bytes(html.as_bytes(), |page| pages.push(page))
        .expect("parse failed");
    pages
}

fn lines(pages: &[Page]) -> Vec<TextBlock> {
    pages
        .iter()
        .flat_map(|page| page.lines().map(|line| line.block.clone()))
        .collect()
}

#[test]
fn test_blockquote_page_break_marker_does_not_unbalance_indent() {
    // A pagebreak marker on a blockquote is skipped whole; its close must
    // not pop a blockquote level that was never pushed.
    let pages = run(
        ChapterConfig::default(),
        "<html><body><blockquote><blockquote epub:type=\"pagebreak\">12</blockquote><p>quoted</p></blockquote><p>after</p></body></html>",
    );
    let layout: Vec<(String, u16)> = lines(&pages)
        .iter()
        .map(|b| (b.text(), b.left_margin()))
        .collect();
    assert_eq!(
        layout,
        vec![("quoted".to_string(), 32), ("after".to_string(), 0)]
    );
}

#[test]
fn test_list_margin_does_not_leak_into_next_paragraph() {
    let pages = run(
        ChapterConfig::default(),
        "<html><body><ul><li>item</li></ul><p>plain</p></body></html>",
    );
    let blocks = lines(&pages);
    assert_eq!(blocks[1].text(), "plain");
    assert_eq!(blocks[1].left_margin(), 0);
    assert!(!blocks[1].is_blockquote());
}

#[test]
fn test_word_split_by_inline_tag_stays_whole() {
    let pages = run(
        ChapterConfig::default(),
        "<html><body><p>un<b>believ</b>able</p></body></html>",
    );
    assert_eq!(lines(&pages)[0].words(), ["unbelievable"]);
}

#[test]
fn test_trailing_text_without_paragraph_close() {
    let pages = run(
        ChapterConfig::default(),
        "<html><body>loose text<div>next</div>tail</body></html>",
    );
    let texts: Vec<String> = lines(&pages).iter().map(|b| b.text()).collect();
    assert_eq!(texts, vec!["loose text", "next", "tail"]);
}

#[test]
fn test_body_without_text_still_emits_page() {
    let pages = run(
        ChapterConfig::default(),
        "<html><head><title>Only a title</title></head><body></body></html>",
    );
    assert_eq!(pages.len(), 1);
    assert!(pages[0].is_empty());
}

#[test]
fn test_uppercase_tags_recognized() {
    let pages = run(
        ChapterConfig::default(),
        "<HTML><BODY><H1>Title</H1><P>Body</P></BODY></HTML>",
    );
    let blocks = lines(&pages);
    assert_eq!(blocks[0].alignment(), Alignment::Center);
    assert_eq!(blocks[1].text(), "Body");
}

#[test]
fn test_legacy_mode_ignores_structure() {
    let config = ChapterConfig::default().with_markup_mode(MarkupMode::Legacy);
    let pages = run(
        config,
        "<html><body><ol><li>first</li></ol><table><tr><td>cell</td></tr></table><hr/><p>end</p></body></html>",
    );
    let texts: Vec<String> = lines(&pages).iter().map(|b| b.text()).collect();
    assert_eq!(texts, vec!["first", "end"]);
    assert!(lines(&pages).iter().all(|b| b.left_margin() == 0));
}

#[test]
fn test_heading_after_long_paragraph_starts_fresh_line() {
    let text = "word ".repeat(760);
    let html = format!(
        "<html><body><p>{}</p><h2>Next</h2></body></html>",
        text
    );
    let pages = run(ChapterConfig::default(), &html);
    let blocks = lines(&pages);
    let last = blocks.last().expect("heading line");
    assert_eq!(last.words(), ["Next"]);
    assert_eq!(last.alignment(), Alignment::Center);
    let words: usize = blocks[..blocks.len() - 1]
        .iter()
        .map(|b| b.word_count())
        .sum();
    assert_eq!(words, 760);
}
