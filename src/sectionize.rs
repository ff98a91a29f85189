// Best-effort sectionizer for model output that did not parse as JSON.
//
// Precedence, first match wins:
// 1. A line starting at column 0 with `\d+.`, `##`/`###` or `**` opens a
//    new fragment; its first line is classified as a header:
//    `\d+.` → MainHeading, `##` → SubHeading, `**Title**` or an unclosed
//    `**Title` → SubHeading, `**Label:** more text` → EmphasisLine.
// 2. Every other non-blank line is classified on its own, trimmed:
//    `-`/`•` → BulletItem, `**…**` on one line → EmphasisLine, else
//    Paragraph.
// Blocks whose text is empty after stripping markers are dropped.
use crate::types::Block;
use once_cell::sync::Lazy;
use regex::Regex;

static BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+\.|#{2,3}|\*\*)").expect("boundary pattern is valid"));
static MAIN_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.").expect("heading pattern is valid"));

/// Split free text into typed blocks. Never fails; `""` yields no blocks.
pub fn sectionize(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    for fragment in split_fragments(text) {
        classify_fragment(&fragment, &mut blocks);
    }
    blocks
}

/// Concatenate the stored text of each block, one per line.
pub fn blocks_to_text(blocks: &[Block]) -> String {
    blocks.iter().map(Block::text).collect::<Vec<_>>().join("\n")
}

fn split_fragments(text: &str) -> Vec<Vec<&str>> {
    let mut fragments: Vec<Vec<&str>> = Vec::new();
    for line in text.lines() {
        if fragments.is_empty() || BOUNDARY.is_match(line) {
            fragments.push(Vec::new());
        }
        if let Some(current) = fragments.last_mut() {
            current.push(line);
        }
    }
    fragments.retain(|lines| lines.iter().any(|l| !l.trim().is_empty()));
    fragments
}

fn classify_fragment(lines: &[&str], out: &mut Vec<Block>) {
    let Some((first, rest)) = lines.split_first() else {
        return;
    };
    let body = if BOUNDARY.is_match(first) {
        if let Some(header) = classify_header(first) {
            push_block(out, header);
        }
        rest
    } else {
        lines
    };
    for line in body {
        if let Some(block) = classify_line(line) {
            push_block(out, block);
        }
    }
}

fn push_block(out: &mut Vec<Block>, block: Block) {
    if !block.text().is_empty() {
        out.push(block);
    }
}

fn classify_header(line: &str) -> Option<Block> {
    let line = line.trim_end();
    if let Some(m) = MAIN_HEADING.find(line) {
        return Some(Block::MainHeading(strip_bold(&line[m.end()..])));
    }
    if line.starts_with("##") {
        let inner = line.trim_start_matches('#').trim_end_matches('#');
        return Some(Block::SubHeading(strip_bold(inner)));
    }
    let inner = line.strip_prefix("**")?;
    let block = match inner.find("**") {
        Some(close) if !inner[close + 2..].trim().is_empty() => {
            Block::EmphasisLine(line.replace("**", "").trim().to_string())
        }
        _ => Block::SubHeading(strip_bold(line)),
    };
    Some(block)
}

fn classify_line(line: &str) -> Option<Block> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(rest) = trimmed.strip_prefix('-').or_else(|| trimmed.strip_prefix('•')) {
        return Some(Block::BulletItem(rest.trim_start().to_string()));
    }
    if trimmed.len() >= 4 && trimmed.starts_with("**") && trimmed.ends_with("**") {
        return Some(Block::EmphasisLine(trimmed.replace("**", "").trim().to_string()));
    }
    Some(Block::Paragraph(trimmed.to_string()))
}

fn strip_bold(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_prefix("**").unwrap_or(s);
    let s = s.strip_suffix("**").unwrap_or(s);
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Block::*;

    fn owned(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn sectionizes_numbered_report() {
        let text = "1. Executive Summary\nSome intro.\n- Point A\n- Point B\n2. Cost Analysis\n**Note:** watch costs";
        assert_eq!(
            sectionize(text),
            vec![
                MainHeading(owned("Executive Summary")),
                Paragraph(owned("Some intro.")),
                BulletItem(owned("Point A")),
                BulletItem(owned("Point B")),
                MainHeading(owned("Cost Analysis")),
                EmphasisLine(owned("Note: watch costs")),
            ]
        );
    }

    #[test]
    fn empty_and_blank_input() {
        assert!(sectionize("").is_empty());
        assert!(sectionize("   \n\n\t\n").is_empty());
    }

    #[test]
    fn unmarked_text_is_paragraphs() {
        let blocks = sectionize("First line.\n\nSecond line.");
        assert_eq!(blocks, vec![Paragraph(owned("First line.")), Paragraph(owned("Second line."))]);
    }

    #[test]
    fn markdown_headers_are_subheadings() {
        let blocks = sectionize("## Foundation\n### **Roofing**\n**Insulation**\nbody");
        assert_eq!(
            blocks,
            vec![
                SubHeading(owned("Foundation")),
                SubHeading(owned("Roofing")),
                SubHeading(owned("Insulation")),
                Paragraph(owned("body")),
            ]
        );
    }

    #[test]
    fn emphasis_needs_both_delimiters_on_the_line() {
        let blocks = sectionize("intro\n  **Key point**\n  **dangling bold\n• Dot bullet");
        assert_eq!(
            blocks,
            vec![
                Paragraph(owned("intro")),
                EmphasisLine(owned("Key point")),
                Paragraph(owned("**dangling bold")),
                BulletItem(owned("Dot bullet")),
            ]
        );
    }

    #[test]
    fn unclosed_bold_header_is_subheading() {
        assert_eq!(sectionize("**Materials"), vec![SubHeading(owned("Materials"))]);
    }

    #[test]
    fn header_with_no_text_is_dropped() {
        let blocks = sectionize("1.\nStill here\n##\n-\n****");
        assert_eq!(blocks, vec![Paragraph(owned("Still here"))]);
    }

    #[test]
    fn crlf_line_endings() {
        let blocks = sectionize("1. Cost\r\n- Labour\r\n");
        assert_eq!(blocks, vec![MainHeading(owned("Cost")), BulletItem(owned("Labour"))]);
    }

    #[test]
    fn bold_numbered_heading_is_unwrapped() {
        assert_eq!(
            sectionize("3. **Environmental Impact**"),
            vec![MainHeading(owned("Environmental Impact"))]
        );
    }

    #[test]
    fn never_yields_empty_text() {
        let inputs = [
            "**", "****", "##", "###", "1.", "-", "•", "- \n• \n", "** **", "12.\n\n**\n",
            "## **\n", "**a**b**", "\u{feff}", "9999999999999999999999.", "- - -",
        ];
        for input in inputs {
            for block in sectionize(input) {
                assert!(!block.text().is_empty(), "empty block from {:?}", input);
            }
        }
    }

    #[test]
    fn joiner_keeps_non_marker_text() {
        let text = "1. Executive Summary\nUse fly-ash bricks.\n- Cost ₹4,500 per m³\n**Note:** check IS 456\n## Roofing\n• Clay tiles";
        let joined = blocks_to_text(&sectionize(text));
        for word in [
            "Executive", "Summary", "Use", "fly-ash", "bricks.", "Cost", "₹4,500", "m³", "Note:",
            "check", "IS", "456", "Roofing", "Clay", "tiles",
        ] {
            assert!(joined.contains(word), "lost {:?} in {:?}", word, joined);
        }
        assert!(!joined.contains("**"));
    }
}
