// Painters: the last step of rendering. Each one walks a `VisualDocument`
// and writes it out in a single format; none of them decide what goes
// into the report.
use crate::error::Result;
use crate::visual::{Card, Field, Node, VisualDocument};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub const PROJECT_HEADING: &str = "PROJECT INFORMATION";
pub const NOTES_HEADING: &str = "Important Notes for Indian Projects:";

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Escape text for HTML.
pub fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Paint the display fragment. The print and raster exports embed this
/// exact markup, so on-screen and exported output cannot drift apart.
pub fn paint_html(doc: &VisualDocument) -> String {
    let mut buf = String::with_capacity(16 * 1024);
    buf.push_str("<div class=\"report\">");
    if let Some(header) = &doc.header {
        let _ = write!(
            buf,
            "<header class=\"report-header\"><h1>{}</h1><p class=\"subtitle\">{}</p><p class=\"compliance\">{}</p>",
            esc(&header.title),
            esc(&header.subtitle),
            esc(&header.compliance)
        );
        if let Some(date) = &header.generated_on {
            let _ = write!(buf, "<div class=\"stamp\">Generated on: {}</div>", esc(date));
        }
        buf.push_str("</header>");
    }
    if !doc.project.is_empty() || !doc.project_notes.is_empty() {
        let _ = write!(buf, "<section class=\"project\"><h2>{}</h2>", esc(PROJECT_HEADING));
        html_fields(&mut buf, &doc.project);
        for note in &doc.project_notes {
            let _ = write!(
                buf,
                "<div class=\"project-note\"><strong>{}:</strong><p>{}</p></div>",
                esc(&note.label),
                esc(&note.value)
            );
        }
        buf.push_str("</section>");
    }
    for node in &doc.body {
        html_node(&mut buf, node);
    }
    if !doc.notes.is_empty() {
        let _ = write!(buf, "<aside class=\"notes tone-yellow\"><h4>{}</h4>", esc(NOTES_HEADING));
        html_list(&mut buf, &doc.notes);
        buf.push_str("</aside>");
    }
    if let Some(footer) = &doc.footer {
        let _ = write!(buf, "<footer class=\"footer\">{}</footer>", esc(footer));
    }
    buf.push_str("</div>");
    buf
}

fn html_node(buf: &mut String, node: &Node) {
    match node {
        Node::Section { title, tone, children } => {
            let _ = write!(buf, "<section class=\"section {}\"><h2>{}</h2>", tone.class(), esc(title));
            for child in children {
                html_node(buf, child);
            }
            buf.push_str("</section>");
        }
        Node::Label { text } => {
            let _ = write!(buf, "<h3 class=\"label\">{}</h3>", esc(text));
        }
        Node::Text { text, strong } => {
            let class = if *strong { "text strong" } else { "text" };
            let _ = write!(buf, "<p class=\"{}\">{}</p>", class, esc(text));
        }
        Node::List { items } => html_list(buf, items),
        Node::Fields { rows } => html_fields(buf, rows),
        Node::Stats { items } => {
            buf.push_str("<div class=\"stats\">");
            for item in items {
                let _ = write!(
                    buf,
                    "<div class=\"stat\"><h4 class=\"stat-label\">{}</h4><p class=\"stat-value\">{}</p></div>",
                    esc(&item.label),
                    esc(&item.value)
                );
            }
            buf.push_str("</div>");
        }
        Node::Table { headers, rows } => {
            buf.push_str("<table class=\"table\"><thead><tr>");
            for h in headers {
                let _ = write!(buf, "<th>{}</th>", esc(h));
            }
            buf.push_str("</tr></thead><tbody>");
            for row in rows {
                buf.push_str("<tr>");
                for cell in row {
                    let _ = write!(buf, "<td>{}</td>", esc(cell));
                }
                buf.push_str("</tr>");
            }
            buf.push_str("</tbody></table>");
        }
        Node::Cards { cards } => {
            buf.push_str("<div class=\"cards\">");
            for card in cards {
                html_card(buf, card);
            }
            buf.push_str("</div>");
        }
        Node::Tags { items } => html_tags(buf, items),
    }
}

fn html_card(buf: &mut String, card: &Card) {
    let _ = write!(buf, "<div class=\"card\"><h4 class=\"card-title\">{}</h4>", esc(&card.title));
    if let Some(subtitle) = &card.subtitle {
        let _ = write!(buf, "<p class=\"card-subtitle\">{}</p>", esc(subtitle));
    }
    if let Some(price) = &card.price {
        let _ = write!(buf, "<p class=\"card-price\">{}</p>", esc(price));
    }
    if !card.bullets.is_empty() {
        html_list(buf, &card.bullets);
    }
    if !card.tags.is_empty() {
        html_tags(buf, &card.tags);
    }
    if !card.fields.is_empty() {
        html_fields(buf, &card.fields);
    }
    buf.push_str("</div>");
}

fn html_list(buf: &mut String, items: &[String]) {
    buf.push_str("<ul class=\"list\">");
    for item in items {
        let _ = write!(buf, "<li>{}</li>", esc(item));
    }
    buf.push_str("</ul>");
}

fn html_tags(buf: &mut String, items: &[String]) {
    buf.push_str("<div class=\"tags\">");
    for item in items {
        let _ = write!(buf, "<span class=\"tag\">{}</span>", esc(item));
    }
    buf.push_str("</div>");
}

fn html_fields(buf: &mut String, rows: &[Field]) {
    buf.push_str("<dl class=\"fields\">");
    for row in rows {
        let _ = write!(
            buf,
            "<div><dt class=\"field-label\">{}:</dt><dd class=\"field-value\">{}</dd></div>",
            esc(&row.label),
            esc(&row.value)
        );
    }
    buf.push_str("</dl>");
}

#[derive(Tabled, Clone)]
struct FieldRow {
    #[tabled(rename = "Field")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn field_table(rows: &[Field]) -> String {
    let rows: Vec<FieldRow> = rows
        .iter()
        .map(|f| FieldRow { label: f.label.clone(), value: f.value.clone() })
        .collect();
    Table::new(rows).with(Style::markdown()).to_string()
}

/// Paint the document for a terminal. Field groups and tables are drawn
/// as markdown tables.
pub fn paint_text(doc: &VisualDocument) -> String {
    let mut buf = String::new();
    if let Some(header) = &doc.header {
        let _ = writeln!(buf, "{}", header.title);
        let _ = writeln!(buf, "{}", header.subtitle);
        let _ = writeln!(buf, "{}", header.compliance);
        if let Some(date) = &header.generated_on {
            let _ = writeln!(buf, "Generated on: {}", date);
        }
        buf.push('\n');
    }
    if !doc.project.is_empty() {
        let _ = writeln!(buf, "{}\n", PROJECT_HEADING);
        let _ = writeln!(buf, "{}\n", field_table(&doc.project));
        for note in &doc.project_notes {
            let _ = writeln!(buf, "{}: {}\n", note.label, note.value);
        }
    }
    for node in &doc.body {
        text_node(&mut buf, node);
    }
    if !doc.notes.is_empty() {
        let _ = writeln!(buf, "{}", NOTES_HEADING);
        for note in &doc.notes {
            let _ = writeln!(buf, "  • {}", note);
        }
        buf.push('\n');
    }
    if let Some(footer) = &doc.footer {
        let _ = writeln!(buf, "{}", footer);
    }
    buf
}

fn text_node(buf: &mut String, node: &Node) {
    match node {
        Node::Section { title, children, .. } => {
            let _ = writeln!(buf, "{}\n{}\n", title.to_uppercase(), "=".repeat(title.chars().count()));
            for child in children {
                text_node(buf, child);
            }
        }
        Node::Label { text } => {
            let _ = writeln!(buf, "{}", text);
            let _ = writeln!(buf, "{}", "-".repeat(text.chars().count()));
        }
        Node::Text { text, strong } => {
            if *strong {
                let _ = writeln!(buf, "{}\n", text.to_uppercase());
            } else {
                let _ = writeln!(buf, "{}\n", text);
            }
        }
        Node::List { items } => {
            for item in items {
                let _ = writeln!(buf, "  • {}", item);
            }
            buf.push('\n');
        }
        Node::Fields { rows } | Node::Stats { items: rows } => {
            let _ = writeln!(buf, "{}\n", field_table(rows));
        }
        Node::Table { headers, rows } => {
            let mut builder = Builder::default();
            builder.push_record(headers.iter().cloned());
            for row in rows {
                builder.push_record(row.iter().cloned());
            }
            let mut table = builder.build();
            table.with(Style::markdown());
            let _ = writeln!(buf, "{}\n", table);
        }
        Node::Cards { cards } => {
            for card in cards {
                text_card(buf, card);
            }
        }
        Node::Tags { items } => {
            let _ = writeln!(buf, "[{}]\n", items.join("] ["));
        }
    }
}

fn text_card(buf: &mut String, card: &Card) {
    let _ = writeln!(buf, "* {}", card.title);
    if let Some(subtitle) = &card.subtitle {
        let _ = writeln!(buf, "  {}", subtitle);
    }
    if let Some(price) = &card.price {
        let _ = writeln!(buf, "  {}", price);
    }
    for bullet in &card.bullets {
        let _ = writeln!(buf, "    - {}", bullet);
    }
    if !card.tags.is_empty() {
        let _ = writeln!(buf, "  [{}]", card.tags.join("] ["));
    }
    for field in &card.fields {
        let _ = writeln!(buf, "  {}: {}", field.label, field.value);
    }
    buf.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::{Header, Tone};

    fn sample() -> VisualDocument {
        VisualDocument {
            header: Some(Header {
                title: "REPORT".into(),
                subtitle: "Sub".into(),
                compliance: "NBC".into(),
                generated_on: Some("05 March 2025".into()),
            }),
            project: vec![Field::new("Location", "Pune <MH>")],
            project_notes: vec![],
            body: vec![Node::Section {
                title: "Cost Analysis".into(),
                tone: Tone::Orange,
                children: vec![
                    Node::Table {
                        headers: vec!["Item".into(), "Cost".into()],
                        rows: vec![vec!["Foundation".into(), "₹3,50,000".into()]],
                    },
                    Node::List { items: vec!["A & B".into()] },
                ],
            }],
            notes: vec!["Verify codes".into()],
            footer: Some("footer".into()),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(esc("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
    }

    #[test]
    fn html_contains_sections_and_escaped_text() {
        let html = paint_html(&sample());
        assert!(html.starts_with("<div class=\"report\">"));
        assert!(html.contains("<section class=\"section tone-orange\"><h2>Cost Analysis</h2>"));
        assert!(html.contains("<td>₹3,50,000</td>"));
        assert!(html.contains("Pune &lt;MH&gt;"));
        assert!(html.contains("<li>A &amp; B</li>"));
        assert!(html.contains("Generated on: 05 March 2025"));
    }

    #[test]
    fn empty_document_paints_bare_container() {
        assert_eq!(paint_html(&VisualDocument::default()), "<div class=\"report\"></div>");
        assert_eq!(paint_text(&VisualDocument::default()), "");
    }

    #[test]
    fn text_painter_draws_tables() {
        let text = paint_text(&sample());
        assert!(text.contains("COST ANALYSIS"));
        assert!(text.contains("| Foundation | ₹3,50,000 |"));
        assert!(text.contains("| Location | Pune <MH> |"));
        assert!(text.contains("  • A & B"));
    }

    #[test]
    fn writes_json_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_json(&path, &sample()).unwrap();
        let back: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["body"][0]["kind"], "section");
        assert_eq!(back["body"][0]["tone"], "orange");
    }
}
