//! Display tree produced by the renderer and consumed by the painters.
//!
//! The tree is flat enough to paint in one pass: sections hold leaf nodes,
//! never other sections.
use serde::Serialize;

/// Accent colour of a group. Each tone maps to one fixed set of classes in
/// the print stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Blue,
    Green,
    Orange,
    Purple,
    Gray,
    Yellow,
}

impl Tone {
    pub const ALL: [Tone; 6] = [Tone::Blue, Tone::Green, Tone::Orange, Tone::Purple, Tone::Gray, Tone::Yellow];

    pub fn class(self) -> &'static str {
        match self {
            Tone::Blue => "tone-blue",
            Tone::Green => "tone-green",
            Tone::Orange => "tone-orange",
            Tone::Purple => "tone-purple",
            Tone::Gray => "tone-gray",
            Tone::Yellow => "tone-yellow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: String,
    pub value: String,
}

impl Field {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Field { label: label.into(), value: value.into() }
    }
}

/// A material or combination card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Card {
    pub title: String,
    pub subtitle: Option<String>,
    pub price: Option<String>,
    pub fields: Vec<Field>,
    pub bullets: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Section { title: String, tone: Tone, children: Vec<Node> },
    /// Sub-section caption inside a section.
    Label { text: String },
    Text { text: String, strong: bool },
    List { items: Vec<String> },
    Fields { rows: Vec<Field> },
    /// Highlight tiles (headline numbers).
    Stats { items: Vec<Field> },
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
    Cards { cards: Vec<Card> },
    Tags { items: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub title: String,
    pub subtitle: String,
    pub compliance: String,
    pub generated_on: Option<String>,
}

/// Everything the renderer produces for one report.
///
/// `Default` is the empty document rendered for unusable input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisualDocument {
    pub header: Option<Header>,
    pub project: Vec<Field>,
    /// Long-form project answers shown under the field grid.
    pub project_notes: Vec<Field>,
    pub body: Vec<Node>,
    pub notes: Vec<String>,
    pub footer: Option<String>,
}

impl VisualDocument {
    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.body.is_empty()
    }

    /// Titles of the top-level sections, in order.
    pub fn section_titles(&self) -> Vec<&str> {
        self.body
            .iter()
            .filter_map(|node| match node {
                Node::Section { title, .. } => Some(title.as_str()),
                _ => None,
            })
            .collect()
    }
}
