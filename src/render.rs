use crate::normalize::normalize;
use crate::sectionize::sectionize;
use crate::types::{
    category_title, labels, Block, Fact, MaterialCombination, MaterialEntry, ProjectData, RawReport,
    SectionKind, SectionRef, StructuredReport,
};
use crate::util::{format_number, format_report_date, humanize_key};
use crate::visual::{Card, Field, Header, Node, Tone, VisualDocument};
use chrono::NaiveDate;
use log::debug;

pub const REPORT_TITLE: &str = "BUILDING MATERIAL ANALYSIS REPORT";
pub const REPORT_SUBTITLE: &str = "Professional Material Selection & Analysis";
pub const COMPLIANCE_LINE: &str = "Compliant with NBC 2016, IS Codes, and Indian Climate Conditions";
pub const PRODUCT_NAME: &str = "AI-Powered Building Material Selector";
const NOT_AVAILABLE: &str = "N/A";

const ADVISORY_NOTES: [&str; 6] = [
    "This analysis is based on Indian building standards (NBC 2016) and provided requirements",
    "Local building codes and state-specific regulations should be verified independently",
    "Material prices are indicative and may vary by location, season, and market conditions",
    "Consider monsoon timing for material procurement and construction scheduling",
    "Professional consultation with licensed Indian engineers is recommended for final decisions",
    "Verify seismic zone requirements and local authority approvals",
];

/// Inputs to rendering that are not part of the report itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Date stamped in the header and footer.
    pub generated_on: Option<NaiveDate>,
}

/// Render a report and its project answers into a display tree.
///
/// Pure: the same inputs always give the same tree. Unusable input
/// (`RawReport::Empty`) gives an empty document rather than an error.
pub fn render(raw: &RawReport, project: &ProjectData, options: &RenderOptions) -> VisualDocument {
    let body = match raw {
        RawReport::Empty => {
            debug!("nothing to render");
            return VisualDocument::default();
        }
        RawReport::Structured(report) => render_structured(report),
        RawReport::Unstructured(text) => render_blocks(&sectionize(text)),
    };
    let date = options.generated_on.map(format_report_date);
    let footer = match &date {
        Some(d) => format!("Report generated on {} | {}", d, PRODUCT_NAME),
        None => PRODUCT_NAME.to_string(),
    };
    VisualDocument {
        header: Some(Header {
            title: REPORT_TITLE.to_string(),
            subtitle: REPORT_SUBTITLE.to_string(),
            compliance: COMPLIANCE_LINE.to_string(),
            generated_on: date,
        }),
        project: project_fields(project),
        project_notes: project_notes(project),
        body,
        notes: ADVISORY_NOTES.iter().map(|n| n.to_string()).collect(),
        footer: Some(footer),
    }
}

/// The block sequence behind a report: normalized sections for structured
/// reports, sectionized text otherwise.
pub fn outline(raw: &RawReport) -> Vec<Block> {
    match raw {
        RawReport::Structured(report) => normalize(report),
        RawReport::Unstructured(text) => sectionize(text),
        RawReport::Empty => Vec::new(),
    }
}

fn project_fields(project: &ProjectData) -> Vec<Field> {
    let or_na = |v: Option<String>| v.unwrap_or_else(|| NOT_AVAILABLE.to_string());
    vec![
        Field::new("Project Type", or_na(project.project_type_label())),
        Field::new("Climate Zone", or_na(project.climate_label())),
        Field::new("Budget Range", or_na(project.budget_label())),
        Field::new(
            "Project Area",
            or_na(project.area.map(|a| format!("{} sq ft", format_number(a, 3)))),
        ),
        Field::new(
            "Expected Budget",
            or_na(project.expected_budget.map(|b| format!("₹{}", format_number(b, 3)))),
        ),
        Field::new("Duration", or_na(project.duration.clone())),
        Field::new("Location", or_na(project.location.clone())),
        Field::new("Sustainability Goals", or_na(project.sustainability_goals.clone())),
    ]
}

fn project_notes(project: &ProjectData) -> Vec<Field> {
    let mut out = Vec::new();
    if let Some(s) = &project.structural_requirements {
        out.push(Field::new("Structural Requirements", s.clone()));
    }
    if let Some(s) = &project.additional_constraints {
        out.push(Field::new("Additional Constraints", s.clone()));
    }
    out
}

fn section_tone(kind: SectionKind) -> Tone {
    match kind {
        SectionKind::ExecutiveSummary => Tone::Blue,
        SectionKind::RecommendedMaterials => Tone::Green,
        SectionKind::CostAnalysis => Tone::Orange,
        SectionKind::EnvironmentalImpact => Tone::Green,
        SectionKind::DurabilityMaintenance => Tone::Purple,
        SectionKind::LocalConsiderations => Tone::Gray,
        SectionKind::ProcurementTimeline => Tone::Orange,
        SectionKind::ProfessionalRecommendations => Tone::Blue,
    }
}

fn render_structured(report: &StructuredReport) -> Vec<Node> {
    report
        .sections()
        .into_iter()
        .map(|section| {
            let kind = section.kind();
            Node::Section {
                title: kind.title().to_string(),
                tone: section_tone(kind),
                children: section_children(section),
            }
        })
        .collect()
}

fn section_children(section: SectionRef<'_>) -> Vec<Node> {
    let mut out = Vec::new();
    match section {
        SectionRef::ExecutiveSummary(s) => {
            push_stats(&mut out, s.facts());
            push_lists(&mut out, s.lists());
        }
        SectionRef::RecommendedMaterials(categories) => {
            for (category, entries) in categories {
                out.push(Node::Label { text: category_title(category) });
                out.push(Node::Cards { cards: entries.iter().map(material_card).collect() });
            }
        }
        SectionRef::CostAnalysis(c) => {
            if !c.material_costs.is_empty() {
                out.push(Node::Label { text: labels::MATERIAL_COSTS.to_string() });
                out.push(Node::Table {
                    headers: vec![labels::ITEM.to_string(), labels::COST.to_string()],
                    rows: c
                        .material_costs
                        .iter()
                        .map(|(item, cost)| vec![humanize_key(item), cost.clone()])
                        .collect(),
                });
            }
            let additional = c.additional();
            if !additional.is_empty() {
                out.push(Node::Label { text: labels::ADDITIONAL_COSTS.to_string() });
                push_fields(&mut out, additional);
            }
            if let Some(total) = &c.total_project_cost {
                out.push(Node::Stats { items: vec![Field::new(labels::TOTAL_PROJECT_COST, total.clone())] });
            }
        }
        SectionRef::EnvironmentalImpact(s) => {
            push_fields(&mut out, s.facts());
            push_lists(&mut out, s.lists());
        }
        SectionRef::DurabilityMaintenance(s) => {
            push_fields(&mut out, s.facts());
            push_lists(&mut out, s.lists());
        }
        SectionRef::LocalConsiderations(s) => {
            push_fields(&mut out, s.facts());
            if !s.compliance_codes.is_empty() {
                out.push(Node::Label { text: labels::COMPLIANCE_CODES.to_string() });
                out.push(Node::Tags { items: s.compliance_codes.clone() });
            }
            push_lists(&mut out, s.lists());
        }
        SectionRef::ProcurementTimeline(t) => {
            if !t.phases.is_empty() {
                out.push(Node::Table {
                    headers: vec![labels::PHASE.to_string(), labels::LEAD_TIME.to_string()],
                    rows: t
                        .phases
                        .iter()
                        .map(|(phase, lead)| vec![humanize_key(phase), lead.clone()])
                        .collect(),
                });
            }
            if let Some(note) = &t.monsoon_considerations {
                out.push(Node::Text {
                    text: format!("{}: {}", labels::MONSOON_CONSIDERATIONS, note),
                    strong: true,
                });
            }
        }
        SectionRef::ProfessionalRecommendations(p) => {
            if !p.top_combinations.is_empty() {
                out.push(Node::Label { text: labels::TOP_COMBINATIONS.to_string() });
                out.push(Node::Cards { cards: p.top_combinations.iter().map(combination_card).collect() });
            }
            push_lists(&mut out, p.lists());
            push_fields(&mut out, p.facts());
        }
    }
    out
}

fn material_card(entry: &MaterialEntry) -> Card {
    Card {
        title: entry.display_name().to_string(),
        subtitle: entry.brand.as_ref().map(|b| format!("{}: {}", labels::BRAND, b)),
        price: entry.cost_per_unit.clone(),
        fields: entry.attributes().into_iter().map(fact_field).collect(),
        bullets: entry.benefits.clone(),
        tags: entry.is_codes.clone(),
    }
}

fn combination_card(combo: &MaterialCombination) -> Card {
    let mut fields = Vec::new();
    if !combo.materials.is_empty() {
        fields.push(Field::new(labels::MATERIALS, combo.materials.join(", ")));
    }
    Card {
        title: combo.name.clone().unwrap_or_else(|| labels::TOP_COMBINATIONS.to_string()),
        subtitle: None,
        price: combo.cost.as_ref().map(|c| format!("{}: {}", labels::COST, c)),
        fields,
        bullets: combo.benefits.clone(),
        tags: Vec::new(),
    }
}

fn fact_field(fact: Fact) -> Field {
    Field::new(fact.label, fact.value)
}

fn push_fields(out: &mut Vec<Node>, facts: Vec<Fact>) {
    if !facts.is_empty() {
        out.push(Node::Fields { rows: facts.into_iter().map(fact_field).collect() });
    }
}

fn push_stats(out: &mut Vec<Node>, facts: Vec<Fact>) {
    if !facts.is_empty() {
        out.push(Node::Stats { items: facts.into_iter().map(fact_field).collect() });
    }
}

fn push_lists(out: &mut Vec<Node>, lists: Vec<(&'static str, &[String])>) {
    for (label, items) in lists {
        out.push(Node::Label { text: label.to_string() });
        out.push(Node::List { items: items.to_vec() });
    }
}

/// Lays out a flat block sequence; nesting comes from block transitions.
#[derive(Default)]
struct BlockLayout {
    root: Vec<Node>,
    section: Option<(String, Vec<Node>)>,
    list: Vec<String>,
}

impl BlockLayout {
    fn target(&mut self) -> &mut Vec<Node> {
        match &mut self.section {
            Some((_, children)) => children,
            None => &mut self.root,
        }
    }

    fn flush_list(&mut self) {
        if !self.list.is_empty() {
            let items = std::mem::take(&mut self.list);
            self.target().push(Node::List { items });
        }
    }

    fn close_section(&mut self) {
        self.flush_list();
        if let Some((title, children)) = self.section.take() {
            self.root.push(Node::Section { title, tone: Tone::Gray, children });
        }
    }

    fn push(&mut self, block: &Block) {
        match block {
            Block::MainHeading(text) => {
                self.close_section();
                self.section = Some((text.clone(), Vec::new()));
            }
            Block::SubHeading(text) => {
                self.flush_list();
                self.target().push(Node::Label { text: text.clone() });
            }
            Block::BulletItem(text) => self.list.push(text.clone()),
            Block::EmphasisLine(text) => {
                self.flush_list();
                self.target().push(Node::Text { text: text.clone(), strong: true });
            }
            Block::Paragraph(text) => {
                self.flush_list();
                self.target().push(Node::Text { text: text.clone(), strong: false });
            }
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.close_section();
        self.root
    }
}

fn render_blocks(blocks: &[Block]) -> Vec<Node> {
    let mut layout = BlockLayout::default();
    for block in blocks {
        layout.push(block);
    }
    layout.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_report() -> RawReport {
        RawReport::from_value(json!({
            "executiveSummary": {
                "keyRecommendations": ["Use AAC blocks", "Clay roof tiles"],
                "totalCostEstimate": "₹45,00,000",
                "timelineOverview": "10-12 months",
                "climateSuitability": "Good for warm-humid zones"
            },
            "recommendedMaterials": {
                "foundation": [{ "name": "M25 concrete", "brand": "UltraTech", "costPerUnit": "₹6,500 per m³", "isCodes": ["IS 456"] }],
                "roofing": [{ "name": "Clay tiles", "costPerUnit": "₹45 per tile", "monsoonResistance": "High" }]
            },
            "costAnalysis": {
                "materialCosts": { "foundation": "₹3,50,000" },
                "laborCosts": "₹8,00,000",
                "totalProjectCost": "₹45,00,000"
            },
            "environmentalImpact": { "carbonFootprint": "Low", "sustainability": ["Fly ash bricks"] },
            "durabilityMaintenance": { "expectedLifespan": "60 years", "commonIssues": ["Dampness"] },
            "localConsiderations": { "seismicZone": "Zone III", "complianceCodes": ["NBC 2016"] },
            "procurementTimeline": { "foundation": "2 weeks", "monsoonConsiderations": "Stock before June" },
            "professionalRecommendations": {
                "topCombinations": [{ "name": "Cool roof", "materials": ["Clay tiles", "PUF"], "benefits": ["Cooler"], "cost": "₹2,00,000" }],
                "riskMitigation": ["Waterproof early"]
            }
        }))
    }

    fn options() -> RenderOptions {
        RenderOptions { generated_on: NaiveDate::from_ymd_opt(2025, 3, 5) }
    }

    #[test]
    fn one_section_per_present_key_in_fixed_order() {
        let doc = render(&full_report(), &ProjectData::default(), &options());
        let expected: Vec<&str> = SectionKind::ORDER.iter().map(|k| k.title()).collect();
        assert_eq!(doc.section_titles(), expected);
    }

    #[test]
    fn absent_sections_render_nothing() {
        let raw = RawReport::from_value(json!({ "costAnalysis": { "laborCosts": "₹1,000" } }));
        let doc = render(&raw, &ProjectData::default(), &options());
        assert_eq!(doc.section_titles(), ["Cost Analysis"]);
    }

    #[test]
    fn rendering_is_idempotent() {
        let project = ProjectData { area: Some(1500.0), ..ProjectData::default() };
        let first = render(&full_report(), &project, &options());
        let second = render(&full_report(), &project, &options());
        assert_eq!(first, second);
    }

    #[test]
    fn raw_text_goes_through_text_path() {
        let raw = RawReport::from_value(json!({ "rawText": "Some unparsable text" }));
        let doc = render(&raw, &ProjectData::default(), &options());
        assert_eq!(doc.body, vec![Node::Text { text: "Some unparsable text".into(), strong: false }]);
    }

    #[test]
    fn empty_report_renders_empty_document() {
        let doc = render(&RawReport::Empty, &ProjectData::default(), &options());
        assert!(doc.is_empty());
        assert_eq!(doc, VisualDocument::default());
    }

    #[test]
    fn block_transitions_build_groups() {
        let raw = RawReport::Unstructured(
            "Preface line\n1. Executive Summary\nSome intro.\n- Point A\n- Point B\n## Detail\n- Point C\n2. Cost Analysis\n**Note:** watch costs"
                .to_string(),
        );
        let doc = render(&raw, &ProjectData::default(), &options());
        assert_eq!(
            doc.body,
            vec![
                Node::Text { text: "Preface line".into(), strong: false },
                Node::Section {
                    title: "Executive Summary".into(),
                    tone: Tone::Gray,
                    children: vec![
                        Node::Text { text: "Some intro.".into(), strong: false },
                        Node::List { items: vec!["Point A".into(), "Point B".into()] },
                        Node::Label { text: "Detail".into() },
                        Node::List { items: vec!["Point C".into()] },
                    ],
                },
                Node::Section {
                    title: "Cost Analysis".into(),
                    tone: Tone::Gray,
                    children: vec![Node::Text { text: "Note: watch costs".into(), strong: true }],
                },
            ]
        );
    }

    #[test]
    fn project_panel_uses_placeholders_and_indian_grouping() {
        let project = ProjectData {
            project_type: Some("commercial".into()),
            area: Some(1234567.0),
            expected_budget: Some(2500000.0),
            ..ProjectData::default()
        };
        let doc = render(&full_report(), &project, &options());
        let value = |label: &str| {
            doc.project.iter().find(|f| f.label == label).map(|f| f.value.clone()).unwrap()
        };
        assert_eq!(value("Project Type"), "Commercial Building");
        assert_eq!(value("Project Area"), "12,34,567 sq ft");
        assert_eq!(value("Expected Budget"), "₹25,00,000");
        assert_eq!(value("Location"), "N/A");
        assert!(doc.project_notes.is_empty());
    }

    #[test]
    fn header_and_footer_carry_the_date() {
        let doc = render(&full_report(), &ProjectData::default(), &options());
        assert_eq!(doc.header.unwrap().generated_on.as_deref(), Some("05 March 2025"));
        assert_eq!(
            doc.footer.as_deref(),
            Some("Report generated on 05 March 2025 | AI-Powered Building Material Selector")
        );
    }

    #[test]
    fn material_cards_skip_missing_attributes() {
        let doc = render(&full_report(), &ProjectData::default(), &options());
        let Node::Section { children, .. } = &doc.body[1] else { panic!("expected section") };
        let Node::Cards { cards } = &children[3] else { panic!("expected cards") };
        let tiles = &cards[0];
        assert_eq!(tiles.title, "Clay tiles");
        assert_eq!(tiles.subtitle, None);
        assert!(tiles.tags.is_empty());
        assert_eq!(tiles.fields, vec![Field::new("Monsoon Resistance", "High")]);
    }

    #[test]
    fn outline_and_render_share_section_titles() {
        let raw = full_report();
        let doc = render(&raw, &ProjectData::default(), &options());
        let headings: Vec<String> = outline(&raw)
            .into_iter()
            .filter_map(|b| match b {
                Block::MainHeading(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(doc.section_titles(), headings);
    }
}
