// Flattens a structured report into the same block sequence the
// sectionizer produces, for outline and plain-text output. Walks the
// same section accessors as the renderer so labels never diverge.
use crate::types::{
    category_title, labels, Block, Fact, MaterialEntry, SectionRef, StructuredReport,
};
use crate::util::humanize_key;

pub fn normalize(report: &StructuredReport) -> Vec<Block> {
    let mut out = Vec::new();
    for section in report.sections() {
        out.push(Block::MainHeading(section.kind().title().to_string()));
        match section {
            SectionRef::ExecutiveSummary(s) => {
                push_facts(&mut out, s.facts());
                push_lists(&mut out, s.lists());
            }
            SectionRef::RecommendedMaterials(categories) => {
                for (category, entries) in categories {
                    out.push(Block::SubHeading(category_title(category)));
                    for entry in entries {
                        push_material(&mut out, entry);
                    }
                }
            }
            SectionRef::CostAnalysis(c) => {
                if !c.material_costs.is_empty() {
                    out.push(Block::SubHeading(labels::MATERIAL_COSTS.to_string()));
                    for (item, cost) in &c.material_costs {
                        out.push(Block::Paragraph(format!("{}: {}", humanize_key(item), cost)));
                    }
                }
                let additional = c.additional();
                if !additional.is_empty() {
                    out.push(Block::SubHeading(labels::ADDITIONAL_COSTS.to_string()));
                    push_facts(&mut out, additional);
                }
                if let Some(total) = &c.total_project_cost {
                    out.push(Block::EmphasisLine(format!("{}: {}", labels::TOTAL_PROJECT_COST, total)));
                }
            }
            SectionRef::EnvironmentalImpact(s) => {
                push_facts(&mut out, s.facts());
                push_lists(&mut out, s.lists());
            }
            SectionRef::DurabilityMaintenance(s) => {
                push_facts(&mut out, s.facts());
                push_lists(&mut out, s.lists());
            }
            SectionRef::LocalConsiderations(s) => {
                push_facts(&mut out, s.facts());
                if !s.compliance_codes.is_empty() {
                    out.push(Block::Paragraph(format!(
                        "{}: {}",
                        labels::COMPLIANCE_CODES,
                        s.compliance_codes.join(", ")
                    )));
                }
                push_lists(&mut out, s.lists());
            }
            SectionRef::ProcurementTimeline(t) => {
                for (phase, lead_time) in &t.phases {
                    out.push(Block::Paragraph(format!("{}: {}", humanize_key(phase), lead_time)));
                }
                if let Some(note) = &t.monsoon_considerations {
                    out.push(Block::EmphasisLine(format!("{}: {}", labels::MONSOON_CONSIDERATIONS, note)));
                }
            }
            SectionRef::ProfessionalRecommendations(p) => {
                if !p.top_combinations.is_empty() {
                    out.push(Block::SubHeading(labels::TOP_COMBINATIONS.to_string()));
                    for combo in &p.top_combinations {
                        if let Some(name) = &combo.name {
                            out.push(Block::EmphasisLine(name.clone()));
                        }
                        if let Some(cost) = &combo.cost {
                            out.push(Block::Paragraph(format!("{}: {}", labels::COST, cost)));
                        }
                        if !combo.materials.is_empty() {
                            out.push(Block::Paragraph(format!(
                                "{}: {}",
                                labels::MATERIALS,
                                combo.materials.join(", ")
                            )));
                        }
                        push_bullets(&mut out, &combo.benefits);
                    }
                }
                push_lists(&mut out, p.lists());
                push_facts(&mut out, p.facts());
            }
        }
    }
    out
}

fn push_material(out: &mut Vec<Block>, entry: &MaterialEntry) {
    out.push(Block::EmphasisLine(entry.display_name().to_string()));
    if let Some(brand) = &entry.brand {
        out.push(Block::Paragraph(format!("{}: {}", labels::BRAND, brand)));
    }
    if let Some(cost) = &entry.cost_per_unit {
        out.push(Block::Paragraph(format!("{}: {}", labels::COST, cost)));
    }
    push_bullets(out, &entry.benefits);
    if !entry.is_codes.is_empty() {
        out.push(Block::Paragraph(format!("{}: {}", labels::IS_CODES, entry.is_codes.join(", "))));
    }
    push_facts(out, entry.attributes());
}

fn push_facts(out: &mut Vec<Block>, facts: Vec<Fact>) {
    for fact in facts {
        out.push(Block::Paragraph(format!("{}: {}", fact.label, fact.value)));
    }
}

fn push_lists(out: &mut Vec<Block>, lists: Vec<(&'static str, &[String])>) {
    for (label, items) in lists {
        out.push(Block::SubHeading(label.to_string()));
        push_bullets(out, items);
    }
}

fn push_bullets(out: &mut Vec<Block>, items: &[String]) {
    out.extend(items.iter().map(|item| Block::BulletItem(item.clone())));
}
