use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Name of the escape field that carries model output which failed to parse.
pub const RAW_TEXT_FIELD: &str = "rawText";

/// One classified unit of a report, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text")]
pub enum Block {
    MainHeading(String),
    SubHeading(String),
    BulletItem(String),
    EmphasisLine(String),
    Paragraph(String),
}

impl Block {
    pub fn text(&self) -> &str {
        match self {
            Block::MainHeading(t)
            | Block::SubHeading(t)
            | Block::BulletItem(t)
            | Block::EmphasisLine(t)
            | Block::Paragraph(t) => t,
        }
    }
}

/// The report as received, with its representation decided once.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReport {
    Structured(StructuredReport),
    Unstructured(String),
    Empty,
}

impl RawReport {
    /// Resolve the discriminant of an upstream value.
    ///
    /// An object carrying a string `rawText` is text even if it has other
    /// keys; any other object is a structured report. Bare strings are text.
    /// Everything else (`null`, numbers, arrays) resolves to `Empty`.
    pub fn from_value(value: Value) -> RawReport {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get(RAW_TEXT_FIELD) {
                    return RawReport::Unstructured(text.clone());
                }
                match serde_json::from_value::<StructuredReport>(Value::Object(map)) {
                    Ok(report) => RawReport::Structured(report),
                    Err(e) => {
                        log::warn!("structured report could not be read: {}", e);
                        RawReport::Structured(StructuredReport::default())
                    }
                }
            }
            Value::String(text) => RawReport::Unstructured(text),
            _ => RawReport::Empty,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, RawReport::Structured(_))
    }
}

/// Fixed top-level sections, declared in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SectionKind {
    ExecutiveSummary,
    RecommendedMaterials,
    CostAnalysis,
    EnvironmentalImpact,
    DurabilityMaintenance,
    LocalConsiderations,
    ProcurementTimeline,
    ProfessionalRecommendations,
}

impl SectionKind {
    pub const ORDER: [SectionKind; 8] = [
        SectionKind::ExecutiveSummary,
        SectionKind::RecommendedMaterials,
        SectionKind::CostAnalysis,
        SectionKind::EnvironmentalImpact,
        SectionKind::DurabilityMaintenance,
        SectionKind::LocalConsiderations,
        SectionKind::ProcurementTimeline,
        SectionKind::ProfessionalRecommendations,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SectionKind::ExecutiveSummary => "Executive Summary",
            SectionKind::RecommendedMaterials => "Recommended Materials by Component",
            SectionKind::CostAnalysis => "Cost Analysis",
            SectionKind::EnvironmentalImpact => "Environmental Impact Assessment",
            SectionKind::DurabilityMaintenance => "Durability & Maintenance",
            SectionKind::LocalConsiderations => "Local Considerations",
            SectionKind::ProcurementTimeline => "Procurement Timeline",
            SectionKind::ProfessionalRecommendations => "Professional Recommendations",
        }
    }
}

/// Sub-group captions shared by the block normalizer and the renderer.
pub mod labels {
    pub const MATERIAL_COSTS: &str = "Material Costs";
    pub const ADDITIONAL_COSTS: &str = "Additional Costs";
    pub const TOTAL_PROJECT_COST: &str = "Total Project Cost";
    pub const COMPLIANCE_CODES: &str = "Compliance Codes";
    pub const MONSOON_CONSIDERATIONS: &str = "Monsoon Considerations";
    pub const TOP_COMBINATIONS: &str = "Top Material Combinations";
    pub const BRAND: &str = "Brand";
    pub const COST: &str = "Cost";
    pub const IS_CODES: &str = "IS Codes";
    pub const MATERIALS: &str = "Materials";
    pub const PHASE: &str = "Phase";
    pub const LEAD_TIME: &str = "Lead Time";
    pub const ITEM: &str = "Item";
}

/// `foundation` → `Foundation Materials`
pub fn category_title(category: &str) -> String {
    format!("{} Materials", crate::util::humanize_key(category))
}

/// A labelled value that is actually present in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fact {
    pub label: &'static str,
    pub value: String,
}

fn push_fact(out: &mut Vec<Fact>, label: &'static str, value: &Option<String>) {
    if let Some(v) = value {
        out.push(Fact { label, value: v.clone() });
    }
}

fn push_list<'a>(out: &mut Vec<(&'static str, &'a [String])>, label: &'static str, items: &'a [String]) {
    if !items.is_empty() {
        out.push((label, items));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StructuredReport {
    #[serde(deserialize_with = "lenient::section")]
    pub executive_summary: Option<ExecutiveSummary>,
    #[serde(deserialize_with = "lenient::material_categories")]
    pub recommended_materials: IndexMap<String, Vec<MaterialEntry>>,
    #[serde(deserialize_with = "lenient::section")]
    pub cost_analysis: Option<CostAnalysis>,
    #[serde(deserialize_with = "lenient::section")]
    pub environmental_impact: Option<EnvironmentalImpact>,
    #[serde(deserialize_with = "lenient::section")]
    pub durability_maintenance: Option<DurabilityMaintenance>,
    #[serde(deserialize_with = "lenient::section")]
    pub local_considerations: Option<LocalConsiderations>,
    #[serde(deserialize_with = "lenient::section")]
    pub procurement_timeline: Option<ProcurementTimeline>,
    #[serde(deserialize_with = "lenient::section")]
    pub professional_recommendations: Option<ProfessionalRecommendations>,
}

/// A present, non-empty section borrowed from a [`StructuredReport`].
#[derive(Debug, Clone, Copy)]
pub enum SectionRef<'a> {
    ExecutiveSummary(&'a ExecutiveSummary),
    RecommendedMaterials(&'a IndexMap<String, Vec<MaterialEntry>>),
    CostAnalysis(&'a CostAnalysis),
    EnvironmentalImpact(&'a EnvironmentalImpact),
    DurabilityMaintenance(&'a DurabilityMaintenance),
    LocalConsiderations(&'a LocalConsiderations),
    ProcurementTimeline(&'a ProcurementTimeline),
    ProfessionalRecommendations(&'a ProfessionalRecommendations),
}

impl SectionRef<'_> {
    pub fn kind(&self) -> SectionKind {
        match self {
            SectionRef::ExecutiveSummary(_) => SectionKind::ExecutiveSummary,
            SectionRef::RecommendedMaterials(_) => SectionKind::RecommendedMaterials,
            SectionRef::CostAnalysis(_) => SectionKind::CostAnalysis,
            SectionRef::EnvironmentalImpact(_) => SectionKind::EnvironmentalImpact,
            SectionRef::DurabilityMaintenance(_) => SectionKind::DurabilityMaintenance,
            SectionRef::LocalConsiderations(_) => SectionKind::LocalConsiderations,
            SectionRef::ProcurementTimeline(_) => SectionKind::ProcurementTimeline,
            SectionRef::ProfessionalRecommendations(_) => SectionKind::ProfessionalRecommendations,
        }
    }
}

impl StructuredReport {
    /// The traversal shared by the normalizer and the renderer: present,
    /// non-empty sections in [`SectionKind::ORDER`].
    pub fn sections(&self) -> Vec<SectionRef<'_>> {
        let mut out = Vec::new();
        for kind in SectionKind::ORDER {
            let section = match kind {
                SectionKind::ExecutiveSummary => self
                    .executive_summary
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .map(SectionRef::ExecutiveSummary),
                SectionKind::RecommendedMaterials => {
                    let has_entries = self.recommended_materials.values().any(|v| !v.is_empty());
                    has_entries.then_some(SectionRef::RecommendedMaterials(&self.recommended_materials))
                }
                SectionKind::CostAnalysis => self
                    .cost_analysis
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .map(SectionRef::CostAnalysis),
                SectionKind::EnvironmentalImpact => self
                    .environmental_impact
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .map(SectionRef::EnvironmentalImpact),
                SectionKind::DurabilityMaintenance => self
                    .durability_maintenance
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .map(SectionRef::DurabilityMaintenance),
                SectionKind::LocalConsiderations => self
                    .local_considerations
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .map(SectionRef::LocalConsiderations),
                SectionKind::ProcurementTimeline => self
                    .procurement_timeline
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .map(SectionRef::ProcurementTimeline),
                SectionKind::ProfessionalRecommendations => self
                    .professional_recommendations
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .map(SectionRef::ProfessionalRecommendations),
            };
            if let Some(section) = section {
                out.push(section);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutiveSummary {
    #[serde(deserialize_with = "lenient::list")]
    pub key_recommendations: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub total_cost_estimate: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub timeline_overview: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub climate_suitability: Option<String>,
}

impl ExecutiveSummary {
    pub fn is_empty(&self) -> bool {
        self.facts().is_empty() && self.key_recommendations.is_empty()
    }

    pub fn facts(&self) -> Vec<Fact> {
        let mut out = Vec::new();
        push_fact(&mut out, "Total Cost", &self.total_cost_estimate);
        push_fact(&mut out, "Timeline", &self.timeline_overview);
        push_fact(&mut out, "Climate Suitability", &self.climate_suitability);
        out
    }

    pub fn lists(&self) -> Vec<(&'static str, &[String])> {
        let mut out = Vec::new();
        push_list(&mut out, "Key Recommendations", &self.key_recommendations);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialEntry {
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub brand: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub cost_per_unit: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub benefits: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub is_codes: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub monsoon_resistance: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub thermal_rating: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub humidity_resistance: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub weather_resistance: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub maintenance: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub climate_zones: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub availability: Option<String>,
}

impl MaterialEntry {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed material")
    }

    /// Descriptive attributes that are present, in a stable order.
    pub fn attributes(&self) -> Vec<Fact> {
        let mut out = Vec::new();
        push_fact(&mut out, "Monsoon Resistance", &self.monsoon_resistance);
        push_fact(&mut out, "Thermal Rating", &self.thermal_rating);
        push_fact(&mut out, "Humidity Resistance", &self.humidity_resistance);
        push_fact(&mut out, "Weather Resistance", &self.weather_resistance);
        push_fact(&mut out, "Maintenance", &self.maintenance);
        if !self.climate_zones.is_empty() {
            out.push(Fact { label: "Climate Zones", value: self.climate_zones.join(", ") });
        }
        push_fact(&mut out, "Availability", &self.availability);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CostAnalysis {
    #[serde(deserialize_with = "lenient::text_map")]
    pub material_costs: IndexMap<String, String>,
    #[serde(deserialize_with = "lenient::text")]
    pub labor_costs: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub transportation_costs: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub contingency: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub total_project_cost: Option<String>,
}

impl CostAnalysis {
    pub fn is_empty(&self) -> bool {
        self.material_costs.is_empty() && self.additional().is_empty() && self.total_project_cost.is_none()
    }

    pub fn additional(&self) -> Vec<Fact> {
        let mut out = Vec::new();
        push_fact(&mut out, "Labor", &self.labor_costs);
        push_fact(&mut out, "Transportation", &self.transportation_costs);
        push_fact(&mut out, "Contingency", &self.contingency);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvironmentalImpact {
    #[serde(deserialize_with = "lenient::text")]
    pub carbon_footprint: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub energy_efficiency: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub monsoon_resistance: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub sustainability: Vec<String>,
}

impl EnvironmentalImpact {
    pub fn is_empty(&self) -> bool {
        self.facts().is_empty() && self.sustainability.is_empty()
    }

    pub fn facts(&self) -> Vec<Fact> {
        let mut out = Vec::new();
        push_fact(&mut out, "Energy Efficiency", &self.energy_efficiency);
        push_fact(&mut out, "Carbon Footprint", &self.carbon_footprint);
        push_fact(&mut out, "Monsoon Resistance", &self.monsoon_resistance);
        out
    }

    pub fn lists(&self) -> Vec<(&'static str, &[String])> {
        let mut out = Vec::new();
        push_list(&mut out, "Sustainability Features", &self.sustainability);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DurabilityMaintenance {
    #[serde(deserialize_with = "lenient::text")]
    pub expected_lifespan: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub maintenance_frequency: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub common_issues: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub preventive_measures: Vec<String>,
}

impl DurabilityMaintenance {
    pub fn is_empty(&self) -> bool {
        self.facts().is_empty() && self.lists().is_empty()
    }

    pub fn facts(&self) -> Vec<Fact> {
        let mut out = Vec::new();
        push_fact(&mut out, "Expected Lifespan", &self.expected_lifespan);
        push_fact(&mut out, "Maintenance Frequency", &self.maintenance_frequency);
        out
    }

    pub fn lists(&self) -> Vec<(&'static str, &[String])> {
        let mut out = Vec::new();
        push_list(&mut out, "Common Issues", &self.common_issues);
        push_list(&mut out, "Preventive Measures", &self.preventive_measures);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalConsiderations {
    #[serde(deserialize_with = "lenient::list")]
    pub compliance_codes: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub seismic_zone: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub climatic_zone: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub local_suppliers: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub regional_factors: Vec<String>,
}

impl LocalConsiderations {
    pub fn is_empty(&self) -> bool {
        self.facts().is_empty() && self.compliance_codes.is_empty() && self.lists().is_empty()
    }

    pub fn facts(&self) -> Vec<Fact> {
        let mut out = Vec::new();
        push_fact(&mut out, "Seismic Zone", &self.seismic_zone);
        push_fact(&mut out, "Climatic Zone", &self.climatic_zone);
        out
    }

    /// Supplier and regional lists; compliance codes are shown as tags.
    pub fn lists(&self) -> Vec<(&'static str, &[String])> {
        let mut out = Vec::new();
        push_list(&mut out, "Local Suppliers", &self.local_suppliers);
        push_list(&mut out, "Regional Factors", &self.regional_factors);
        out
    }
}

/// Lead time per procurement phase. Phase names are open-ended; the
/// `monsoonConsiderations` key is split out as a note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcurementTimeline {
    pub phases: IndexMap<String, String>,
    pub monsoon_considerations: Option<String>,
}

impl ProcurementTimeline {
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty() && self.monsoon_considerations.is_none()
    }
}

impl<'de> Deserialize<'de> for ProcurementTimeline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut phases = lenient::text_map(deserializer)?;
        let monsoon_considerations = phases.shift_remove("monsoonConsiderations");
        Ok(ProcurementTimeline { phases, monsoon_considerations })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialCombination {
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub materials: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub benefits: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub cost: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfessionalRecommendations {
    #[serde(deserialize_with = "lenient::entries")]
    pub top_combinations: Vec<MaterialCombination>,
    #[serde(deserialize_with = "lenient::list")]
    pub risk_mitigation: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub quality_assurance: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub green_building_compliance: Option<String>,
}

impl ProfessionalRecommendations {
    pub fn is_empty(&self) -> bool {
        self.top_combinations.is_empty() && self.lists().is_empty() && self.facts().is_empty()
    }

    pub fn facts(&self) -> Vec<Fact> {
        let mut out = Vec::new();
        push_fact(&mut out, "Green Building Compliance", &self.green_building_compliance);
        out
    }

    pub fn lists(&self) -> Vec<(&'static str, &[String])> {
        let mut out = Vec::new();
        push_list(&mut out, "Risk Mitigation", &self.risk_mitigation);
        push_list(&mut out, "Quality Assurance", &self.quality_assurance);
        out
    }
}

/// Questionnaire answers shown in the report header.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectData {
    #[serde(deserialize_with = "lenient::text")]
    pub project_type: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub climate: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub budget: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub area: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub expected_budget: Option<f64>,
    #[serde(deserialize_with = "lenient::text")]
    pub duration: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub structural_requirements: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub sustainability_goals: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub additional_constraints: Option<String>,
}

impl ProjectData {
    pub fn project_type_label(&self) -> Option<String> {
        self.project_type.as_deref().map(|code| {
            match code {
                "residential" => "Residential Building",
                "commercial" => "Commercial Building",
                "industrial" => "Industrial Facility",
                "infrastructure" => "Infrastructure Project",
                "institutional" => "Institutional Building",
                other => other,
            }
            .to_string()
        })
    }

    pub fn climate_label(&self) -> Option<String> {
        self.climate.as_deref().map(|code| {
            match code {
                "hot-dry" => "Hot & Dry (Rajasthan, Gujarat)",
                "warm-humid" => "Warm & Humid (Chennai, Mumbai)",
                "moderate" => "Moderate (Delhi, Pune)",
                "cold" => "Cold (Kashmir, Himachal)",
                "composite" => "Composite (North Indian Plains)",
                "coastal" => "Coastal (Goa, Kerala)",
                "hill-station" => "Hill Station (Shimla, Ooty)",
                other => other,
            }
            .to_string()
        })
    }

    pub fn budget_label(&self) -> Option<String> {
        self.budget.as_deref().map(|code| {
            match code {
                "economy" => "Economy (₹800-1,500/sq ft)",
                "standard" => "Standard (₹1,500-2,500/sq ft)",
                "premium" => "Premium (₹2,500-4,000/sq ft)",
                "luxury" => "Luxury (₹4,000+/sq ft)",
                other => other,
            }
            .to_string()
        })
    }
}

/// Forgiving field readers. Model output drifts: numbers show up where
/// strings were asked for, single strings where lists were asked for.
/// None of these fail; unusable values read as absent.
pub(crate) mod lenient {
    use crate::util::parse_f64_safe;
    use indexmap::IndexMap;
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::MaterialEntry;

    fn text_of(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn list_of(value: &Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.iter().filter_map(text_of).collect(),
            other => text_of(other).into_iter().collect(),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(text_of(&Value::deserialize(d)?))
    }

    pub fn list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(list_of(&Value::deserialize(d)?))
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_f64_safe(Some(&s)),
            _ => None,
        })
    }

    pub fn text_map<'de, D: Deserializer<'de>>(d: D) -> Result<IndexMap<String, String>, D::Error> {
        let mut out = IndexMap::new();
        if let Value::Object(map) = Value::deserialize(d)? {
            for (key, value) in map {
                if let Some(text) = text_of(&value) {
                    out.insert(key, text);
                }
            }
        }
        Ok(out)
    }

    pub fn section<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            value @ Value::Object(_) => match serde_json::from_value(value) {
                Ok(section) => Ok(Some(section)),
                Err(e) => {
                    log::warn!("dropping unreadable report section: {}", e);
                    Ok(None)
                }
            },
            _ => {
                log::warn!("dropping report section that is not an object");
                Ok(None)
            }
        }
    }

    pub fn entries<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(entries_of(Value::deserialize(d)?))
    }

    fn entries_of<T: DeserializeOwned>(value: Value) -> Vec<T> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn material_categories<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<IndexMap<String, Vec<MaterialEntry>>, D::Error> {
        let mut out = IndexMap::new();
        match Value::deserialize(d)? {
            Value::Object(map) => {
                for (category, value) in map {
                    let entries: Vec<MaterialEntry> = match value {
                        single @ Value::Object(_) => entries_of(Value::Array(vec![single])),
                        other => entries_of(other),
                    };
                    if !entries.is_empty() {
                        out.insert(category, entries);
                    }
                }
            }
            Value::Null => {}
            _ => log::warn!("dropping recommendedMaterials that is not an object"),
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_text_escape_routes_to_text() {
        let raw = RawReport::from_value(json!({ "rawText": "Some unparsable text" }));
        assert_eq!(raw, RawReport::Unstructured("Some unparsable text".to_string()));
    }

    #[test]
    fn raw_text_wins_over_other_keys() {
        let raw = RawReport::from_value(json!({ "rawText": "x", "costAnalysis": {} }));
        assert!(!raw.is_structured());
    }

    #[test]
    fn non_object_values_resolve() {
        assert_eq!(RawReport::from_value(Value::Null), RawReport::Empty);
        assert_eq!(RawReport::from_value(json!([1, 2])), RawReport::Empty);
        assert_eq!(RawReport::from_value(json!(42)), RawReport::Empty);
        assert_eq!(
            RawReport::from_value(json!("plain")),
            RawReport::Unstructured("plain".to_string())
        );
    }

    #[test]
    fn categories_keep_input_order() {
        let raw = RawReport::from_value(json!({
            "recommendedMaterials": {
                "roofing": [{ "name": "Tiles" }],
                "acoustics": [{ "name": "Panels" }],
                "foundation": [{ "name": "PCC" }]
            }
        }));
        let RawReport::Structured(report) = raw else { panic!("expected structured") };
        let keys: Vec<&str> = report.recommended_materials.keys().map(String::as_str).collect();
        assert_eq!(keys, ["roofing", "acoustics", "foundation"]);
    }

    #[test]
    fn lenient_fields_accept_drift() {
        let report: StructuredReport = serde_json::from_value(json!({
            "executiveSummary": {
                "keyRecommendations": "Use AAC blocks",
                "totalCostEstimate": 2500000,
                "timelineOverview": null
            },
            "costAnalysis": "not an object",
            "environmentalImpact": { "sustainability": ["Fly ash", 3, null, "  "] }
        }))
        .unwrap();
        let summary = report.executive_summary.unwrap();
        assert_eq!(summary.key_recommendations, vec!["Use AAC blocks"]);
        assert_eq!(summary.total_cost_estimate.as_deref(), Some("2500000"));
        assert_eq!(summary.timeline_overview, None);
        assert!(report.cost_analysis.is_none());
        assert_eq!(report.environmental_impact.unwrap().sustainability, vec!["Fly ash", "3"]);
    }

    #[test]
    fn sections_skip_absent_and_empty() {
        let report: StructuredReport = serde_json::from_value(json!({
            "professionalRecommendations": { "riskMitigation": ["Cure slabs"] },
            "executiveSummary": {},
            "recommendedMaterials": { "foundation": [] },
            "costAnalysis": { "laborCosts": "₹1,20,000" },
            "unknownSection": { "a": 1 }
        }))
        .unwrap();
        let kinds: Vec<SectionKind> = report.sections().iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            [SectionKind::CostAnalysis, SectionKind::ProfessionalRecommendations]
        );
    }

    #[test]
    fn material_attributes_only_when_present() {
        let entry: MaterialEntry = serde_json::from_value(json!({
            "name": "Clay tiles",
            "thermalRating": "R-2.5",
            "climateZones": ["Zone 1", "Zone 2"]
        }))
        .unwrap();
        let labels: Vec<&str> = entry.attributes().iter().map(|f| f.label).collect();
        assert_eq!(labels, ["Thermal Rating", "Climate Zones"]);
        assert_eq!(entry.attributes()[1].value, "Zone 1, Zone 2");
    }

    #[test]
    fn procurement_splits_monsoon_note() {
        let timeline: ProcurementTimeline = serde_json::from_value(json!({
            "foundation": "2 weeks",
            "monsoonConsiderations": "Stock cement before June",
            "roofing": "4 weeks"
        }))
        .unwrap();
        let phases: Vec<&str> = timeline.phases.keys().map(String::as_str).collect();
        assert_eq!(phases, ["foundation", "roofing"]);
        assert_eq!(timeline.monsoon_considerations.as_deref(), Some("Stock cement before June"));
    }

    #[test]
    fn project_numbers_accept_strings() {
        let project: ProjectData = serde_json::from_value(json!({
            "projectType": "residential",
            "area": "1,500",
            "expectedBudget": 2500000,
            "climate": "tundra"
        }))
        .unwrap();
        assert_eq!(project.area, Some(1500.0));
        assert_eq!(project.expected_budget, Some(2500000.0));
        assert_eq!(project.project_type_label().as_deref(), Some("Residential Building"));
        assert_eq!(project.climate_label().as_deref(), Some("tundra"));
        assert_eq!(project.budget_label(), None);
    }
}
