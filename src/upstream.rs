/// Generative-model collaborator
///
/// This module handles:
/// - Building the analysis prompt from questionnaire answers
/// - Calling the Gemini `generateContent` endpoint
/// - Turning model text into a report value (fences stripped, raw text kept on failure)
/// - Reading the `{code}` / `{error}` envelope returned at the HTTP boundary
use crate::config::UpstreamConfig;
use crate::error::{ReportError, Result};
use crate::types::{ProjectData, RAW_TEXT_FIELD};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

const USER_AGENT: &str = concat!("material-report/", env!("CARGO_PKG_VERSION"));
pub const GENERIC_FAILURE: &str = "Failed to generate material analysis report";

static OPENING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\n?").unwrap());
static CLOSING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n?```").unwrap());

const REPORT_SCHEMA: &str = r#"{
    "executiveSummary": {
        "keyRecommendations": ["recommendation1", "recommendation2", "recommendation3"],
        "totalCostEstimate": "₹XX,XX,XXX",
        "timelineOverview": "X-Y months",
        "climateSuitability": "description"
    },
    "recommendedMaterials": {
        "foundation": [{ "name": "Material Name", "brand": "Indian Brand", "costPerUnit": "₹XXX per unit", "benefits": ["benefit1", "benefit2"], "isCodes": ["IS XXXX", "NBC 2016"] }],
        "structural": [{ "name": "Material Name", "brand": "Indian Brand", "costPerUnit": "₹XXX per unit", "benefits": ["benefit1", "benefit2"], "isCodes": ["IS XXXX"] }],
        "roofing": [{ "name": "Material Name", "brand": "Indian Brand", "costPerUnit": "₹XXX per unit", "benefits": ["benefit1", "benefit2"], "monsoonResistance": "High/Medium/Low" }],
        "insulation": [{ "name": "Material Name", "brand": "Indian Brand", "costPerUnit": "₹XXX per unit", "thermalRating": "R-value or description", "climateZones": ["Zone 1", "Zone 2"] }],
        "exterior": [{ "name": "Material Name", "brand": "Indian Brand", "costPerUnit": "₹XXX per unit", "weatherResistance": "description", "maintenance": "Low/Medium/High" }],
        "interior": [{ "name": "Material Name", "brand": "Indian Brand", "costPerUnit": "₹XXX per unit", "humidityResistance": "High/Medium/Low", "availability": "Pan India/Regional" }]
    },
    "costAnalysis": {
        "materialCosts": { "foundation": "₹XX,XXX", "structural": "₹XX,XXX", "roofing": "₹XX,XXX", "insulation": "₹XX,XXX", "finishing": "₹XX,XXX" },
        "laborCosts": "₹XX,XXX",
        "transportationCosts": "₹X,XXX",
        "contingency": "₹X,XXX (15%)",
        "totalProjectCost": "₹XX,XX,XXX"
    },
    "environmentalImpact": {
        "carbonFootprint": "description",
        "energyEfficiency": "BEE star rating or description",
        "monsoonResistance": "description",
        "sustainability": ["point1", "point2", "point3"]
    },
    "durabilityMaintenance": {
        "expectedLifespan": "XX years",
        "maintenanceFrequency": "description",
        "commonIssues": ["issue1", "issue2"],
        "preventiveMeasures": ["measure1", "measure2"]
    },
    "localConsiderations": {
        "complianceCodes": ["NBC 2016", "IS XXXX"],
        "seismicZone": "Zone I-V",
        "climaticZone": "description",
        "localSuppliers": ["supplier1", "supplier2"],
        "regionalFactors": ["factor1", "factor2"]
    },
    "procurementTimeline": {
        "foundation": "X weeks",
        "structural": "X weeks",
        "roofing": "X weeks",
        "insulation": "X weeks",
        "finishing": "X weeks",
        "monsoonConsiderations": "description"
    },
    "professionalRecommendations": {
        "topCombinations": [{ "name": "Combination 1", "materials": ["material1", "material2"], "benefits": ["benefit1", "benefit2"], "cost": "₹XX,XXX" }],
        "riskMitigation": ["strategy1", "strategy2"],
        "qualityAssurance": ["qa1", "qa2"],
        "greenBuildingCompliance": "GRIHA/IGBC details"
    }
}"#;

/// Questionnaire prompt. Unanswered questions are left blank.
pub fn build_prompt(project: &ProjectData) -> String {
    let answer = |v: &Option<String>| v.clone().unwrap_or_default();
    format!(
        "As a professional building materials consultant with expertise in Indian construction practices and standards, \
analyze the following project requirements and provide a comprehensive material selection report:

Project Type: {}
Climate Zone: {}
Budget Range: {}
Project Duration: {}
Location: {}
Structural Requirements: {}
Sustainability Goals: {}
Additional Constraints: {}

Please provide a detailed analysis considering Indian context:
1. Top 3 recommended materials for each major component (foundation, structure, roofing, insulation, finishing) with Indian brands and suppliers
2. Cost analysis in INR with current market rates
3. Environmental impact assessment considering Indian climate
4. Durability and maintenance in Indian conditions (monsoon, heat, humidity)
5. Local availability and supplier recommendations across India
6. Compliance with Indian building codes (NBC 2016, IS codes)
7. Timeline for material procurement in Indian market
8. Consideration for local labor skills and construction practices
9. Energy efficiency ratings as per Bureau of Energy Efficiency (BEE)
10. GRIHA/IGBC green building compliance if applicable

Format the response as a professional engineering report with clear sections, recommendations, and Indian market insights.",
        answer(&project.project_type),
        answer(&project.climate),
        answer(&project.budget),
        answer(&project.duration),
        answer(&project.location),
        answer(&project.structural_requirements),
        answer(&project.sustainability_goals),
        answer(&project.additional_constraints),
    )
}

/// Wrap a prompt in the consultant persona and the JSON shape the report
/// must follow.
pub fn enhance_prompt(prompt: &str) -> String {
    format!(
        "You are a senior building materials consultant with 20+ years of experience in Indian construction industry, \
architecture, and engineering. You have deep knowledge of Indian building codes, climate conditions, local materials, \
and construction practices.

{}

Please provide a comprehensive, professional material analysis report specifically for Indian construction market \
in strict JSON format. Return ONLY valid JSON with the following structure:

{}

Include specific Indian brand names, IS codes, NBC references, and current market rates in INR. Consider regional \
variations and local construction practices. Return ONLY the JSON object, no additional text or formatting.",
        prompt, REPORT_SCHEMA
    )
}

/// Anything that turns a prompt into model text.
pub trait ReportSource {
    fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: UpstreamConfig,
}

impl GeminiClient {
    pub fn new(config: UpstreamConfig) -> Self {
        GeminiClient { config }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        )
    }
}

impl ReportSource for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!("requesting {} from {}", self.config.model, self.config.endpoint);
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let resp = ureq::post(&self.url())
            .set("User-Agent", USER_AGENT)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => {
                    let detail = resp.into_string().unwrap_or_default();
                    ReportError::UpstreamCall(format!("HTTP {}: {}", code, detail.trim()))
                }
                other => ReportError::UpstreamCall(other.to_string()),
            })?;
        let text = resp
            .into_string()
            .map_err(|e| ReportError::UpstreamCall(e.to_string()))?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| ReportError::UpstreamCall(format!("unreadable response: {}", e)))?;
        candidate_text(&value)
            .ok_or_else(|| ReportError::UpstreamCall("response has no candidate text".to_string()))
    }
}

/// Concatenated text parts of the first candidate.
fn candidate_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse model text as a report. Text that is not JSON is kept whole under
/// `rawText`, which renders through the text path.
pub fn parse_upstream_text(text: &str) -> Value {
    let cleaned = OPENING_FENCE.replace_all(text, "");
    let cleaned = CLOSING_FENCE.replace_all(&cleaned, "");
    match serde_json::from_str::<Value>(cleaned.trim()) {
        Ok(value) => value,
        Err(e) => {
            warn!("model output is not JSON, keeping raw text: {}", e);
            json!({ RAW_TEXT_FIELD: text })
        }
    }
}

/// Run the full analysis: prompt, model call, parse.
pub fn analyze(source: &dyn ReportSource, project: &ProjectData) -> Result<Value> {
    let prompt = enhance_prompt(&build_prompt(project));
    let text = source.generate(&prompt)?;
    Ok(parse_upstream_text(&text))
}

/// Wrap a report the way the HTTP boundary returns it.
pub fn envelope(report: Value) -> Value {
    json!({ "code": report })
}

/// Unwrap `{ "code": report }`; `{ "error": message }` is a failed call.
/// Anything else is taken as the report itself.
pub fn resolve_envelope(value: Value) -> Result<Value> {
    match value {
        Value::Object(mut map) => {
            if let Some(report) = map.remove("code") {
                return Ok(report);
            }
            if let Some(err) = map.remove("error") {
                let message = match err {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                return Err(ReportError::UpstreamCall(message));
            }
            Ok(Value::Object(map))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(std::result::Result<&'static str, &'static str>);

    impl ReportSource for Canned {
        fn generate(&self, prompt: &str) -> Result<String> {
            assert!(prompt.contains("Return ONLY valid JSON"));
            self.0
                .map(str::to_string)
                .map_err(|e| ReportError::UpstreamCall(e.to_string()))
        }
    }

    #[test]
    fn strips_json_fences() {
        let value = parse_upstream_text("```json\n{\"executiveSummary\": {\"timelineOverview\": \"8 months\"}}\n```");
        assert_eq!(value["executiveSummary"]["timelineOverview"], "8 months");
    }

    #[test]
    fn unparsable_text_is_kept_raw() {
        let text = "1. Executive Summary\nNot JSON at all";
        assert_eq!(parse_upstream_text(text), json!({ "rawText": text }));
    }

    #[test]
    fn prompt_carries_answers_and_blanks() {
        let project = ProjectData {
            project_type: Some("residential".into()),
            location: Some("Kochi".into()),
            ..ProjectData::default()
        };
        let prompt = build_prompt(&project);
        assert!(prompt.contains("Project Type: residential\n"));
        assert!(prompt.contains("Location: Kochi\n"));
        assert!(prompt.contains("Climate Zone: \n"));
        let enhanced = enhance_prompt(&prompt);
        assert!(enhanced.contains(&prompt));
        assert!(enhanced.contains("\"procurementTimeline\""));
    }

    #[test]
    fn candidate_parts_are_joined() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(candidate_text(&response).as_deref(), Some("{\"a\":1}"));
        assert_eq!(candidate_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn envelope_round_trips_and_errors_surface() {
        let report = json!({ "rawText": "x" });
        assert_eq!(resolve_envelope(envelope(report.clone())).unwrap(), report);
        let err = resolve_envelope(json!({ "error": GENERIC_FAILURE })).unwrap_err();
        assert!(matches!(err, ReportError::UpstreamCall(_)));
        assert_eq!(resolve_envelope(json!({ "executiveSummary": {} })).unwrap(), json!({ "executiveSummary": {} }));
    }

    #[test]
    fn analyze_parses_or_propagates() {
        let value = analyze(&Canned(Ok("{\"costAnalysis\": {}}")), &ProjectData::default()).unwrap();
        assert!(value.get("costAnalysis").is_some());
        let err = analyze(&Canned(Err("quota exceeded")), &ProjectData::default()).unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate material analysis report: quota exceeded");
    }
}
