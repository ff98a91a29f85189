use crate::error::Result;
use crate::types::{ProjectData, RawReport};
use crate::upstream::{parse_upstream_text, resolve_envelope};
use crate::util::format_int;
use log::{debug, info};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub bytes: usize,
    pub structured: bool,
    pub sections: usize,
}

/// Read a report file. Without `envelope` the file is taken as model output
/// (report JSON, fenced JSON, or free text); with it the file must be the
/// `{code}` / `{error}` JSON the HTTP boundary returns.
pub fn load_report(path: &Path, envelope: bool) -> Result<(RawReport, LoadReport)> {
    let text = std::fs::read_to_string(path)?;
    let value = if envelope {
        resolve_envelope(serde_json::from_str::<Value>(&text)?)?
    } else {
        parse_upstream_text(&text)
    };
    let raw = RawReport::from_value(value);
    let load_report = LoadReport {
        bytes: text.len(),
        structured: raw.is_structured(),
        sections: match &raw {
            RawReport::Structured(report) => report.sections().len(),
            _ => 0,
        },
    };
    info!(
        "loaded {} ({} bytes, {})",
        path.display(),
        format_int(load_report.bytes as u64),
        if load_report.structured {
            format!("{} sections", load_report.sections)
        } else {
            "text".to_string()
        }
    );
    Ok((raw, load_report))
}

/// Read questionnaire answers. A missing path means no answers.
pub fn load_project(path: Option<&Path>) -> Result<ProjectData> {
    let Some(path) = path else {
        debug!("no project file, using empty answers");
        return Ok(ProjectData::default());
    };
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
