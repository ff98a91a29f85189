/// Configuration resolution
///
/// Turns parsed CLI arguments (with their environment fallbacks) into an
/// immutable `AppConfig`, so the commands never look at raw arguments.
use crate::cli::CliArgs;
use crate::error::{ReportError, Result};
use crate::export::PrintTiming;
use crate::render::RenderOptions;
use crate::util::parse_date_safe;
use chrono::{Local, NaiveDate};
use log::debug;
use std::time::Duration;

pub const RASTER_ZOOM: f32 = 1.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub render: RenderOptions,
    /// Present only when an API key is configured.
    pub upstream: Option<UpstreamConfig>,
    pub raster_command: String,
    pub raster_zoom: f32,
    pub print: PrintTiming,
}

/// Build the configuration, stamping reports with `today` unless a date
/// was given explicitly.
pub fn build_config(args: &CliArgs, today: NaiveDate) -> Result<AppConfig> {
    args.validate().map_err(ReportError::Config)?;

    let generated_on = match args.date.as_deref() {
        Some(raw) => parse_date_safe(Some(raw))
            .ok_or_else(|| ReportError::Config(format!("invalid --date '{}', expected YYYY-MM-DD", raw)))?,
        None => today,
    };
    debug!("stamping reports with {}", generated_on);

    let upstream = args.api_key.as_ref().map(|key| UpstreamConfig {
        api_key: key.clone(),
        model: args.model.trim().to_string(),
        endpoint: args.endpoint.trim().to_string(),
    });

    Ok(AppConfig {
        render: RenderOptions { generated_on: Some(generated_on) },
        upstream,
        raster_command: args.raster_command.trim().to_string(),
        raster_zoom: RASTER_ZOOM,
        print: PrintTiming {
            settle: Duration::from_millis(args.settle_ms),
            close_timeout: Duration::from_millis(args.close_timeout_ms),
        },
    })
}

/// `build_config` against the local calendar date.
pub fn build_config_today(args: &CliArgs) -> Result<AppConfig> {
    build_config(args, Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["material-report"];
        argv.extend_from_slice(extra);
        let mut args = CliArgs::try_parse_from(argv).unwrap();
        // Keep the test independent of the caller's environment.
        args.api_key = None;
        args
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
    }

    #[test]
    fn defaults_resolve() {
        let config = build_config(&args(&["outline", "--report", "r.txt"]), today()).unwrap();
        assert_eq!(config.render.generated_on, Some(today()));
        assert_eq!(config.print, PrintTiming::default());
        assert_eq!(config.raster_zoom, 1.5);
        assert!(config.upstream.is_none());
    }

    #[test]
    fn explicit_date_wins() {
        let config =
            build_config(&args(&["--date", "2024-12-01", "outline", "--report", "r.txt"]), today()).unwrap();
        assert_eq!(config.render.generated_on, NaiveDate::from_ymd_opt(2024, 12, 1));
    }

    #[test]
    fn bad_date_is_a_config_error() {
        let err = build_config(&args(&["--date", "March 5", "outline", "--report", "r.txt"]), today()).unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn api_key_enables_upstream() {
        let mut a = args(&["generate", "--project", "p.json", "--model", "gemini-pro"]);
        a.api_key = Some("secret".into());
        let upstream = build_config(&a, today()).unwrap().upstream.unwrap();
        assert_eq!(upstream.model, "gemini-pro");
        assert_eq!(upstream.api_key, "secret");
    }
}
