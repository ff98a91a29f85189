use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Parser, Debug, Clone)]
#[command(name = "material-report")]
#[command(about = "Format AI building-material analyses into reports, PDFs and print documents")]
#[command(version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Gemini API key (needed by `generate`)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Base URL of the Gemini REST API
    #[arg(long, env = "GEMINI_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    pub endpoint: String,

    /// HTML to PNG command used for PDF export when no --raster image is given
    #[arg(long, env = "REPORT_RASTER_CMD", default_value = "wkhtmltoimage", global = true)]
    pub raster_command: String,

    /// Date stamped on the report (YYYY-MM-DD); defaults to today
    #[arg(long, value_name = "DATE", global = true)]
    pub date: Option<String>,

    /// Delay before printing, in milliseconds
    #[arg(long, default_value = "500", global = true)]
    pub settle_ms: u64,

    /// How long to wait for the print command before closing, in milliseconds
    #[arg(long, default_value = "1000", global = true)]
    pub close_timeout_ms: u64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render upstream output as HTML, text or a JSON display tree
    Render {
        #[command(flatten)]
        input: ReportInput,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write here instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Print the block sequence behind a report as JSON
    Outline {
        #[arg(long, value_name = "FILE")]
        report: PathBuf,

        /// The report file holds a `{code}` / `{error}` envelope
        #[arg(long)]
        envelope: bool,
    },

    /// Export the rendered report as a paginated A4 PDF
    Pdf {
        #[command(flatten)]
        input: ReportInput,

        /// Pre-captured PNG or JPEG of the report to paginate
        #[arg(long, value_name = "PNG")]
        raster: Option<PathBuf>,

        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Write a printable HTML document and optionally send it to a printer
    Print {
        #[command(flatten)]
        input: ReportInput,

        /// Spool directory for the print document
        #[arg(long, value_name = "DIR")]
        dir: PathBuf,

        /// Command that receives the document path, e.g. `lp`
        #[arg(long, value_name = "CMD")]
        print_command: Option<String>,
    },

    /// Ask Gemini for an analysis of a project and save the envelope
    Generate {
        #[arg(long, value_name = "FILE")]
        project: PathBuf,

        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ReportInput {
    /// Model output: raw text, report JSON, or an envelope with --envelope
    #[arg(long, value_name = "FILE")]
    pub report: PathBuf,

    /// Project questionnaire answers as JSON
    #[arg(long, value_name = "FILE")]
    pub project: Option<PathBuf>,

    /// The report file holds a `{code}` / `{error}` envelope
    #[arg(long)]
    pub envelope: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Text,
    Json,
}

impl CliArgs {
    pub fn parse_args() -> Self {
        let mut args = CliArgs::parse();
        args.api_key = args.api_key.take().map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        args
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if let Command::Generate { .. } = self.command {
            if self.api_key.is_none() {
                return Err("generate needs an API key: set GEMINI_API_KEY or pass --api-key".to_string());
            }
        }
        if self.raster_command.trim().is_empty() {
            return Err("--raster-command must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn render_defaults_to_text() {
        let args = parse(&["material-report", "render", "--report", "r.json"]);
        match args.command {
            Command::Render { input, format, out } => {
                assert_eq!(input.report, PathBuf::from("r.json"));
                assert!(!input.envelope);
                assert_eq!(format, OutputFormat::Text);
                assert!(out.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(args.settle_ms, 500);
        assert_eq!(args.close_timeout_ms, 1000);
    }

    #[test]
    fn pdf_requires_out() {
        assert!(CliArgs::try_parse_from(["material-report", "pdf", "--report", "r.json"]).is_err());
    }

    #[test]
    fn generate_without_key_is_rejected() {
        let mut args = parse(&["material-report", "generate", "--project", "p.json"]);
        args.api_key = None;
        assert!(args.validate().is_err());
        args.api_key = Some("k".into());
        assert!(args.validate().is_ok());
    }
}
