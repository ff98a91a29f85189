// Entry point and command dispatch.
//
// Every command loads its inputs, renders once, and hands the rendered
// document to a painter or an export strategy.
use log::info;
use material_report::cli::{CliArgs, Command, OutputFormat, ReportInput};
use material_report::config::{build_config_today, AppConfig};
use material_report::error::{ReportError, Result};
use material_report::export::{self, CommandRasterizer, DirectoryPrintHost, ImageFileRasterizer, Rasterizer};
use material_report::upstream::{self, GeminiClient};
use material_report::{loader, output, render, VisualDocument};
use std::io::Write;
use std::path::Path;

fn render_input(input: &ReportInput, config: &AppConfig) -> Result<VisualDocument> {
    let (raw, _) = loader::load_report(&input.report, input.envelope)?;
    let project = loader::load_project(input.project.as_deref())?;
    Ok(render::render(&raw, &project, &config.render))
}

fn emit(out: Option<&Path>, body: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, body)?;
            println!("Saved {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(body.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn handle_render(input: &ReportInput, format: OutputFormat, out: Option<&Path>, config: &AppConfig) -> Result<()> {
    let doc = render_input(input, config)?;
    match format {
        OutputFormat::Html => emit(out, &paint_page(&doc)),
        OutputFormat::Text => emit(out, &output::paint_text(&doc)),
        OutputFormat::Json => match out {
            Some(path) => {
                output::write_json(path, &doc)?;
                println!("Saved {}", path.display());
                Ok(())
            }
            None => emit(None, &serde_json::to_string_pretty(&doc)?),
        },
    }
}

fn paint_page(doc: &VisualDocument) -> String {
    export::print_document(&output::paint_html(doc), export::DOCUMENT_TITLE)
}

fn handle_outline(report: &Path, envelope: bool) -> Result<()> {
    let (raw, _) = loader::load_report(report, envelope)?;
    let blocks = render::outline(&raw);
    emit(None, &format!("{}\n", serde_json::to_string_pretty(&blocks)?))
}

fn handle_pdf(input: &ReportInput, raster: Option<&Path>, out: &Path, config: &AppConfig) -> Result<()> {
    let doc = render_input(input, config)?;
    let rasterizer: Box<dyn Rasterizer> = match raster {
        Some(path) => Box::new(ImageFileRasterizer { path: path.to_path_buf() }),
        None => Box::new(CommandRasterizer { command: config.raster_command.clone(), zoom: config.raster_zoom }),
    };
    let bytes = export::export_pdf(Some(&doc), rasterizer.as_ref())?;
    std::fs::write(out, bytes)?;
    println!("Saved {}", out.display());
    Ok(())
}

fn handle_print(input: &ReportInput, dir: &Path, print_command: Option<&str>, config: &AppConfig) -> Result<()> {
    let doc = render_input(input, config)?;
    let host = DirectoryPrintHost { dir: dir.to_path_buf(), command: print_command.map(str::to_string) };
    export::print_report(Some(&doc), &host, &config.print)?;
    println!("Print document written to {}", dir.display());
    Ok(())
}

fn handle_generate(project: &Path, out: Option<&Path>, config: &AppConfig) -> Result<()> {
    let upstream_config = config
        .upstream
        .clone()
        .ok_or_else(|| ReportError::Config("GEMINI_API_KEY is not set".to_string()))?;
    let project = loader::load_project(Some(project))?;
    let client = GeminiClient::new(upstream_config);
    info!("requesting material analysis");
    let report = upstream::analyze(&client, &project)?;
    let body = serde_json::to_string_pretty(&upstream::envelope(report))?;
    emit(out, &format!("{}\n", body))
}

fn run(args: &CliArgs) -> Result<()> {
    let config = build_config_today(args)?;
    match &args.command {
        Command::Render { input, format, out } => handle_render(input, *format, out.as_deref(), &config),
        Command::Outline { report, envelope } => handle_outline(report, *envelope),
        Command::Pdf { input, raster, out } => handle_pdf(input, raster.as_deref(), out, &config),
        Command::Print { input, dir, print_command } => {
            handle_print(input, dir, print_command.as_deref(), &config)
        }
        Command::Generate { project, out } => handle_generate(project, out.as_deref(), &config),
    }
}

fn main() {
    env_logger::init();

    let args = CliArgs::parse_args();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
