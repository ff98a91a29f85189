//! Export of a rendered report: raster-paginated PDF and print stream.
//!
//! Both strategies take the already rendered `VisualDocument` and paint it
//! with `output::paint_html`, so exported markup is the display markup.
use crate::error::ExportError;
use crate::output::paint_html;
use crate::visual::VisualDocument;
use image::RgbImage;
use log::{debug, info, warn};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;
const PT_PER_MM: f64 = 72.0 / 25.4;
const TOLERANCE_MM: f64 = 1e-6;

pub const DOCUMENT_TITLE: &str = "Building Material Analysis Report";
pub const POPUP_BLOCKED: &str = "Failed to open print window. Please allow pop-ups for this site.";
const NO_TARGET: &str = "report content is not rendered";

/// Where each page shows the full-height bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    /// Bitmap height once scaled to the page width.
    pub image_height_mm: f64,
    /// Vertical image offset per page; page `k` sits at `-k * 297`.
    pub offsets_mm: Vec<f64>,
}

impl Pagination {
    pub fn page_count(&self) -> usize {
        self.offsets_mm.len()
    }
}

/// Slice a `width_px` x `height_px` bitmap into A4 pages. The first page is
/// always emitted; further pages follow while image height remains.
pub fn paginate(width_px: u32, height_px: u32) -> Pagination {
    let image_height_mm = if width_px == 0 {
        0.0
    } else {
        height_px as f64 * PAGE_WIDTH_MM / width_px as f64
    };
    let mut offsets_mm = vec![0.0];
    let mut remaining = image_height_mm - PAGE_HEIGHT_MM;
    while remaining > TOLERANCE_MM {
        offsets_mm.push(-(offsets_mm.len() as f64) * PAGE_HEIGHT_MM);
        remaining -= PAGE_HEIGHT_MM;
    }
    Pagination { image_height_mm, offsets_mm }
}

/// Captures the full height of a print document as one RGB bitmap.
pub trait Rasterizer {
    fn rasterize(&self, html: &str) -> Result<RgbImage, ExportError>;
}

/// Runs an external HTML to PNG tool (`wkhtmltoimage` by default).
#[derive(Debug, Clone)]
pub struct CommandRasterizer {
    pub command: String,
    pub zoom: f32,
}

impl Default for CommandRasterizer {
    fn default() -> Self {
        CommandRasterizer { command: "wkhtmltoimage".to_string(), zoom: 1.5 }
    }
}

impl Rasterizer for CommandRasterizer {
    fn rasterize(&self, html: &str) -> Result<RgbImage, ExportError> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ExportError::Raster("empty raster command".to_string()))?;
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("report.html");
        let output = dir.path().join("report.png");
        std::fs::write(&input, html)?;

        debug!("rasterizing with {} (zoom {})", program, self.zoom);
        let status = Command::new(program)
            .args(parts)
            .arg("--zoom")
            .arg(self.zoom.to_string())
            .arg("--format")
            .arg("png")
            .arg(&input)
            .arg(&output)
            .status()
            .map_err(|e| ExportError::Raster(format!("failed to run {}: {}", program, e)))?;
        if !status.success() {
            return Err(ExportError::Raster(format!("{} exited with {}", program, status)));
        }
        load_bitmap(&output)
    }
}

/// Uses a bitmap captured elsewhere.
#[derive(Debug, Clone)]
pub struct ImageFileRasterizer {
    pub path: PathBuf,
}

impl Rasterizer for ImageFileRasterizer {
    fn rasterize(&self, _html: &str) -> Result<RgbImage, ExportError> {
        load_bitmap(&self.path)
    }
}

fn load_bitmap(path: &Path) -> Result<RgbImage, ExportError> {
    let img = image::open(path)
        .map_err(|e| ExportError::Raster(format!("{}: {}", path.display(), e)))?;
    Ok(img.to_rgb8())
}

/// Rasterize the rendered report and compose it into a multi-page PDF.
pub fn export_pdf(target: Option<&VisualDocument>, rasterizer: &dyn Rasterizer) -> Result<Vec<u8>, ExportError> {
    let doc = target.ok_or_else(|| ExportError::TargetUnavailable(NO_TARGET.to_string()))?;
    let html = print_document(&paint_html(doc), DOCUMENT_TITLE);
    let bitmap = rasterizer.rasterize(&html)?;
    let mut pdf = compose_pdf(&bitmap)?;
    let mut buf = Vec::new();
    pdf.save_to(&mut buf)?;
    info!("composed {} byte PDF", buf.len());
    Ok(buf)
}

/// Place one bitmap on as many A4 pages as its height needs. The image is
/// stored once and every page draws it at its own offset.
pub fn compose_pdf(bitmap: &RgbImage) -> Result<Document, ExportError> {
    let (width, height) = bitmap.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::Raster("rasterized document is empty".to_string()));
    }
    let layout = paginate(width, height);
    debug!(
        "{}x{} px bitmap, {:.1} mm tall, {} page(s)",
        width,
        height,
        layout.image_height_mm,
        layout.page_count()
    );

    let page_w = (PAGE_WIDTH_MM * PT_PER_MM) as f32;
    let page_h = (PAGE_HEIGHT_MM * PT_PER_MM) as f32;
    let image_h = (layout.image_height_mm * PT_PER_MM) as f32;

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        bitmap.as_raw().clone(),
    ));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });

    let mut page_ids: Vec<Object> = Vec::with_capacity(layout.page_count());
    for offset_mm in &layout.offsets_mm {
        let y = page_h - (*offset_mm * PT_PER_MM) as f32 - image_h;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![page_w.into(), 0.into(), 0.into(), image_h.into(), 0.into(), y.into()],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id.into());
    }

    let count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => count,
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

/// Stylesheet of the print document. Lists every class `paint_html` emits
/// and nothing else.
pub const PRINT_STYLESHEET: &str = r#"
@page { size: A4; margin: 15mm; }
* { -webkit-print-color-adjust: exact; print-color-adjust: exact; box-sizing: border-box; }
body { font-family: Arial, Helvetica, sans-serif; color: #1f2937; margin: 0; line-height: 1.5; }
.report { max-width: 210mm; margin: 0 auto; background: #ffffff; }
.report-header { text-align: center; border-bottom: 2px solid #2563eb; padding-bottom: 12px; margin-bottom: 20px; }
.report-header h1 { color: #1e40af; font-size: 22px; margin: 0 0 6px 0; }
.subtitle { color: #4b5563; font-size: 14px; margin: 0; }
.compliance { color: #6b7280; font-size: 12px; margin: 4px 0 0 0; }
.stamp { color: #6b7280; font-size: 11px; margin-top: 8px; }
.project { background: #f9fafb; border: 1px solid #e5e7eb; border-radius: 6px; padding: 12px; margin-bottom: 20px; }
.project h2 { font-size: 16px; color: #111827; margin: 0 0 10px 0; }
.project-note { margin-top: 8px; font-size: 13px; }
.project-note p { margin: 2px 0 0 0; }
.fields { display: grid; grid-template-columns: 1fr 1fr; gap: 6px 16px; margin: 0 0 10px 0; }
.fields div { display: flex; gap: 6px; }
.field-label { font-weight: bold; color: #374151; }
.field-value { margin: 0; color: #1f2937; }
.section { border-left: 4px solid #9ca3af; border-radius: 6px; padding: 12px 16px; margin-bottom: 18px; page-break-inside: avoid; }
.section h2 { font-size: 17px; margin: 0 0 10px 0; }
.tone-blue { background: #eff6ff; border-color: #3b82f6; }
.tone-blue h2 { color: #1e40af; }
.tone-green { background: #f0fdf4; border-color: #22c55e; }
.tone-green h2 { color: #166534; }
.tone-orange { background: #fff7ed; border-color: #f97316; }
.tone-orange h2 { color: #9a3412; }
.tone-purple { background: #faf5ff; border-color: #a855f7; }
.tone-purple h2 { color: #6b21a8; }
.tone-gray { background: #f9fafb; border-color: #6b7280; }
.tone-gray h2 { color: #1f2937; }
.tone-yellow { background: #fefce8; border-color: #eab308; }
.tone-yellow h4 { color: #854d0e; }
.label { font-size: 14px; color: #374151; margin: 12px 0 6px 0; }
.text { font-size: 13px; margin: 4px 0; }
.strong { font-weight: bold; }
.list { margin: 4px 0 8px 0; padding-left: 20px; font-size: 13px; }
.stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 10px; margin-bottom: 10px; }
.stat { background: #ffffff; border: 1px solid #dbeafe; border-radius: 6px; padding: 8px; }
.stat-label { font-size: 12px; color: #6b7280; margin: 0; }
.stat-value { font-size: 15px; font-weight: bold; color: #111827; margin: 2px 0 0 0; }
.table { width: 100%; border-collapse: collapse; font-size: 13px; margin-bottom: 10px; }
.table th, .table td { border: 1px solid #e5e7eb; padding: 6px 8px; text-align: left; }
.table th { background: #f3f4f6; }
.cards { display: grid; grid-template-columns: 1fr 1fr; gap: 10px; margin-bottom: 10px; }
.card { background: #ffffff; border: 1px solid #d1d5db; border-radius: 6px; padding: 10px; page-break-inside: avoid; }
.card-title { font-size: 14px; color: #111827; margin: 0 0 4px 0; }
.card-subtitle { font-size: 12px; color: #4b5563; margin: 0; }
.card-price { font-size: 13px; font-weight: bold; color: #15803d; margin: 4px 0; }
.tags { display: flex; flex-wrap: wrap; gap: 4px; margin: 4px 0; }
.tag { background: #e0e7ff; color: #3730a3; border-radius: 4px; padding: 1px 6px; font-size: 11px; }
.notes { border: 1px solid #fde047; border-radius: 6px; padding: 12px 16px; margin-bottom: 18px; }
.notes h4 { margin: 0 0 6px 0; }
.footer { text-align: center; color: #6b7280; font-size: 11px; border-top: 1px solid #e5e7eb; padding-top: 10px; }
"#;

/// Wrap a painted fragment into a standalone printable page.
pub fn print_document(fragment: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        crate::output::esc(title),
        PRINT_STYLESHEET,
        fragment
    )
}

/// An isolated presentation context holding one print document.
pub trait PrintContext {
    fn write(&mut self, document: &str) -> Result<(), ExportError>;
    fn print(&mut self) -> Result<(), ExportError>;
    /// Block until printing finishes or `timeout` elapses. Returns whether
    /// printing finished.
    fn wait_printed(&mut self, timeout: Duration) -> bool;
    fn close(&mut self);
}

/// Opens print contexts. `None` means the platform refused (a blocked popup).
pub trait PrintHost {
    fn open(&self, title: &str) -> Option<Box<dyn PrintContext>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintTiming {
    /// Delay between writing the document and printing it.
    pub settle: Duration,
    /// How long to wait for printing before closing anyway.
    pub close_timeout: Duration,
}

impl Default for PrintTiming {
    fn default() -> Self {
        PrintTiming { settle: Duration::from_millis(500), close_timeout: Duration::from_millis(1000) }
    }
}

/// Print the rendered report through `host`. The context is closed whether
/// or not printing succeeds.
pub fn print_report(
    target: Option<&VisualDocument>,
    host: &dyn PrintHost,
    timing: &PrintTiming,
) -> Result<(), ExportError> {
    let doc = target.ok_or_else(|| ExportError::TargetUnavailable(NO_TARGET.to_string()))?;
    let html = print_document(&paint_html(doc), DOCUMENT_TITLE);
    let mut ctx = host
        .open(DOCUMENT_TITLE)
        .ok_or_else(|| ExportError::ContextUnavailable(POPUP_BLOCKED.to_string()))?;
    let result = run_print(ctx.as_mut(), &html, timing);
    ctx.close();
    result
}

fn run_print(ctx: &mut dyn PrintContext, html: &str, timing: &PrintTiming) -> Result<(), ExportError> {
    ctx.write(html)?;
    std::thread::sleep(timing.settle);
    ctx.print()?;
    if !ctx.wait_printed(timing.close_timeout) {
        debug!("print still running after {:?}; closing context", timing.close_timeout);
    }
    Ok(())
}

/// Spools print documents into a directory and optionally hands each one
/// to a print command such as `lp`.
#[derive(Debug, Clone)]
pub struct DirectoryPrintHost {
    pub dir: PathBuf,
    pub command: Option<String>,
}

impl PrintHost for DirectoryPrintHost {
    fn open(&self, title: &str) -> Option<Box<dyn PrintContext>> {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("cannot use print directory {}: {}", self.dir.display(), e);
            return None;
        }
        Some(Box::new(SpoolContext {
            path: self.dir.join(format!("{}.html", file_stem(title))),
            command: self.command.clone(),
            child: None,
        }))
    }
}

fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "report".to_string()
    } else {
        stem.to_string()
    }
}

struct SpoolContext {
    path: PathBuf,
    command: Option<String>,
    child: Option<Child>,
}

impl PrintContext for SpoolContext {
    fn write(&mut self, document: &str) -> Result<(), ExportError> {
        std::fs::write(&self.path, document)?;
        Ok(())
    }

    fn print(&mut self) -> Result<(), ExportError> {
        let Some(command) = &self.command else {
            info!("print document written to {}", self.path.display());
            return Ok(());
        };
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(());
        };
        let child = Command::new(program).args(parts).arg(&self.path).spawn()?;
        info!("sent {} to {}", self.path.display(), program);
        self.child = Some(child);
        Ok(())
    }

    fn wait_printed(&mut self, timeout: Duration) -> bool {
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        warn!("print command exited with {}", status);
                    }
                    return true;
                }
                Ok(None) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(50)),
                Ok(None) => return false,
                Err(e) => {
                    warn!("lost track of print command: {}", e);
                    return false;
                }
            }
        }
    }

    fn close(&mut self) {
        // A still-running print job keeps going; only our handle is dropped.
        self.child = None;
    }
}
