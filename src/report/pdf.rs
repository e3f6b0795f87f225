//! 使用 printpdf 将 [`Report`] 排版为 A4 PDF

use log::{debug, warn};
use printpdf::image_crate::{self, GenericImageView};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rgb,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::{Block, Report};
use crate::errors::{ReportError, Result};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const PT_TO_MM: f32 = 0.3528;
/// Helvetica 平均字宽约为字号的一半
const AVG_CHAR_WIDTH: f32 = 0.5;

const TITLE_SIZE: f32 = 20.0;
const SECTION_SIZE: f32 = 14.0;
const HEADING_SIZE: f32 = 11.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 9.0;
const ROW_HEIGHT: f32 = 6.0;

const IMAGE_WIDTH: f32 = 170.0;

fn pdf_err<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::PdfError(e.to_string())
}

/// 内置字体仅支持 WinAnsi，超出 ASCII 的字符做替换
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{20B9}' => out.push_str("Rs "),
            '\u{2026}' => out.push_str("..."),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c if c.is_whitespace() => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}

/// 按近似字宽折行
pub fn wrap_text(text: &str, font_size: f32, width_mm: f32) -> Vec<String> {
    let char_mm = font_size * PT_TO_MM * AVG_CHAR_WIDTH;
    let max_chars = ((width_mm / char_mm).floor() as usize).max(1);

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            lines.push(head);
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate(text: &str, font_size: f32, width_mm: f32) -> String {
    let char_mm = font_size * PT_TO_MM * AVG_CHAR_WIDTH;
    let max_chars = ((width_mm / char_mm).floor() as usize).max(1);
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut s: String = text.chars().take(max_chars.saturating_sub(2)).collect();
        s.push_str("..");
        s
    }
}

struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// 当前基线位置（距页面底部）
    y: f32,
    pages: usize,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(sanitize_text(text), size, Mm(x), Mm(self.y), font);
    }

    fn line_height(size: f32) -> f32 {
        size * PT_TO_MM * 1.4
    }

    fn rule(&self, y: f32, thickness: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.6, 0.6, 0.6, None)));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    fn title(&mut self, title: &str, subtitle: &str) {
        self.y -= Self::line_height(TITLE_SIZE);
        self.text(title, TITLE_SIZE, MARGIN, true);
        self.y -= Self::line_height(HEADING_SIZE);
        self.text(subtitle, HEADING_SIZE, MARGIN, false);
        self.y -= 4.0;
        self.rule(self.y, 0.8);
        self.y -= 4.0;
    }

    fn section(&mut self, title: &str) {
        self.ensure_space(Self::line_height(SECTION_SIZE) + ROW_HEIGHT * 3.0);
        self.y -= Self::line_height(SECTION_SIZE) + 2.0;
        self.text(title, SECTION_SIZE, MARGIN, true);
        self.y -= 2.0;
    }

    fn heading(&mut self, text: &str) {
        self.ensure_space(Self::line_height(HEADING_SIZE) + ROW_HEIGHT * 2.0);
        self.y -= Self::line_height(HEADING_SIZE) + 1.0;
        self.text(text, HEADING_SIZE, MARGIN, true);
        self.y -= 1.0;
    }

    fn paragraph(&mut self, text: &str, size: f32, indent: f32) {
        for line in wrap_text(&sanitize_text(text), size, CONTENT_WIDTH - indent) {
            self.ensure_space(Self::line_height(size));
            self.y -= Self::line_height(size);
            self.text(&line, size, MARGIN + indent, false);
        }
    }

    fn table(&mut self, widths: &[f32], header: &[String], rows: &[Vec<String>]) {
        let total: f32 = widths.iter().sum::<f32>().max(f32::EPSILON);
        let cols: Vec<f32> = widths.iter().map(|w| w / total * CONTENT_WIDTH).collect();

        self.table_header(&cols, header);
        for row in rows {
            if self.y - ROW_HEIGHT < MARGIN {
                self.new_page();
                self.table_header(&cols, header);
            }
            self.y -= ROW_HEIGHT;
            self.table_row(&cols, row, false);
        }
        self.y -= 2.0;
        self.rule(self.y + 1.0, 0.3);
    }

    fn table_header(&mut self, cols: &[f32], header: &[String]) {
        self.ensure_space(ROW_HEIGHT * 2.0);
        self.y -= ROW_HEIGHT;
        self.table_row(cols, header, true);
        self.rule(self.y - 1.5, 0.5);
        self.y -= 1.0;
    }

    fn table_row(&self, cols: &[f32], cells: &[String], bold: bool) {
        let mut x = MARGIN;
        for (width, cell) in cols.iter().zip(cells) {
            let cell = truncate(&sanitize_text(cell), TABLE_SIZE, width - 2.0);
            self.text(&cell, TABLE_SIZE, x + 1.0, bold);
            x += width;
        }
    }

    fn image(&mut self, path: &Path, caption: &str) {
        let img = match image_crate::open(path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Failed to load chart {}: {}", path.display(), e);
                self.paragraph(&format!("[Chart unavailable: {}]", caption), BODY_SIZE, 0.0);
                return;
            }
        };

        let (w, h) = img.dimensions();
        let (px_w, px_h) = (w.max(1) as f32, h.max(1) as f32);
        let dpi = px_w * 25.4 / IMAGE_WIDTH;
        let height = px_h / dpi * 25.4;

        self.ensure_space(height + Self::line_height(BODY_SIZE) + 4.0);
        self.y -= Self::line_height(BODY_SIZE);
        self.text(caption, BODY_SIZE, MARGIN, true);
        self.y -= height + 2.0;

        Image::from_dynamic_image(&img).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN + (CONTENT_WIDTH - IMAGE_WIDTH) / 2.0)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.y -= 4.0;
    }

    fn bullets(&mut self, items: &[(String, String)]) {
        for (text, source) in items {
            let line = if source.is_empty() {
                format!("- {}", text)
            } else {
                format!("- {} ({})", text, source)
            };
            self.paragraph(&line, BODY_SIZE, 2.0);
            self.y -= 1.0;
        }
    }

    fn save(self, path: &Path) -> Result<usize> {
        let pages = self.pages;
        let file = File::create(path)?;
        self.doc.save(&mut BufWriter::new(file)).map_err(pdf_err)?;
        Ok(pages)
    }
}

/// Lays out the report on A4 pages and writes it to `path`. Any failure here is fatal.
pub fn render_pdf(report: &Report, path: &Path) -> Result<()> {
    let mut writer = PdfWriter::new(&report.title)?;
    writer.title(&report.title, &report.subtitle);

    for section in &report.sections {
        writer.section(&section.title);
        for block in &section.blocks {
            match block {
                Block::Heading(text) => writer.heading(text),
                Block::Paragraph(text) => writer.paragraph(text, BODY_SIZE, 0.0),
                Block::Table { widths, header, rows } => writer.table(widths, header, rows),
                Block::Image { path, caption } => writer.image(path, caption),
                Block::Bullets(items) => writer.bullets(items),
            }
        }
    }

    let pages = writer.save(path)?;
    debug!("Wrote {} page(s) to {}", pages, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Section;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn sanitize_replaces_non_ascii() {
        assert_eq!(sanitize_text("Sensex \u{2013} up"), "Sensex - up");
        assert_eq!(sanitize_text("\u{20B9}100"), "Rs 100");
        assert_eq!(sanitize_text("\u{4E2D}"), "?");
    }

    #[test]
    fn wrap_respects_width() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let lines = wrap_text(text, 10.0, 30.0);
        assert!(lines.len() > 1);
        let max_chars = (30.0 / (10.0 * PT_TO_MM * AVG_CHAR_WIDTH)).floor() as usize;
        assert!(lines.iter().all(|l| l.chars().count() <= max_chars));
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn renders_multi_page_report() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<Vec<String>> = (0..120)
            .map(|i| vec![format!("Row {}", i), format!("{:.2}", i as f64)])
            .collect();
        let report = Report {
            title: "Daily Financial Market Report".to_string(),
            subtitle: "Tuesday, 04 March 2025".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
            sections: vec![Section {
                title: "Market Overview".to_string(),
                blocks: vec![
                    Block::Heading("Indian Indices".to_string()),
                    Block::Table { widths: vec![2.0, 1.0], header: vec!["Name".into(), "Close".into()], rows },
                    Block::Image { path: dir.path().join("missing.png"), caption: "Missing".to_string() },
                    Block::Bullets(vec![("Markets rally".to_string(), "Mint".to_string())]),
                ],
            }],
        };

        let path = dir.path().join(report.file_name());
        render_pdf(&report, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn unwritable_target_is_an_error() {
        let dir = TempDir::new().unwrap();
        let report = Report {
            title: "Daily Financial Market Report".to_string(),
            subtitle: String::new(),
            date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
            sections: Vec::new(),
        };
        let target = dir.path().join("no_such_dir").join("report.pdf");
        assert!(render_pdf(&report, &target).is_err());
    }
}
