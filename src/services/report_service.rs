//! Patient report: a pure layout step followed by PDF rendering.
//!
//! [`build_layout`] turns a patient snapshot into a list of blocks (letterhead,
//! field table, history table, signature). [`render_pdf`] flows those blocks onto
//! A4 pages with Helvetica, breaking pages as needed.

use chrono::NaiveDate;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use crate::error::{AppError, AppResult};
use crate::models::patient::{PatientSnapshot, Priority};

// A4 in points
const PAGE_W: f32 = 595.28;
const PAGE_H: f32 = 841.89;
const MARGIN_LEFT: f32 = 40.0;
const MARGIN_RIGHT: f32 = 40.0;
const MARGIN_TOP: f32 = 60.0;
const MARGIN_BOTTOM: f32 = 40.0;
const CELL_PAD: f32 = 4.0;
// rough Helvetica advance width relative to font size
const CHAR_WIDTH: f32 = 0.52;

const EMPTY_HISTORY: &str = "Belum terdapat riwayat kondisi yang tercatat dalam sistem.";

#[derive(Debug, Clone)]
pub struct Letterhead {
    pub hospital_name: String,
    pub city: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text {
        text: String,
        size: f32,
        bold: bool,
        align: Align,
    },
    Table {
        widths: Vec<f32>,
        rows: Vec<Vec<String>>,
        header: bool,
    },
    Spacer(f32),
}

#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl ReportLayout {
    /// All text in reading order, one line per text block or table row.
    pub fn plain_text(&self) -> String {
        let mut out = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Text { text, .. } => out.push(text.clone()),
                Block::Table { rows, .. } => out.extend(rows.iter().map(|r| r.join(" | "))),
                Block::Spacer(_) => {}
            }
        }
        out.join("\n")
    }
}

fn text(text: impl Into<String>, size: f32, bold: bool, align: Align) -> Block {
    Block::Text {
        text: text.into(),
        size,
        bold,
        align,
    }
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

pub fn priority_label(level: i64) -> &'static str {
    Priority::from_level(level).map(Priority::label).unwrap_or("-")
}

pub fn build_layout(snapshot: &PatientSnapshot, letterhead: &Letterhead, date: NaiveDate) -> ReportLayout {
    let patient = &snapshot.patient;
    let hospital = &snapshot.hospital;
    let name = letterhead.hospital_name.as_str();

    let mut blocks = vec![
        text(name.to_uppercase(), 16.0, true, Align::Center),
        Block::Spacer(6.0),
        text("LAPORAN MEDIS PASIEN", 16.0, true, Align::Center),
        Block::Spacer(6.0),
        text(hospital.address.clone(), 10.0, false, Align::Center),
        text(hospital.phone_number.clone(), 10.0, false, Align::Center),
        Block::Spacer(20.0),
        text("Dengan hormat,", 11.0, false, Align::Left),
        Block::Spacer(8.0),
        text(
            format!(
                "Dokumen ini merupakan laporan resmi yang disusun oleh tim medis {name} sebagai \
                 bentuk pertanggungjawaban terhadap layanan dan penanganan medis yang telah \
                 diberikan kepada pasien berikut. Semua informasi yang tercantum bersumber dari \
                 pencatatan selama proses observasi dan perawatan."
            ),
            11.0,
            false,
            Align::Left,
        ),
        Block::Spacer(20.0),
    ];

    let fields = vec![
        vec!["Nama Pasien".to_string(), patient.name.clone()],
        vec!["Key Akses".to_string(), patient.access_key.clone()],
        vec!["Kondisi Terakhir".to_string(), or_dash(&patient.condition)],
        vec!["Terakhir Diperbarui".to_string(), or_dash(&patient.last_updated)],
        vec!["Nama Keluarga".to_string(), or_dash(&patient.family_member_name)],
        vec!["Nomor Darurat".to_string(), or_dash(&patient.emergency_phone_number)],
        vec!["Nomor KTP".to_string(), or_dash(&patient.id_card_number)],
        vec!["Alamat".to_string(), or_dash(&patient.address)],
        vec!["Dokter Penanggung Jawab".to_string(), or_dash(&patient.doctor_name)],
        vec!["Prioritas".to_string(), priority_label(patient.priority).to_string()],
    ];
    blocks.push(Block::Table {
        widths: vec![160.0, 320.0],
        rows: fields,
        header: false,
    });
    blocks.push(Block::Spacer(20.0));

    blocks.push(text("Riwayat Kondisi Pasien", 13.0, true, Align::Left));
    blocks.push(Block::Spacer(8.0));
    if snapshot.history.is_empty() {
        blocks.push(text(EMPTY_HISTORY, 10.0, false, Align::Left));
    } else {
        let mut rows = vec![vec!["Tanggal & Waktu".to_string(), "Kondisi".to_string()]];
        rows.extend(
            snapshot
                .history
                .iter()
                .map(|h| vec![h.timestamp.clone(), h.condition.clone()]),
        );
        blocks.push(Block::Table {
            widths: vec![200.0, 280.0],
            rows,
            header: true,
        });
    }

    blocks.extend([
        Block::Spacer(30.0),
        text(
            "Demikian laporan ini kami sampaikan untuk digunakan sebagaimana mestinya. Kami \
             menyatakan bahwa informasi dalam laporan ini benar dan telah diverifikasi oleh \
             pihak yang berwenang.",
            11.0,
            false,
            Align::Left,
        ),
        Block::Spacer(12.0),
        text(
            format!("{}, {}", letterhead.city, date.format("%d %B %Y")),
            11.0,
            false,
            Align::Left,
        ),
        Block::Spacer(36.0),
        text("Hormat kami,", 11.0, false, Align::Left),
        text(format!("Tim Medis {name}"), 11.0, true, Align::Left),
    ]);

    ReportLayout {
        title: format!("Laporan {}", patient.name),
        blocks,
    }
}

/// Greedy word wrap using an estimated glyph width. Words wider than a line are split.
fn wrap(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * CHAR_WIDTH)).floor() as usize).max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;
        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                let needed = if current_len == 0 {
                    piece.len()
                } else {
                    current_len + 1 + piece.len()
                };
                if needed > max_chars && current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.extend(piece);
                current_len += piece.len();
            }
        }
        lines.push(current);
    }
    lines
}

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    // baseline cursor in points from the bottom edge
    y: f32,
    pages: usize,
    lowest_baseline: f32,
}

impl PageWriter {
    fn new(title: &str) -> AppResult<Self> {
        let (doc, page, layer) = PdfDocument::new(title, mm(PAGE_W), mm(PAGE_H), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::Report(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::Report(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_H - MARGIN_TOP,
            pages: 1,
            lowest_baseline: PAGE_H,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(mm(PAGE_W), mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H - MARGIN_TOP;
        self.pages += 1;
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < MARGIN_BOTTOM {
            self.new_page();
        }
    }

    fn put_text(&mut self, s: &str, size: f32, bold: bool, x: f32, y: f32) {
        self.lowest_baseline = self.lowest_baseline.min(y);
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(s, size, mm(x), mm(y), font);
    }

    fn line(&self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let line = Line {
            points: vec![
                (Point::new(mm(x1), mm(y1)), false),
                (Point::new(mm(x2), mm(y2)), false),
            ],
            is_closed: false,
        };
        self.layer.add_line(line);
    }

    fn write_text(&mut self, text: &str, size: f32, bold: bool, align: Align) {
        let width = PAGE_W - MARGIN_LEFT - MARGIN_RIGHT;
        let leading = size * 1.3;
        for line in wrap(text, width, size) {
            self.ensure_space(leading);
            self.y -= leading;
            let x = match align {
                Align::Left => MARGIN_LEFT,
                Align::Center => {
                    let est = line.chars().count() as f32 * size * CHAR_WIDTH;
                    ((PAGE_W - est) / 2.0).max(MARGIN_LEFT)
                }
            };
            self.put_text(&line, size, bold, x, self.y);
        }
    }

    /// Rows taller than the space left are continued on the next page, cell lines
    /// staying side by side.
    fn write_table(&mut self, widths: &[f32], rows: &[Vec<String>], header: bool) {
        const SIZE: f32 = 10.0;
        let leading = SIZE * 1.3;
        let table_width: f32 = widths.iter().sum();

        for (index, row) in rows.iter().enumerate() {
            let bold = header && index == 0;
            let cells: Vec<Vec<String>> = widths
                .iter()
                .zip(row.iter())
                .map(|(w, cell)| wrap(cell, w - 2.0 * CELL_PAD, SIZE))
                .collect();
            let line_count = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);

            let mut start = 0;
            while start < line_count {
                let mut fits = ((self.y - MARGIN_BOTTOM - 2.0 * CELL_PAD) / leading).floor();
                if fits < 1.0 {
                    self.new_page();
                    fits = ((self.y - MARGIN_BOTTOM - 2.0 * CELL_PAD) / leading).floor();
                }
                let end = line_count.min(start + fits.max(1.0) as usize);
                let height = (end - start) as f32 * leading + 2.0 * CELL_PAD;
                let top = self.y;
                let bottom = top - height;

                let mut x = MARGIN_LEFT;
                for (w, lines) in widths.iter().zip(cells.iter()) {
                    let mut baseline = top - CELL_PAD;
                    for line in lines.iter().skip(start).take(end - start) {
                        baseline -= leading;
                        self.put_text(line, SIZE, bold, x + CELL_PAD, baseline + 3.0);
                    }
                    x += w;
                }
                self.cell_borders(widths, table_width, top, bottom);
                self.y = bottom;
                start = end;
            }
        }
    }

    fn cell_borders(&self, widths: &[f32], table_width: f32, top: f32, bottom: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None)));
        self.layer.set_outline_thickness(0.5);
        self.line(MARGIN_LEFT, top, MARGIN_LEFT + table_width, top);
        self.line(MARGIN_LEFT, bottom, MARGIN_LEFT + table_width, bottom);
        let mut x = MARGIN_LEFT;
        self.line(x, top, x, bottom);
        for w in widths {
            x += w;
            self.line(x, top, x, bottom);
        }
    }

    fn finish(self) -> AppResult<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| AppError::Report(e.to_string()))
    }
}

pub fn render_pdf(layout: &ReportLayout) -> AppResult<Vec<u8>> {
    lay_out_pages(layout)?.finish()
}

fn lay_out_pages(layout: &ReportLayout) -> AppResult<PageWriter> {
    let mut writer = PageWriter::new(&layout.title)?;
    for block in &layout.blocks {
        match block {
            Block::Text {
                text,
                size,
                bold,
                align,
            } => writer.write_text(text, *size, *bold, *align),
            Block::Table {
                widths,
                rows,
                header,
            } => writer.write_table(widths, rows, *header),
            Block::Spacer(h) => {
                if writer.y - h < MARGIN_BOTTOM {
                    writer.new_page();
                } else {
                    writer.y -= h;
                }
            }
        }
    }
    Ok(writer)
}

/// Layout and render in one go; runs on the blocking pool.
pub async fn generate_report(
    snapshot: PatientSnapshot,
    letterhead: Letterhead,
    date: NaiveDate,
) -> AppResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || render_pdf(&build_layout(&snapshot, &letterhead, date)))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

/// `Laporan_<name>.pdf`, restricted to characters safe in a header value.
pub fn report_filename(patient_name: &str) -> String {
    let cleaned: String = patient_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("Laporan_{cleaned}.pdf")
}
