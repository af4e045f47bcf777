//! # Minimal PDF Writer
//!
//! Just enough of PDF 1.4 to print dealership paperwork: the three standard
//! Helvetica faces, filled and stroked rectangles, uncompressed RGB images
//! and any number of US Letter pages.
//!
//! ## File Layout
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ %PDF-1.4                                     │
//! │ 1 Catalog ─► 2 Pages ─► page, page, ...      │
//! │ 3..5 Helvetica / -Bold / -Oblique (WinAnsi)  │
//! │ 6 Info                                       │
//! │ 7.. image XObjects                           │
//! │ page + content stream pairs                  │
//! │ xref table, trailer, startxref               │
//! │ %%EOF                                        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Coordinates are PDF points with the origin at the bottom-left corner.
//! Text is WinAnsi encoded, so Spanish accents print correctly; characters
//! outside that set become `?`.

use image::DynamicImage;

/// US Letter width in points.
pub const PAGE_WIDTH: f32 = 612.0;

/// US Letter height in points.
pub const PAGE_HEIGHT: f32 = 792.0;

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FIRST_FONT_ID: usize = 3;
const INFO_ID: usize = 6;
const FIRST_IMAGE_ID: usize = 7;

// =============================================================================
// Fonts and Colours
// =============================================================================

/// Standard Type 1 faces, available in every PDF viewer without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Oblique];

    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Oblique => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Oblique => "Helvetica-Oblique",
        }
    }
}

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const WHITE: Color = Color(0xFF, 0xFF, 0xFF);

    /// `0xRRGGBB`.
    pub const fn hex(value: u32) -> Self {
        Color((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    fn operands(self) -> String {
        format!(
            "{:.3} {:.3} {:.3}",
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0
        )
    }
}

// Helvetica advance widths (1/1000 em) for ' ' through '~'.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Width of `text` set in `font` at `size` points.
///
/// Bold is approximated from the regular metrics; accented letters take
/// the width of their base letter.
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c))).sum();
    let scale = if font == Font::Bold { 1.06 } else { 1.0 };
    units as f32 * size / 1000.0 * scale
}

fn char_width(c: char) -> u16 {
    let base = fold_accent(c).unwrap_or(c);
    match base {
        ' '..='~' => HELVETICA_WIDTHS[base as usize - 0x20],
        _ => 556,
    }
}

fn fold_accent(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        _ => return None,
    };
    Some(folded)
}

/// Encodes `text` as a PDF literal string body (without the parentheses).
///
/// The result is pure ASCII: WinAnsi bytes above 0x7F are written as octal
/// escapes.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\t' | '\n' | '\r' => out.push(' '),
            _ => match win_ansi_byte(c) {
                Some(byte) => out.push_str(&format!("\\{:03o}", byte)),
                None => out.push('?'),
            },
        }
    }
    out
}

fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        '\u{00A0}'..='\u{00FF}' => Some(c as u32 as u8),
        '€' => Some(0x80),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        _ => None,
    }
}

// =============================================================================
// Images
// =============================================================================

/// Raw 8-bit RGB raster, stored uncompressed in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl PdfImage {
    /// `None` unless `rgb` holds exactly `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, rgb: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(3)?;
        (width > 0 && height > 0 && rgb.len() == expected).then_some(PdfImage {
            width,
            height,
            rgb,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl From<&DynamicImage> for PdfImage {
    fn from(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        PdfImage {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
        }
    }
}

/// Handle returned by [`PdfDocument::add_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageId(usize);

// =============================================================================
// Document
// =============================================================================

/// A PDF under construction. Drawing calls go to the last page.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    title: String,
    pages: Vec<String>,
    images: Vec<PdfImage>,
}

impl PdfDocument {
    /// Creates a document with one empty page.
    pub fn new(title: impl Into<String>) -> Self {
        PdfDocument {
            title: title.into(),
            pages: vec![String::new()],
            images: Vec::new(),
        }
    }

    pub fn add_page(&mut self) {
        self.pages.push(String::new());
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Registers an image; draw it with [`PdfDocument::draw_image`].
    pub fn add_image(&mut self, image: PdfImage) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len())
    }

    /// Writes `text` with its baseline starting at `(x, y)`.
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Color, text: &str) {
        let op = format!(
            "BT /{} {:.1} Tf {} rg {:.2} {:.2} Td ({}) Tj ET\n",
            font.resource(),
            size,
            color.operands(),
            x,
            y,
            encode_text(text)
        );
        self.current_page().push_str(&op);
    }

    /// Fills the rectangle whose bottom-left corner is `(x, y)`.
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let op = format!(
            "q {} rg {:.2} {:.2} {:.2} {:.2} re f Q\n",
            color.operands(),
            x,
            y,
            width,
            height
        );
        self.current_page().push_str(&op);
    }

    /// Outlines the rectangle whose bottom-left corner is `(x, y)`.
    pub fn stroke_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        line_width: f32,
    ) {
        let op = format!(
            "q {} RG {:.2} w {:.2} {:.2} {:.2} {:.2} re S Q\n",
            color.operands(),
            line_width,
            x,
            y,
            width,
            height
        );
        self.current_page().push_str(&op);
    }

    /// Paints a registered image scaled into the given box.
    pub fn draw_image(&mut self, id: ImageId, x: f32, y: f32, width: f32, height: f32) {
        let op = format!(
            "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im{} Do Q\n",
            width, height, x, y, id.0
        );
        self.current_page().push_str(&op);
    }

    fn current_page(&mut self) -> &mut String {
        if self.pages.is_empty() {
            self.pages.push(String::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Serialises the document.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ObjectWriter::new();

        let first_page_id = FIRST_IMAGE_ID + self.images.len();
        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| first_page_id + i * 2).collect();

        w.object(&format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID));
        debug_assert_eq!(w.last_id(), CATALOG_ID);

        let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        w.object(&format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_ids.len()
        ));

        for font in Font::ALL {
            w.object(&format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            ));
        }

        w.object(&format!(
            "<< /Title ({}) /Producer (AutoGest) >>",
            encode_text(&self.title)
        ));
        debug_assert_eq!(w.last_id(), INFO_ID);

        for image in &self.images {
            w.stream(
                &format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8",
                    image.width, image.height
                ),
                &image.rgb,
            );
        }

        let resources = self.resources();
        for (page, page_id) in self.pages.iter().zip(&page_ids) {
            w.object(&format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} /Contents {} 0 R >>",
                PAGES_ID,
                PAGE_WIDTH,
                PAGE_HEIGHT,
                resources,
                page_id + 1
            ));
            w.stream("", page.as_bytes());
        }

        w.finish()
    }

    fn resources(&self) -> String {
        let fonts: Vec<String> = Font::ALL
            .iter()
            .enumerate()
            .map(|(i, font)| format!("/{} {} 0 R", font.resource(), FIRST_FONT_ID + i))
            .collect();

        if self.images.is_empty() {
            return format!("<< /Font << {} >> >>", fonts.join(" "));
        }

        let images: Vec<String> = (0..self.images.len())
            .map(|i| format!("/Im{} {} 0 R", i + 1, FIRST_IMAGE_ID + i))
            .collect();

        format!(
            "<< /Font << {} >> /XObject << {} >> >>",
            fonts.join(" "),
            images.join(" ")
        )
    }
}

/// Appends numbered objects and remembers their byte offsets for the xref.
struct ObjectWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn new() -> Self {
        let mut out = Vec::with_capacity(4096);
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        ObjectWriter {
            out,
            offsets: Vec::new(),
        }
    }

    fn last_id(&self) -> usize {
        self.offsets.len()
    }

    fn begin(&mut self) {
        self.offsets.push(self.out.len());
        let header = format!("{} 0 obj\n", self.offsets.len());
        self.out.extend_from_slice(header.as_bytes());
    }

    fn object(&mut self, body: &str) {
        self.begin();
        self.out.extend_from_slice(body.as_bytes());
        self.out.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, dict_entries: &str, data: &[u8]) {
        self.begin();
        let dict = if dict_entries.is_empty() {
            format!("<< /Length {} >>\nstream\n", data.len())
        } else {
            format!("<< {} /Length {} >>\nstream\n", dict_entries, data.len())
        };
        self.out.extend_from_slice(dict.as_bytes());
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.out.len();
        let count = self.offsets.len() + 1;

        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", count);
        for offset in &self.offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            count, CATALOG_ID, INFO_ID, xref_offset
        ));

        self.out.extend_from_slice(xref.as_bytes());
        self.out
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
