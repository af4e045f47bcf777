//! Top-down page flow on top of [`PdfDocument`].
//!
//! Blocks are stacked from the top margin down; a block that does not fit
//! on the current page starts a new one. Table headers repeat after a
//! page break.

use crate::pdf::{text_width, Color, Font, PdfDocument, PdfImage, PAGE_HEIGHT, PAGE_WIDTH};

pub(crate) const MARGIN: f32 = 50.0;
pub(crate) const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const INK: Color = Color::hex(0x1F2937);
const INK_SOFT: Color = Color::hex(0x374151);
const MUTED: Color = Color::hex(0x6B7280);
const ACCENT: Color = Color::hex(0x3B82F6);
const TOTAL: Color = Color::hex(0x10B981);
const STRIPE: Color = Color::hex(0xF9FAFB);
const GRID: Color = Color::hex(0xE5E7EB);

const LABEL_WIDTH: f32 = 144.0;
const FIELD_ROW_HEIGHT: f32 = 30.0;
const HEADER_ROW_HEIGHT: f32 = 28.0;
const DATA_ROW_HEIGHT: f32 = 22.0;
const CELL_PADDING: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Center,
}

/// One column of a [`Flow::grid_table`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Column<'a> {
    pub title: &'a str,
    pub width: f32,
    pub align: Align,
}

pub(crate) struct Flow {
    doc: PdfDocument,
    /// Distance from the top edge of the page to the next free line.
    top: f32,
}

impl Flow {
    pub fn new(title: &str) -> Self {
        Flow {
            doc: PdfDocument::new(title),
            top: MARGIN,
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.doc.to_bytes()
    }

    #[cfg(test)]
    pub fn page_count(&self) -> usize {
        self.doc.page_count()
    }

    /// Starts a new page unless `height` more points fit on this one.
    fn ensure(&mut self, height: f32) -> bool {
        if self.top + height <= PAGE_HEIGHT - MARGIN {
            return false;
        }
        self.doc.add_page();
        self.top = MARGIN;
        true
    }

    /// PDF y of the baseline that vertically centres `size` text in a box.
    fn baseline(box_top: f32, box_height: f32, size: f32) -> f32 {
        PAGE_HEIGHT - (box_top + box_height / 2.0 + size * 0.35)
    }

    /// PDF y of the bottom edge of a box.
    fn bottom(box_top: f32, box_height: f32) -> f32 {
        PAGE_HEIGHT - box_top - box_height
    }

    fn centered_line(&mut self, text: &str, font: Font, size: f32, color: Color, after: f32) {
        let height = size * 1.25;
        self.ensure(height);

        let text = fit(text, font, size, CONTENT_WIDTH);
        let x = MARGIN + (CONTENT_WIDTH - text_width(&text, font, size)) / 2.0;
        let y = Self::baseline(self.top, height, size);
        self.doc.text(x, y, font, size, color, &text);

        self.top += height + after;
    }

    pub fn title(&mut self, text: &str) {
        self.centered_line(text, Font::Bold, 24.0, INK, 18.0);
    }

    pub fn subtitle(&mut self, text: &str) {
        self.centered_line(text, Font::Oblique, 10.0, MUTED, 20.0);
    }

    pub fn heading(&mut self, text: &str) {
        let size = 14.0;
        let height = size * 1.25;
        // Keep a heading with at least one row of what follows
        self.ensure(height + 12.0 + FIELD_ROW_HEIGHT);

        let y = Self::baseline(self.top, height, size);
        self.doc.text(MARGIN, y, Font::Bold, size, ACCENT, text);
        self.top += height + 12.0;
    }

    pub fn paragraph(&mut self, text: &str) {
        let size = 10.0;
        let height = size * 1.4;
        self.ensure(height);

        let text = fit(text, Font::Regular, size, CONTENT_WIDTH);
        let y = Self::baseline(self.top, height, size);
        self.doc.text(MARGIN, y, Font::Regular, size, INK, &text);
        self.top += height;
    }

    pub fn note(&mut self, text: &str) {
        let size = 10.0;
        let height = size * 1.4;
        self.ensure(height);

        let y = Self::baseline(self.top, height, size);
        self.doc.text(MARGIN, y, Font::Oblique, size, INK, text);
        self.top += height;
    }

    pub fn spacer(&mut self, height: f32) {
        self.top += height;
    }

    /// Two-column "Label: value" table.
    pub fn field_table(&mut self, rows: &[(&str, String)]) {
        let value_width = CONTENT_WIDTH - LABEL_WIDTH;
        let size = 11.0;

        for (i, (label, value)) in rows.iter().enumerate() {
            self.ensure(FIELD_ROW_HEIGHT);
            let bottom = Self::bottom(self.top, FIELD_ROW_HEIGHT);
            let baseline = Self::baseline(self.top, FIELD_ROW_HEIGHT, size);
            let value_fill = if i % 2 == 1 { STRIPE } else { Color::WHITE };

            self.doc.fill_rect(MARGIN, bottom, LABEL_WIDTH, FIELD_ROW_HEIGHT, STRIPE);
            self.doc.fill_rect(
                MARGIN + LABEL_WIDTH,
                bottom,
                value_width,
                FIELD_ROW_HEIGHT,
                value_fill,
            );
            self.doc.stroke_rect(MARGIN, bottom, LABEL_WIDTH, FIELD_ROW_HEIGHT, GRID, 1.0);
            self.doc.stroke_rect(
                MARGIN + LABEL_WIDTH,
                bottom,
                value_width,
                FIELD_ROW_HEIGHT,
                GRID,
                1.0,
            );

            let label = fit(label, Font::Bold, size, LABEL_WIDTH - 2.0 * CELL_PADDING);
            let value = fit(value, Font::Regular, size, value_width - 2.0 * CELL_PADDING);
            self.doc.text(MARGIN + CELL_PADDING, baseline, Font::Bold, size, INK, &label);
            self.doc.text(
                MARGIN + LABEL_WIDTH + CELL_PADDING,
                baseline,
                Font::Regular,
                size,
                INK_SOFT,
                &value,
            );

            self.top += FIELD_ROW_HEIGHT;
        }
    }

    /// Multi-column table with a coloured header row.
    pub fn grid_table(&mut self, columns: &[Column<'_>], rows: &[Vec<String>]) {
        self.ensure(HEADER_ROW_HEIGHT + DATA_ROW_HEIGHT);
        self.grid_header(columns);

        for (i, row) in rows.iter().enumerate() {
            if self.ensure(DATA_ROW_HEIGHT) {
                self.grid_header(columns);
            }

            let fill = if i % 2 == 1 { STRIPE } else { Color::WHITE };
            let cells = columns.iter().map(|c| (c.width, c.align));
            let texts = row.iter().map(String::as_str);
            self.grid_row(cells, texts, DATA_ROW_HEIGHT, Font::Regular, 9.0, INK, fill);
        }
    }

    fn grid_header(&mut self, columns: &[Column<'_>]) {
        let cells = columns.iter().map(|c| (c.width, Align::Center));
        let titles = columns.iter().map(|c| c.title);
        self.grid_row(cells, titles, HEADER_ROW_HEIGHT, Font::Bold, 10.0, Color::WHITE, ACCENT);
    }

    #[allow(clippy::too_many_arguments)]
    fn grid_row<'t>(
        &mut self,
        cells: impl Iterator<Item = (f32, Align)>,
        texts: impl Iterator<Item = &'t str>,
        height: f32,
        font: Font,
        size: f32,
        color: Color,
        fill: Color,
    ) {
        let bottom = Self::bottom(self.top, height);
        let baseline = Self::baseline(self.top, height, size);
        let mut x = MARGIN;

        for ((width, align), text) in cells.zip(texts) {
            self.doc.fill_rect(x, bottom, width, height, fill);
            self.doc.stroke_rect(x, bottom, width, height, GRID, 1.0);

            let text = fit(text, font, size, width - 2.0 * CELL_PADDING.min(width / 4.0));
            let text_x = match align {
                Align::Left => x + CELL_PADDING.min(width / 4.0),
                Align::Center => x + (width - text_width(&text, font, size)) / 2.0,
            };
            self.doc.text(text_x, baseline, font, size, color, &text);
            x += width;
        }

        self.top += height;
    }

    /// Full-width highlighted row, used for totals.
    pub fn banner(&mut self, label: &str, value: &str) {
        let height = 44.0;
        let size = 16.0;
        self.ensure(height);

        let bottom = Self::bottom(self.top, height);
        let baseline = Self::baseline(self.top, height, size);
        self.doc.fill_rect(MARGIN, bottom, CONTENT_WIDTH, height, TOTAL);

        let value_width = CONTENT_WIDTH - LABEL_WIDTH;
        let label_x = MARGIN + (LABEL_WIDTH - text_width(label, Font::Bold, size)) / 2.0;
        let value = fit(value, Font::Bold, size, value_width);
        let value_x =
            MARGIN + LABEL_WIDTH + (value_width - text_width(&value, Font::Bold, size)) / 2.0;

        self.doc.text(label_x, baseline, Font::Bold, size, Color::WHITE, label);
        self.doc.text(value_x, baseline, Font::Bold, size, Color::WHITE, &value);
        self.top += height;
    }

    /// Centred picture scaled to fit `max_width` × `max_height`.
    pub fn picture(&mut self, image: PdfImage, max_width: f32, max_height: f32) {
        let (w, h) = (image.width() as f32, image.height() as f32);
        let scale = (max_width / w).min(max_height / h);
        let (width, height) = (w * scale, h * scale);
        self.ensure(height);

        let id = self.doc.add_image(image);
        let x = MARGIN + (CONTENT_WIDTH - width) / 2.0;
        self.doc.draw_image(id, x, Self::bottom(self.top, height), width, height);
        self.top += height;
    }
}

/// Shortens `text` with "..." until it fits in `max_width`.
pub(crate) fn fit(text: &str, font: Font, size: f32, max_width: f32) -> String {
    if text_width(text, font, size) <= max_width {
        return text.to_string();
    }

    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if text_width(&candidate, font, size) <= max_width {
            return candidate;
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_truncates_long_text() {
        let long = "Avenida Siempre Viva 742, Springfield, Estado Desconocido";
        let fitted = fit(long, Font::Regular, 9.0, 100.0);

        assert!(fitted.ends_with("..."));
        assert!(text_width(&fitted, Font::Regular, 9.0) <= 100.0);
        assert_eq!(fit("Corto", Font::Regular, 9.0, 100.0), "Corto");
    }

    #[test]
    fn test_long_tables_break_pages() {
        let mut flow = Flow::new("Tabla");
        let columns = [Column {
            title: "ID",
            width: CONTENT_WIDTH,
            align: Align::Left,
        }];
        let rows: Vec<Vec<String>> = (0..80).map(|i| vec![i.to_string()]).collect();

        flow.grid_table(&columns, &rows);
        assert!(flow.page_count() >= 3);
    }
}
