//! Minimal PDF writer for plain-text documents.
//!
//! Lays out lines of text top to bottom on A4 pages using the standard
//! Helvetica fonts, which every PDF reader ships, so nothing is embedded.
//! A line starting with `# ` is set as a bold heading. Text is written in
//! `WinAnsiEncoding`, so Latin-1 letters and common typographic punctuation
//! survive as octal escapes; `₹` is spelled `Rs` and anything else the
//! encoding lacks becomes `?`.

use std::fmt::Write as _;

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN_LEFT: u32 = 50;
const TOP_BASELINE: u32 = 790;
const LEADING: u32 = 14;
const BODY_SIZE: u32 = 10;
const HEADING_SIZE: u32 = 14;
const LINES_PER_PAGE: usize = 52;

/// Render `text` into a complete PDF file.
#[must_use]
pub fn render_text(text: &str) -> Vec<u8> {
    let lines: Vec<&str> = text.lines().collect();
    let pages: Vec<&[&str]> = if lines.is_empty() {
        vec![lines.as_slice()]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let mut doc = Writer::default();

    // 1: catalog, 2: page tree, 3-4: fonts, then a page + content pair per page.
    let first_page = 5;
    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", first_page + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");

    doc.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    doc.object(
        2,
        &format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()),
    );
    doc.object(
        3,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    doc.object(
        4,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );

    for (i, page_lines) in pages.iter().enumerate() {
        let page_id = first_page + 2 * i;
        let content_id = page_id + 1;

        doc.object(
            page_id,
            &format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {content_id} 0 R >>"
            ),
        );

        let stream = content_stream(page_lines);
        doc.object(
            content_id,
            &format!(
                "<< /Length {} >>\nstream\n{stream}\nendstream",
                stream.len()
            ),
        );
    }

    doc.finish()
}

fn content_stream(lines: &[&str]) -> String {
    let mut out = String::new();
    let _ = write!(out, "BT\n{LEADING} TL\n{MARGIN_LEFT} {TOP_BASELINE} Td\n");

    for line in lines {
        let (font, size, text) = match line.strip_prefix("# ") {
            Some(heading) => ("F2", HEADING_SIZE, heading),
            None => ("F1", BODY_SIZE, *line),
        };
        let _ = writeln!(out, "/{font} {size} Tf\n({}) Tj\nT*", escape(text));
    }

    out.push_str("ET");
    out
}

/// Escape a line for a PDF literal string.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push_str("    "),
            ' '..='~' => out.push(c),
            '₹' => out.push_str("Rs"),
            _ => match win_ansi_code(c) {
                Some(code) => {
                    let _ = write!(out, "\\{code:03o}");
                }
                None => out.push('?'),
            },
        }
    }
    out
}

/// Byte for `c` in `WinAnsiEncoding`, for characters beyond ASCII.
fn win_ansi_code(c: char) -> Option<u8> {
    let code = match c {
        '\u{a0}'..='\u{ff}' => return u8::try_from(u32::from(c)).ok(),
        '€' => 0x80,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '™' => 0x99,
        _ => return None,
    };
    Some(code)
}

/// Accumulates objects and their byte offsets for the xref table.
#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl Writer {
    fn object(&mut self, id: usize, body: &str) {
        if self.buf.is_empty() {
            self.buf.extend_from_slice(b"%PDF-1.4\n");
        }
        self.offsets.push((id, self.buf.len()));
        self.buf
            .extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    fn finish(mut self) -> Vec<u8> {
        self.offsets.sort_unstable_by_key(|&(id, _)| id);
        let size = self.offsets.len() + 1;
        let xref_at = self.buf.len();

        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for (_, offset) in &self.offsets {
            let _ = write!(xref, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n"
        );

        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}
