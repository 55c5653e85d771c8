//! Positioned text extraction from a single PDF page using lopdf
//!
//! Table detection needs to know where each piece of text sits on the page, so
//! the content stream is interpreted just far enough to track the text and
//! transformation matrices.

use crate::ScrapeError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

/// TJ displacement (thousandths of an em) treated as a word gap
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// A text item with position information
#[derive(Debug, Clone)]
pub struct TextItem {
    /// The text content
    pub text: String,
    /// X position on page
    pub x: f32,
    /// Y position on page (PDF coordinates, origin at bottom-left)
    pub y: f32,
    /// Font size after text matrix scaling
    pub font_size: f32,
    /// Page number (1-indexed)
    pub page: u32,
}

/// A line of text (grouped text items)
#[derive(Debug, Clone)]
pub struct TextLine {
    pub items: Vec<TextItem>,
    pub y: f32,
    pub page: u32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|i| i.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Document, ScrapeError> {
    Ok(Document::load(path)?)
}

pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

/// Extract positioned text items from the page at a 0-based index
///
/// Returns an empty list when the document has no such page.
pub fn extract_page_items(doc: &Document, page_index: usize) -> Result<Vec<TextItem>, ScrapeError> {
    match doc.get_pages().into_iter().nth(page_index) {
        Some((page_num, page_id)) => extract_page_text_items(doc, page_id, page_num),
        None => Ok(Vec::new()),
    }
}

/// Plain text of a page: its lines joined with newlines
pub fn page_text(items: &[TextItem]) -> String {
    group_into_lines(items.to_vec())
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Text and graphics state while walking one content stream
struct TextState {
    ctm: [f32; 6],
    ctm_stack: Vec<[f32; 6]>,
    font: String,
    font_size: f32,
    leading: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    in_text_block: bool,
}

impl TextState {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            font: String::new(),
            font_size: 12.0,
            leading: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            in_text_block: false,
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        let translation = [1.0, 0.0, 0.0, 1.0, tx, ty];
        self.line_matrix = multiply_matrices(&translation, &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading > 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    fn item(&self, text: String, page: u32) -> TextItem {
        let combined = multiply_matrices(&self.text_matrix, &self.ctm);
        TextItem {
            text,
            x: combined[4],
            y: combined[5],
            font_size: effective_font_size(self.font_size, &self.text_matrix),
            page,
        }
    }
}

/// Extract text items from a single page
fn extract_page_text_items(
    doc: &Document,
    page_id: ObjectId,
    page_num: u32,
) -> Result<Vec<TextItem>, ScrapeError> {
    use lopdf::content::Content;

    let mut items = Vec::new();
    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
    let content_data = doc.get_page_content(page_id)?;
    let content = Content::decode(&content_data)?;

    let mut state = TextState::new();

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => state.ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(saved) = state.ctm_stack.pop() {
                    state.ctm = saved;
                }
            }
            "cm" if operands.len() >= 6 => {
                let matrix = read_matrix(operands);
                state.ctm = multiply_matrices(&matrix, &state.ctm);
            }
            "BT" => {
                state.in_text_block = true;
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "ET" => state.in_text_block = false,
            "Tf" if operands.len() >= 2 => {
                if let Ok(name) = operands[0].as_name() {
                    state.font = String::from_utf8_lossy(name).to_string();
                }
                if let Some(size) = get_number(&operands[1]) {
                    state.font_size = size;
                }
            }
            "TL" if !operands.is_empty() => {
                state.leading = get_number(&operands[0]).unwrap_or(0.0);
            }
            "Td" | "TD" if operands.len() >= 2 => {
                let tx = get_number(&operands[0]).unwrap_or(0.0);
                let ty = get_number(&operands[1]).unwrap_or(0.0);
                if op.operator == "TD" {
                    state.leading = -ty;
                }
                state.move_line(tx, ty);
            }
            "Tm" if operands.len() >= 6 => {
                state.text_matrix = read_matrix(operands);
                state.line_matrix = state.text_matrix;
            }
            "T*" => state.next_line(),
            "Tj" if state.in_text_block && !operands.is_empty() => {
                let text = decode_operand(&operands[0], doc, &fonts, &state.font);
                push_text(&mut items, &state, text, page_num);
            }
            "TJ" if state.in_text_block && !operands.is_empty() => {
                if let Ok(array) = operands[0].as_array() {
                    let mut combined = String::new();
                    for element in array {
                        match get_number(element) {
                            Some(offset) if offset < TJ_SPACE_THRESHOLD => combined.push(' '),
                            Some(_) => {}
                            None => {
                                if let Some(text) =
                                    decode_operand(element, doc, &fonts, &state.font)
                                {
                                    combined.push_str(&text);
                                }
                            }
                        }
                    }
                    push_text(&mut items, &state, Some(combined), page_num);
                }
            }
            "'" if !operands.is_empty() => {
                state.next_line();
                let text = decode_operand(&operands[0], doc, &fonts, &state.font);
                push_text(&mut items, &state, text, page_num);
            }
            "\"" if operands.len() >= 3 => {
                state.next_line();
                let text = decode_operand(&operands[2], doc, &fonts, &state.font);
                push_text(&mut items, &state, text, page_num);
            }
            _ => {}
        }
    }

    Ok(items)
}

fn push_text(items: &mut Vec<TextItem>, state: &TextState, text: Option<String>, page: u32) {
    if let Some(text) = text {
        if !text.trim().is_empty() {
            items.push(state.item(text, page));
        }
    }
}

fn read_matrix(operands: &[Object]) -> [f32; 6] {
    let mut matrix = IDENTITY;
    for (i, operand) in operands.iter().take(6).enumerate() {
        if let Some(value) = get_number(operand) {
            matrix[i] = value;
        }
    }
    matrix
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Compute effective font size from base size and text matrix
fn effective_font_size(base_size: f32, text_matrix: &[f32; 6]) -> f32 {
    let scale_x = (text_matrix[0].powi(2) + text_matrix[1].powi(2)).sqrt();
    let scale_y = (text_matrix[2].powi(2) + text_matrix[3].powi(2)).sqrt();
    base_size * scale_x.max(scale_y)
}

/// Decode a string operand with the current font's encoding
fn decode_operand(
    obj: &Object,
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    current_font: &str,
) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };

    if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
        if let Ok(encoding) = font_dict.get_font_encoding(doc) {
            if let Ok(text) = Document::decode_text(&encoding, bytes) {
                return Some(text);
            }
        }
    }

    // Fallback: UTF-16BE with BOM, then Latin-1
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&utf16));
    }

    Some(bytes.iter().map(|&b| b as char).collect())
}

/// Group items into lines, page by page, top to bottom
pub fn group_into_lines(mut items: Vec<TextItem>) -> Vec<TextLine> {
    // Sort by page, then Y descending, then X
    items.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let y_tolerance = 3.0;
    let mut lines: Vec<TextLine> = Vec::new();

    for item in items {
        match lines.last_mut() {
            Some(line) if line.page == item.page && (line.y - item.y).abs() < y_tolerance => {
                line.items.push(item);
            }
            _ => {
                let (y, page) = (item.y, item.page);
                lines.push(TextLine {
                    items: vec![item],
                    y,
                    page,
                });
            }
        }
    }

    for line in &mut lines {
        line.items
            .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    lines
}
