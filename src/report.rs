//! PDF inspection report rendering
//!
//! Renders a session's chat history into a single-column PDF: a title
//! banner, then one block per turn ("OPERATOR:" for user turns, a wrapped
//! "ANALYSIS:" paragraph plus a token-count line for assistant turns).
//!
//! The built-in PDF fonts are WinAnsi-encoded, so text is sanitized to
//! Latin-1 before rendering. That sanitization is lossy by design: emoji
//! and any other code point above U+00FF come out as `?`.

use crate::error::{InspectraError, Result};
use crate::storage::MessageRecord;
use printpdf::{BuiltinFont, Color, Mm, PdfDocument, Rgb};

/// Characters per wrapped line at body font size on an A4 column
const WRAP_COLS: usize = 90;

/// Render chat history as PDF bytes
///
/// # Arguments
///
/// * `history` - Messages in session order
///
/// # Errors
///
/// Returns a report error if font registration or document serialization
/// fails
pub fn render(history: &[MessageRecord]) -> Result<Vec<u8>> {
    let (doc, page, layer) =
        PdfDocument::new("Inspectra - Inspection Report", Mm(210.0), Mm(297.0), "Layer 1");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| InspectraError::Report(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| InspectraError::Report(e.to_string()))?;
    let mono = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| InspectraError::Report(e.to_string()))?;

    let mut layer_ref = doc.get_page(page).get_layer(layer);
    let mut y = Mm(280.0);

    layer_ref.use_text(
        "Inspectra - Inspection Report",
        16.0,
        Mm(55.0),
        y,
        &bold,
    );
    y = Mm(y.0 - 14.0);

    for msg in history {
        // New page when the cursor runs out of room
        if y.0 < 25.0 {
            let (next_page, next_layer) = doc.add_page(Mm(210.0), Mm(297.0), "Layer 1");
            layer_ref = doc.get_page(next_page).get_layer(next_layer);
            y = Mm(280.0);
        }

        let content = sanitize_text(&msg.content);

        if msg.role == "user" {
            // Operator lines in dark grey to distinguish them
            layer_ref.set_fill_color(Color::Rgb(Rgb::new(0.4, 0.4, 0.4, None)));
            for line in wrap_text(&format!("OPERATOR: {}", content), WRAP_COLS) {
                layer_ref.use_text(line, 11.0, Mm(15.0), y, &regular);
                y = Mm(y.0 - 6.0);
                if y.0 < 25.0 {
                    let (next_page, next_layer) = doc.add_page(Mm(210.0), Mm(297.0), "Layer 1");
                    layer_ref = doc.get_page(next_page).get_layer(next_layer);
                    y = Mm(280.0);
                    layer_ref.set_fill_color(Color::Rgb(Rgb::new(0.4, 0.4, 0.4, None)));
                }
            }
        } else {
            layer_ref.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
            for line in wrap_text(&format!("ANALYSIS: {}", content), WRAP_COLS) {
                layer_ref.use_text(line, 11.0, Mm(15.0), y, &regular);
                y = Mm(y.0 - 6.0);
                if y.0 < 25.0 {
                    let (next_page, next_layer) = doc.add_page(Mm(210.0), Mm(297.0), "Layer 1");
                    layer_ref = doc.get_page(next_page).get_layer(next_layer);
                    y = Mm(280.0);
                }
            }

            if let Some(usage) = &msg.usage {
                layer_ref.use_text(
                    format!("[METRICS: {} Tokens used]", usage.total_tokens),
                    8.0,
                    Mm(15.0),
                    y,
                    &mono,
                );
                y = Mm(y.0 - 5.0);
            }
        }

        // Small gap between turns
        y = Mm(y.0 - 3.0);
    }

    doc.save_to_bytes()
        .map_err(|e| InspectraError::Report(e.to_string()).into())
}

/// Sanitize text to the Latin-1 range
///
/// The built-in PDF fonts cannot represent code points above U+00FF, so
/// anything outside that range (emoji included) is replaced with `?`.
/// Lossy by design.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) <= 0xFF { c } else { '?' })
        .collect()
}

/// Word-wrap text to a fixed column width
///
/// Paragraph breaks in the input are preserved; words longer than the
/// width are hard-split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.split('\n') {
        if raw_line.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0usize;

        for word in raw_line.split_whitespace() {
            let word_len = word.chars().count();

            if current_len > 0 && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }

            if word_len > width {
                let mut chunk = String::new();
                let mut chunk_len = 0usize;
                for c in word.chars() {
                    if chunk_len == width {
                        lines.push(std::mem::take(&mut chunk));
                        chunk_len = 0;
                    }
                    chunk.push(c);
                    chunk_len += 1;
                }
                current = chunk;
                current_len = chunk_len;
            } else {
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.push_str(word);
                current_len += word_len;
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}
