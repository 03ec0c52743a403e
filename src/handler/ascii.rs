//! ASCII table handler
//!
//! Renders the 128 ASCII code points as a fixed-width text table.

use crate::http::{Request, ResponseSink};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use std::fmt::Write as _;

/// Spaces between table columns
const COLUMN_SPACING: usize = 4;

/// Width of the `HEX DEC ` prefix of every cell
const CELL_PREFIX: usize = 7;

const HEADER: &str = "HEX DEC CHAR";
const HEADER_RULE: &str = "------------";

/// Names and descriptions of the control characters 0-31
const CONTROL_CHARS: [(&str, &str); 32] = [
    ("NUL", "null"),
    ("SOH", "start of heading"),
    ("STX", "start of text"),
    ("ETX", "end of text"),
    ("EOT", "end of transmission"),
    ("ENQ", "enquiry"),
    ("ACK", "acknowledge"),
    ("BEL", "bell"),
    ("BS", "backspace"),
    ("TAB", "horizontal tab"),
    ("LF", "NL line feed, new line"),
    ("VT", "vertical tab"),
    ("FF", "NP form feed, new page"),
    ("CR", "carriage return"),
    ("SO", "shift out"),
    ("SI", "shift in"),
    ("DLE", "data link escape"),
    ("DC1", "device control 1"),
    ("DC2", "device control 2"),
    ("DC3", "device control 3"),
    ("DC4", "device control 4"),
    ("NAK", "negative acknowledge"),
    ("SYN", "synchronous idle"),
    ("ETB", "end of trans. block"),
    ("CAN", "cancel"),
    ("EM", "end of medium"),
    ("SUB", "substitute"),
    ("ESC", "escape"),
    ("FS", "file separator"),
    ("GS", "group separator"),
    ("RS", "record separator"),
    ("US", "unit separator"),
];

/// Supported table layouts; 128 rows divide evenly by each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Single = 1,
    Double = 2,
    Quad = 4,
}

impl Layout {
    const fn columns(self) -> usize {
        self as usize
    }
}

/// `GET /ascii`, `?m` (empty or truthy) selects the single-column layout
pub fn ascii(w: &mut dyn ResponseSink, req: &Request) {
    let layout = if wants_single_column(req.uri().query()) {
        Layout::Single
    } else {
        Layout::Quad
    };

    w.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    let _ = w.write_all(render_table(layout).as_bytes());
}

fn wants_single_column(query: Option<&str>) -> bool {
    let Some(query) = query else {
        return false;
    };

    query
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| *key == "m")
        .is_some_and(|(_, value)| {
            matches!(value, "" | "1" | "t" | "T" | "true" | "TRUE" | "True")
        })
}

/// Display form of one code point
fn char_label(code: usize) -> String {
    match code {
        32 => "SPACE".to_string(),
        127 => "DEL".to_string(),
        0..=31 => {
            let (name, description) = CONTROL_CHARS[code];
            format!("{name:<3} ({description})")
        }
        _ => u8::try_from(code).map_or_else(|_| "?".to_string(), |b| char::from(b).to_string()),
    }
}

/// Render the full table for `layout`
pub fn render_table(layout: Layout) -> String {
    let columns = layout.columns();
    let rows = 128 / columns;

    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            (0..rows)
                .map(|row| CELL_PREFIX + char_label(col * rows + row).len())
                .max()
                .unwrap_or(0)
                .max(HEADER.len())
        })
        .collect();

    let mut out = String::new();

    for label in [HEADER, HEADER_RULE] {
        for width in &widths {
            out.push_str(label);
            out.push_str(&" ".repeat(width - label.len() + COLUMN_SPACING));
        }
        out.push('\n');
    }

    for row in 0..rows {
        for (col, width) in widths.iter().enumerate() {
            let code = col * rows + row;
            let label = char_label(code);
            let _ = write!(out, "{code:02x} {code:3} {label}");
            out.push_str(&" ".repeat(width + COLUMN_SPACING - label.len() - CELL_PREFIX));
        }
        out.push('\n');
    }

    out
}
