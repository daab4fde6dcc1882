//! Puzzle fixtures and the stateless verification boundary.
//!
//! Puzzle content is data, not logic: each entry carries a tagged
//! content payload rendered per-variant, plus a fixed expected answer
//! resolved only server-side. The decoding itself (hex, base64,
//! binary) happens in players' heads.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// Expected answers, by puzzle index, compared after normalization.
const ANSWERS: [&str; 5] = ["CAYMAN", "OSPREY", "VAULT", "MERIDIAN", "LANTERN"];

pub const PUZZLE_COUNT: usize = ANSWERS.len();

/// Trim and uppercase, the single normalization applied to every
/// submitted answer and passcode.
pub fn normalize(answer: &str) -> String {
    answer.trim().to_uppercase()
}

/// Expected answer for a puzzle index, if the index exists.
pub fn expected_answer(index: usize) -> Option<&'static str> {
    ANSWERS.get(index).copied()
}

/// Check a submitted answer. `None` means the index is unknown.
pub fn check_answer(index: usize, answer: &str) -> Option<bool> {
    expected_answer(index).map(|expected| normalize(answer) == expected)
}

/// One puzzle as served to clients. The answer never travels with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puzzle {
    pub index: usize,
    pub title: String,
    pub content: PuzzleContent,
    pub shared_input_key: String,
}

/// Puzzle payload variants, one render capability per tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PuzzleContent {
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Terminal {
        lines: Vec<String>,
    },
    Document {
        heading: String,
        body: Vec<String>,
    },
    Email {
        from: String,
        to: String,
        subject: String,
        body: Vec<String>,
    },
    Log {
        entries: Vec<String>,
    },
}

impl PuzzleContent {
    /// Render to display lines, dispatched on the variant tag.
    pub fn render(&self) -> Vec<String> {
        match self {
            PuzzleContent::Table { headers, rows } => {
                let mut out = vec![headers.join(" | ")];
                out.extend(rows.iter().map(|row| row.join(" | ")));
                out
            }
            PuzzleContent::Terminal { lines } => lines.clone(),
            PuzzleContent::Document { heading, body } => {
                let mut out = vec![heading.clone(), String::new()];
                out.extend(body.iter().cloned());
                out
            }
            PuzzleContent::Email {
                from,
                to,
                subject,
                body,
            } => {
                let mut out = vec![
                    format!("From: {from}"),
                    format!("To: {to}"),
                    format!("Subject: {subject}"),
                    String::new(),
                ];
                out.extend(body.iter().cloned());
                out
            }
            PuzzleContent::Log { entries } => entries.clone(),
        }
    }
}

fn hex_encode(s: &str) -> String {
    s.bytes()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn binary_encode(s: &str) -> String {
    s.bytes()
        .map(|b| format!("{b:08b}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the puzzle for an index. Content embeds the encoded answer so
/// the fixture stays consistent with `ANSWERS` by construction.
pub fn puzzle(index: usize) -> Option<Puzzle> {
    let answer = expected_answer(index)?;
    let content = match index {
        0 => PuzzleContent::Terminal {
            lines: vec![
                "> intercepting transmission...".to_string(),
                "> signal acquired on channel 7".to_string(),
                format!("> payload: {}", hex_encode(answer)),
                "> decode the payload to name the drop site".to_string(),
            ],
        },
        1 => PuzzleContent::Email {
            from: "quartermaster@nightjar.example".to_string(),
            to: "field-ops@nightjar.example".to_string(),
            subject: "Courier designation (encoded per protocol)".to_string(),
            body: vec![
                "The courier's callsign follows, wrapped the usual way:".to_string(),
                BASE64.encode(answer),
                "Burn after reading.".to_string(),
            ],
        },
        2 => PuzzleContent::Document {
            heading: "FACILITY ACCESS MEMO #12".to_string(),
            body: vec![
                "The storage wing is named below in machine words.".to_string(),
                binary_encode(answer),
            ],
        },
        3 => PuzzleContent::Table {
            headers: vec!["station".to_string(), "bearing".to_string(), "beacon".to_string()],
            rows: vec![
                vec!["north".to_string(), "017".to_string(), "--".to_string()],
                vec!["east".to_string(), "094".to_string(), hex_encode(answer)],
                vec!["south".to_string(), "181".to_string(), "--".to_string()],
            ],
        },
        4 => PuzzleContent::Log {
            entries: vec![
                "03:12 watch change, nothing to report".to_string(),
                format!("03:47 signal lamp flashed: {}", BASE64.encode(answer)),
                "04:02 lamp dark again".to_string(),
            ],
        },
        _ => unreachable!("index bounded by expected_answer"),
    };
    Some(Puzzle {
        index,
        title: format!("Transmission {}", index + 1),
        content,
        shared_input_key: shared_input_key(index),
    })
}

/// Key under which a puzzle's shared answer field lives in the room's
/// `shared_inputs` map.
pub fn shared_input_key(index: usize) -> String {
    format!("puzzle{index}_answer")
}

/// Hint text per puzzle.
pub fn hint(index: usize) -> Option<&'static str> {
    const HINTS: [&str; 5] = [
        "Pairs of hex digits, one byte per letter.",
        "The wrapper ends in '=' padding more often than not.",
        "Eight bits per letter, ASCII.",
        "Only one beacon column is not a dash.",
        "Same wrapper as the courier's callsign.",
    ];
    HINTS.get(index).copied()
}

/// `POST /verify` request: stateless checks against fixed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VerifyRequest {
    Entry { passcode: String },
    Puzzle { index: usize, answer: String },
    Hint { index: usize },
}

/// `POST /verify` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerifyResponse {
    Checked { correct: bool },
    Hint { hint: String },
}

/// Resolve a verification request against the configured secrets.
pub fn verify(request: &VerifyRequest, entry_passcode: &str) -> VerifyResponse {
    match request {
        VerifyRequest::Entry { passcode } => VerifyResponse::Checked {
            correct: normalize(passcode) == normalize(entry_passcode),
        },
        VerifyRequest::Puzzle { index, answer } => VerifyResponse::Checked {
            correct: check_answer(*index, answer).unwrap_or(false),
        },
        VerifyRequest::Hint { index } => VerifyResponse::Hint {
            hint: hint(*index).unwrap_or("No hint for that one.").to_string(),
        },
    }
}
