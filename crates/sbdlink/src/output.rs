use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A command result: serialized as-is for JSON, shown as labelled rows
/// otherwise. Raw output prints the value of the first row.
pub struct Report<'a, T: Serialize> {
    pub title: &'a str,
    pub value: &'a T,
    pub rows: Vec<(&'static str, String)>,
}

impl<'a, T: Serialize> Report<'a, T> {
    pub fn new(title: &'a str, value: &'a T) -> Self {
        Self {
            title,
            value,
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, label: &'static str, value: impl ToString) -> Self {
        self.rows.push((label, value.to_string()));
        self
    }

    pub fn print(&self, format: OutputFormat) {
        match format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string(self.value).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec!["FIELD", "VALUE"]);
                for (label, value) in &self.rows {
                    table.add_row(vec![label.to_string(), value.clone()]);
                }
                println!("{table}");
            }
            OutputFormat::Pretty => {
                println!("{}:", self.title);
                let width = self.rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
                for (label, value) in &self.rows {
                    println!("  {:<width$}  {}", format!("{label}:"), value, width = width + 1);
                }
            }
            OutputFormat::Raw => {
                if let Some((_, value)) = self.rows.first() {
                    println!("{value}");
                }
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("<binary {} bytes>", payload.len()),
    }
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn from_hex(input: &str) -> Option<Vec<u8>> {
    let input = input.trim();
    if input.len() % 2 != 0 {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|i| input.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_shows_text_and_summarizes_binary() {
        assert_eq!(payload_preview(b"HELLO"), "HELLO");
        assert_eq!(payload_preview(&[0x00, 0xff, 0x10]), "<binary 3 bytes>");
        assert_eq!(payload_preview(b"a\r\nb"), "<binary 4 bytes>");
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(to_hex(&[0x00, 0xab, 0x10]), "00ab10");
        assert_eq!(from_hex("68656C6c6f"), Some(b"hello".to_vec()));
        assert_eq!(from_hex("abc"), None);
        assert_eq!(from_hex("zz"), None);
    }
}
