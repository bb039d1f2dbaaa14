//! # Tareas de Texto
//! src/commands/text.rs
//!
//! Operan sobre el texto que viene en el payload:
//! - wordcount: líneas, palabras y bytes
//! - grep: líneas que coinciden con una regex
//! - compress: tamaño original vs. gzip

use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use std::io::{self, Write};

/// Máximo de líneas de muestra que devuelve grep
pub const GREP_SAMPLE_LINES: usize = 10;

/// Estadísticas de wordcount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStats {
    pub lines: usize,
    pub words: usize,
    pub bytes: usize,
}

pub fn word_count(text: &str) -> TextStats {
    TextStats {
        lines: text.lines().count(),
        words: text.split_whitespace().count(),
        bytes: text.len(),
    }
}

/// Cuenta las líneas que coinciden y devuelve las primeras como muestra
pub fn grep(pattern: &Regex, text: &str) -> (usize, Vec<String>) {
    let mut count = 0;
    let mut sample = Vec::new();

    for line in text.lines().filter(|line| pattern.is_match(line)) {
        count += 1;
        if sample.len() < GREP_SAMPLE_LINES {
            sample.push(line.to_string());
        }
    }

    (count, sample)
}

/// Comprime en memoria con gzip y devuelve (tamaño original, comprimido)
pub fn gzip_sizes(data: &[u8]) -> io::Result<(u64, u64)> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    Ok((data.len() as u64, compressed.len() as u64))
}
