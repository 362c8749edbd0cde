// SPDX-License-Identifier: GPL-3.0-only

//! Console output for scan results
//!
//! Text mode prints errors, and results whose confidence reaches the
//! threshold. JSON mode writes every result as one line.

use crate::analyzer::{ResultHandler, ScanResult};
use chrono::Local;
use serde::Serialize;
use std::io::Write;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    result: &'a ScanResult,
}

/// [`ResultHandler`] printing to a writer
pub struct ConsoleReporter<W: Write + Send> {
    out: W,
    format: ReportFormat,
    threshold: f32,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout(format: ReportFormat, threshold: f32) -> Self {
        Self::new(std::io::stdout(), format, threshold)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W, format: ReportFormat, threshold: f32) -> Self {
        Self {
            out,
            format,
            threshold,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_text(&mut self, result: &ScanResult) -> std::io::Result<()> {
        if let Some(error) = &result.error {
            return writeln!(self.out, "error: {}", error);
        }
        if result.confidence < self.threshold {
            return Ok(());
        }

        writeln!(self.out, "Confidence: {:.2}", result.confidence)?;
        writeln!(self.out, "Front side: {}", opt(result.is_front_side))?;
        writeln!(self.out, "Front side full: {}", opt(result.is_front_card_full))?;
        if let Some(texts) = &result.extracted_text {
            writeln!(self.out, "Text: {}", texts.join(" | "))?;
        }
        // Classification is only meaningful once the full front side is in view
        if result.is_front_card_full == Some(true) {
            match result.classification.as_ref().map(|c| (c.ml_confidence, &c.error)) {
                Some((confidence, None)) => {
                    writeln!(self.out, "Classification confidence: {}", opt(confidence))?
                }
                Some((_, Some(error))) => writeln!(self.out, "Classification error: {}", error)?,
                None => {}
            }
        }
        writeln!(self.out)
    }

    fn write_json(&mut self, result: &ScanResult) -> std::io::Result<()> {
        let line = JsonLine {
            timestamp: Local::now().to_rfc3339(),
            result,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        writeln!(self.out)
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl<W: Write + Send> ResultHandler for ConsoleReporter<W> {
    fn on_result(&mut self, result: ScanResult) {
        let written = match self.format {
            ReportFormat::Text => self.write_text(&result),
            ReportFormat::Json => self.write_json(&result),
        };
        if let Err(e) = written.and_then(|_| self.out.flush()) {
            warn!(error = %e, "Failed to write scan result");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalyzerError, ClassificationResult};

    fn report(format: ReportFormat, result: ScanResult) -> String {
        let mut reporter = ConsoleReporter::new(Vec::new(), format, 0.5);
        reporter.on_result(result);
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn low_confidence_is_silent() {
        let out = report(
            ReportFormat::Text,
            ScanResult {
                confidence: 0.49,
                ..Default::default()
            },
        );
        assert!(out.is_empty());
    }

    #[test]
    fn errors_are_always_printed() {
        let out = report(
            ReportFormat::Text,
            ScanResult::from_error(AnalyzerError::NotInitialized),
        );
        assert_eq!(out, "error: Analyzer not initialized\n");
    }

    #[test]
    fn full_front_side_prints_classification() {
        let out = report(
            ReportFormat::Text,
            ScanResult {
                confidence: 0.8,
                is_front_side: Some(true),
                is_front_card_full: Some(true),
                extracted_text: Some(vec!["ID".to_string(), "1234".to_string()]),
                classification: Some(ClassificationResult {
                    ml_confidence: Some(0.75),
                    error: None,
                }),
                ..Default::default()
            },
        );
        assert!(out.contains("Confidence: 0.80"));
        assert!(out.contains("Front side full: true"));
        assert!(out.contains("Text: ID | 1234"));
        assert!(out.contains("Classification confidence: 0.75"));
    }

    #[test]
    fn json_mode_writes_one_line_per_result() {
        let out = report(
            ReportFormat::Json,
            ScanResult {
                confidence: 0.1,
                ..Default::default()
            },
        );
        assert_eq!(out.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert!(value["timestamp"].is_string());
        assert!((value["result"]["confidence"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }
}
