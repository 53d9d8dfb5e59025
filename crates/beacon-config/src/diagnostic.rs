// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors become [`ConfigError`]s that miette renders with the
//! offending TOML line highlighted and, for misspelled keys, the closest
//! valid key (Jaro-Winkler).

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity a valid key needs before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A TOML document that took part in loading, kept for span lookup.
#[derive(Debug, Clone)]
pub struct TomlSource {
    /// Display name: a file path or `<inline>`.
    pub name: String,
    pub content: String,
}

impl TomlSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(beacon::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is close enough.
        suggestion: Option<String>,
        /// Comma-separated keys accepted by the section.
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(beacon::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `gateway.port`.
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(beacon::config::missing_key),
        help("set `{key}` in beacon.toml or through a BEACON_* variable")
    )]
    MissingKey { key: String },

    /// A value that parsed but breaks a semantic rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(beacon::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(beacon::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Converts every error carried by `err` into a diagnostic.
pub fn figment_to_config_errors(err: figment::Error, sources: &[TomlSource]) -> Vec<ConfigError> {
    err.into_iter().map(|e| convert(&e, sources)).collect()
}

fn convert(error: &figment::Error, sources: &[TomlSource]) -> ConfigError {
    let path: Vec<String> = error.path.iter().map(ToString::to_string).collect();
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = highlight(error, sources, path.first(), field);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::InvalidType(actual, expected) => {
            // For a type error the path ends with the key itself.
            let field = path.last().cloned().unwrap_or_default();
            let section = path.len().checked_sub(2).and_then(|i| path.get(i));
            let (span, src) = highlight(error, sources, section, &field);
            ConfigError::InvalidType {
                key: path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.to_string(),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Span of `field` in the document that produced `error`.
///
/// Inline strings carry no file metadata, so a lone source is assumed to be
/// the origin.
fn highlight(
    error: &figment::Error,
    sources: &[TomlSource],
    section: Option<&String>,
    field: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let source = match origin {
        Some(name) => sources.iter().find(|s| s.name == name),
        None if sources.len() == 1 => sources.first(),
        None => None,
    };

    source
        .and_then(|s| {
            let offset = find_key_offset(&s.content, section.map(String::as_str), field)?;
            Some((
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(&s.name, s.content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field = ...` inside `[section]` (or the top level).
///
/// Tracks table headers line by line, so a key with the same name in
/// another section is never matched.
pub fn find_key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = Some(header.trim());
        } else if current == section {
            let indent = line.len() - line.trim_start().len();
            let rest = line.trim_start().strip_prefix(field);
            if rest.is_some_and(|r| r.trim_start().starts_with('=')) {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }
    None
}

/// Closest valid key to `unknown`, if any clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints every error to stderr with miette's graphical report handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_chunk_size_for_typo() {
        let valid = &["chunk_size", "chunk_pause_ms", "send_timeout_secs"];
        assert_eq!(suggest_key("chunk_sise", valid).as_deref(), Some("chunk_size"));
    }

    #[test]
    fn suggests_verify_token_for_typo() {
        let valid = &["access_token", "verify_token", "app_secret"];
        assert_eq!(
            suggest_key("verfy_token", valid).as_deref(),
            Some("verify_token")
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        assert_eq!(suggest_key("zzzzzz", &["host", "port", "bearer_token"]), None);
    }

    #[test]
    fn key_offset_inside_section() {
        let content = "[dispatch]\nchunk_sise = 10\n";
        let offset = find_key_offset(content, Some("dispatch"), "chunk_sise").unwrap();
        assert_eq!(&content[offset..offset + 10], "chunk_sise");
    }

    #[test]
    fn key_offset_ignores_other_sections() {
        let content = "[gateway]\nport = 1\n\n[dispatch]\nport = 2\n";
        let offset = find_key_offset(content, Some("dispatch"), "port").unwrap();
        assert_eq!(&content[offset..offset + 8], "port = 2");
        assert!(find_key_offset(content, Some("scheduler"), "port").is_none());
    }

    #[test]
    fn key_offset_requires_assignment() {
        let content = "[gateway]\nportal = 1\n";
        assert!(find_key_offset(content, Some("gateway"), "port").is_none());
    }

    #[test]
    fn unknown_key_help_lists_suggestion() {
        assert!(unknown_key_help(Some("port"), "host, port").contains("did you mean `port`"));
        assert_eq!(unknown_key_help(None, "host"), "valid keys: host");
    }
}
