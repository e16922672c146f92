//! INI config file parsing.
//!
//! Turns an INI file into a [`ConfigDocument`]: an ordered list of named
//! sections, each holding the key-value pairs that will be published as one
//! secret.
//!
//! # Supported Syntax
//!
//! - Section headers: `[name]`, where the name is everything between the first
//!   `[` and the last `]` on the line, kept untrimmed (`[ x ]` names ` x `).
//!   Text after the closing `]` is ignored, so `[x] ; note` opens `x`.
//! - Entries: `key = value` or `key: value` (first delimiter wins)
//! - Comments: whole lines starting with `#` or `;`
//! - Continuation lines: indented deeper than their key, joined with `\n`
//! - Default section: `[DEFAULT]`, or entries written before the first header
//!
//! # Default Section
//!
//! Parsing happens in two steps. The file is first read into raw sections,
//! then every named section's effective body is built once as the default
//! entries overridden by the section's own entries. The default section is
//! never published on its own.
//!
//! Each section, `DEFAULT` included, may be opened only once. A second
//! `[DEFAULT]` header is a parse error rather than a way to add more defaults.
//!
//! Keys keep their file order. Default keys come first, in their own order,
//! followed by the section's new keys; an override keeps the default's slot.
//!
//! Values are taken raw: there is no `%(name)s` interpolation.

use crate::error::{Result, UploadError};
use indexmap::IndexMap;
use std::path::Path;

/// Name of the header that opens the default section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Bookkeeping key some INI readers inject into every section.
///
/// It is never part of a published body.
pub const SECTION_NAME_KEY: &str = "__name__";

/// Key-value pairs of one section.
pub type SectionBody = IndexMap<String, String>;

/// How keys are normalized while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// Fold keys to lowercase, like most INI readers do
    #[default]
    Lowercase,
    /// Keep keys exactly as written
    Preserve,
}

impl KeyCase {
    fn apply(self, key: &str) -> String {
        match self {
            KeyCase::Lowercase => key.to_lowercase(),
            KeyCase::Preserve => key.to_string(),
        }
    }
}

/// Parser configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub key_case: KeyCase,
}

impl ParseOptions {
    /// Options used for secret uploads: keys keep their casing.
    pub fn case_sensitive() -> Self {
        Self {
            key_case: KeyCase::Preserve,
        }
    }
}

/// Parsed INI file, sections in order of appearance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigDocument {
    sections: Vec<(String, SectionBody)>,
}

impl ConfigDocument {
    /// Read and parse an INI file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file doesn't exist or cannot be read as UTF-8 text
    /// - The content is not valid INI (see [`ConfigDocument::parse_str`])
    pub fn load<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| UploadError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;

        let document = Self::parse_str(&content, options)?;
        tracing::debug!(
            path = %path.display(),
            sections = document.len(),
            "parsed config file"
        );
        Ok(document)
    }

    /// Parse INI text.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Parse`] for a malformed section header, a
    /// line without `=` or `:`, an empty key, a key repeated within one
    /// section, or a section header repeated in the file.
    pub fn parse_str(content: &str, options: ParseOptions) -> Result<Self> {
        Ok(parse_raw(content, options)?.into_document())
    }

    /// Effective body of a named section.
    pub fn get(&self, section: &str) -> Option<&SectionBody> {
        self.sections
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, body)| body)
    }

    /// Sections in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionBody)> {
        self.sections.iter().map(|(name, body)| (name.as_str(), body))
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Sections as written, before default merging.
#[derive(Debug, Default)]
struct RawIni {
    defaults: SectionBody,
    sections: Vec<(String, SectionBody)>,
}

impl RawIni {
    fn body_mut(&mut self, target: Target) -> &mut SectionBody {
        match target {
            Target::Default => &mut self.defaults,
            Target::Section(index) => &mut self.sections[index].1,
        }
    }

    fn section_label(&self, target: Target) -> &str {
        match target {
            Target::Default => DEFAULT_SECTION,
            Target::Section(index) => &self.sections[index].0,
        }
    }

    fn into_document(self) -> ConfigDocument {
        let RawIni { defaults, sections } = self;

        let sections = sections
            .into_iter()
            .map(|(name, own)| {
                let mut body = defaults.clone();
                body.extend(own);
                body.shift_remove(SECTION_NAME_KEY);
                (name, body)
            })
            .collect();

        ConfigDocument { sections }
    }
}

/// Section that entries are currently added to.
#[derive(Debug, Clone, Copy)]
enum Target {
    Default,
    Section(usize),
}

/// Key whose value may still be extended by continuation lines.
struct OpenValue {
    key: String,
    indent: usize,
}

fn parse_raw(content: &str, options: ParseOptions) -> Result<RawIni> {
    let mut raw = RawIni::default();
    let mut target = Target::Default;
    let mut default_header_seen = false;
    let mut open_value: Option<OpenValue> = None;

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();

        // A blank line closes any multi-line value
        if trimmed.is_empty() {
            open_value = None;
            continue;
        }

        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let indent = line.len() - line.trim_start().len();

        if let Some(open) = &open_value {
            if indent > open.indent {
                if let Some(value) = raw.body_mut(target).get_mut(&open.key) {
                    value.push('\n');
                    value.push_str(trimmed);
                }
                continue;
            }
        }

        if trimmed.starts_with('[') {
            open_value = None;
            let name = parse_header(trimmed, line_no)?;

            if name == DEFAULT_SECTION {
                if default_header_seen {
                    return Err(UploadError::parse(
                        line_no,
                        format!("duplicate section '{}'", DEFAULT_SECTION),
                    ));
                }
                default_header_seen = true;
                target = Target::Default;
            } else {
                if raw.sections.iter().any(|(existing, _)| existing == name) {
                    return Err(UploadError::parse(
                        line_no,
                        format!("duplicate section '{}'", name),
                    ));
                }
                raw.sections.push((name.to_string(), SectionBody::new()));
                target = Target::Section(raw.sections.len() - 1);
            }
            continue;
        }

        let (key, value) = parse_entry(trimmed, line_no)?;
        let key = options.key_case.apply(key);

        if raw.body_mut(target).contains_key(&key) {
            return Err(UploadError::parse(
                line_no,
                format!(
                    "duplicate key '{}' in section '{}'",
                    key,
                    raw.section_label(target)
                ),
            ));
        }

        raw.body_mut(target).insert(key.clone(), value.to_string());
        open_value = Some(OpenValue { key, indent });
    }

    Ok(raw)
}

fn parse_header(line: &str, line_no: usize) -> Result<&str> {
    let name = line
        .strip_prefix('[')
        .and_then(|rest| rest.rfind(']').map(|end| &rest[..end]))
        .ok_or_else(|| {
            UploadError::parse(line_no, format!("malformed section header: {}", line))
        })?;

    if name.is_empty() {
        return Err(UploadError::parse(line_no, "empty section name"));
    }

    Ok(name)
}

fn parse_entry(line: &str, line_no: usize) -> Result<(&str, &str)> {
    let split = line.find(['=', ':']).ok_or_else(|| {
        UploadError::parse(
            line_no,
            format!("expected 'key = value' or 'key: value', found: {}", line),
        )
    })?;

    let key = line[..split].trim();
    if key.is_empty() {
        return Err(UploadError::parse(line_no, "entry has an empty key"));
    }

    Ok((key, line[split + 1..].trim()))
}
