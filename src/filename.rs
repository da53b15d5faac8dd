//! Filename templates.
//!
//! Trodes session files follow a naming convention such as
//! `20200101_rat_02_r1.rec`, described by a template with `{field}`
//! placeholders: `{date}_{animal}_{epoch}_{label}.{extension}`.
//!
//! Each placeholder matches one or more characters, as few as possible, and
//! the last placeholder takes whatever is left. With the default template
//! the label therefore stops at the first `.` and continuation suffixes end
//! up in the extension (`r1.1.h264` gives label `r1`, extension `1.h264`).

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

use crate::types::*;

/// Default Trodes naming convention.
pub const DEFAULT_FILENAME_FORMAT: &str = "{date}_{animal}_{epoch}_{label}.{extension}";

/// Named components of a filename, in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    fields: Vec<(String, String)>,
}

impl ParsedFilename {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A compiled filename template.
#[derive(Debug, Clone)]
pub struct FilenameTemplate {
    template: String,
    fields: Vec<String>,
    pattern: Regex,
}

impl FilenameTemplate {
    /// Compiles a template string.
    ///
    /// Field names are word characters inside braces. A field name may only
    /// appear once.
    pub fn compile(template: &str) -> Result<Self> {
        let placeholder = Regex::new(r"\{(\w+)\}")?;

        let mut fields: Vec<String> = Vec::new();
        let mut pattern = String::from("^");
        let mut last = 0;
        for caps in placeholder.captures_iter(template) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let name = caps[1].to_string();
            if fields.contains(&name) {
                return Err(MetadataError::InvalidTemplate {
                    template: template.to_string(),
                    reason: format!("duplicate field {:?}", name),
                });
            }
            pattern.push_str(&regex::escape(&template[last..whole.start]));
            pattern.push_str("(.+?)");
            fields.push(name);
            last = whole.end;
        }
        pattern.push_str(&regex::escape(&template[last..]));
        pattern.push('$');

        if fields.is_empty() {
            return Err(MetadataError::InvalidTemplate {
                template: template.to_string(),
                reason: "no {field} placeholders".to_string(),
            });
        }

        Ok(FilenameTemplate {
            template: template.to_string(),
            fields,
            pattern: Regex::new(&pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Field names in template order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Splits a filename into its named components.
    pub fn decompose(&self, filename: &str) -> Result<ParsedFilename> {
        let caps = self
            .pattern
            .captures(filename)
            .ok_or_else(|| MetadataError::NoMatch {
                filename: filename.to_string(),
                template: self.template.clone(),
            })?;

        let fields = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = caps.get(i + 1).map_or("", |m| m.as_str());
                (name.clone(), value.to_string())
            })
            .collect();
        Ok(ParsedFilename { fields })
    }

    /// Decomposes the file name component of a path.
    pub fn decompose_path<P: AsRef<Path>>(&self, path: P) -> Result<ParsedFilename> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        self.decompose(&filename)
    }

    /// Builds a filename by substituting values into the template.
    pub fn format(&self, values: &HashMap<&str, &str>) -> Result<String> {
        let placeholder = Regex::new(r"\{(\w+)\}")?;
        let mut missing = None;
        let filename = placeholder.replace_all(&self.template, |caps: &regex::Captures| {
            match values.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => {
                    missing.get_or_insert_with(|| caps[1].to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(field) => Err(MetadataError::MissingField(field)),
            None => Ok(filename.into_owned()),
        }
    }
}
