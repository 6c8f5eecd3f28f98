//! URI templates for resource templates.
//!
//! Supports the simple `{name}` placeholder form used by MCP resource
//! templates, e.g. `greeting://{name}` or `repo://{owner}/{repo}`.
//! A placeholder matches one or more characters up to the next `/` and its
//! value is percent-decoded.

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Parameters extracted from a template match, by placeholder name.
pub type UriParams = HashMap<String, String>;

/// A compiled URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    pattern: String,
    regex: Regex,
    params: Vec<String>,
}

impl UriTemplate {
    /// Compile a template pattern.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidUriTemplate(format!("{} ({})", pattern, reason));

        let mut source = String::from("^");
        let mut params: Vec<String> = Vec::new();
        let mut rest = pattern;

        while let Some(open) = rest.find('{') {
            let (literal, after) = rest.split_at(open);
            if literal.contains('}') {
                return Err(invalid("unbalanced '}'"));
            }
            source.push_str(&regex::escape(literal));

            let close = after.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
            let name = &after[1..close];
            if !is_valid_param_name(name) {
                return Err(invalid("invalid placeholder name"));
            }
            if params.iter().any(|p| p == name) {
                return Err(invalid("duplicate placeholder"));
            }

            source.push_str(&format!("(?P<{}>[^/]+)", name));
            params.push(name.to_string());
            rest = &after[close + 1..];
        }

        if rest.contains('}') {
            return Err(invalid("unbalanced '}'"));
        }
        source.push_str(&regex::escape(rest));
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            params,
        })
    }

    /// The original pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in order of appearance.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Match a concrete URI, returning every placeholder value or `None`.
    pub fn matches(&self, uri: &str) -> Option<UriParams> {
        let captures = self.regex.captures(uri)?;
        self.params
            .iter()
            .map(|name| {
                let raw = captures.name(name)?.as_str();
                let decoded = percent_decode_str(raw).decode_utf8_lossy().into_owned();
                Some((name.clone(), decoded))
            })
            .collect()
    }
}

fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
