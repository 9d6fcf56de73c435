//! Route template compilation.
//!
//! # Responsibilities
//! - Parse `{name}` placeholders out of a route template
//! - Produce an anchored regex where each placeholder captures `[^/]+`
//! - Keep placeholder names in left-to-right order for positional extraction
//!
//! # Design Decisions
//! - Literal text is escaped; `/a.b` matches only `/a.b`
//! - Two placeholders with nothing between them are rejected (ambiguous split)
//! - Compilation happens once at startup; a bad template is a setup error

use regex::Regex;
use std::fmt;

/// Error produced when a route template cannot be compiled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),
    #[error("unmatched '}}' at byte {0}")]
    Unmatched(usize),
    #[error("nested '{{' at byte {0}")]
    Nested(usize),
    #[error("empty placeholder name at byte {0}")]
    EmptyName(usize),
    #[error("placeholder '{0}' appears more than once")]
    Duplicate(String),
    #[error("placeholder '{0}' directly follows another placeholder")]
    Adjacent(String),
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A compiled, anchored route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    segments: Vec<Segment>,
    names: Vec<String>,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a template such as `/users/{id}/posts/{post}`.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let segments = parse(template)?;

        let mut source = String::with_capacity(template.len() + 16);
        source.push('^');
        let mut names: Vec<String> = Vec::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => source.push_str(&regex::escape(text)),
                Segment::Placeholder(name) => {
                    if names.iter().any(|n| n == name) {
                        return Err(PatternError::Duplicate(name.clone()));
                    }
                    source.push_str("([^/]+)");
                    names.push(name.clone());
                }
            }
        }
        source.push('$');

        Ok(Self {
            template: template.to_string(),
            regex: Regex::new(&source)?,
            segments,
            names,
        })
    }

    /// Match a full path. Returns `(name, value)` pairs in placeholder order.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let captures = self.regex.captures(path)?;
        let params = self
            .names
            .iter()
            .zip(captures.iter().skip(1))
            .filter_map(|(name, value)| value.map(|v| (name.clone(), v.as_str().to_string())))
            .collect();
        Some(params)
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in left-to-right order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn parse(template: &str) -> Result<Vec<Segment>, PatternError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut open: Option<(usize, String)> = None;

    for (pos, ch) in template.char_indices() {
        match ch {
            '{' => {
                if open.is_some() {
                    return Err(PatternError::Nested(pos));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                open = Some((pos, String::new()));
            }
            '}' => {
                let Some((start, name)) = open.take() else {
                    return Err(PatternError::Unmatched(pos));
                };
                if name.is_empty() {
                    return Err(PatternError::EmptyName(start));
                }
                if let Some(Segment::Placeholder(_)) = segments.last() {
                    return Err(PatternError::Adjacent(name));
                }
                segments.push(Segment::Placeholder(name));
            }
            c => match open.as_mut() {
                Some((_, name)) => name.push(c),
                None => literal.push(c),
            },
        }
    }

    if let Some((start, _)) = open {
        return Err(PatternError::Unclosed(start));
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
