//! Fock basis states and their canonical text grammar
//!
//! A [`BasicState`] assigns a photon count to each mode. A mode can instead
//! list one [`Annotation`] per photon (e.g. a polarization label), in which
//! case its occupation is the number of annotations.
//!
//! Canonical text: `|n0,n1,...>` where a field is either a bare integer or a
//! run of `{label}` tokens, one per photon:
//!
//! ```
//! use linopt_core::BasicState;
//!
//! let s: BasicState = "|{P:H}{P:V},0>".parse().unwrap();
//! assert_eq!(s.m(), 2);
//! assert_eq!(s.n(), 2);
//! assert_eq!(s.occupation(0), 2);
//! assert_eq!(s.annotations(0)[1].get("P"), Some("V"));
//! assert_eq!(s.to_string(), "|{P:H}{P:V},0>");
//! ```

use crate::{OpticsError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Per-photon internal-degree annotation: a set of `key:value` pairs
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Annotation {
    pairs: BTreeMap<String, String>,
}

impl Annotation {
    /// Annotation with a single `key:value` pair
    ///
    /// # Errors
    /// Returns [`OpticsError::Validation`] if the pair would not survive the
    /// canonical text form (see [`Annotation::with`])
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        Self {
            pairs: BTreeMap::new(),
        }
        .with(key, value)
    }

    /// Add a pair (builder pattern)
    ///
    /// # Errors
    /// Returns [`OpticsError::Validation`] if the key or value is empty, has
    /// surrounding whitespace or contains `,` `{` `}`, or if the key contains `:`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let (key, value) = (key.into(), value.into());
        check_label_part(&key, "key", &[',', '{', '}', ':'])?;
        check_label_part(&value, "value", &[',', '{', '}'])?;
        self.pairs.insert(key, value);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse the inside of a `{...}` token
    fn parse_label(label: &str, context: &str) -> Result<Self> {
        let mut pairs = BTreeMap::new();
        for item in label.split(',') {
            let (key, value) = item.split_once(':').ok_or_else(|| {
                OpticsError::parse(context, format!("annotation '{}' is not key:value", item.trim()))
            })?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return Err(OpticsError::parse(
                    context,
                    format!("annotation '{}' has an empty key or value", item.trim()),
                ));
            }
            if pairs.insert(key.to_string(), value.to_string()).is_some() {
                return Err(OpticsError::parse(
                    context,
                    format!("annotation key '{}' repeated", key),
                ));
            }
        }
        Ok(Self { pairs })
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", k, v)?;
        }
        write!(f, "}}")
    }
}

fn check_label_part(part: &str, what: &str, reserved: &[char]) -> Result<()> {
    if part.is_empty() || part.trim() != part {
        return Err(OpticsError::Validation(format!(
            "annotation {} '{}' is empty or padded with whitespace",
            what, part
        )));
    }
    if let Some(c) = part.chars().find(|c| reserved.contains(c)) {
        return Err(OpticsError::Validation(format!(
            "annotation {} '{}' contains '{}'",
            what, part, c
        )));
    }
    Ok(())
}

/// Content of one mode
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModeContent {
    /// Plain photon count
    Count(usize),
    /// One annotation per photon, in order (never empty)
    Annotated(Vec<Annotation>),
}

impl ModeContent {
    #[inline]
    pub fn occupation(&self) -> usize {
        match self {
            ModeContent::Count(n) => *n,
            ModeContent::Annotated(a) => a.len(),
        }
    }
}

/// An occupation-number state over an ordered list of modes
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasicState {
    modes: Vec<ModeContent>,
}

impl BasicState {
    /// State with the given plain occupations
    pub fn new(occupations: &[usize]) -> Self {
        Self {
            modes: occupations.iter().map(|&n| ModeContent::Count(n)).collect(),
        }
    }

    /// State from per-mode contents; empty annotation lists become count 0
    pub fn from_modes(modes: Vec<ModeContent>) -> Self {
        Self {
            modes: modes
                .into_iter()
                .map(|m| match m {
                    ModeContent::Annotated(a) if a.is_empty() => ModeContent::Count(0),
                    other => other,
                })
                .collect(),
        }
    }

    /// Parse canonical text
    ///
    /// # Errors
    /// Returns [`OpticsError::Parse`] naming the offending field
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let inner = trimmed
            .strip_prefix('|')
            .and_then(|s| s.strip_suffix('>'))
            .ok_or_else(|| {
                OpticsError::parse(
                    format!("state '{}'", text),
                    "expected text of the form |n0,n1,...>",
                )
            })?;

        if inner.trim().is_empty() {
            return Ok(Self::default());
        }

        let fields = split_fields(inner).map_err(|message| {
            OpticsError::parse(format!("state '{}'", text), message)
        })?;
        let modes = fields
            .iter()
            .enumerate()
            .map(|(i, field)| parse_field(field.trim(), &format!("field {} of state '{}'", i, text)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_modes(modes))
    }

    /// Number of modes
    #[inline]
    pub fn m(&self) -> usize {
        self.modes.len()
    }

    /// Total photon count
    pub fn n(&self) -> usize {
        self.modes.iter().map(ModeContent::occupation).sum()
    }

    /// Photon count in `mode`
    ///
    /// # Panics
    /// Panics if `mode >= self.m()`
    #[inline]
    pub fn occupation(&self, mode: usize) -> usize {
        self.modes[mode].occupation()
    }

    /// Photon counts of every mode
    pub fn occupations(&self) -> Vec<usize> {
        self.modes.iter().map(ModeContent::occupation).collect()
    }

    /// Annotations of `mode`, empty for plain modes
    ///
    /// # Panics
    /// Panics if `mode >= self.m()`
    pub fn annotations(&self, mode: usize) -> &[Annotation] {
        match &self.modes[mode] {
            ModeContent::Count(_) => &[],
            ModeContent::Annotated(a) => a,
        }
    }

    pub fn has_annotations(&self) -> bool {
        self.modes
            .iter()
            .any(|m| matches!(m, ModeContent::Annotated(_)))
    }

    pub fn modes(&self) -> &[ModeContent] {
        &self.modes
    }
}

/// Split on commas outside `{...}`
fn split_fields(inner: &str) -> std::result::Result<Vec<&str>, String> {
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '{' => {
                if depth > 0 {
                    return Err(format!("nested '{{' at offset {}", i));
                }
                depth += 1;
            },
            '}' => {
                if depth == 0 {
                    return Err(format!("unmatched '}}' at offset {}", i));
                }
                depth -= 1;
            },
            ',' if depth == 0 => {
                fields.push(&inner[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }
    if depth > 0 {
        return Err("unterminated '{'".to_string());
    }
    fields.push(&inner[start..]);
    Ok(fields)
}

fn parse_field(field: &str, context: &str) -> Result<ModeContent> {
    if field.is_empty() {
        return Err(OpticsError::parse(context, "empty field"));
    }
    if !field.starts_with('{') {
        return field
            .parse::<usize>()
            .map(ModeContent::Count)
            .map_err(|_| {
                OpticsError::parse(
                    context,
                    format!("'{}' is neither an occupation count nor annotation tokens", field),
                )
            });
    }

    let mut annotations = Vec::new();
    let mut rest = field;
    while !rest.is_empty() {
        let body = rest.strip_prefix('{').ok_or_else(|| {
            OpticsError::parse(context, format!("unexpected '{}' between annotation tokens", rest))
        })?;
        let close = body
            .find('}')
            .ok_or_else(|| OpticsError::parse(context, "unterminated annotation token"))?;
        let label = &body[..close];
        if label.trim().is_empty() {
            return Err(OpticsError::parse(context, "empty annotation token"));
        }
        annotations.push(Annotation::parse_label(label, context)?);
        rest = body[close + 1..].trim_start();
    }
    Ok(ModeContent::Annotated(annotations))
}

impl FromStr for BasicState {
    type Err = OpticsError;

    fn from_str(s: &str) -> Result<Self> {
        BasicState::parse(s)
    }
}

impl From<Vec<usize>> for BasicState {
    fn from(occupations: Vec<usize>) -> Self {
        BasicState::new(&occupations)
    }
}

impl From<&[usize]> for BasicState {
    fn from(occupations: &[usize]) -> Self {
        BasicState::new(occupations)
    }
}

impl fmt::Display for BasicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|")?;
        for (i, mode) in self.modes.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match mode {
                ModeContent::Count(n) => write!(f, "{}", n)?,
                ModeContent::Annotated(list) => {
                    for a in list {
                        write!(f, "{}", a)?;
                    }
                },
            }
        }
        write!(f, ">")
    }
}
