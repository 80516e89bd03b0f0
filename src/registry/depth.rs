use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::model::ConfigError;

/// Depth used for chromosomes without statistics.
pub const FALLBACK_DEPTH: f64 = 30.0;

/// Average and median depth of one chromosome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromDepth {
    /// Mean depth.
    pub average: f64,
    /// Median depth.
    pub median: f64,
}

impl Default for ChromDepth {
    fn default() -> Self {
        Self {
            average: FALLBACK_DEPTH,
            median: FALLBACK_DEPTH,
        }
    }
}

/// Chromosome name → depth statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromDepthTable {
    entries: HashMap<String, ChromDepth>,
}

impl ChromDepthTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tab-separated `chrom avg [median]` lines. Blank lines and
    /// `#` comments are skipped; a missing median equals the average.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut table = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fail = |message: String| ConfigError::DepthTable {
                line: idx + 1,
                message,
            };
            let mut fields = line.split_whitespace();
            let chrom = fields
                .next()
                .ok_or_else(|| fail("missing chromosome".to_string()))?;
            let average = parse_depth(fields.next(), "average").map_err(fail)?;
            let median = match fields.next() {
                Some(value) => parse_depth(Some(value), "median").map_err(fail)?,
                None => average,
            };
            table.insert(chrom, ChromDepth { average, median });
        }
        Ok(table)
    }

    /// Read a depth table file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Add or replace one chromosome.
    pub fn insert(&mut self, chrom: impl Into<String>, depth: ChromDepth) {
        self.entries.insert(chrom.into(), depth);
    }

    /// Statistics for a chromosome, if present.
    pub fn get(&self, chrom: &str) -> Option<ChromDepth> {
        self.entries.get(chrom).copied()
    }

    /// Statistics for a chromosome, falling back to the default depth.
    pub fn get_or_default(&self, chrom: &str) -> ChromDepth {
        self.get(chrom).unwrap_or_default()
    }

    /// Number of chromosomes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no chromosome has statistics.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_depth(field: Option<&str>, what: &str) -> Result<f64, String> {
    let field = field.ok_or_else(|| format!("missing {what} depth"))?;
    let value: f64 = field
        .parse()
        .map_err(|_| format!("{what} depth '{field}' is not a number"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("{what} depth '{field}' must be a non-negative number"))
    }
}
