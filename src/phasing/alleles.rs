use std::collections::HashMap;

/// Counts of block substrings observed across spanning reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlleleObservations {
    counts: HashMap<String, u32>,
    usable: u32,
    unused: u32,
}

impl AlleleObservations {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one usable read showing `allele`.
    pub fn observe(&mut self, allele: impl Into<String>) {
        *self.counts.entry(allele.into()).or_insert(0) += 1;
        self.usable += 1;
    }

    /// Count one spanning read that could not be used.
    pub fn reject(&mut self) {
        self.unused += 1;
    }

    /// Reads contributing an allele.
    pub fn usable(&self) -> u32 {
        self.usable
    }

    /// Reads rejected for quality.
    pub fn unused(&self) -> u32 {
        self.unused
    }

    /// Occurrences of one allele.
    pub fn count(&self, allele: &str) -> u32 {
        self.counts.get(allele).copied().unwrap_or(0)
    }

    /// Number of distinct alleles.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Two most frequent alleles, by descending count then allele text.
    pub fn top_two(&self) -> Option<((&str, u32), (&str, u32))> {
        let mut ranked: Vec<(&str, u32)> = self
            .counts
            .iter()
            .map(|(allele, &count)| (allele.as_str(), count))
            .collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        match ranked.as_slice() {
            [first, second, ..] => Some((*first, *second)),
            _ => None,
        }
    }

    /// Drop all observations.
    pub fn clear(&mut self) {
        self.counts.clear();
        self.usable = 0;
        self.unused = 0;
    }
}
