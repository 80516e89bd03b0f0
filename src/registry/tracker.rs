use std::mem;
use std::sync::Arc;

use tracing::trace;

use super::overlap::span;
use crate::calls::{IndelCall, SiteCall};
use crate::{CallStream, VarScoreError};

/// A call let go by [`OverlapTracker`].
#[derive(Debug, Clone)]
pub enum Released {
    /// Site reconciled with every indel covering it, not yet classified.
    Site(SiteCall),
    /// Classified indel.
    Indel(IndelCall),
}

/// Groups overlapping indels and holds sites back until every indel that
/// could cover them has been classified.
///
/// Records must arrive sorted by position within a chromosome, an indel
/// keyed on its first affected base. Sites and indels at the same position
/// may come in either order.
#[derive(Debug, Default)]
pub struct OverlapTracker {
    chrom: Option<Arc<str>>,
    group: Vec<IndelCall>,
    group_end: u32,
    active: Vec<IndelCall>,
    held: Vec<SiteCall>,
}

impl OverlapTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sites currently held back.
    pub fn held(&self) -> &[SiteCall] {
        &self.held
    }

    /// Feed an indel; returns what can be released.
    pub fn push_indel(
        &mut self,
        indel: IndelCall,
        stream: &mut CallStream<'_>,
    ) -> Result<Vec<Released>, VarScoreError> {
        let mut out = self.enter_chrom(&indel.chrom, stream)?;
        let (start, end) = span(&indel);
        if !self.group.is_empty() && start >= self.group_end {
            self.close_group(stream, &mut out)?;
        }
        self.release_before(start, stream, &mut out)?;

        self.group_end = if self.group.is_empty() {
            end
        } else {
            self.group_end.max(end)
        };
        self.group.push(indel);
        Ok(out)
    }

    /// Feed a site; returns what can be released.
    pub fn push_site(
        &mut self,
        site: SiteCall,
        stream: &mut CallStream<'_>,
    ) -> Result<Vec<Released>, VarScoreError> {
        let mut out = self.enter_chrom(&site.chrom, stream)?;
        if !self.group.is_empty() && site.pos >= self.group_end {
            self.close_group(stream, &mut out)?;
        }
        self.release_before(site.pos, stream, &mut out)?;
        self.held.push(site);
        Ok(out)
    }

    /// Classify the open group and release every held site.
    pub fn finish(&mut self, stream: &mut CallStream<'_>) -> Result<Vec<Released>, VarScoreError> {
        let mut out = Vec::new();
        self.close_group(stream, &mut out)?;
        self.release_before(u32::MAX, stream, &mut out)?;
        self.active.clear();
        self.chrom = None;
        Ok(out)
    }

    fn enter_chrom(
        &mut self,
        chrom: &Arc<str>,
        stream: &mut CallStream<'_>,
    ) -> Result<Vec<Released>, VarScoreError> {
        if self.chrom.as_deref() == Some(&**chrom) {
            return Ok(Vec::new());
        }
        let out = if self.chrom.is_some() {
            self.finish(stream)?
        } else {
            Vec::new()
        };
        self.chrom = Some(Arc::clone(chrom));
        Ok(out)
    }

    fn close_group(
        &mut self,
        stream: &mut CallStream<'_>,
        out: &mut Vec<Released>,
    ) -> Result<(), VarScoreError> {
        if self.group.is_empty() {
            return Ok(());
        }
        let group = mem::take(&mut self.group);
        for indel in stream.push_indels(group)? {
            self.active.push(indel.clone());
            out.push(Released::Indel(indel));
        }
        Ok(())
    }

    /// Release held sites left of `limit`. Nothing leaves while a group is
    /// open, since it may still cover any held site.
    fn release_before(
        &mut self,
        limit: u32,
        stream: &CallStream<'_>,
        out: &mut Vec<Released>,
    ) -> Result<(), VarScoreError> {
        if !self.group.is_empty() {
            return Ok(());
        }
        let split = self.held.partition_point(|site| site.pos < limit);
        for mut site in self.held.drain(..split) {
            self.active.retain(|indel| span(indel).1 > site.pos);
            for indel in &self.active {
                stream.registry().reconcile_site_with_indel(&mut site, indel)?;
            }
            trace!(pos = site.pos, covering = self.active.len(), "released site");
            out.push(Released::Site(site));
        }
        Ok(())
    }
}
