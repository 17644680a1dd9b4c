//! Overlap grouping
//!
//! Spans are sorted by start and swept once: a span joins the current group
//! when it starts at or before the furthest end seen so far. The scratch
//! state lives only for the duration of one call.

/// A resolved highlight, in absolute text offsets of the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSpan {
    pub start: usize,
    pub end: usize,
    /// Index of the source record
    pub record: usize,
}

/// A maximal run of overlapping spans, rendered as one decoration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapGroup {
    pub start: usize,
    pub end: usize,
    /// Record indices, earliest start first
    pub records: Vec<usize>,
}

impl OverlapGroup {
    /// The record whose id labels the decoration
    pub fn primary(&self) -> usize {
        self.records[0]
    }

    pub fn overlap_count(&self, max: usize) -> usize {
        self.records.len().min(max.max(1))
    }
}

pub fn group_overlapping(mut spans: Vec<ResolvedSpan>) -> Vec<OverlapGroup> {
    // Stable, so equal starts keep input order
    spans.sort_by_key(|s| s.start);

    let mut groups: Vec<OverlapGroup> = Vec::new();
    for span in spans {
        match groups.last_mut() {
            Some(group) if span.start <= group.end => {
                group.end = group.end.max(span.end);
                group.records.push(span.record);
            }
            _ => groups.push(OverlapGroup {
                start: span.start,
                end: span.end,
                records: vec![span.record],
            }),
        }
    }
    groups
}
