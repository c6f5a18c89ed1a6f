//! Greedy bin-packing of recordings into duration-bounded merges.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Silence units opening every bin.
pub const LEAD_UNITS: u32 = 5;
/// Silence units between two segments of a bin.
pub const PAUSE_UNITS: u32 = 2;
/// Silence units closing every bin.
pub const TAIL_UNITS: u32 = 3;

/// One recording and its measured playing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub path: PathBuf,
    pub duration: Duration,
}

/// One reference in a bin's concatenation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    Silence,
    Segment(&'a Path),
}

/// Segments that end up in one merged file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bin {
    pub segments: Vec<Segment>,
}

impl Bin {
    /// Total playing time including all padding.
    pub fn duration(&self, unit: Duration) -> Duration {
        let speech: Duration = self.segments.iter().map(|s| s.duration).sum();
        let pauses = self.segments.len().saturating_sub(1) as u32 * PAUSE_UNITS;
        speech + unit * (LEAD_UNITS + pauses + TAIL_UNITS)
    }

    /// A lone segment that does not fit the budget even on its own.
    pub fn is_oversized(&self, unit: Duration, max: Duration) -> bool {
        self.segments.len() == 1 && self.duration(unit) > max
    }

    /// Ordered concatenation list: lead silence, segments separated by pauses, tail silence.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        let mut entries = vec![Entry::Silence; LEAD_UNITS as usize];
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                entries.extend(std::iter::repeat_n(Entry::Silence, PAUSE_UNITS as usize));
            }
            entries.push(Entry::Segment(&segment.path));
        }
        entries.extend(std::iter::repeat_n(Entry::Silence, TAIL_UNITS as usize));
        entries
    }
}

/// Group `segments`, in order, into as few bins as the greedy rule allows.
///
/// Each segment is charged as a block of its duration plus one pause. A segment joins
/// the current bin when the running total plus its block plus the closing silence stays
/// within `max`; otherwise the bin is closed and the segment opens the next one. A
/// segment is never split or dropped, so one longer than the budget gets a bin of its own.
pub fn plan_bins(segments: Vec<Segment>, unit: Duration, max: Duration) -> Vec<Bin> {
    let lead = unit * LEAD_UNITS;
    let pause = unit * PAUSE_UNITS;
    let tail = unit * TAIL_UNITS;

    let mut bins = Vec::new();
    let mut current = Bin::default();
    let mut running = lead;

    for segment in segments {
        let block = segment.duration + pause;
        if !current.segments.is_empty() && running + block + tail > max {
            bins.push(std::mem::take(&mut current));
            running = lead;
        }
        running += block;
        current.segments.push(segment);
    }

    if !current.segments.is_empty() {
        bins.push(current);
    }
    bins
}
