// Clips - detected event windows and the alignment utilities used to
// compare two detectors' output
//
// Both `match_clips` and `merge_clips` expect input ordered by start with
// strictly increasing starts and ends. This is not re-checked.

use serde::{Deserialize, Serialize};

/// Detected event window `[start, start + length)` in samples
///
/// `start` may be negative once initial padding has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Clip {
    pub start: i64,
    pub length: u64,
}

impl Clip {
    pub fn new(start: i64, length: u64) -> Self {
        Self { start, length }
    }

    /// Exclusive end index
    pub fn end(&self) -> i64 {
        self.start + self.length as i64
    }

    /// Half-open interval intersection
    pub fn overlaps(&self, other: &Clip) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// One entry of [`match_clips`] output
///
/// Either a clip of the first sequence with every overlapping clip of the
/// second (possibly none), or a lone unmatched clip of the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipMatch {
    pub a: Option<Clip>,
    pub b: Vec<Clip>,
}

impl ClipMatch {
    pub fn paired(a: Clip, b: Vec<Clip>) -> Self {
        Self { a: Some(a), b }
    }

    pub fn unpaired(b: Clip) -> Self {
        Self {
            a: None,
            b: vec![b],
        }
    }

    /// True when an `a` clip overlaps exactly one `b` clip
    pub fn is_one_to_one(&self) -> bool {
        self.a.is_some() && self.b.len() == 1
    }
}

/// Pair each clip of `a` with the clips of `b` it overlaps
///
/// Runs in O(|a| + |b|) with two forward-only cursors into `b`.
///
/// # Returns
/// Entries ordered by the `a` clip start, with each `b` clip that overlaps
/// nothing in `a` emitted alone at its own position.
pub fn match_clips(a: &[Clip], b: &[Clip]) -> Vec<ClipMatch> {
    let mut matches = Vec::with_capacity(a.len().max(b.len()));
    // b[..next] has already been emitted
    let mut next = 0;
    let mut lo = 0;
    let mut hi = 0;

    for clip in a {
        while lo < b.len() && b[lo].end() <= clip.start {
            lo += 1;
        }
        hi = hi.max(lo);
        while hi < b.len() && b[hi].start < clip.end() {
            hi += 1;
        }

        matches.extend(b[next..lo.max(next)].iter().copied().map(ClipMatch::unpaired));
        matches.push(ClipMatch::paired(*clip, b[lo..hi].to_vec()));
        next = next.max(hi);
    }
    matches.extend(b[next..].iter().copied().map(ClipMatch::unpaired));

    matches
}

/// Merge touching or overlapping clips into spanning clips
///
/// A clip is absorbed when its start is at or before the running end, so
/// the result is strictly increasing and pairwise non-touching. Applying
/// it twice gives the same result as once.
pub fn merge_clips(clips: &[Clip]) -> Vec<Clip> {
    let mut merged: Vec<Clip> = Vec::with_capacity(clips.len());

    for clip in clips {
        match merged.last_mut() {
            Some(current) if clip.start <= current.end() => {
                let end = current.end().max(clip.end());
                current.length = (end - current.start) as u64;
            }
            _ => merged.push(*clip),
        }
    }

    merged
}
