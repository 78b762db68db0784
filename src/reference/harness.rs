// Harness - compare a candidate detector's clips with a reference's

use anyhow::Result;
use serde::Serialize;

use super::ReferenceDetector;
use crate::analysis::StreamingDetector;
use crate::clips::{match_clips, Clip, ClipMatch};
use crate::config::DetectorSettings;

/// Differences of a candidate clip relative to the reference clip it
/// overlaps, in samples (candidate minus reference)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchStatistics {
    pub start_diff: i64,
    pub end_diff: i64,
    pub length_diff: i64,
}

impl MatchStatistics {
    pub fn between(reference: &Clip, candidate: &Clip) -> Self {
        Self {
            start_diff: candidate.start - reference.start,
            end_diff: candidate.end() - reference.end(),
            length_diff: candidate.length as i64 - reference.length as i64,
        }
    }

    /// Largest absolute difference
    pub fn max_abs(&self) -> u64 {
        self.start_diff
            .unsigned_abs()
            .max(self.end_diff.unsigned_abs())
            .max(self.length_diff.unsigned_abs())
    }
}

/// One aligned entry with its statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub aligned: ClipMatch,
    /// Per candidate clip; `None` for an unmatched candidate clip
    pub statistics: Option<Vec<MatchStatistics>>,
}

/// Outcome of comparing two clip lists
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquivalenceReport {
    pub reference_count: usize,
    pub candidate_count: usize,
    /// Reference clips overlapped by exactly one identical candidate clip
    pub exact_matches: usize,
    /// Reference clips overlapped by no candidate clip
    pub missing: usize,
    /// Candidate clips overlapping no reference clip
    pub extra: usize,
    pub entries: Vec<ReportEntry>,
}

impl EquivalenceReport {
    /// Both lists are identical
    pub fn is_equivalent(&self) -> bool {
        self.is_within(0)
    }

    /// Every reference clip pairs one-to-one with a candidate clip whose
    /// start, end and length differ by at most `tolerance` samples
    pub fn is_within(&self, tolerance: u64) -> bool {
        self.missing == 0
            && self.extra == 0
            && self.entries.iter().all(|entry| match &entry.statistics {
                Some(stats) => stats.len() == 1 && stats[0].max_abs() <= tolerance,
                None => false,
            })
    }

    /// Largest absolute difference across all paired clips
    pub fn max_deviation(&self) -> u64 {
        self.entries
            .iter()
            .filter_map(|entry| entry.statistics.as_ref())
            .flatten()
            .map(MatchStatistics::max_abs)
            .max()
            .unwrap_or(0)
    }
}

/// Align `candidate` against `reference`
pub fn compare(reference: &[Clip], candidate: &[Clip]) -> EquivalenceReport {
    let entries: Vec<ReportEntry> = match_clips(reference, candidate)
        .into_iter()
        .map(|aligned| {
            let statistics = aligned.a.map(|a| {
                aligned
                    .b
                    .iter()
                    .map(|b| MatchStatistics::between(&a, b))
                    .collect()
            });
            ReportEntry {
                aligned,
                statistics,
            }
        })
        .collect();

    let mut exact_matches = 0;
    let mut missing = 0;
    let mut extra = 0;
    for entry in &entries {
        match (&entry.aligned.a, &entry.statistics) {
            (None, _) => extra += 1,
            (Some(_), Some(stats)) if stats.is_empty() => missing += 1,
            (Some(_), Some(stats)) if stats.len() == 1 && stats[0].max_abs() == 0 => {
                exact_matches += 1
            }
            _ => {}
        }
    }

    EquivalenceReport {
        reference_count: reference.len(),
        candidate_count: candidate.len(),
        exact_matches,
        missing,
        extra,
        entries,
    }
}

/// Run `reference` over the whole signal and a streaming detector over
/// `chunk_size`-sample chunks, then compare
///
/// # Errors
/// Fails if the reference fails or `settings` are invalid.
pub fn validate(
    reference: &mut dyn ReferenceDetector,
    settings: &DetectorSettings,
    samples: &[f64],
    chunk_size: usize,
) -> Result<EquivalenceReport> {
    let expected = reference.detect(samples)?;

    let mut detector = StreamingDetector::new(settings.clone())?;
    let mut actual = Vec::new();
    for chunk in samples.chunks(chunk_size.max(1)) {
        actual.extend(detector.detect(chunk));
    }
    actual.extend(detector.complete_detection());

    let report = compare(&expected, &actual);
    log::info!(
        "[Harness] {} vs streaming ({}-sample chunks): {} reference, {} candidate, {} exact, {} missing, {} extra",
        reference.name(),
        chunk_size,
        report.reference_count,
        report.candidate_count,
        report.exact_matches,
        report.missing,
        report.extra
    );
    Ok(report)
}
