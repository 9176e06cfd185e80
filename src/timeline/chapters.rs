//! Chapter normalization.
//!
//! Turns an unordered, possibly overlapping chapter list into spans that are
//! sorted by start, pairwise non-overlapping and at least `min_gap` wide.
//! Malformed input (negative starts, inverted ends, shared starts) is
//! corrected, never rejected.

use super::types::{Chapter, ChapterSpan};
use crate::config::EngineConfig;

/// Minimum chapter width in seconds.
pub const MIN_CHAPTER_GAP: f64 = 0.5;
/// Effective duration used while the real one is unknown (one hour).
pub const FALLBACK_DURATION: f64 = 3600.0;

/// Float slack for width comparisons so normalized output survives a rerun.
const WIDTH_EPSILON: f64 = 1e-9;

/// Duration the normalizer works against.
pub fn effective_duration(duration: f64, fallback: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else if fallback.is_finite() && fallback > 0.0 {
        fallback
    } else {
        FALLBACK_DURATION
    }
}

fn start_key(chapter: &Chapter) -> f64 {
    if chapter.start.is_finite() {
        chapter.start
    } else {
        0.0
    }
}

/// Widen `end` so the span is at least `gap` long, then cap at `ceiling`.
fn widen_end(start: f64, end: f64, gap: f64, ceiling: f64) -> f64 {
    let end = if end < start + gap - WIDTH_EPSILON {
        start + gap
    } else {
        end
    };
    end.min(ceiling)
}

/// Normalize chapters against the resolved duration.
///
/// 1. Sort by start.
/// 2. Clamp starts to `>= 0`; a missing end becomes the next chapter's start
///    (or the effective duration for the last chapter).
/// 3. Clamp ends into `[start + min_gap, effective_duration]`.
/// 4. Resolve overlap with the previous chapter by splitting at the midpoint
///    of both starts. When the starts coincide the previous chapter instead
///    becomes a `min_gap` band ending where the current one starts, and
///    earlier chapters are trimmed against that boundary.
/// 5. An unknown duration is replaced by `fallback_duration`.
///
/// When more chapters are supplied than fit at `min_gap`, the gap shrinks to
/// `effective_duration / n` so the output stays valid.
pub fn normalize_chapters(
    chapters: &[Chapter],
    duration: f64,
    min_gap: f64,
    fallback_duration: f64,
) -> Vec<ChapterSpan> {
    if chapters.is_empty() {
        return Vec::new();
    }

    let eff = effective_duration(duration, fallback_duration);
    let requested_gap = if min_gap.is_finite() && min_gap > 0.0 {
        min_gap
    } else {
        MIN_CHAPTER_GAP
    };
    let gap = requested_gap.min(eff / chapters.len() as f64);

    let mut sorted: Vec<&Chapter> = chapters.iter().collect();
    sorted.sort_by(|a, b| start_key(a).total_cmp(&start_key(b)));

    let starts: Vec<f64> = sorted
        .iter()
        .map(|c| start_key(c).max(0.0).min(eff))
        .collect();

    let mut spans: Vec<ChapterSpan> = Vec::with_capacity(sorted.len());
    for (i, chapter) in sorted.iter().enumerate() {
        let start = starts[i];
        let end = chapter
            .end
            .filter(|e| e.is_finite())
            .unwrap_or_else(|| starts.get(i + 1).copied().unwrap_or(eff));
        let mut current = ChapterSpan {
            start,
            end: widen_end(start, end, gap, eff),
            title: chapter.title.clone(),
        };

        if let Some(prev) = spans.last_mut() {
            if current.start < prev.end {
                let midpoint = (prev.start + current.start) / 2.0;
                if midpoint > prev.start {
                    prev.end = midpoint;
                    current.start = midpoint;
                } else {
                    // Shared start: the previous chapter collapses onto this
                    // boundary and is widened backwards below.
                    prev.end = current.start;
                }
            }
        }

        spans.push(current);
    }

    enforce_min_width_backward(&mut spans, gap, eff);
    enforce_order_forward(&mut spans, gap, eff);

    spans
}

/// Normalize using the gap and fallback from the engine configuration.
pub fn normalize_chapters_with(
    chapters: &[Chapter],
    duration: f64,
    config: &EngineConfig,
) -> Vec<ChapterSpan> {
    normalize_chapters(
        chapters,
        duration,
        config.min_chapter_gap_secs,
        config.fallback_duration_secs,
    )
}

/// Walk from the last chapter to the first, keeping each chapter inside the
/// start of its successor and pulling its start back when it is too narrow.
fn enforce_min_width_backward(spans: &mut [ChapterSpan], gap: f64, eff: f64) {
    let n = spans.len();
    for i in (0..n).rev() {
        let limit = if i + 1 < n { spans[i + 1].start } else { eff };
        let span = &mut spans[i];
        span.end = span.end.min(limit);
        if span.width() < gap - WIDTH_EPSILON {
            span.end = (span.start + gap).min(limit);
            span.start = span.start.min(span.end - gap);
        }
    }
}

/// Walk forward pushing chapters that were pulled below zero or below their
/// predecessor back into place.
fn enforce_order_forward(spans: &mut [ChapterSpan], gap: f64, eff: f64) {
    let mut floor = 0.0_f64;
    for span in spans.iter_mut() {
        if span.start < floor {
            span.start = floor;
        }
        span.end = widen_end(span.start, span.end, gap, eff);
        span.start = span.start.min(span.end);
        floor = span.end;
    }
}

/// Index of the chapter containing `time` (`[start, end)`).
pub fn active_chapter(spans: &[ChapterSpan], time: f64) -> Option<usize> {
    spans.iter().position(|span| span.contains(time))
}
