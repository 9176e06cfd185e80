//! Timeline layout projection.
//!
//! [`project_layout`] turns (duration, current time, segment, normalized
//! chapters) into the render model for the timeline strip. It is a pure
//! function: identical input always yields identical output, and nothing is
//! mutated.
//!
//! Layers, bottom to top:
//! - chapter bands (clickable, seek to the chapter start)
//! - progress fill
//! - trim masks and segment marker (whole-timeline mode only)
//! - playhead

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::coord::TimelineWindow;
use super::types::{ChapterSpan, PlaybackSegment};
use super::vtt::format_clock;

/// Hint shown under the title when playback is not trimmed.
pub const CHAPTER_HINT: &str =
    "Click on the colored timeline regions to jump to the beginning of each chapter.";

/// Coordinate space of the timeline strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub enum RenderMode {
    /// The active segment fills the whole strip.
    #[default]
    SegmentRelative,
    /// The strip spans the full media; the segment is marked and the rest
    /// dimmed.
    WholeTimeline,
}

/// A horizontal rectangle in percent of the strip.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct Band {
    pub left: f64,
    pub width: f64,
}

/// One rendered chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct ChapterBand {
    /// Index into the normalized chapter list.
    pub index: usize,
    pub title: String,
    /// Visible start in seconds (clipped to the segment).
    pub start: f64,
    /// Visible end in seconds (clipped to the segment).
    pub end: f64,
    pub left: f64,
    pub width: f64,
    pub is_active: bool,
    /// Where a click on this band seeks to.
    pub seek_target: f64,
    /// `"title (m:ss - m:ss)"`.
    pub tooltip: String,
}

/// Text shown around the strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct TimeLabels {
    pub current: String,
    pub total: String,
    pub range_start: String,
    pub range_end: String,
    pub caption: String,
}

impl TimeLabels {
    fn zero() -> Self {
        let zero = format_clock(0.0);
        Self {
            current: zero.clone(),
            total: zero.clone(),
            range_start: zero.clone(),
            range_end: zero,
            caption: CHAPTER_HINT.to_string(),
        }
    }
}

/// Render model for the timeline strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub struct TimelineLayout {
    pub mode: RenderMode,
    pub chapters: Vec<ChapterBand>,
    pub playhead: f64,
    pub progress: Band,
    pub trim_masks: Vec<Band>,
    pub segment_marker: Option<Band>,
    pub labels: TimeLabels,
}

impl TimelineLayout {
    /// Layout for an unknown duration: nothing to draw.
    pub fn empty(mode: RenderMode) -> Self {
        Self {
            mode,
            chapters: Vec::new(),
            playhead: 0.0,
            progress: Band::default(),
            trim_masks: Vec::new(),
            segment_marker: None,
            labels: TimeLabels::zero(),
        }
    }
}

/// Everything the projector reads.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
    pub duration: f64,
    pub current_time: f64,
    pub segment: Option<&'a PlaybackSegment>,
    /// Normalized chapters.
    pub chapters: &'a [ChapterSpan],
    pub mode: RenderMode,
    /// Narrowest band drawn, in percent.
    pub min_band_width_pct: f64,
}

/// Project the timeline render model.
pub fn project_layout(input: &LayoutInput<'_>) -> TimelineLayout {
    let duration = input.duration;
    if !(duration.is_finite() && duration > 0.0) {
        return TimelineLayout::empty(input.mode);
    }

    let whole = TimelineWindow::whole(duration);
    let window = match input.mode {
        RenderMode::SegmentRelative => TimelineWindow::for_segment(duration, input.segment),
        RenderMode::WholeTimeline => whole,
    };
    let current = if input.current_time.is_finite() {
        input.current_time
    } else {
        0.0
    };

    let chapters = project_chapters(input, &window, current);
    let playhead = window.percentage(current);

    let (progress, trim_masks, segment_marker) = match (input.mode, input.segment) {
        (RenderMode::WholeTimeline, Some(seg)) => {
            let seg_window = TimelineWindow::for_segment(duration, Some(seg));
            let left = whole.percentage(seg.start);
            let right = whole.percentage(seg.effective_end());
            let elapsed_to = seg_window.clamp_time(current);
            let progress = Band {
                left,
                width: whole.span_percentage(seg.start, elapsed_to),
            };

            let mut masks = Vec::new();
            if left > 0.0 {
                masks.push(Band { left: 0.0, width: left });
            }
            if right < 100.0 {
                masks.push(Band {
                    left: right,
                    width: 100.0 - right,
                });
            }

            let marker = Band {
                left,
                width: right - left,
            };
            (progress, masks, Some(marker))
        },
        _ => (
            Band {
                left: 0.0,
                width: playhead,
            },
            Vec::new(),
            None,
        ),
    };

    TimelineLayout {
        mode: input.mode,
        chapters,
        playhead,
        progress,
        trim_masks,
        segment_marker,
        labels: project_labels(duration, current, input.segment),
    }
}

fn project_chapters(input: &LayoutInput<'_>, window: &TimelineWindow, current: f64) -> Vec<ChapterBand> {
    let min_width = if input.min_band_width_pct.is_finite() {
        input.min_band_width_pct.max(0.0)
    } else {
        0.0
    };

    input
        .chapters
        .iter()
        .enumerate()
        .filter_map(|(index, span)| {
            let (start, end) = match input.segment {
                Some(seg) => {
                    if !seg.overlaps(span.start, span.end) {
                        return None;
                    }
                    (span.start.max(seg.start), span.end.min(seg.effective_end()))
                },
                None => (span.start, span.end),
            };

            let left = window.percentage(start);
            let right = window.percentage(end);
            Some(ChapterBand {
                index,
                title: span.title.clone(),
                start,
                end,
                left,
                width: (right - left).max(min_width),
                is_active: span.contains(current),
                seek_target: start,
                tooltip: format!("{} ({} - {})", span.title, format_clock(start), format_clock(end)),
            })
        })
        .collect()
}

fn project_labels(duration: f64, current: f64, segment: Option<&PlaybackSegment>) -> TimeLabels {
    match segment {
        Some(seg) => {
            let start = format_clock(seg.start);
            let end = format_clock(seg.effective_end());
            TimeLabels {
                current: format_clock(current),
                total: end.clone(),
                caption: format!("Playing segment: {} - {}", start, end),
                range_start: start,
                range_end: end,
            }
        },
        None => TimeLabels {
            current: format_clock(current),
            total: format_clock(duration),
            range_start: format_clock(0.0),
            range_end: format_clock(duration),
            caption: CHAPTER_HINT.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: f64, end: f64, title: &str) -> ChapterSpan {
        ChapterSpan {
            start,
            end,
            title: title.to_string(),
        }
    }

    fn input<'a>(
        duration: f64,
        current_time: f64,
        segment: Option<&'a PlaybackSegment>,
        chapters: &'a [ChapterSpan],
        mode: RenderMode,
    ) -> LayoutInput<'a> {
        LayoutInput {
            duration,
            current_time,
            segment,
            chapters,
            mode,
            min_band_width_pct: 0.5,
        }
    }

    fn segment(start: f64, end: f64, duration: f64) -> PlaybackSegment {
        PlaybackSegment {
            start,
            end: Some(end),
            duration,
        }
    }

    #[test]
    fn test_segment_playhead_scenario() {
        let seg = segment(30.0, 90.0, 120.0);
        let layout = project_layout(&input(120.0, 60.0, Some(&seg), &[], RenderMode::SegmentRelative));
        assert_eq!(layout.playhead, 50.0);
        assert_eq!(layout.progress, Band { left: 0.0, width: 50.0 });
        assert!(layout.trim_masks.is_empty());
        assert!(layout.segment_marker.is_none());
        assert_eq!(layout.labels.caption, "Playing segment: 0:30 - 1:30");
        assert_eq!(layout.labels.total, "1:30");
    }

    #[test]
    fn test_unknown_duration_is_empty() {
        let chapters = vec![span(0.0, 10.0, "A")];
        for duration in [0.0, -4.0, f64::NAN] {
            let layout = project_layout(&input(duration, 7.0, None, &chapters, RenderMode::SegmentRelative));
            assert_eq!(layout, TimelineLayout::empty(RenderMode::SegmentRelative));
            assert_eq!(layout.labels.current, "0:00");
        }
    }

    #[test]
    fn test_untrimmed_chapter_bands() {
        let chapters = vec![span(0.0, 5.0, "Warm-up"), span(5.0, 20.0, "Rally 1")];
        let layout = project_layout(&input(20.0, 6.0, None, &chapters, RenderMode::SegmentRelative));

        assert_eq!(layout.chapters.len(), 2);
        assert_eq!((layout.chapters[0].left, layout.chapters[0].width), (0.0, 25.0));
        assert_eq!((layout.chapters[1].left, layout.chapters[1].width), (25.0, 75.0));
        assert!(!layout.chapters[0].is_active);
        assert!(layout.chapters[1].is_active);
        assert_eq!(layout.chapters[1].seek_target, 5.0);
        assert_eq!(layout.chapters[1].tooltip, "Rally 1 (0:05 - 0:20)");
        assert_eq!(layout.labels.caption, CHAPTER_HINT);
        assert_eq!(layout.playhead, 30.0);
    }

    #[test]
    fn test_chapters_outside_segment_omitted_and_clipped() {
        let seg = segment(30.0, 90.0, 120.0);
        let chapters = vec![
            span(0.0, 30.0, "Before"),
            span(30.0, 60.0, "First half"),
            span(60.0, 100.0, "Spills over"),
            span(100.0, 120.0, "After"),
        ];
        let layout = project_layout(&input(120.0, 45.0, Some(&seg), &chapters, RenderMode::SegmentRelative));

        let titles: Vec<&str> = layout.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["First half", "Spills over"]);

        let spill = &layout.chapters[1];
        assert_eq!(spill.index, 2);
        assert_eq!((spill.start, spill.end), (60.0, 90.0));
        assert_eq!((spill.left, spill.width), (50.0, 50.0));
        assert!(layout.chapters[0].is_active);
    }

    #[test]
    fn test_clipped_seek_target_is_segment_start() {
        let seg = segment(30.0, 90.0, 120.0);
        let chapters = vec![span(10.0, 50.0, "Straddles start")];
        let layout = project_layout(&input(120.0, 30.0, Some(&seg), &chapters, RenderMode::SegmentRelative));
        assert_eq!(layout.chapters[0].seek_target, 30.0);
        assert_eq!(layout.chapters[0].left, 0.0);
    }

    #[test]
    fn test_narrow_band_widened() {
        let chapters = vec![span(0.0, 0.5, "Serve"), span(0.5, 3600.0, "Match")];
        let layout = project_layout(&input(3600.0, 0.0, None, &chapters, RenderMode::SegmentRelative));
        assert_eq!(layout.chapters[0].width, 0.5);
    }

    #[test]
    fn test_whole_timeline_masks_and_marker() {
        let seg = segment(30.0, 90.0, 120.0);
        let layout = project_layout(&input(120.0, 60.0, Some(&seg), &[], RenderMode::WholeTimeline));

        assert_eq!(layout.playhead, 50.0);
        assert_eq!(
            layout.trim_masks,
            vec![Band { left: 0.0, width: 25.0 }, Band { left: 75.0, width: 25.0 }]
        );
        assert_eq!(layout.segment_marker, Some(Band { left: 25.0, width: 50.0 }));
        assert_eq!(layout.progress, Band { left: 25.0, width: 25.0 });
    }

    #[test]
    fn test_whole_timeline_progress_clamped_to_segment() {
        let seg = segment(30.0, 90.0, 120.0);
        let before = project_layout(&input(120.0, 10.0, Some(&seg), &[], RenderMode::WholeTimeline));
        let after = project_layout(&input(120.0, 110.0, Some(&seg), &[], RenderMode::WholeTimeline));
        assert_eq!(before.progress.width, 0.0);
        assert_eq!(after.progress.width, 50.0);
    }

    #[test]
    fn test_whole_timeline_without_segment_has_no_masks() {
        let layout = project_layout(&input(20.0, 5.0, None, &[], RenderMode::WholeTimeline));
        assert!(layout.trim_masks.is_empty());
        assert!(layout.segment_marker.is_none());
        assert_eq!(layout.progress.width, 25.0);
    }

    #[test]
    fn test_open_ended_segment_has_single_mask() {
        let seg = PlaybackSegment {
            start: 30.0,
            end: None,
            duration: 120.0,
        };
        let layout = project_layout(&input(120.0, 30.0, Some(&seg), &[], RenderMode::WholeTimeline));
        assert_eq!(layout.trim_masks, vec![Band { left: 0.0, width: 25.0 }]);
    }

    #[test]
    fn test_progress_monotonic_and_bounded() {
        let seg = segment(5.0, 15.0, 30.0);
        for mode in [RenderMode::SegmentRelative, RenderMode::WholeTimeline] {
            let mut last = 0.0;
            for step in 0..=300 {
                let t = step as f64 * 0.1;
                let layout = project_layout(&input(30.0, t, Some(&seg), &[], mode));
                let width = layout.progress.width;
                assert!((0.0..=100.0).contains(&width));
                assert!(width >= last, "progress went backwards at t={} in {:?}", t, mode);
                last = width;
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let seg = segment(5.0, 15.0, 30.0);
        let chapters = vec![span(0.0, 10.0, "A"), span(10.0, 30.0, "B")];
        let a = project_layout(&input(30.0, 12.0, Some(&seg), &chapters, RenderMode::SegmentRelative));
        let b = project_layout(&input(30.0, 12.0, Some(&seg), &chapters, RenderMode::SegmentRelative));
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&RenderMode::WholeTimeline).unwrap(),
            "\"wholeTimeline\""
        );
    }
}
