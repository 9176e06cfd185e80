//! WebVTT chapter track generation and human-readable time labels.

use super::types::ChapterSpan;

/// Whole milliseconds in `seconds`, with non-finite and negative input as 0.
fn millis(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

/// Format seconds as a WebVTT cue timestamp (`HH:MM:SS.mmm`).
pub fn format_vtt_timestamp(seconds: f64) -> String {
    let total_ms = millis(seconds);
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

/// Format seconds for display: `m:ss`, or `h:mm:ss` past the hour.
///
/// Fractional seconds are truncated so the label never runs ahead of the
/// playhead.
pub fn format_clock(seconds: f64) -> String {
    let total_secs = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Render normalized chapters as a `kind="chapters"` WebVTT document.
///
/// Returns `None` for an empty chapter set; no track is published then.
pub fn chapter_vtt(spans: &[ChapterSpan]) -> Option<String> {
    if spans.is_empty() {
        return None;
    }

    let cues: Vec<String> = spans
        .iter()
        .map(|span| {
            format!(
                "{} --> {}\n{}",
                format_vtt_timestamp(span.start),
                format_vtt_timestamp(span.end),
                cue_text(&span.title)
            )
        })
        .collect();

    Some(format!("WEBVTT\n\n{}\n", cues.join("\n\n")))
}

/// Cue payloads cannot contain blank lines or the `-->` separator.
fn cue_text(title: &str) -> String {
    let single_line = title
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    single_line.replace("-->", "->")
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

    #[test]
    fn test_vtt_timestamp() {
        assert_eq!(format_vtt_timestamp(0.0), "00:00:00.000");
        assert_eq!(format_vtt_timestamp(9.5), "00:00:09.500");
        assert_eq!(format_vtt_timestamp(3723.25), "01:02:03.250");
        assert_eq!(format_vtt_timestamp(1.001), "00:00:01.001");
    }

    #[test]
    fn test_vtt_timestamp_invalid_input() {
        assert_eq!(format_vtt_timestamp(-4.0), "00:00:00.000");
        assert_eq!(format_vtt_timestamp(f64::NAN), "00:00:00.000");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(9.99), "0:09");
        assert_eq!(format_clock(75.0), "1:15");
        assert_eq!(format_clock(3600.0), "1:00:00");
        assert_eq!(format_clock(3725.4), "1:02:05");
        assert_eq!(format_clock(f64::INFINITY), "0:00");
    }

    #[test]
    fn test_chapter_vtt() {
        let spans = vec![span(0.0, 9.5, "Warm-up"), span(9.5, 20.0, "Rally 1")];
        let vtt = chapter_vtt(&spans).unwrap();
        assert_eq!(
            vtt,
            "WEBVTT\n\n00:00:00.000 --> 00:00:09.500\nWarm-up\n\n00:00:09.500 --> 00:00:20.000\nRally 1\n"
        );
    }

    #[test]
    fn test_chapter_vtt_empty() {
        assert!(chapter_vtt(&[]).is_none());
    }

    #[test]
    fn test_cue_text_sanitized() {
        let spans = vec![span(0.0, 1.0, "Set 1\n\nGame --> 3")];
        let vtt = chapter_vtt(&spans).unwrap();
        assert!(vtt.ends_with("Set 1 Game -> 3\n"));
    }
}
