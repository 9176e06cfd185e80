//! Authoritative duration resolution.

use super::types::DurationSource;

/// Duration together with the source that supplied it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedDuration {
    pub seconds: f64,
    pub source: DurationSource,
}

impl ResolvedDuration {
    pub const UNKNOWN: ResolvedDuration = ResolvedDuration {
        seconds: 0.0,
        source: DurationSource::Unknown,
    };

    pub fn is_known(&self) -> bool {
        self.seconds > 0.0
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Pick the authoritative duration.
///
/// The externally supplied value wins whenever it is a finite positive
/// number, then the media-reported one, otherwise `0` (unknown).
pub fn resolve_duration(external: Option<f64>, media: Option<f64>) -> ResolvedDuration {
    if let Some(seconds) = usable(external) {
        return ResolvedDuration {
            seconds,
            source: DurationSource::External,
        };
    }
    if let Some(seconds) = usable(media) {
        return ResolvedDuration {
            seconds,
            source: DurationSource::Media,
        };
    }
    ResolvedDuration::UNKNOWN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_wins() {
        let resolved = resolve_duration(Some(42.0), Some(40.5));
        assert_eq!(resolved.seconds, 42.0);
        assert_eq!(resolved.source, DurationSource::External);
    }

    #[test]
    fn test_media_fallback() {
        for external in [None, Some(0.0), Some(-1.0), Some(f64::NAN), Some(f64::INFINITY)] {
            let resolved = resolve_duration(external, Some(40.5));
            assert_eq!(resolved.seconds, 40.5);
            assert_eq!(resolved.source, DurationSource::Media);
        }
    }

    #[test]
    fn test_unknown_when_media_is_nan() {
        let resolved = resolve_duration(None, Some(f64::NAN));
        assert_eq!(resolved, ResolvedDuration::UNKNOWN);
        assert!(!resolved.is_known());
    }

    #[test]
    fn test_media_infinity_is_unknown() {
        // Live streams report +Infinity.
        let resolved = resolve_duration(None, Some(f64::INFINITY));
        assert_eq!(resolved.seconds, 0.0);
    }
}
