//! Seek controller.
//!
//! Applies seek requests to every ready backend so the native element and
//! the widget stay consistent, falls back across backends on failure, and
//! queues requests that arrive before any backend is ready.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::backend::BackendPair;
use super::types::BackendKind;

/// What happened to a seek request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "camelCase")]
#[ts(export, export_to = "../frontend/src/types/generated/")]
pub enum SeekOutcome {
    /// Reached at least one backend.
    Applied {
        target: f64,
        #[serde(rename = "appliedTo")]
        applied_to: Vec<BackendKind>,
    },
    /// No backend ready yet; replayed on the first readiness transition.
    Queued { target: f64 },
    /// Every attached backend rejected the seek.
    Failed { target: f64 },
}

impl SeekOutcome {
    pub fn target(&self) -> f64 {
        match self {
            SeekOutcome::Applied { target, .. }
            | SeekOutcome::Queued { target }
            | SeekOutcome::Failed { target } => *target,
        }
    }
}

/// Clamp a seek target into `[0, duration]`.
///
/// Only the lower bound applies while the duration is unknown; `NaN` maps
/// to `0`.
pub fn clamp_seek_target(target: f64, duration: f64) -> f64 {
    if target.is_nan() {
        return 0.0;
    }
    let target = target.max(0.0);
    if duration.is_finite() && duration > 0.0 {
        target.min(duration)
    } else if target.is_finite() {
        target
    } else {
        0.0
    }
}

/// Holds at most one pending seek.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeekController {
    pending: Option<f64>,
}

impl SeekController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The seek waiting for a ready backend, if any.
    pub fn pending(&self) -> Option<f64> {
        self.pending
    }

    /// Drop the pending seek (source change, teardown).
    pub fn clear(&mut self) {
        if let Some(target) = self.pending.take() {
            log::debug!("[SEEK] Dropping pending seek to {:.3}s", target);
        }
    }

    /// Seek every ready backend to `target`, widget first.
    ///
    /// Never fails: a rejected seek falls back to the other backend, and a
    /// request with no ready backend is queued, replacing any older one.
    pub fn request(&mut self, target: f64, duration: f64, backends: &mut BackendPair) -> SeekOutcome {
        let target = clamp_seek_target(target, duration);

        if !backends.any_ready() {
            if let Some(previous) = self.pending.replace(target) {
                log::debug!("[SEEK] Pending seek {:.3}s superseded", previous);
            }
            log::debug!("[SEEK] No backend ready, queued seek to {:.3}s", target);
            return SeekOutcome::Queued { target };
        }

        self.pending = None;
        apply(target, backends)
    }

    /// Replay the pending seek once a backend reports ready.
    ///
    /// Returns `None` when nothing was pending or no backend is ready yet.
    pub fn on_backend_ready(&mut self, duration: f64, backends: &mut BackendPair) -> Option<SeekOutcome> {
        if !backends.any_ready() {
            return None;
        }
        let target = self.pending.take()?;
        log::debug!("[SEEK] Replaying pending seek to {:.3}s", target);
        Some(apply(clamp_seek_target(target, duration), backends))
    }
}

fn apply(target: f64, backends: &mut BackendPair) -> SeekOutcome {
    let attached = backends.attached();
    let (ready, fallback): (Vec<BackendKind>, Vec<BackendKind>) =
        attached.into_iter().partition(|kind| backends.is_ready(*kind));

    let mut applied_to = Vec::new();
    for kind in ready {
        if try_seek(backends, kind, target) {
            applied_to.push(kind);
        }
    }

    // Every ready backend rejected the seek: try the ones still loading.
    if applied_to.is_empty() {
        for kind in fallback {
            log::info!("[SEEK] Falling back to {} backend", kind);
            if try_seek(backends, kind, target) {
                applied_to.push(kind);
                break;
            }
        }
    }

    if applied_to.is_empty() {
        log::error!("[SEEK] Seek to {:.3}s failed on every backend", target);
        SeekOutcome::Failed { target }
    } else {
        SeekOutcome::Applied { target, applied_to }
    }
}

fn try_seek(backends: &mut BackendPair, kind: BackendKind, target: f64) -> bool {
    let Some(backend) = backends.get_mut(kind) else {
        return false;
    };
    match backend.seek(target) {
        Ok(()) => {
            log::trace!("[SEEK] {} seeked to {:.3}s", kind, target);
            true
        },
        Err(e) => {
            log::warn!("[SEEK] {} seek to {:.3}s failed: {}", kind, target, e);
            false
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::backend::WidgetSlot;
    use crate::timeline::scripted::{ScriptHandle, ScriptedBackend, ScriptedWidgetFactory};

    fn pair(native_ready: bool, widget_ready: bool) -> (BackendPair, ScriptHandle, ScriptHandle) {
        let (native, native_handle) = ScriptedBackend::new(BackendKind::Native);
        let (widget, widget_handle) = ScriptedBackend::new(BackendKind::Widget);
        native_handle.borrow_mut().ready = native_ready;
        widget_handle.borrow_mut().ready = widget_ready;

        let mut backends = BackendPair::new();
        backends.set_native(Box::new(native));
        backends.set_widget(WidgetSlot::acquire(&mut ScriptedWidgetFactory::with(widget)));
        (backends, native_handle, widget_handle)
    }

    #[test]
    fn test_clamp_seek_target() {
        assert_eq!(clamp_seek_target(-3.0, 20.0), 0.0);
        assert_eq!(clamp_seek_target(999.0, 20.0), 20.0);
        assert_eq!(clamp_seek_target(7.5, 20.0), 7.5);
        assert_eq!(clamp_seek_target(999.0, 0.0), 999.0);
        assert_eq!(clamp_seek_target(f64::NAN, 20.0), 0.0);
        assert_eq!(clamp_seek_target(f64::INFINITY, 0.0), 0.0);
    }

    #[test]
    fn test_seek_clamped_on_backends() {
        let (mut backends, native, widget) = pair(true, true);
        let mut seeks = SeekController::new();

        let outcome = seeks.request(-3.0, 20.0, &mut backends);
        assert_eq!(outcome.target(), 0.0);
        let outcome = seeks.request(999.0, 20.0, &mut backends);
        assert_eq!(
            outcome,
            SeekOutcome::Applied {
                target: 20.0,
                applied_to: vec![BackendKind::Widget, BackendKind::Native],
            }
        );
        assert_eq!(native.borrow().time, 20.0);
        assert_eq!(widget.borrow().time, 20.0);
    }

    #[test]
    fn test_widget_failure_falls_back_to_native() {
        let (mut backends, native, widget) = pair(true, true);
        widget.borrow_mut().fail_seeks = true;

        let outcome = SeekController::new().request(5.0, 20.0, &mut backends);
        assert_eq!(
            outcome,
            SeekOutcome::Applied {
                target: 5.0,
                applied_to: vec![BackendKind::Native],
            }
        );
        assert_eq!(native.borrow().time, 5.0);
    }

    #[test]
    fn test_failure_falls_back_to_loading_backend() {
        let (mut backends, native, widget) = pair(false, true);
        widget.borrow_mut().fail_seeks = true;

        let outcome = SeekController::new().request(5.0, 20.0, &mut backends);
        assert_eq!(
            outcome,
            SeekOutcome::Applied {
                target: 5.0,
                applied_to: vec![BackendKind::Native],
            }
        );
        assert_eq!(native.borrow().seeks, vec![5.0]);
    }

    #[test]
    fn test_all_backends_failing() {
        let (mut backends, native, widget) = pair(true, true);
        native.borrow_mut().fail_seeks = true;
        widget.borrow_mut().fail_seeks = true;

        let outcome = SeekController::new().request(5.0, 20.0, &mut backends);
        assert_eq!(outcome, SeekOutcome::Failed { target: 5.0 });
    }

    #[test]
    fn test_queued_until_ready_then_replayed_once() {
        let (mut backends, native, widget) = pair(false, false);
        let mut seeks = SeekController::new();

        assert_eq!(seeks.request(4.0, 20.0, &mut backends), SeekOutcome::Queued { target: 4.0 });
        assert_eq!(seeks.request(8.0, 20.0, &mut backends), SeekOutcome::Queued { target: 8.0 });
        assert_eq!(seeks.pending(), Some(8.0));

        // Still nothing ready: the pending seek stays queued.
        assert!(seeks.on_backend_ready(20.0, &mut backends).is_none());
        assert_eq!(seeks.pending(), Some(8.0));

        widget.borrow_mut().ready = true;
        let replayed = seeks.on_backend_ready(20.0, &mut backends);
        assert_eq!(
            replayed,
            Some(SeekOutcome::Applied {
                target: 8.0,
                applied_to: vec![BackendKind::Widget],
            })
        );
        assert!(seeks.on_backend_ready(20.0, &mut backends).is_none());

        assert_eq!(widget.borrow().seeks, vec![8.0]);
        assert!(native.borrow().seeks.is_empty());
    }

    #[test]
    fn test_replay_reclamps_to_current_duration() {
        let (mut backends, native, _widget) = pair(false, false);
        let mut seeks = SeekController::new();
        seeks.request(50.0, 0.0, &mut backends);

        native.borrow_mut().ready = true;
        let outcome = seeks.on_backend_ready(30.0, &mut backends);
        assert_eq!(outcome.map(|o| o.target()), Some(30.0));
    }

    #[test]
    fn test_no_backends_attached_queues() {
        let mut backends = BackendPair::new();
        let mut seeks = SeekController::new();
        assert_eq!(seeks.request(3.0, 10.0, &mut backends), SeekOutcome::Queued { target: 3.0 });
        seeks.clear();
        assert_eq!(seeks.pending(), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(SeekOutcome::Applied {
            target: 1.5,
            applied_to: vec![BackendKind::Widget],
        })
        .unwrap();
        assert_eq!(json["status"], "applied");
        assert_eq!(json["appliedTo"][0], "widget");
    }
}
