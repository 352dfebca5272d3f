//! Pointer gesture state machine: classifies a stream of pointer-id tagged
//! positions into pan / pinch / double-tap and drives the view transform.
//!
//! All geometry arrives as plain numbers (see [`StageRect`]) so this module
//! stays free of web_sys and runs under host unit tests. Every mutation is
//! synchronous; methods return `true` when the transform changed and the
//! caller should push it to the render sink.

use std::collections::BTreeMap;

use super::transform::{MAX_SCALE, MIN_SCALE, ViewTransform, Viewport, clamp_translate};

/// Two taps closer than this in time count as a double-tap.
pub const DOUBLE_TAP_WINDOW_MS: f64 = 300.0;
/// ...and closer than this on screen.
pub const DOUBLE_TAP_RADIUS_PX: f64 = 24.0;
/// Double-tap zooms to this scale, or back to 1 when already past the
/// halfway threshold.
const TOGGLE_ZOOM_SCALE: f64 = 2.0;
const TOGGLE_ZOOM_THRESHOLD: f64 = 1.5;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Stage bounding rectangle in screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl StageRect {
    pub fn viewport(&self) -> Viewport {
        Viewport { width: self.width, height: self.height }
    }

    /// Screen coordinates -> coordinates relative to the stage center.
    fn to_center(&self, p: Point) -> Point {
        Point::new(
            p.x - (self.left + self.width / 2.0),
            p.y - (self.top + self.height / 2.0),
        )
    }
}

/// Snapshot taken the moment the second pointer engages. The live midpoint
/// is re-read on every move, so only scale/translate/distance are kept.
#[derive(Clone, Copy, Debug)]
struct PinchStart {
    s0: f64,
    t0: Point,
    d0: f64,
}

#[derive(Clone, Copy, Debug)]
struct TapRecord {
    at_ms: f64,
    pos: Point,
}

/// Owns all gesture-related mutable state for one stage: the pointer map,
/// the ephemeral pinch snapshot, the last-tap record, the pan continuity
/// anchor and the committed view transform.
#[derive(Default)]
pub struct GestureTracker {
    /// Keyed by pointer id; BTreeMap iteration gives the deterministic
    /// "lowest two ids" pair when more than two pointers are down.
    pointers: BTreeMap<i32, Point>,
    pinch: Option<PinchStart>,
    last_tap: Option<TapRecord>,
    pan_anchor: Option<Point>,
    transform: ViewTransform,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Track a new pointer. Detects double-tap (single pointer only) and
    /// arms the pinch snapshot when the second pointer lands.
    pub fn pointer_down(&mut self, id: i32, pos: Point, now_ms: f64, stage: StageRect) -> bool {
        self.pointers.insert(id, pos);
        let mut changed = false;

        if self.pointers.len() == 1 {
            if let Some(tap) = self.last_tap {
                if now_ms - tap.at_ms < DOUBLE_TAP_WINDOW_MS
                    && tap.pos.distance_to(pos) < DOUBLE_TAP_RADIUS_PX
                {
                    self.toggle_zoom(pos, stage);
                    changed = true;
                }
            }
        }
        self.last_tap = Some(TapRecord { at_ms: now_ms, pos });

        if self.pointers.len() == 2 {
            if let Some((_, dist)) = self.pinch_geometry() {
                self.pinch = Some(PinchStart {
                    s0: self.transform.scale,
                    t0: Point::new(self.transform.tx, self.transform.ty),
                    d0: dist,
                });
            }
        }
        changed
    }

    /// Update a tracked pointer's position, applying pinch or pan.
    pub fn pointer_move(&mut self, id: i32, pos: Point, stage: StageRect) -> bool {
        match self.pointers.get_mut(&id) {
            Some(p) => *p = pos,
            None => return false,
        }

        if self.pointers.len() >= 2 {
            let Some(start) = self.pinch else { return false };
            let Some((mid, dist)) = self.pinch_geometry() else { return false };
            // Coincident start pointers would divide by zero; treat as no
            // scale change.
            let ratio = if start.d0 > 0.0 { dist / start.d0 } else { 1.0 };
            let s1 = (start.s0 * ratio).clamp(MIN_SCALE, MAX_SCALE);
            self.transform =
                anchored_rescale(stage.to_center(mid), start.s0, start.t0, s1, stage.viewport());
            true
        } else if self.transform.scale > MIN_SCALE {
            // Single pointer pans when zoomed in; plain screen-space deltas,
            // not anchored to any stage point.
            let prev = self.pan_anchor.unwrap_or(pos);
            self.pan_anchor = Some(pos);
            let (tx, ty) = clamp_translate(
                self.transform.scale,
                self.transform.tx + (pos.x - prev.x),
                self.transform.ty + (pos.y - prev.y),
                stage.viewport(),
            );
            self.transform.tx = tx;
            self.transform.ty = ty;
            true
        } else {
            false
        }
    }

    /// Forget a pointer (up or cancel). Dropping below two pointers ends the
    /// pinch; dropping to zero clears the pan anchor so the next touch does
    /// not inherit a stale delta origin.
    pub fn pointer_up(&mut self, id: i32) {
        self.pointers.remove(&id);
        if self.pointers.len() < 2 {
            self.pinch = None;
        }
        if self.pointers.is_empty() {
            self.pan_anchor = None;
        }
    }

    /// Re-clamp the current transform against new stage bounds, keeping the
    /// scale (window resize).
    pub fn resize(&mut self, stage: StageRect) {
        self.transform.reclamp(stage.viewport());
    }

    /// Back to the default view (new file loaded). Gesture bookkeeping is
    /// dropped with it.
    pub fn reset_view(&mut self) {
        self.transform.reset();
        self.pinch = None;
        self.pan_anchor = None;
        self.last_tap = None;
    }

    fn toggle_zoom(&mut self, tap: Point, stage: StageRect) {
        let s0 = self.transform.scale;
        let s1 = if s0 < TOGGLE_ZOOM_THRESHOLD { TOGGLE_ZOOM_SCALE } else { MIN_SCALE };
        let t0 = Point::new(self.transform.tx, self.transform.ty);
        self.transform = anchored_rescale(stage.to_center(tap), s0, t0, s1, stage.viewport());
    }

    /// Midpoint and distance of the two lowest-id pointers.
    fn pinch_geometry(&self) -> Option<(Point, f64)> {
        let mut it = self.pointers.values();
        let a = *it.next()?;
        let b = *it.next()?;
        let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        Some((mid, a.distance_to(b)))
    }
}

/// Rescale about an anchor point `pc` (stage-center coordinates): the stage
/// point under `pc` at (s0, t0) stays under `pc` at the new scale.
/// t1 = pc − s1·(pc − t0)/s0, then clamped.
fn anchored_rescale(pc: Point, s0: f64, t0: Point, s1: f64, viewport: Viewport) -> ViewTransform {
    let t1x = pc.x - s1 * (pc.x - t0.x) / s0;
    let t1y = pc.y - s1 * (pc.y - t0.y) / s0;
    ViewTransform::clamped(s1, t1x, t1y, viewport)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: StageRect = StageRect { left: 0.0, top: 0.0, width: 800.0, height: 600.0 };

    fn pinch_to(tracker: &mut GestureTracker, a: Point, b: Point) -> bool {
        let c1 = tracker.pointer_move(1, a, STAGE);
        let c2 = tracker.pointer_move(2, b, STAGE);
        c1 || c2
    }

    /// Screen position of the stage point that currently sits under `screen`
    /// given a transform (scale about center + translate).
    fn screen_of(stage_pt: Point, t: ViewTransform, stage: StageRect) -> Point {
        let cx = stage.left + stage.width / 2.0;
        let cy = stage.top + stage.height / 2.0;
        Point::new(cx + t.scale * stage_pt.x + t.tx, cy + t.scale * stage_pt.y + t.ty)
    }

    #[test]
    fn pinch_doubles_scale_and_keeps_anchor_fixed() {
        let mut tr = GestureTracker::new();
        // two pointers 100px apart, midpoint at (300, 300)
        tr.pointer_down(1, Point::new(250.0, 300.0), 0.0, STAGE);
        tr.pointer_down(2, Point::new(350.0, 300.0), 10.0, STAGE);

        // stage point under the midpoint before the move
        let t0 = tr.transform();
        let pc = Point::new(300.0 - 400.0, 300.0 - 300.0); // center-relative
        let anchor = Point::new((pc.x - t0.tx) / t0.scale, (pc.y - t0.ty) / t0.scale);

        // spread to 200px keeping the midpoint
        assert!(pinch_to(&mut tr, Point::new(200.0, 300.0), Point::new(400.0, 300.0)));
        let t1 = tr.transform();
        assert!((t1.scale - 2.0).abs() < 1e-12);

        let before = screen_of(anchor, t0, STAGE);
        let after = screen_of(anchor, t1, STAGE);
        assert!(before.distance_to(after) < 1e-9, "anchor moved: {before:?} -> {after:?}");
    }

    #[test]
    fn pinch_scale_is_clamped_to_max() {
        let mut tr = GestureTracker::new();
        tr.pointer_down(1, Point::new(399.0, 300.0), 0.0, STAGE);
        tr.pointer_down(2, Point::new(401.0, 300.0), 10.0, STAGE);
        pinch_to(&mut tr, Point::new(0.0, 300.0), Point::new(800.0, 300.0));
        assert_eq!(tr.transform().scale, MAX_SCALE);
    }

    #[test]
    fn coincident_pointers_do_not_divide_by_zero() {
        let mut tr = GestureTracker::new();
        tr.pointer_down(1, Point::new(300.0, 300.0), 0.0, STAGE);
        tr.pointer_down(2, Point::new(300.0, 300.0), 10.0, STAGE);
        pinch_to(&mut tr, Point::new(250.0, 300.0), Point::new(350.0, 300.0));
        let t = tr.transform();
        assert!(t.scale.is_finite());
        assert_eq!(t.scale, 1.0); // ratio treated as 1
    }

    #[test]
    fn double_tap_toggle_is_idempotent() {
        let mut tr = GestureTracker::new();
        let tap = Point::new(500.0, 200.0);

        tr.pointer_down(1, tap, 0.0, STAGE);
        tr.pointer_up(1);
        assert!(tr.pointer_down(1, tap, 100.0, STAGE));
        tr.pointer_up(1);
        assert_eq!(tr.transform().scale, 2.0);

        // next pair of taps, outside the first window, toggles back
        tr.pointer_down(1, tap, 1000.0, STAGE);
        tr.pointer_up(1);
        assert!(tr.pointer_down(1, tap, 1100.0, STAGE));
        tr.pointer_up(1);
        let t = tr.transform();
        assert_eq!(t.scale, 1.0);
        assert_eq!((t.tx, t.ty), (0.0, 0.0));
    }

    #[test]
    fn slow_or_distant_taps_do_not_toggle() {
        let mut tr = GestureTracker::new();
        tr.pointer_down(1, Point::new(100.0, 100.0), 0.0, STAGE);
        tr.pointer_up(1);
        // too late
        assert!(!tr.pointer_down(1, Point::new(100.0, 100.0), 400.0, STAGE));
        tr.pointer_up(1);
        // too far
        assert!(!tr.pointer_down(1, Point::new(160.0, 100.0), 500.0, STAGE));
        tr.pointer_up(1);
        assert_eq!(tr.transform().scale, 1.0);
    }

    #[test]
    fn single_pointer_does_not_pan_at_unit_scale() {
        let mut tr = GestureTracker::new();
        tr.pointer_down(1, Point::new(100.0, 100.0), 0.0, STAGE);
        assert!(!tr.pointer_move(1, Point::new(150.0, 120.0), STAGE));
        assert_eq!(tr.transform(), ViewTransform::default());
    }

    #[test]
    fn pan_accumulates_deltas_and_clamps() {
        let mut tr = GestureTracker::new();
        zoom_in(&mut tr); // scale 2, translate (0,0) via center double-tap

        tr.pointer_down(7, Point::new(400.0, 300.0), 2000.0, STAGE);
        // first move only seeds the anchor
        tr.pointer_move(7, Point::new(400.0, 300.0), STAGE);
        tr.pointer_move(7, Point::new(430.0, 310.0), STAGE);
        tr.pointer_move(7, Point::new(460.0, 320.0), STAGE);
        let t = tr.transform();
        assert_eq!((t.tx, t.ty), (60.0, 20.0));

        // drag far past the bound
        tr.pointer_move(7, Point::new(2000.0, 1500.0), STAGE);
        let t = tr.transform();
        assert_eq!((t.tx, t.ty), (400.0, 300.0));
        tr.pointer_up(7);
    }

    #[test]
    fn pan_anchor_resets_after_all_pointers_lift() {
        let mut tr = GestureTracker::new();
        zoom_in(&mut tr);

        tr.pointer_down(1, Point::new(400.0, 300.0), 2000.0, STAGE);
        tr.pointer_move(1, Point::new(400.0, 300.0), STAGE);
        tr.pointer_move(1, Point::new(410.0, 300.0), STAGE);
        tr.pointer_up(1);
        let before = tr.transform();
        assert_eq!((before.tx, before.ty), (10.0, 0.0));

        // re-touch far away; the first move must seed a fresh anchor, not
        // apply the gap to the stale one
        tr.pointer_down(2, Point::new(100.0, 100.0), 3000.0, STAGE);
        tr.pointer_move(2, Point::new(105.0, 100.0), STAGE);
        assert_eq!(tr.transform(), before);
        tr.pointer_up(2);
    }

    #[test]
    fn lowest_two_ids_drive_the_pinch() {
        let mut tr = GestureTracker::new();
        tr.pointer_down(3, Point::new(250.0, 300.0), 0.0, STAGE);
        tr.pointer_down(5, Point::new(350.0, 300.0), 10.0, STAGE);
        tr.pointer_down(9, Point::new(700.0, 550.0), 20.0, STAGE);

        // moving the third (highest id) pointer keeps scale at the snapshot
        tr.pointer_move(9, Point::new(100.0, 100.0), STAGE);
        assert!((tr.transform().scale - 1.0).abs() < 1e-12);

        // spreading the two lowest ids doubles the scale
        tr.pointer_move(3, Point::new(200.0, 300.0), STAGE);
        tr.pointer_move(5, Point::new(400.0, 300.0), STAGE);
        assert!((tr.transform().scale - 2.0).abs() < 1e-12);
    }

    #[test]
    fn untracked_pointer_moves_are_ignored() {
        let mut tr = GestureTracker::new();
        assert!(!tr.pointer_move(42, Point::new(10.0, 10.0), STAGE));
        assert_eq!(tr.pointer_count(), 0);
    }

    #[test]
    fn resize_reclamps_out_of_bounds_translate() {
        let mut tr = GestureTracker::new();
        zoom_in(&mut tr);
        tr.pointer_down(1, Point::new(400.0, 300.0), 2000.0, STAGE);
        tr.pointer_move(1, Point::new(400.0, 300.0), STAGE);
        tr.pointer_move(1, Point::new(800.0, 600.0), STAGE); // drags to the bound
        tr.pointer_up(1);
        assert_eq!((tr.transform().tx, tr.transform().ty), (400.0, 300.0));

        tr.resize(StageRect { left: 0.0, top: 0.0, width: 400.0, height: 300.0 });
        let t = tr.transform();
        assert_eq!(t.scale, 2.0);
        assert_eq!((t.tx, t.ty), (200.0, 150.0));
    }

    #[test]
    fn reset_view_returns_to_default() {
        let mut tr = GestureTracker::new();
        zoom_in(&mut tr);
        tr.reset_view();
        assert_eq!(tr.transform(), ViewTransform::default());
    }

    /// Double-tap at the stage center: scale 2, translate (0,0).
    fn zoom_in(tr: &mut GestureTracker) {
        let center = Point::new(400.0, 300.0);
        tr.pointer_down(1, center, 0.0, STAGE);
        tr.pointer_up(1);
        tr.pointer_down(1, center, 100.0, STAGE);
        tr.pointer_up(1);
        assert_eq!(tr.transform().scale, 2.0);
        assert_eq!((tr.transform().tx, tr.transform().ty), (0.0, 0.0));
    }
}
