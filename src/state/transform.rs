//! View transform state for the stage: uniform scale about the stage center
//! plus a screen-space translation, with clamping that keeps the picture
//! covering the viewport.

/// Minimum zoom; at (or below) this the picture fits the stage exactly.
pub const MIN_SCALE: f64 = 1.0;
/// Maximum pinch zoom.
pub const MAX_SCALE: f64 = 8.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Current view transform. `tx`/`ty` are screen pixels applied after the
/// scale about the stage center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { scale: 1.0, tx: 0.0, ty: 0.0 }
    }
}

/// Clamp a proposed translation for the given scale. At scale <= 1 the
/// picture cannot move; above 1 each axis is bounded by half the overflow,
/// ±(dim·(scale−1))/2. A zero-sized viewport degenerates to (0, 0).
pub fn clamp_translate(scale: f64, tx: f64, ty: f64, viewport: Viewport) -> (f64, f64) {
    if scale <= MIN_SCALE {
        return (0.0, 0.0);
    }
    let max_dx = (viewport.width * (scale - 1.0)) / 2.0;
    let max_dy = (viewport.height * (scale - 1.0)) / 2.0;
    (tx.clamp(-max_dx, max_dx), ty.clamp(-max_dy, max_dy))
}

impl ViewTransform {
    /// Build a transform from proposed values, applying the clamp rules.
    pub fn clamped(scale: f64, tx: f64, ty: f64, viewport: Viewport) -> Self {
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        let (tx, ty) = clamp_translate(scale, tx, ty, viewport);
        Self { scale, tx, ty }
    }

    /// Re-apply translation bounds after the viewport changed (window
    /// resize). Scale is untouched.
    pub fn reclamp(&mut self, viewport: Viewport) {
        let (tx, ty) = clamp_translate(self.scale, self.tx, self.ty, viewport);
        self.tx = tx;
        self.ty = ty;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VP: Viewport = Viewport { width: 800.0, height: 600.0 };

    #[test]
    fn at_or_below_unit_scale_translation_is_zero() {
        for s in [0.5, 0.9, 1.0] {
            assert_eq!(clamp_translate(s, 123.0, -456.0, VP), (0.0, 0.0));
        }
    }

    #[test]
    fn translation_bounded_by_half_overflow() {
        let s = 2.0;
        let (tx, ty) = clamp_translate(s, 1e6, -1e6, VP);
        assert_eq!(tx, 400.0); // 800 * (2-1) / 2
        assert_eq!(ty, -300.0); // 600 * (2-1) / 2
        // in-bounds values pass through
        assert_eq!(clamp_translate(s, 10.0, -20.0, VP), (10.0, -20.0));
    }

    #[test]
    fn zero_viewport_degenerates_to_origin() {
        let vp = Viewport { width: 0.0, height: 0.0 };
        assert_eq!(clamp_translate(3.0, 50.0, 50.0, vp), (0.0, 0.0));
    }

    #[test]
    fn clamped_constructor_limits_scale_and_translate() {
        let t = ViewTransform::clamped(20.0, 0.0, 0.0, VP);
        assert_eq!(t.scale, MAX_SCALE);
        let t = ViewTransform::clamped(0.2, 5.0, 5.0, VP);
        assert_eq!(t, ViewTransform { scale: MIN_SCALE, tx: 0.0, ty: 0.0 });
        let t = ViewTransform::clamped(2.0, 1e6, -1e6, VP);
        assert_eq!(t, ViewTransform { scale: 2.0, tx: 400.0, ty: -300.0 });
    }

    #[test]
    fn resize_reclamps_without_touching_scale() {
        let mut t = ViewTransform { scale: 2.0, tx: 400.0, ty: 300.0 };
        t.reclamp(Viewport { width: 400.0, height: 300.0 });
        assert_eq!(t.scale, 2.0);
        assert_eq!((t.tx, t.ty), (200.0, 150.0));
    }
}
