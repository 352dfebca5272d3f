//! Control layer over the stage's `HtmlVideoElement`: promise-backed seeks,
//! frame stepping, and empirical frame-rate sampling.
//!
//! Everything here tolerates platform refusals (autoplay rejection, missing
//! APIs) by degrading to a no-op or a fallback estimate; nothing propagates.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{AddEventListenerOptions, HtmlVideoElement};

use crate::state::framerate::SAMPLE_TIMEOUT_MS;
use crate::state::{DeltaSampler, FrameRateEstimate, step_target};

/// Wall-clock milliseconds from `performance.now()`.
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Exclusive controller for the single video element. Stepping and
/// estimation both commandeer playback state, so a busy flag serializes
/// them; a call arriving while busy is a no-op.
pub struct Player {
    video: HtmlVideoElement,
    busy: Cell<bool>,
}

impl Player {
    pub fn new(video: HtmlVideoElement) -> Self {
        Self { video, busy: Cell::new(false) }
    }

    pub fn has_source(&self) -> bool {
        !self.video.current_src().is_empty()
    }

    /// Play (tolerating autoplay rejection) or pause.
    pub fn toggle_play(&self) {
        if !self.has_source() {
            return;
        }
        if self.video.paused() {
            if let Ok(promise) = self.video.play() {
                spawn_local(async move {
                    let _ = JsFuture::from(promise).await;
                });
            }
        } else {
            let _ = self.video.pause();
        }
    }

    /// Seek and suspend until the element fires `seeked`. One-shot listener,
    /// single-resume channel; callers may chain seeks without racing.
    pub async fn seek_to(&self, t: f64) {
        let (tx, rx) = oneshot::channel::<()>();
        let mut tx = Some(tx);
        let on_seeked = Closure::wrap(Box::new(move |_: web_sys::Event| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(());
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        let opts = AddEventListenerOptions::new();
        opts.set_once(true);
        if self
            .video
            .add_event_listener_with_callback_and_add_event_listener_options(
                "seeked",
                on_seeked.as_ref().unchecked_ref(),
                &opts,
            )
            .is_err()
        {
            return;
        }
        self.video.set_current_time(t);
        let _ = rx.await;
    }

    /// Step one estimated frame in `dir` (±1). Pauses first; no-op without a
    /// loaded source or a usable duration.
    pub async fn step_frame(&self, dir: i32, estimate: FrameRateEstimate) {
        if self.busy.get() || !self.has_source() {
            return;
        }
        self.busy.set(true);
        let _ = self.video.pause();
        let target = step_target(
            self.video.current_time(),
            self.video.duration(),
            estimate.seconds_per_frame,
            dir,
        );
        if let Some(target) = target {
            self.seek_to(target).await;
        }
        self.busy.set(false);
    }

    /// Sample presented-frame media times from a short muted playback burst
    /// and return the median frame duration. Prior paused/muted/time state is
    /// restored on every path. Without `requestVideoFrameCallback` support
    /// the fallback comes back immediately, not confident.
    pub async fn estimate_frame_rate(&self, fallback: FrameRateEstimate) -> FrameRateEstimate {
        if self.busy.get() {
            return fallback;
        }
        let Some(rvfc) = self.frame_callback_fn() else {
            return FrameRateEstimate { confident: false, ..fallback };
        };
        self.busy.set(true);

        let was_paused = self.video.paused();
        let was_muted = self.video.muted();
        let saved_time = self.video.current_time();

        self.video.set_muted(true);
        if let Ok(promise) = self.video.play() {
            // Autoplay rejection just means fewer (zero) samples.
            let _ = JsFuture::from(promise).await;
        }

        let sampler = Rc::new(RefCell::new(DeltaSampler::new(now_ms())));
        self.pump_frame_callbacks(&rvfc, sampler.clone());

        // The callback chain pauses the video once the sampler saturates;
        // poll until then, with a grace period past the sampling cap in case
        // no frame ever arrives.
        let deadline = sampler.borrow().started_ms() + SAMPLE_TIMEOUT_MS + 100.0;
        while !self.video.paused() && now_ms() < deadline {
            TimeoutFuture::new(30).await;
        }

        let estimate = sampler.borrow().estimate(fallback);

        self.video.set_muted(was_muted);
        if was_paused {
            let _ = self.video.pause();
            self.video.set_current_time(saved_time);
        } else if self.video.paused() {
            // The callback chain paused on saturation; pick playback back up.
            if let Ok(promise) = self.video.play() {
                spawn_local(async move {
                    let _ = JsFuture::from(promise).await;
                });
            }
        }
        self.busy.set(false);
        estimate
    }

    /// `requestVideoFrameCallback` has no typed web-sys binding; detect and
    /// invoke it through `Reflect`.
    fn frame_callback_fn(&self) -> Option<js_sys::Function> {
        let video: &JsValue = self.video.as_ref();
        js_sys::Reflect::get(video, &JsValue::from_str("requestVideoFrameCallback"))
            .ok()?
            .dyn_into::<js_sys::Function>()
            .ok()
    }

    /// Re-registering frame callback feeding the sampler. The closure holds
    /// itself alive through an Rc cell; the chain self-terminates via the
    /// sampler's count/timeout caps, after which the cell is simply leaked.
    fn pump_frame_callbacks(&self, rvfc: &js_sys::Function, sampler: Rc<RefCell<DeltaSampler>>) {
        let video = self.video.clone();
        let rvfc_inner = rvfc.clone();
        let cell: Rc<RefCell<Option<Closure<dyn FnMut(f64, JsValue)>>>> =
            Rc::new(RefCell::new(None));
        let cell_inner = cell.clone();

        let on_frame = Closure::wrap(Box::new(move |_now: f64, meta: JsValue| {
            if let Some(media_time) = js_sys::Reflect::get(&meta, &JsValue::from_str("mediaTime"))
                .ok()
                .and_then(|v| v.as_f64())
            {
                sampler.borrow_mut().record(media_time);
            }
            if sampler.borrow().saturated(now_ms()) {
                let _ = video.pause();
            } else if let Some(cb) = cell_inner.borrow().as_ref() {
                let this: &JsValue = video.as_ref();
                let _ = rvfc_inner.call1(this, cb.as_ref().unchecked_ref());
            }
        }) as Box<dyn FnMut(f64, JsValue)>);

        let this: &JsValue = self.video.as_ref();
        let _ = rvfc.call1(this, on_frame.as_ref().unchecked_ref());
        *cell.borrow_mut() = Some(on_frame);
    }
}
