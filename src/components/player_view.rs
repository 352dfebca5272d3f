use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Element, Event, HtmlElement, HtmlInputElement, HtmlVideoElement, KeyboardEvent, PointerEvent,
    Url,
};
use yew::prelude::*;

use super::transport_controls::TransportControls;
use crate::media::{Player, now_ms};
use crate::state::{FrameRateEstimate, GestureTracker, Point, StageRect, ViewTransform};
use crate::util::{clog, fmt_time};

/// How long a HUD flash stays up.
const HUD_FLASH_MS: u32 = 1200;

fn stage_rect(stage: &HtmlElement) -> StageRect {
    let r = stage.get_bounding_client_rect();
    StageRect { left: r.left(), top: r.top(), width: r.width(), height: r.height() }
}

/// Push the transform to the render sink (CSS custom properties consumed by
/// the stage stylesheet).
fn apply_transform(video: &HtmlVideoElement, t: ViewTransform) {
    let style = video.style();
    let _ = style.set_property("--sx", &t.scale.to_string());
    let _ = style.set_property("--tx", &format!("{}px", t.tx));
    let _ = style.set_property("--ty", &format!("{}px", t.ty));
}

/// The stage: full-viewport video with pinch-zoom/pan, frame stepping,
/// scrubbing and the HUD. All DOM listeners are registered in one mount
/// effect and released in its cleanup.
#[function_component(PlayerView)]
pub fn player_view() -> Html {
    let stage_ref = use_node_ref();
    let video_ref = use_node_ref();
    let file_ref = use_node_ref();
    let seek_ref = use_node_ref();
    let current_ref = use_node_ref();
    let duration_ref = use_node_ref();

    let tracker = use_mut_ref(GestureTracker::new);
    let player = use_mut_ref(|| None::<Rc<Player>>);
    let estimate = use_mut_ref(FrameRateEstimate::default);
    let scrubbing = use_mut_ref(|| false);
    let object_url = use_mut_ref(|| None::<String>);
    let hud_token = use_mut_ref(|| 0u64);

    let is_playing = use_state(|| false);
    let analyzing = use_state(|| false);
    let hud = use_state(String::new);

    // HUD flash with token-guarded auto-clear: a newer flash cancels the
    // pending clear of an older one.
    let flash_hud: Rc<dyn Fn(String)> = {
        let hud = hud.clone();
        let hud_token = hud_token.clone();
        Rc::new(move |msg: String| {
            hud.set(msg);
            let token = {
                let mut t = hud_token.borrow_mut();
                *t += 1;
                *t
            };
            let hud = hud.clone();
            let hud_token = hud_token.clone();
            Timeout::new(HUD_FLASH_MS, move || {
                if *hud_token.borrow() == token {
                    hud.set(String::new());
                }
            })
            .forget();
        })
    };

    let do_step = {
        let player = player.clone();
        let estimate = estimate.clone();
        Callback::from(move |dir: i32| {
            let Some(p) = player.borrow().clone() else {
                return;
            };
            let est = *estimate.borrow();
            spawn_local(async move {
                p.step_frame(dir, est).await;
            });
        })
    };

    {
        let stage_ref = stage_ref.clone();
        let video_ref = video_ref.clone();
        let seek_ref = seek_ref.clone();
        let current_ref = current_ref.clone();
        let duration_ref = duration_ref.clone();
        let tracker = tracker.clone();
        let player_slot = player.clone();
        let estimate = estimate.clone();
        let scrubbing = scrubbing.clone();
        let object_url = object_url.clone();
        let is_playing = is_playing.clone();
        let analyzing = analyzing.clone();
        let flash_hud = flash_hud.clone();
        let do_step = do_step.clone();

        use_effect_with((), move |_| {
            let window = web_sys::window().expect("no global `window` exists");
            let stage: HtmlElement = stage_ref
                .cast::<HtmlElement>()
                .expect("stage_ref not attached to an element");
            let video: HtmlVideoElement = video_ref
                .cast::<HtmlVideoElement>()
                .expect("video_ref not attached to a video element");

            let player = Rc::new(Player::new(video.clone()));
            *player_slot.borrow_mut() = Some(player.clone());

            // Pointer gestures. Events that start on the overlay controls
            // never reach the tracker.
            let pointer_down_cb = {
                let stage = stage.clone();
                let video = video.clone();
                let tracker = tracker.clone();
                Closure::wrap(Box::new(move |e: PointerEvent| {
                    if e.button() != 0 {
                        return;
                    }
                    if let Some(el) = e.target().and_then(|t| t.dyn_into::<Element>().ok()) {
                        if el.closest(".controls, .seek, .btn").ok().flatten().is_some() {
                            return;
                        }
                    }
                    let _ = stage.set_pointer_capture(e.pointer_id());
                    let pos = Point::new(e.client_x() as f64, e.client_y() as f64);
                    let mut tr = tracker.borrow_mut();
                    if tr.pointer_down(e.pointer_id(), pos, now_ms(), stage_rect(&stage)) {
                        apply_transform(&video, tr.transform());
                    }
                }) as Box<dyn FnMut(_)>)
            };
            let _ = stage.add_event_listener_with_callback(
                "pointerdown",
                pointer_down_cb.as_ref().unchecked_ref(),
            );

            let pointer_move_cb = {
                let stage = stage.clone();
                let video = video.clone();
                let tracker = tracker.clone();
                Closure::wrap(Box::new(move |e: PointerEvent| {
                    let pos = Point::new(e.client_x() as f64, e.client_y() as f64);
                    let mut tr = tracker.borrow_mut();
                    if tr.pointer_move(e.pointer_id(), pos, stage_rect(&stage)) {
                        apply_transform(&video, tr.transform());
                    }
                }) as Box<dyn FnMut(_)>)
            };
            let _ = stage.add_event_listener_with_callback(
                "pointermove",
                pointer_move_cb.as_ref().unchecked_ref(),
            );

            // Shared by pointerup and pointercancel.
            let pointer_end_cb = {
                let stage = stage.clone();
                let tracker = tracker.clone();
                Closure::wrap(Box::new(move |e: PointerEvent| {
                    if stage.has_pointer_capture(e.pointer_id()) {
                        let _ = stage.release_pointer_capture(e.pointer_id());
                    }
                    tracker.borrow_mut().pointer_up(e.pointer_id());
                }) as Box<dyn FnMut(_)>)
            };
            let _ = stage.add_event_listener_with_callback(
                "pointerup",
                pointer_end_cb.as_ref().unchecked_ref(),
            );
            let _ = stage.add_event_listener_with_callback(
                "pointercancel",
                pointer_end_cb.as_ref().unchecked_ref(),
            );

            // Resize re-clamps the current translate against the new bounds.
            let resize_cb = {
                let stage = stage.clone();
                let video = video.clone();
                let tracker = tracker.clone();
                Closure::wrap(Box::new(move |_: Event| {
                    let mut tr = tracker.borrow_mut();
                    tr.resize(stage_rect(&stage));
                    apply_transform(&video, tr.transform());
                }) as Box<dyn FnMut(_)>)
            };
            let _ = window
                .add_event_listener_with_callback("resize", resize_cb.as_ref().unchecked_ref());

            let key_cb = {
                let player = player.clone();
                let do_step = do_step.clone();
                Closure::wrap(Box::new(move |e: KeyboardEvent| match e.code().as_str() {
                    "Space" => {
                        e.prevent_default();
                        player.toggle_play();
                    }
                    "ArrowLeft" => {
                        e.prevent_default();
                        do_step.emit(-1);
                    }
                    "ArrowRight" => {
                        e.prevent_default();
                        do_step.emit(1);
                    }
                    _ => {}
                }) as Box<dyn FnMut(_)>)
            };
            let _ =
                window.add_event_listener_with_callback("keydown", key_cb.as_ref().unchecked_ref());

            // Play state icon follows the element, not our own bookkeeping.
            let play_state_cb = {
                let video = video.clone();
                let is_playing = is_playing.clone();
                Closure::wrap(Box::new(move |_: Event| {
                    is_playing.set(!video.paused() && !video.ended());
                }) as Box<dyn FnMut(_)>)
            };
            for ev in ["play", "pause", "ended"] {
                let _ = video
                    .add_event_listener_with_callback(ev, play_state_cb.as_ref().unchecked_ref());
            }

            // New metadata: estimate the frame duration for stepping. The
            // spinner is cleared on every path; estimation never throws.
            let metadata_cb = {
                let player = player.clone();
                let estimate = estimate.clone();
                let analyzing = analyzing.clone();
                let flash_hud = flash_hud.clone();
                Closure::wrap(Box::new(move |_: Event| {
                    let player = player.clone();
                    let estimate = estimate.clone();
                    let analyzing = analyzing.clone();
                    let flash_hud = flash_hud.clone();
                    spawn_local(async move {
                        analyzing.set(true);
                        let prior = *estimate.borrow();
                        let est = player.estimate_frame_rate(prior).await;
                        analyzing.set(false);
                        *estimate.borrow_mut() = est;
                        if est.confident {
                            (*flash_hud)(format!("{:.1} fps", est.fps()));
                        } else {
                            clog("frame rate sampling inconclusive, stepping at 1/30s");
                        }
                    });
                }) as Box<dyn FnMut(_)>)
            };
            let _ = video.add_event_listener_with_callback(
                "loadedmetadata",
                metadata_cb.as_ref().unchecked_ref(),
            );

            // rAF loop refreshing the clock readout and seek fill through
            // refs, paused for the bar while the user scrubs.
            let raf_id = Rc::new(RefCell::new(None));
            let raf_closure: Rc<RefCell<Option<Closure<dyn FnMut()>>>> =
                Rc::new(RefCell::new(None));
            {
                let raf_id_inner = raf_id.clone();
                let raf_closure_inner = raf_closure.clone();
                let window_inner = window.clone();
                let video = video.clone();
                let seek_ref = seek_ref.clone();
                let current_ref = current_ref.clone();
                let duration_ref = duration_ref.clone();
                let scrubbing = scrubbing.clone();
                *raf_closure.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                    let t = video.current_time();
                    let d = video.duration();
                    let d = if d.is_finite() { d } else { 0.0 };
                    if let Some(el) = current_ref.cast::<HtmlElement>() {
                        el.set_text_content(Some(&fmt_time(t)));
                    }
                    if let Some(el) = duration_ref.cast::<HtmlElement>() {
                        el.set_text_content(Some(&fmt_time(d)));
                    }
                    if !*scrubbing.borrow() && d > 0.0 {
                        if let Some(seek) = seek_ref.cast::<HtmlInputElement>() {
                            seek.set_max(&d.to_string());
                            seek.set_value(&t.to_string());
                            let fill = t / d * 100.0;
                            let _ = seek.style().set_property("--fill", &format!("{fill}%"));
                        }
                    }
                    if let Some(cb) = raf_closure_inner.borrow().as_ref() {
                        if let Ok(id) =
                            window_inner.request_animation_frame(cb.as_ref().unchecked_ref())
                        {
                            *raf_id_inner.borrow_mut() = Some(id);
                        }
                    }
                }) as Box<dyn FnMut()>));
                if let Some(cb) = raf_closure.borrow().as_ref() {
                    if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        *raf_id.borrow_mut() = Some(id);
                    }
                }
            }

            let window_cleanup = window.clone();
            move || {
                let _ = stage.remove_event_listener_with_callback(
                    "pointerdown",
                    pointer_down_cb.as_ref().unchecked_ref(),
                );
                let _ = stage.remove_event_listener_with_callback(
                    "pointermove",
                    pointer_move_cb.as_ref().unchecked_ref(),
                );
                let _ = stage.remove_event_listener_with_callback(
                    "pointerup",
                    pointer_end_cb.as_ref().unchecked_ref(),
                );
                let _ = stage.remove_event_listener_with_callback(
                    "pointercancel",
                    pointer_end_cb.as_ref().unchecked_ref(),
                );
                let _ = window_cleanup.remove_event_listener_with_callback(
                    "resize",
                    resize_cb.as_ref().unchecked_ref(),
                );
                let _ = window_cleanup.remove_event_listener_with_callback(
                    "keydown",
                    key_cb.as_ref().unchecked_ref(),
                );
                for ev in ["play", "pause", "ended"] {
                    let _ = video.remove_event_listener_with_callback(
                        ev,
                        play_state_cb.as_ref().unchecked_ref(),
                    );
                }
                let _ = video.remove_event_listener_with_callback(
                    "loadedmetadata",
                    metadata_cb.as_ref().unchecked_ref(),
                );
                if let Some(id) = *raf_id.borrow() {
                    let _ = window_cleanup.cancel_animation_frame(id);
                }
                raf_closure.borrow_mut().take();
                if let Some(url) = object_url.borrow_mut().take() {
                    let _ = Url::revoke_object_url(&url);
                }
                *player_slot.borrow_mut() = None;
                let _keep_alive = (
                    &pointer_down_cb,
                    &pointer_move_cb,
                    &pointer_end_cb,
                    &resize_cb,
                    &key_cb,
                    &play_state_cb,
                    &metadata_cb,
                );
            }
        });
    }

    let on_open = {
        let file_ref = file_ref.clone();
        Callback::from(move |_| {
            if let Some(input) = file_ref.cast::<HtmlInputElement>() {
                input.click();
            }
        })
    };

    let on_file_change = {
        let video_ref = video_ref.clone();
        let tracker = tracker.clone();
        let estimate = estimate.clone();
        let object_url = object_url.clone();
        Callback::from(move |e: Event| {
            let Some(input) = e.target_dyn_into::<HtmlInputElement>() else {
                return;
            };
            let Some(file) = input.files().and_then(|l| l.get(0)) else {
                return;
            };
            if let Some(old) = object_url.borrow_mut().take() {
                let _ = Url::revoke_object_url(&old);
            }
            match Url::create_object_url_with_blob(&file) {
                Ok(url) => {
                    if let Some(video) = video_ref.cast::<HtmlVideoElement>() {
                        let mut tr = tracker.borrow_mut();
                        tr.reset_view();
                        apply_transform(&video, tr.transform());
                        drop(tr);
                        *estimate.borrow_mut() = FrameRateEstimate::default();
                        video.set_src(&url);
                        video.load();
                    }
                    *object_url.borrow_mut() = Some(url);
                }
                Err(_) => clog("could not create an object URL for the picked file"),
            }
        })
    };

    let on_toggle_play = {
        let player = player.clone();
        Callback::from(move |_| {
            if let Some(p) = player.borrow().as_ref() {
                p.toggle_play();
            }
        })
    };

    let on_scrub_input = {
        let video_ref = video_ref.clone();
        let scrubbing = scrubbing.clone();
        Callback::from(move |e: InputEvent| {
            let Some(input) = e.target_dyn_into::<HtmlInputElement>() else {
                return;
            };
            let Some(video) = video_ref.cast::<HtmlVideoElement>() else {
                return;
            };
            if !video.duration().is_finite() {
                return;
            }
            *scrubbing.borrow_mut() = true;
            let t: f64 = input.value().parse().unwrap_or(0.0);
            let d: f64 = input.max().parse().unwrap_or(0.0);
            let fill = if d > 0.0 { t / d * 100.0 } else { 0.0 };
            let _ = input.style().set_property("--fill", &format!("{fill}%"));
            video.set_current_time(t);
        })
    };

    let on_scrub_change = {
        let scrubbing = scrubbing.clone();
        Callback::from(move |_: Event| {
            *scrubbing.borrow_mut() = false;
        })
    };

    html! {
        <div id="stage" ref={stage_ref}>
            <video ref={video_ref} playsinline=true preload="metadata"></video>
            <div id="hud">{ (*hud).clone() }</div>
            {
                if *analyzing {
                    html! { <div id="spinner" style="display:grid;"><span>{"Analyzing…"}</span></div> }
                } else {
                    html! {}
                }
            }
            <input
                ref={file_ref}
                type="file"
                accept="video/*"
                style="display:none;"
                onchange={on_file_change}
            />
            <TransportControls
                is_playing={*is_playing}
                on_open={on_open}
                on_toggle_play={on_toggle_play}
                on_step={do_step.clone()}
                on_scrub_input={on_scrub_input}
                on_scrub_change={on_scrub_change}
                seek_ref={seek_ref}
                current_ref={current_ref}
                duration_ref={duration_ref}
            />
        </div>
    }
}
