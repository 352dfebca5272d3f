use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct TransportControlsProps {
    pub is_playing: bool,
    pub on_open: Callback<()>,
    pub on_toggle_play: Callback<()>,
    /// Step one frame; emits ±1.
    pub on_step: Callback<i32>,
    pub on_scrub_input: Callback<InputEvent>,
    pub on_scrub_change: Callback<Event>,
    /// Refs the stage's rAF loop writes through, so the readout updates
    /// without re-rendering this component every frame.
    pub seek_ref: NodeRef,
    pub current_ref: NodeRef,
    pub duration_ref: NodeRef,
}

#[function_component(TransportControls)]
pub fn transport_controls(props: &TransportControlsProps) -> Html {
    let open_cb = {
        let cb = props.on_open.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let play_cb = {
        let cb = props.on_toggle_play.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let prev_cb = {
        let cb = props.on_step.clone();
        Callback::from(move |_| cb.emit(-1))
    };
    let next_cb = {
        let cb = props.on_step.clone();
        Callback::from(move |_| cb.emit(1))
    };

    html! {<div class="controls">
        <button class="btn" onclick={open_cb}>{"Open"}</button>
        <button class="btn" onclick={play_cb} title="Play/Pause (Space)">
            { if props.is_playing { "⏸" } else { "▶" } }
        </button>
        <button class="btn" onclick={prev_cb} title="Previous frame (←)">{"⏴"}</button>
        <button class="btn" onclick={next_cb} title="Next frame (→)">{"⏵"}</button>
        <span class="time" ref={props.current_ref.clone()}>{"00:00.00"}</span>
        <input
            class="seek"
            type="range"
            min="0"
            step="0.001"
            ref={props.seek_ref.clone()}
            oninput={props.on_scrub_input.clone()}
            onchange={props.on_scrub_change.clone()}
        />
        <span class="time" ref={props.duration_ref.clone()}>{"00:00.00"}</span>
    </div>}
}
