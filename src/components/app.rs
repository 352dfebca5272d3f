use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::Event;
use yew::prelude::*;

use super::{install_button::InstallButton, player_view::PlayerView};

/// Root component: registers the service worker and owns the PWA
/// install-prompt lifecycle. `beforeinstallprompt` has no typed web-sys
/// binding, so the captured event is kept as a raw `JsValue` and its
/// `prompt()` is invoked through `Reflect`.
#[function_component(App)]
pub fn app() -> Html {
    let install_event = use_mut_ref(|| None::<JsValue>);
    let can_install = use_state(|| false);

    {
        let install_event = install_event.clone();
        let can_install = can_install.clone();
        use_effect_with((), move |_| {
            let window = web_sys::window().expect("no global `window` exists");

            let sw_promise = window.navigator().service_worker().register("./sw.js");
            spawn_local(async move {
                // Registration failure just means no offline shell.
                let _ = JsFuture::from(sw_promise).await;
            });

            let prompt_cb = {
                let install_event = install_event.clone();
                let can_install = can_install.clone();
                Closure::wrap(Box::new(move |e: Event| {
                    e.prevent_default();
                    *install_event.borrow_mut() = Some(JsValue::from(e));
                    can_install.set(true);
                }) as Box<dyn FnMut(_)>)
            };
            let _ = window.add_event_listener_with_callback(
                "beforeinstallprompt",
                prompt_cb.as_ref().unchecked_ref(),
            );

            let installed_cb = {
                let install_event = install_event.clone();
                let can_install = can_install.clone();
                Closure::wrap(Box::new(move |_: Event| {
                    *install_event.borrow_mut() = None;
                    can_install.set(false);
                }) as Box<dyn FnMut(_)>)
            };
            let _ = window.add_event_listener_with_callback(
                "appinstalled",
                installed_cb.as_ref().unchecked_ref(),
            );

            move || {
                let _ = window.remove_event_listener_with_callback(
                    "beforeinstallprompt",
                    prompt_cb.as_ref().unchecked_ref(),
                );
                let _ = window.remove_event_listener_with_callback(
                    "appinstalled",
                    installed_cb.as_ref().unchecked_ref(),
                );
                drop(prompt_cb);
                drop(installed_cb);
            }
        });
    }

    let on_install = {
        let install_event = install_event.clone();
        let can_install = can_install.clone();
        Callback::from(move |_| {
            let Some(evt) = install_event.borrow_mut().take() else {
                return;
            };
            can_install.set(false);
            let Ok(prompt) = js_sys::Reflect::get(&evt, &JsValue::from_str("prompt")) else {
                return;
            };
            if let Ok(prompt) = prompt.dyn_into::<js_sys::Function>() {
                if let Ok(choice) = prompt.call0(&evt) {
                    if let Ok(choice) = choice.dyn_into::<js_sys::Promise>() {
                        spawn_local(async move {
                            let _ = JsFuture::from(choice).await;
                        });
                    }
                }
            }
        })
    };

    html! {
        <>
            <PlayerView />
            <InstallButton visible={*can_install} on_install={on_install} />
        </>
    }
}
