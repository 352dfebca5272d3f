use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct InstallButtonProps {
    /// Set once the platform offered an install prompt.
    pub visible: bool,
    pub on_install: Callback<()>,
}

#[function_component(InstallButton)]
pub fn install_button(props: &InstallButtonProps) -> Html {
    if !props.visible {
        return html! {};
    }
    let cb = {
        let cb = props.on_install.clone();
        Callback::from(move |_| cb.emit(()))
    };
    html! {
        <button id="install-btn" class="btn" onclick={cb}>{"Install"}</button>
    }
}
