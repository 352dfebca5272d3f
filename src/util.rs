use wasm_bindgen::JsValue;

/// Playback clock readout as mm:ss.cc (centiseconds).
pub fn fmt_time(t: f64) -> String {
    if !t.is_finite() {
        return "00:00.00".to_string();
    }
    let sign = if t < 0.0 { "-" } else { "" };
    let t = t.abs();
    let m = (t / 60.0).floor() as u64;
    let s = (t % 60.0).floor() as u64;
    let cs = ((t - t.floor()) * 100.0).floor() as u64;
    format!("{}{:02}:{:02}.{:02}", sign, m, s, cs)
}

pub fn clog(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}
