#[cfg(target_arch = "wasm32")]
fn main() {
    use dapp_sync::app::App;
    use leptos::*;

    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    mount_to_body(|| view! { <App/> })
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    eprintln!("the web front end only runs on wasm32; build it with `trunk serve` or use the dapp_cli binary");
}
