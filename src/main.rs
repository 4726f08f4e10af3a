//! Host-side helper: `cargo run [port]` builds the WASM bundle into
//! `static/pkg` and serves `static/` locally so the portfolio can be checked
//! in a browser.

use std::process::ExitCode;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    use log::{error, info, warn};
    use std::process::{Command, Stdio};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = match std::env::args().nth(1).map(|p| p.parse::<u16>()) {
        None => 8000,
        Some(Ok(port)) => port,
        Some(Err(e)) => {
            error!("invalid port: {e}");
            return ExitCode::from(2);
        }
    };

    info!("building WASM pkg …");
    match Command::new("wasm-pack")
        .args(["build", "--release", "--target", "web", "--out-dir", "static/pkg"])
        .status()
    {
        Ok(st) if st.success() => {}
        Ok(_) => {
            error!("wasm-pack finished with errors");
            return ExitCode::FAILURE;
        }
        Err(_) => {
            warn!("wasm-pack not found in PATH; serving whatever is already in static/pkg");
        }
    }

    info!("serving static/ at http://127.0.0.1:{port} (Ctrl-C to stop)");
    match Command::new("python3")
        .args(["-m", "http.server", &port.to_string(), "--directory", "static"])
        .stdout(Stdio::null())
        .status()
    {
        Ok(st) if st.success() => ExitCode::SUCCESS,
        Ok(st) => {
            error!("http server exited with {st}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("could not start python3 http.server: {e}");
            ExitCode::FAILURE
        }
    }
}

// Only meaningful on non-wasm targets.
#[cfg(target_arch = "wasm32")]
fn main() -> ExitCode {
    ExitCode::SUCCESS
}
