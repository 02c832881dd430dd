//! Demo viewer: opens a window and renders a small deferred scene. An
//! optional first argument names a TOML options preset.

use std::path::Path;

use deep_deferred::options::Options;
use deep_deferred::viewer::Viewer;

fn main() {
    env_logger::init();

    // Optional argument: a TOML options preset.
    let options = match std::env::args().nth(1) {
        Some(path) => match Options::load(Path::new(&path)) {
            Ok(options) => options,
            Err(e) => {
                log::error!("failed to load options from {path}: {e}");
                std::process::exit(1);
            }
        },
        None => Options::default(),
    };

    if let Err(e) = Viewer::builder().with_options(options).build().run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
