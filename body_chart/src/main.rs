mod config;
mod pipeline;

use config::{RunConfig, CONFIG_FILE};
use std::path::{Path, PathBuf};
use std::process;

fn generate() -> Result<PathBuf, metrics_common::ChartError> {
    let config = RunConfig::load_or_default(Path::new(CONFIG_FILE))?;
    pipeline::run(&config)
}

fn main() {
    env_logger::init();

    match generate() {
        Ok(path) => println!("Chart written to {}", path.display()),
        Err(e) => {
            println!("error: {}", e);
            process::exit(1);
        }
    }
}
