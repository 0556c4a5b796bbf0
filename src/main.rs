use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use log::info;

use omniscye::story::scenario::omniscye_story;
use omniscye::{Engine, EngineConfig, Story, ValidationMode};

const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   cargo run                               # path loads + transitions (info)
    //   RUST_LOG=warn   cargo run               # only story problems and stalls
    //   RUST_LOG=debug  cargo run               # + side effects, ignored duplicates
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();

    let story = match args.get(1).map(String::as_str) {
        None | Some("-") => omniscye_story(),
        Some(path) => {
            let file = File::open(path).with_context(|| {
                format!(
                    "failed to open story file {path}\n\
                     \n\
                     Usage: omniscye [story.json|-] [delay_scale] [warn|strict]\n\
                     \n\
                     Example:\n  omniscye - 0.5 strict"
                )
            })?;
            Story::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to load story from {path}"))?
        }
    };

    let validation = match args.get(3).map(String::as_str) {
        Some("strict") => ValidationMode::FailFast,
        _ => ValidationMode::WarnOnly,
    };
    let config = EngineConfig::default()
        .with_delay_scale(args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1.0))
        .with_validation(validation);

    info!(
        "Loaded story: {} nodes, {} paths, {} routes (delay scale {}, {:?})",
        story.graph.nodes.len(),
        story.graph.paths.len(),
        story.routes.len(),
        config.delay_scale,
        config.validation
    );

    let engine = Engine::new(story, config).context("story rejected")?;

    omniscye::terminal::run(engine).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_is_info() {
        let logger = env_logger::Builder::new()
            .parse_filters(DEFAULT_LOG_FILTER)
            .build();
        assert_eq!(logger.filter(), log::LevelFilter::Info);
    }
}
