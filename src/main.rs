//! CLI entry point: run one extraction over a message export and print the
//! resulting relationship map as JSON.
//!
//! Usage: tideline <messages.json> <user-email> [--config <config.json>]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;

use tideline::config::EngineConfig;
use tideline::engine::RelationshipEngine;
use tideline::json_loader;
use tideline::oracle::{CommitmentOracle, HttpOracle, NoopOracle};

fn usage() -> ExitCode {
    eprintln!("Usage: tideline <messages.json> <user-email> [--config <config.json>]");
    ExitCode::from(2)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut messages_path: Option<PathBuf> = None;
    let mut user_email: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => return usage(),
            },
            _ if messages_path.is_none() => messages_path = Some(PathBuf::from(arg)),
            _ if user_email.is_none() => user_email = Some(arg),
            _ => return usage(),
        }
    }

    let (Some(messages_path), Some(user_email)) = (messages_path, user_email) else {
        return usage();
    };

    let config = match config_path {
        Some(path) => match EngineConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    let messages = match json_loader::load_messages(&messages_path) {
        Ok(messages) => messages,
        Err(e) => {
            eprintln!("Failed to load messages: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let oracle: Arc<dyn CommitmentOracle> = match &config.oracle {
        Some(oracle_config) if config.extract_commitments => {
            match HttpOracle::from_config(oracle_config) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    eprintln!("Failed to build oracle client: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        _ => {
            log::info!("No oracle configured; commitment extraction disabled");
            Arc::new(NoopOracle)
        }
    };

    let engine = RelationshipEngine::new(config, oracle);
    let map = engine.compute(&user_email, &messages, Utc::now()).await;

    match serde_json::to_string_pretty(&map) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize map: {}", e);
            ExitCode::FAILURE
        }
    }
}
