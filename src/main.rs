use std::env;
use std::process::ExitCode;

use log::{error, info};
use recipe_parser::{AppConfig, RecipeParseResult, RecipeParser, RecipeStore, RestRecipeStore};
use tokio::io::AsyncReadExt;

const USAGE: &str = "Usage: recipe-parser [--no-ai] [--save] [FILE]";

struct Args {
    no_ai: bool,
    save: bool,
    file: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        no_ai: false,
        save: false,
        file: None,
    };
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--no-ai" => args.no_ai = true,
            "--save" => args.save = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("Unknown flag {flag}\n{USAGE}")),
            _ if args.file.is_some() => return Err(USAGE.to_string()),
            _ => args.file = Some(arg.clone()),
        }
    }
    Ok(args)
}

async fn read_input(file: Option<&str>) -> std::io::Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path).await,
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            Ok(text)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let content = match read_input(args.file.as_deref()).await {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read recipe text: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = AppConfig::load().unwrap_or_else(|e| {
        error!("Invalid configuration, using defaults: {}", e);
        AppConfig::default()
    });

    let builder = RecipeParser::builder().config(config.clone());
    let builder = if args.no_ai { builder.without_ai() } else { builder };
    let parser = match builder.build() {
        Ok(parser) => parser,
        Err(e) => {
            error!("Failed to set up parser: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = parser.parse(&content).await;
    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Failed to serialize result: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let RecipeParseResult::Success { recipe, .. } = result else {
        return ExitCode::FAILURE;
    };

    if args.save {
        let Some(store_config) = config.store.as_ref() else {
            error!("--save requires a [store] section in config.toml");
            return ExitCode::FAILURE;
        };
        let store = RestRecipeStore::new(store_config).with_retry_policy(config.retry.policy());
        match store.insert(&recipe).await {
            Ok(stored) => info!("Stored recipe with id {}", stored.id),
            Err(e) => {
                error!("Failed to save recipe: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
