//! genkit - command-line client for genkit-gateway
//!
//! Reads its connection settings from the environment (or `--config`).

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use genkit_gateway::{
    FunctionCall, GenkitClient, GenkitConfig, GenerationResult, SettingsOverrides,
};

/// genkit-gateway CLI
#[derive(Parser)]
#[command(name = "genkit")]
#[command(version = genkit_gateway::PKG_VERSION)]
#[command(about = "Cached Vertex AI generation from the command line")]
struct Args {
    /// TOML config file (default: read configuration from the environment)
    #[arg(short, long, env = "GENKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Vertex AI base URL override
    #[arg(long, env = "GENKIT_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the configured model is reachable
    Health,

    /// Generate text for a prompt
    Generate {
        /// Prompt text (or omit to read from stdin)
        prompt: Option<String>,
        #[arg(short, long)]
        temperature: Option<f32>,
        #[arg(long)]
        max_output_tokens: Option<u32>,
        #[arg(long)]
        top_p: Option<f32>,
        #[arg(long)]
        top_k: Option<u32>,
        /// Stop sequence (repeatable)
        #[arg(long = "stop")]
        stop: Vec<String>,
    },

    /// Embed text
    Embed {
        /// Text to embed (or omit to read from stdin)
        text: Option<String>,
    },

    /// List the built-in functions
    Functions,

    /// Call a built-in function
    Call {
        /// Function name
        name: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Default: warn for CLI; override with RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GenkitConfig::load(Some(path))?,
        None => GenkitConfig::from_env()?,
    };
    tracing::info!(
        version = %genkit_gateway::version_string(),
        model = %config.model,
        location = %config.location,
        "starting genkit"
    );

    let mut builder = GenkitClient::builder(config).default_functions();
    if let Some(url) = args.base_url {
        builder = builder.base_url(url);
    }
    let client = builder.build()?;

    match args.command {
        Command::Health => {
            let healthy = client.health_check().await;
            println!("genkit {}", genkit_gateway::version_string());
            println!("model: {}", client.config().model);
            println!("status: {}", if healthy { "healthy" } else { "unhealthy" });
            if !healthy {
                std::process::exit(1);
            }
        }

        Command::Generate {
            prompt,
            temperature,
            max_output_tokens,
            top_p,
            top_k,
            stop,
        } => {
            let prompt = resolve_text(prompt, "generate")?;
            let overrides = SettingsOverrides {
                temperature,
                max_output_tokens,
                top_p,
                top_k,
                stop_sequences: (!stop.is_empty()).then_some(stop),
                ..SettingsOverrides::default()
            };
            match client.generate(&prompt, &overrides).await? {
                GenerationResult::Success {
                    text,
                    function_calls,
                } => {
                    println!("{text}");
                    if !function_calls.is_empty() {
                        print_function_results(&client, &function_calls).await;
                    }
                }
                GenerationResult::Failure { code, message } => {
                    eprintln!("error [{code}]: {message}");
                    std::process::exit(1);
                }
            }
        }

        Command::Embed { text } => {
            let text = resolve_text(text, "embed")?;
            let embedding = client.embed(&text).await?;
            println!("model: {}", embedding.model);
            println!("dimensions: {}", embedding.dimensions);
            let preview: Vec<String> = embedding
                .values
                .iter()
                .take(8)
                .map(|v| format!("{v:.4}"))
                .collect();
            println!("values: [{}, ...]", preview.join(", "));
        }

        Command::Functions => {
            let mut definitions = client.function_definitions();
            definitions.sort_by(|a, b| a.name.cmp(&b.name));
            for def in definitions {
                println!("{:<20} {}", def.name, def.description);
            }
        }

        Command::Call { name, args } => {
            let arguments: serde_json::Value = serde_json::from_str(&args)?;
            let value = client.functions().call(&name, arguments).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

async fn print_function_results(client: &GenkitClient, calls: &[FunctionCall]) {
    for result in client.execute_function_calls(calls).await {
        println!("{}", result.to_response_json());
    }
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_text = if io::stdin().is_terminal() {
        None
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass text as argument or via stdin)").into())
        }
    }
}
