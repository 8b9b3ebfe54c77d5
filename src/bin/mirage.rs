//! CLI for Mirage - prompt-driven image editing.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use mirage::image::prompt::{find_preset, presets_for};
use mirage::{
    AspectRatio, EditSession, GeminiModel, GeminiProvider, GenerationMode, GenerationState,
    ImageEditor, MirageError, SourceFile,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit code for input problems caught before any remote call.
const EXIT_INVALID_INPUT: i32 = 2;

#[derive(Parser)]
#[command(name = "mirage")]
#[command(about = "Edit images and transfer poses with Gemini image models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit an image (or copy a gesture onto a subject) from a text prompt
    Edit(EditArgs),

    /// List prompt presets
    Presets(PresetArgs),

    /// Check that the API key and model are usable
    Check(ProviderArgs),
}

#[derive(Args)]
#[command(group(ArgGroup::new("instruction").required(true).args(["prompt", "preset"])))]
struct EditArgs {
    /// Source image (standard mode) or pose reference (gesture mode)
    image: PathBuf,

    /// Subject image, used in gesture mode
    #[arg(short, long)]
    subject: Option<PathBuf>,

    /// Generation mode
    #[arg(short, long, value_enum, default_value = "standard")]
    mode: ModeArg,

    /// Edit instruction, or the subject description in gesture mode
    #[arg(short, long)]
    prompt: Option<String>,

    /// Use a prompt preset (see `mirage presets`)
    #[arg(long)]
    preset: Option<String>,

    /// Output aspect ratio
    #[arg(short, long, value_enum, default_value = "1:1")]
    aspect_ratio: AspectRatioArg,

    /// Directory the result is saved into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Args)]
struct PresetArgs {
    /// Only list presets for this mode
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,
}

#[derive(Args)]
struct ProviderArgs {
    /// Gemini model to use
    #[arg(long, value_enum, default_value = "flash")]
    model: ModelArg,

    /// Request timeout in seconds (none by default)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Standard,
    Gesture,
}

impl From<ModeArg> for GenerationMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Standard => GenerationMode::Standard,
            ModeArg::Gesture => GenerationMode::Gesture,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Flash,
    Pro,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Flash => GeminiModel::NanoBanana,
            ModelArg::Pro => GeminiModel::NanoBananaPro,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "3:4")]
    StandardPortrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "16:9")]
    Landscape,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Edit(args) => edit(args, cli.json).await?,
        Commands::Presets(args) => list_presets(args, cli.json)?,
        Commands::Check(args) => check(args, cli.json).await?,
    }

    Ok(())
}

fn build_provider(args: &ProviderArgs) -> anyhow::Result<GeminiProvider> {
    let mut builder = GeminiProvider::builder().model(args.model.into());
    if let Some(secs) = args.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

fn resolve_prompt(args: &EditArgs, mode: GenerationMode) -> anyhow::Result<String> {
    let prompt = match (&args.prompt, &args.preset) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(slug)) => {
            let preset = find_preset(slug)
                .ok_or_else(|| anyhow::anyhow!("unknown preset '{slug}' (see `mirage presets`)"))?;
            if preset.mode != mode {
                tracing::warn!(preset = preset.slug, mode = %mode, "preset belongs to another mode");
            }
            preset.prompt.to_string()
        }
        (None, None) => String::new(),
    };
    if prompt.trim().is_empty() {
        anyhow::bail!("Please describe the edit with --prompt or --preset");
    }
    Ok(prompt)
}

/// Validation failures exit with [`EXIT_INVALID_INPUT`]; anything else is
/// returned for `main` to report.
fn input_error(context: &str, e: MirageError) -> anyhow::Error {
    if e.is_validation() {
        eprintln!("Error: {context}: {}", e.user_message());
        std::process::exit(EXIT_INVALID_INPUT);
    }
    anyhow::anyhow!("{context}: {}", e.user_message())
}

async fn edit(args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    let mode = GenerationMode::from(args.mode);
    let prompt = resolve_prompt(&args, mode)?;
    let provider = build_provider(&args.provider)?;

    let mut session = EditSession::new(Arc::new(provider));
    session.set_mode(mode);
    session.set_prompt(prompt);
    session.set_aspect_ratio(args.aspect_ratio.into());

    session
        .upload_primary(SourceFile::from_path(&args.image))
        .await
        .map_err(|e| input_error(mode.primary_label(), e))?;

    if let Some(ref subject) = args.subject {
        if mode.requires_secondary() {
            session
                .upload_secondary(SourceFile::from_path(subject))
                .await
                .map_err(|e| input_error("Upload Subject (Person)", e))?;
        } else {
            tracing::warn!("--subject is only used in gesture mode; ignoring it");
        }
    }

    if !json_output {
        eprintln!("{}...", mode.action_label());
    }

    let state = session
        .generate()
        .await
        .map_err(|e| input_error(mode.action_label(), e))?;

    let result = match state {
        GenerationState::Succeeded(result) => result.clone(),
        GenerationState::Failed(message) => anyhow::bail!("{message}"),
        other => anyhow::bail!("unexpected state after generation: {other:?}"),
    };

    let saved = result.save_to_dir(&args.output_dir)?;

    if json_output {
        let output = serde_json::json!({
            "success": true,
            "mode": mode.as_str(),
            "aspect_ratio": session.aspect_ratio(),
            "output": saved.as_ref().map(|p| p.display().to_string()),
            "text": result.text,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match saved {
            Some(path) => println!("Saved edited image: {}", path.display()),
            None => println!("The model returned no image."),
        }
        if let Some(ref text) = result.text {
            println!("AI Note: {text}");
        }
    }

    Ok(())
}

fn list_presets(args: PresetArgs, json_output: bool) -> anyhow::Result<()> {
    let modes: Vec<GenerationMode> = match args.mode {
        Some(mode) => vec![mode.into()],
        None => vec![GenerationMode::Standard, GenerationMode::Gesture],
    };

    if json_output {
        let presets: Vec<_> = modes.iter().flat_map(|m| presets_for(*m)).collect();
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    for mode in modes {
        println!("{}:", mode.as_str().to_uppercase());
        for preset in presets_for(mode) {
            println!("  {:<16} {}", preset.slug, preset.label);
            println!("    {}", preset.prompt);
        }
    }
    Ok(())
}

async fn check(args: ProviderArgs, json_output: bool) -> anyhow::Result<()> {
    let provider = build_provider(&args)?;
    let outcome = provider.health_check().await;

    if json_output {
        let output = serde_json::json!({
            "provider": provider.name(),
            "model": provider.model().as_str(),
            "ok": outcome.is_ok(),
            "error": outcome.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if outcome.is_ok() {
        println!("{} ({}) is reachable", provider.name(), provider.model().as_str());
    }

    outcome?;
    Ok(())
}
