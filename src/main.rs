use clap::{ArgAction, Args, Parser, Subcommand};
use glass_ocr_lib::capture::{PrimaryMonitor, SelectionRect};
use glass_ocr_lib::llm::{all_providers, ProviderKind, ReqwestTransport};
use glass_ocr_lib::messaging::{spawn_background, OcrReply};
use glass_ocr_lib::pipeline::CaptureCoordinator;
use glass_ocr_lib::render::{
    copy_with_fallback, render_markdown, DetectedCommandClipboard, SystemClipboard,
};
use glass_ocr_lib::settings::SettingsStore;
use std::io::Read;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "glass-ocr",
    version,
    about = "Recognize the text in a region of the screen with a cloud vision model"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture a region of the primary monitor and print its text
    Capture(CaptureArgs),
    /// Render recognized text from stdin to HTML
    Render,
    /// List recognition providers and whether each has a key
    Providers,
    /// Store a provider API key in the settings file and the OS keychain
    #[command(name = "set-key")]
    SetKey(SetKeyArgs),
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// Left edge, logical px
    #[arg(long, allow_negative_numbers = true)]
    x: f64,
    /// Top edge, logical px
    #[arg(long, allow_negative_numbers = true)]
    y: f64,
    #[arg(long)]
    width: f64,
    #[arg(long)]
    height: f64,
    /// Device pixel ratio (default: the primary monitor's)
    #[arg(long)]
    scale: Option<f64>,
    /// Also copy the text to the clipboard
    #[arg(long, action = ArgAction::SetTrue)]
    copy: bool,
}

#[derive(Args, Debug)]
struct SetKeyArgs {
    /// gemini | qwen
    provider: ProviderKind,
    key: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    glass_ocr_lib::load_env();
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Capture(args) => run_capture(args).await,
        Commands::Render => run_render(),
        Commands::Providers => run_providers(),
        Commands::SetKey(args) => run_set_key(args),
    }
}

async fn run_capture(args: CaptureArgs) -> ExitCode {
    let scale = match args.scale {
        Some(scale) => scale,
        None => match PrimaryMonitor::scale_factor() {
            Ok(scale) => scale,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
    };
    let rect = SelectionRect {
        x: args.x,
        y: args.y,
        width: args.width,
        height: args.height,
    };

    let coordinator = CaptureCoordinator::new(
        PrimaryMonitor,
        ReqwestTransport::new(),
        SettingsStore::default_location(),
    );
    let (background, task) = spawn_background(coordinator);
    let reply = background.capture_and_ocr(rect, scale).await;
    drop(background);
    let _ = task.await;

    match reply {
        OcrReply::Text { text } => {
            println!("{}", text);
            if args.copy {
                if let Err(e) =
                    copy_with_fallback(&mut SystemClipboard, &mut DetectedCommandClipboard, &text)
                {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        OcrReply::Error { error, .. } => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn run_render() -> ExitCode {
    let mut text = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut text) {
        eprintln!("Failed to read stdin: {}", e);
        return ExitCode::FAILURE;
    }
    println!("{}", render_markdown(text.trim_end_matches('\n')));
    ExitCode::SUCCESS
}

fn run_providers() -> ExitCode {
    let store = SettingsStore::default_location();
    for info in all_providers() {
        let configured = info
            .id
            .parse::<ProviderKind>()
            .map(|kind| store.is_configured(kind))
            .unwrap_or(false);
        println!(
            "{:<8} {:<28} {:<20} {}",
            info.id,
            info.name,
            info.default_model,
            if configured { "configured" } else { "no key" }
        );
    }
    ExitCode::SUCCESS
}

fn run_set_key(args: SetKeyArgs) -> ExitCode {
    let store = SettingsStore::default_location();
    match store.save_api_key(args.provider, &args.key) {
        Ok(in_keychain) => {
            println!(
                "Saved {} for {} to {}{}",
                args.provider.key_name(),
                args.provider,
                store.path().display(),
                if in_keychain { " and the OS keychain" } else { "" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
