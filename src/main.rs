mod ai;
mod assemble;
mod config;
mod error;
mod frame;
mod images;
mod script;
#[cfg(test)]
mod test_support;
mod video;

use std::path::PathBuf;
use std::time::Duration;

use ai::TogetherClient;
use clap::{Args, Parser, Subcommand};
use config::Config;
use error::{Result, VideoError};
use frame::{FrameComposer, TextPainter};
use images::PexelsClient;
use script::{load_script, Session, Style};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reelscript")]
#[command(about = "Turn a topic into a captioned slideshow video", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory for the script, the video and temporary images
    #[arg(short, long, global = true, default_value = "outputs")]
    output_dir: PathBuf,

    /// TrueType font for captions (defaults to the bundled DejaVu Sans)
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    /// Timeout for each network request, in seconds
    #[arg(long, global = true, default_value_t = 300)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a script and save it for editing
    Script(TopicArgs),
    /// Build a video from the saved (possibly edited) script
    Video {
        /// Script to read instead of <output-dir>/script.txt
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
    /// Generate a script and turn it into a video right away
    Run(TopicArgs),
}

#[derive(Args)]
struct TopicArgs {
    #[arg(short, long, default_value = "History of AI")]
    topic: String,
    #[arg(short, long, value_enum, default_value_t = Style::Informative)]
    style: Style,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config
            .with_output_dir(&cli.output_dir)
            .with_font_path(cli.font.clone())
            .with_timeout(Duration::from_secs(cli.timeout_secs)),
        Err(e) => {
            eprintln!("Error: {}. Add it to your environment or a .env file", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, &config).await {
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let mut session = Session::new();
    match command {
        Command::Script(args) => {
            generate(&mut session, config, &args).await?;
            if let Some(script) = session.script() {
                println!("{}", script.text());
            }
            info!(
                "Edit {} and run `reelscript video` to build the video",
                config.script_path().display()
            );
        }
        Command::Video { script } => {
            let script_path = script.unwrap_or_else(|| config.script_path());
            session.replace_script(load_script(&script_path).await?);
            create_video(&session, config).await?;
        }
        Command::Run(args) => {
            generate(&mut session, config, &args).await?;
            create_video(&session, config).await?;
        }
    }
    Ok(())
}

async fn generate(session: &mut Session, config: &Config, args: &TopicArgs) -> Result<()> {
    let client = TogetherClient::new(
        &config.together_api_key,
        &config.together_api_base,
        config.together_model.clone(),
        config.timeout,
    );
    let script = ai::generate_script(&client, &args.topic, args.style, &config.script_path()).await?;
    session.replace_script(script);
    Ok(())
}

async fn create_video(session: &Session, config: &Config) -> Result<PathBuf> {
    let script = session.script().ok_or(VideoError::EmptyScript)?;

    let painter = match &config.font_path {
        Some(path) => TextPainter::load(path)?,
        None => TextPainter::embedded()?,
    };
    let composer = FrameComposer::new(painter);
    let images = PexelsClient::new(
        config.pexels_api_key.clone(),
        config.pexels_api_base.clone(),
        config.timeout,
    )?;

    info!("Fetching images and generating video...");
    let video_path = assemble::assemble(
        script,
        &images,
        &composer,
        config.scratch_dir(),
        &config.video_path(),
    )
    .await?;
    println!("{}", video_path.display());
    Ok(video_path)
}
