use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "image-translator-rust",
    version,
    about = "Translate the text inside images in place"
)]
struct Cli {
    /// Language of the text in the images (ISO 639-1, e.g. ja, zh, fr)
    source_lang: String,

    /// Images to translate; each is written next to the source as <stem>-translated.<ext>
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Target language (default from settings: en)
    #[arg(short = 't', long = "target-lang")]
    target_lang: Option<String>,

    /// Translation provider (mymemory, openai)
    #[arg(short = 'p', long = "provider")]
    provider: Option<String>,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Model name for LLM providers
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Contact email sent to MyMemory for a larger free quota
    #[arg(long = "email")]
    email: Option<String>,

    /// Minimum OCR confidence (0-100)
    #[arg(short = 'c', long = "confidence")]
    confidence: Option<f32>,

    /// Font file used to draw translations
    #[arg(long = "font-path")]
    font_path: Option<String>,

    /// Installed font family used to draw translations
    #[arg(long = "font-family")]
    font_family: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    image_translator_rust::logging::init(cli.verbose)?;

    let config = image_translator_rust::Config {
        source_lang: cli.source_lang,
        images: cli.images,
        target_lang: cli.target_lang,
        provider: cli.provider,
        key: cli.key,
        model: cli.model,
        email: cli.email,
        confidence: cli.confidence,
        font_path: cli.font_path,
        font_family: cli.font_family,
        settings_path: cli.read_settings,
    };

    let worker = image_translator_rust::run(config)?;
    for message in worker.messages() {
        println!("{}", message);
    }
    worker.join()
}
