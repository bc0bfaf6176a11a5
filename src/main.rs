use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "text-overlay-rust",
    version,
    about = "Overlay text onto images over HTTP"
)]
struct Cli {
    /// Address to listen on (overrides settings [server] addr)
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Render this image file once instead of starting the server
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Output path for --data
    #[arg(short = 'o', long = "output", default_value = "image_with_text.jpg")]
    output: String,

    /// Overlay text for --data (default: "Sample Text")
    #[arg(short = 't', long = "text")]
    text: Option<String>,

    /// Font file name from the fonts directory
    #[arg(long = "font-name")]
    font_name: Option<String>,

    /// Font size in pixels
    #[arg(long = "font-size")]
    font_size: Option<u32>,

    /// center, top, bottom, left, right, top-left, top-right, bottom-left, bottom-right
    #[arg(long = "position")]
    position: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    text_overlay_rust::logging::init(cli.verbose)?;

    let output = text_overlay_rust::run(text_overlay_rust::Config {
        settings_path: cli.read_settings,
        addr: cli.addr,
        data: cli.data,
        output: cli.output,
        text: cli.text,
        font_name: cli.font_name,
        font_size: cli.font_size,
        position: cli.position,
    })
    .await?;

    if let Some(path) = output {
        println!("{}", path);
    }
    Ok(())
}
