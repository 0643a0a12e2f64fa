use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use core_types::{DisplayRect, Provider};

/// retouch - paint over an object and have it removed
#[derive(Parser, Debug)]
#[command(name = "retouch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Paint a mask and send it to the inpainting service
    Erase(EraseArgs),
    /// Paint a mask and write it out without contacting the service
    Mask(MaskArgs),
    /// Show or change stored settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args, Debug)]
pub struct Canvas {
    /// Image to edit
    #[arg(long, value_name = "IMAGE")]
    pub image: PathBuf,

    /// Brush position in display coordinates, repeat for a stroke
    #[arg(long = "stroke", value_name = "X,Y", value_parser = parse_point, required = true)]
    pub strokes: Vec<(f64, f64)>,

    /// Size the image is displayed at; defaults to its native size
    #[arg(long, value_name = "WxH", value_parser = parse_display)]
    pub display: Option<DisplayRect>,
}

#[derive(Args, Debug)]
pub struct EraseArgs {
    #[command(flatten)]
    pub canvas: Canvas,

    /// Where to write the edited image
    #[arg(short, long)]
    pub out: PathBuf,

    /// Also write the submitted mask here
    #[arg(long)]
    pub mask_out: Option<PathBuf>,

    /// Override the stored service endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override the stored wire encoding
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,
}

#[derive(Args, Debug)]
pub struct MaskArgs {
    #[command(flatten)]
    pub canvas: Canvas,

    /// Where to write the mask PNG
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the stored settings as JSON
    Show,
    /// Store the service endpoint
    SetEndpoint { url: String },
    /// Store the wire encoding
    SetProvider {
        #[arg(value_enum)]
        provider: ProviderArg,
    },
    /// Store the requested output format, or clear it
    SetOutputFormat { format: Option<String> },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderArg {
    Multipart,
    JsonBase64,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Multipart => Provider::Multipart,
            ProviderArg::JsonBase64 => Provider::JsonBase64,
        }
    }
}

/// Parse `X,Y` into a pair of coordinates
fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{s}'"))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("invalid x in '{s}'"))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("invalid y in '{s}'"))?;
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("coordinates must be finite: '{s}'"));
    }
    Ok((x, y))
}

/// Parse `WxH` into a display box anchored at the origin
fn parse_display(s: &str) -> Result<DisplayRect, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH but got '{s}'"))?;
    let w: f64 = w.trim().parse().map_err(|_| format!("invalid width in '{s}'"))?;
    let h: f64 = h.trim().parse().map_err(|_| format!("invalid height in '{s}'"))?;
    let rect = DisplayRect::sized(w, h);
    if !rect.is_laid_out() {
        return Err("display size must be positive".to_string());
    }
    Ok(rect)
}
