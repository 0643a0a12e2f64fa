mod args;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use app_settings::AppSettings;
use args::{Canvas, Cli, Command, EraseArgs, MaskArgs, SettingsCommand};
use clap::Parser;
use core_types::{DisplayRect, Notice, NoticeKind};
use engine::ImageEngine;
use inpaint_client::{HttpTransport, Orchestrator, TempDirStore};
use tracing_subscriber::EnvFilter;
use workflow::{Editor, EditorCallbacks, Session, SubmitOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Erase(args) => erase(args).await,
        Command::Mask(args) => mask(args),
        Command::Settings(command) => settings(command),
    }
}

async fn erase(args: EraseArgs) -> Result<()> {
    let mut stored = AppSettings::load().unwrap_or_default();
    let settings = with_overrides(&stored, &args);
    if settings.api_token().is_none() {
        tracing::warn!(var = %settings.api_token_env, "no API token set");
    }

    let transport = HttpTransport::from_settings(&settings)?;
    let store = Arc::new(TempDirStore::new().context("failed to create result directory")?);
    let callbacks = EditorCallbacks {
        on_change: None,
        on_notice: Some(Arc::new(|notice: &Notice| report(notice))),
    };
    let editor = Editor::with_callbacks(Orchestrator::new(Arc::new(transport), store), callbacks);

    editor.open_image(&args.canvas.image)?;
    let native = editor.view().image.context("image did not load")?;
    let rect = args
        .canvas
        .display
        .unwrap_or_else(|| DisplayRect::sized(native.width as f64, native.height as f64));
    editor.relayout(rect);

    editor.pointer_down();
    for &(x, y) in &args.canvas.strokes {
        editor.pointer_move(x, y);
    }
    editor.pointer_up();

    if let Some(mask_out) = &args.mask_out {
        let encoding = editor.with_session(|session| session.mask().map(|mask| mask.export()));
        let encoding = encoding.context("no mask to write")??;
        write_file(mask_out, &encoding.bytes)?;
    }

    match editor.submit().await {
        SubmitOutcome::Completed { result } => {
            let bytes = editor
                .result_bytes()?
                .context("result was released before it could be saved")?;
            write_file(&args.out, &bytes)?;
            tracing::info!(mime = %result.mime, out = %args.out.display(), "saved edited image");
        }
        SubmitOutcome::Failed { message } => bail!(message),
        SubmitOutcome::Rejected(err) => return Err(err.into()),
        SubmitOutcome::Abandoned => bail!("edit request was abandoned"),
    }

    stored.set_last_image_dir(&args.canvas.image);
    if let Err(err) = stored.save() {
        tracing::warn!("failed to save settings: {err}");
    }
    Ok(())
}

/// Settings for this run only; command-line overrides are never stored.
fn with_overrides(stored: &AppSettings, args: &EraseArgs) -> AppSettings {
    let mut settings = stored.clone();
    if let Some(endpoint) = &args.endpoint {
        settings.endpoint = endpoint.clone();
    }
    if let Some(provider) = args.provider {
        settings.provider = provider.into();
    }
    settings
}

fn mask(args: MaskArgs) -> Result<()> {
    let Canvas {
        image,
        strokes,
        display,
    } = args.canvas;

    let source = ImageEngine::new().open_source(&image)?;
    let native = source.dimensions();
    let mut session = Session::new();
    session.select_image(source)?;
    session.set_display(
        display.unwrap_or_else(|| DisplayRect::sized(native.width as f64, native.height as f64)),
    );

    session.begin_stroke()?;
    for (x, y) in strokes {
        session.pointer_move(x, y)?;
    }
    session.end_stroke();

    let mask = session.mask().context("no mask allocated")?;
    let encoding = mask.export()?;
    write_file(&args.out, &encoding.bytes)?;
    println!(
        "{}x{} mask, {} pixels painted",
        encoding.dimensions.width,
        encoding.dimensions.height,
        mask.painted_pixels()
    );
    Ok(())
}

fn settings(command: SettingsCommand) -> Result<()> {
    let mut settings = AppSettings::load().unwrap_or_default();
    match command {
        SettingsCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            return Ok(());
        }
        SettingsCommand::SetEndpoint { url } => settings.endpoint = url,
        SettingsCommand::SetProvider { provider } => settings.provider = provider.into(),
        SettingsCommand::SetOutputFormat { format } => settings.output_format = format,
    }
    settings.save()?;
    Ok(())
}

fn report(notice: &Notice) {
    match notice.kind {
        NoticeKind::Error => eprintln!("{}: {}", notice.title, notice.description),
        NoticeKind::Quota | NoticeKind::Info => eprintln!("{}", notice.description),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Provider;

    fn erase_args(extra: &[&str]) -> EraseArgs {
        let mut argv = vec![
            "retouch", "erase", "--image", "in.png", "--stroke", "1,1", "--out", "out.png",
        ];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Erase(args) => args,
            other => panic!("expected erase, got {other:?}"),
        }
    }

    #[test]
    fn overrides_apply_to_the_run_but_not_the_stored_settings() {
        let stored = AppSettings::default();
        let args = erase_args(&[
            "--endpoint",
            "http://localhost:9000/inpaint",
            "--provider",
            "json-base64",
        ]);

        let effective = with_overrides(&stored, &args);
        assert_eq!(effective.endpoint, "http://localhost:9000/inpaint");
        assert_eq!(effective.provider, Provider::JsonBase64);

        assert_eq!(stored, AppSettings::default());
        assert_eq!(stored.provider, Provider::Multipart);
    }

    #[test]
    fn no_overrides_keeps_stored_values() {
        let mut stored = AppSettings::default();
        stored.endpoint = "https://example.test/edit".into();

        let effective = with_overrides(&stored, &erase_args(&[]));
        assert_eq!(effective, stored);
    }
}
