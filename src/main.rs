use std::{
    fs,
    io::{self, Read, Write},
    process,
};

use highlight_code::{
    application::{
        error::AppError,
        render::{DefaultEngines, Highlighter},
        widget::{DisplaySurface, HighlightCode, TAG_NAME, WidgetEvent, spawn_widget},
    },
    config::{self, OutputFormat, RenderArgs, Settings},
    infra::telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Some(config::Command::Render(args)) => run_render(&settings, args).await,
        Some(config::Command::Languages) => run_languages(),
        None => run_render(&settings, RenderArgs::default()).await,
    }
}

async fn run_render(settings: &Settings, args: RenderArgs) -> Result<(), AppError> {
    let text = read_input(&args)?;

    let widget = HighlightCode::with_provider(DefaultEngines::from(&settings.render));
    let handle = spawn_widget(widget);

    let mut events = vec![WidgetEvent::set("content", text)];
    if let Some(language) = args.language {
        events.push(WidgetEvent::set("language", language));
    }
    if let Some(base) = args.base_url {
        events.push(WidgetEvent::set("baseurl", base));
    }
    if let Some(raw_base) = args.raw_base_url {
        events.push(WidgetEvent::set("rawbaseurl", raw_base));
    }
    events.push(WidgetEvent::Attached);

    for event in events {
        handle.send(event)?;
    }
    let surface = handle.close().await?;

    info!(
        target = "highlight_code::render",
        commits = surface.commits(),
        classes = ?surface.classes(),
        "render complete"
    );
    write_surface(&surface, args.format)
}

fn run_languages() -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    for language in Highlighter::syntect().engine().languages() {
        writeln!(stdout, "{language}")?;
    }
    Ok(())
}

fn read_input(args: &RenderArgs) -> Result<String, AppError> {
    match args.input_path() {
        Some(path) => {
            fs::read_to_string(path).map_err(|err| AppError::input(path.display().to_string(), err))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| AppError::input("<stdin>", err))?;
            Ok(buffer)
        }
    }
}

fn write_surface(surface: &DisplaySurface, format: OutputFormat) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Html => writeln!(stdout, "{}", surface.outer_html(TAG_NAME))?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, surface)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
