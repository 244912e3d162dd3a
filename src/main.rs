use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use portal_scene::{
    DirectoryLoader, InputEvent, Page, PageLayout, PointerOutcome, TransitionTick, Viewport,
};

const USAGE: &str = "Usage: portal-scene <layout.xml|home|portfolio> [--models DIR] \
[--viewport WxH] [--event click:X,Y|wheel:DY|resize:WxH]... [--frame-ms N] [--max-ms N] [--seed N]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let layout = load_layout(&options.layout)?;
    let mut loader = DirectoryLoader::new(&options.models);
    let mut page = Page::build(&layout, &mut loader, options.viewport, options.seed);

    println!(
        "Loaded page {} with {} of {} models ({} interactive nodes)",
        page.name(),
        page.models().len(),
        layout.models.len(),
        page.controller().registry().len()
    );
    for path in page.load_failures() {
        println!(" - failed to load {path}");
    }

    let mut navigated: Option<(String, f64)> = None;
    let mut sink = |destination: &str| {
        println!("Navigate -> {destination}");
    };

    let mut now = 0.0;
    let mut events = options.events.iter();
    while now <= options.max_ms {
        if let Some(event) = events.next() {
            if let Some(outcome) = page.handle_input(*event, now) {
                println!("{event} => {}", describe(&outcome));
            }
        }
        if let TransitionTick::Navigated(destination) = page.frame(now, &mut sink) {
            navigated = Some((destination.to_string(), now));
            break;
        }
        now += options.frame_ms;
    }

    match navigated {
        Some((destination, at)) => println!("Navigated to {destination} at {at} ms"),
        None => println!("No navigation"),
    }
    Ok(())
}

fn describe(outcome: &PointerOutcome) -> String {
    match outcome {
        PointerOutcome::Started { destination, .. } => format!("transition to {destination}"),
        PointerOutcome::Missed => "miss".to_string(),
        PointerOutcome::Busy => "ignored (transition running)".to_string(),
    }
}

fn load_layout(source: &str) -> Result<PageLayout> {
    if PageLayout::bundled_xml(source).is_some() {
        return PageLayout::bundled(source);
    }
    let xml = fs::read_to_string(source).with_context(|| format!("failed to read layout {source}"))?;
    PageLayout::from_xml(&xml).with_context(|| format!("failed to parse layout {source}"))
}

struct CliOptions {
    layout: String,
    models: PathBuf,
    viewport: Viewport,
    events: Vec<InputEvent>,
    frame_ms: f64,
    max_ms: f64,
    seed: u64,
}

impl CliOptions {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let Some(layout) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        if layout.starts_with("--") {
            return Err(anyhow!(USAGE));
        }
        let mut options = Self {
            layout,
            models: PathBuf::from("."),
            viewport: Viewport::default(),
            events: Vec::new(),
            frame_ms: 1000.0 / 60.0,
            max_ms: 5_000.0,
            seed: 0,
        };
        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| anyhow!("{arg} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--models" => options.models = PathBuf::from(value()?),
                "--viewport" => options.viewport = parse_viewport(&value()?)?,
                "--event" => options.events.push(value()?.parse()?),
                "--frame-ms" => options.frame_ms = parse_positive(&arg, &value()?)?,
                "--max-ms" => options.max_ms = parse_positive(&arg, &value()?)?,
                "--seed" => {
                    options.seed = value()?
                        .parse()
                        .with_context(|| format!("invalid value for {arg}"))?
                }
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }
}

fn parse_viewport(value: &str) -> Result<Viewport> {
    let (width, height) = value
        .split_once('x')
        .ok_or_else(|| anyhow!("viewport {value:?} must look like WIDTHxHEIGHT"))?;
    Ok(Viewport::new(
        width.parse().context("invalid viewport width")?,
        height.parse().context("invalid viewport height")?,
    ))
}

fn parse_positive(flag: &str, value: &str) -> Result<f64> {
    let parsed: f64 = value
        .parse()
        .with_context(|| format!("invalid value for {flag}"))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(anyhow!("{flag} must be a positive finite number"));
    }
    Ok(parsed)
}
