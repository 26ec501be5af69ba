use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, ValueEnum};
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use career_odyssey::{CareerNodeInput, CareerOdyssey, Layout, OdysseyConfig, parse_nodes};

/// Where the node document comes from. A missing `--input` or `-` means
/// stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("-") => Self::Stdin,
            Some(path) => Self::File(PathBuf::from(path)),
        }
    }

    /// Reads the whole document, rejecting blank input.
    fn read(&self) -> Result<String> {
        let document = match self {
            Self::Stdin => {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context("failed to read career nodes from stdin")?;
                buffer
            }
            Self::File(path) => match fs::read_to_string(path) {
                Ok(contents) => contents,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    bail!("input file '{}' does not exist", path.display())
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
                }
            },
        };
        if document.trim().is_empty() {
            bail!("no career nodes in {self}");
        }
        Ok(document)
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("stdin"),
            Self::File(path) => write!(f, "'{}'", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

impl OutputDestination {
    /// `-` is stdout. Without `--output` the result lands next to the input
    /// file (or in `timeline.<ext>` for stdin input).
    fn resolve(arg: Option<&str>, input: &InputSource, format: Option<OutputFormat>) -> Result<Self> {
        let path = match arg {
            Some("-") => return Ok(Self::Stdout),
            Some(path) => PathBuf::from(path),
            None => {
                let ext = format.unwrap_or(OutputFormat::Svg).extension();
                match input {
                    InputSource::Stdin => PathBuf::from(format!("timeline.{ext}")),
                    InputSource::File(source) => {
                        let sibling = source.with_extension(ext);
                        if &sibling == source {
                            bail!(
                                "refusing to overwrite input '{}'; pass --output",
                                source.display()
                            );
                        }
                        sibling
                    }
                }
            }
        };
        Ok(Self::File(path))
    }

    /// Explicit `--output-format` wins, then the file extension. Stdout
    /// defaults to SVG.
    fn format(&self, requested: Option<OutputFormat>) -> Result<OutputFormat> {
        match (requested, self) {
            (Some(format), _) => Ok(format),
            (None, Self::Stdout) => Ok(OutputFormat::Svg),
            (None, Self::File(path)) => OutputFormat::from_path(path).ok_or_else(|| {
                anyhow!(
                    "cannot tell the output format of '{}'; pass --output-format",
                    path.display()
                )
            }),
        }
    }

    fn write(&self, bytes: &[u8], quiet: bool) -> Result<()> {
        match self {
            Self::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(bytes)?;
                stdout.flush()?;
            }
            Self::File(path) => {
                fs::write(path, bytes)
                    .with_context(|| format!("failed to write '{}'", path.display()))?;
                if !quiet {
                    println!("Generated timeline -> {}", path.display());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "career-odyssey",
    about = "Lay out a career timeline graph and render it to SVG or layout JSON."
)]
pub struct RenderArgs {
    /// Path to the input node JSON. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Path to the output file. Use '-' to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Output format (defaults to the output file extension or svg).
    #[arg(short = 'e', long = "output-format")]
    output_format: Option<OutputFormat>,

    /// JSON file overriding layout and interaction constants.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Center the rendered view on this node id.
    #[arg(short = 'a', long = "anchor")]
    anchor: Option<String>,

    /// Background color for the rendered timeline (svg only).
    #[arg(short = 'b', long = "background-color", default_value = "white")]
    background_color: String,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Svg,
    Json,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        [Self::Svg, Self::Json]
            .into_iter()
            .find(|format| ext.eq_ignore_ascii_case(format.extension()))
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Json => "json",
        }
    }
}

pub fn dispatch() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let render_args = match args.get(1).map(|s| s.as_str()) {
        Some("render") => RenderArgs::parse_from(
            std::iter::once(args[0].clone()).chain(args.iter().skip(2).cloned()),
        ),
        _ => RenderArgs::parse_from(args),
    };
    run_render(render_args)
}

fn run_render(cli: RenderArgs) -> Result<()> {
    let source = InputSource::from_arg(cli.input.as_deref());
    let destination = OutputDestination::resolve(cli.output.as_deref(), &source, cli.output_format)?;
    let format = destination.format(cli.output_format)?;

    let mut config = match &cli.config {
        Some(path) => OdysseyConfig::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => OdysseyConfig::default(),
    };
    if let Some(anchor) = &cli.anchor {
        config.interaction.anchor = Some(anchor.clone());
    }

    let document = source.read()?;
    let nodes = parse_nodes(&document).context("failed to parse career nodes")?;
    log::info!("loaded {} career nodes", nodes.len());

    let output_bytes = match format {
        OutputFormat::Svg => render_timeline(nodes, config, &cli.background_color)?,
        OutputFormat::Json => {
            let layout = Layout::compute(&nodes, &config.layout)?;
            if !layout.report.is_clean() {
                log::warn!(
                    "layout left {} overlapping pairs and {} crossings",
                    layout.report.remaining_overlaps,
                    layout.report.remaining_crossings
                );
            }
            let mut json = serde_json::to_string_pretty(&layout)?;
            json.push('\n');
            json.into_bytes()
        }
    };

    destination.write(&output_bytes, cli.quiet)
}

/// Static full-canvas render, or a view centered on the anchor when one is
/// configured.
fn render_timeline(
    nodes: Vec<CareerNodeInput>,
    config: OdysseyConfig,
    background: &str,
) -> Result<Vec<u8>> {
    let requested = config.interaction.anchor.clone();
    let odyssey = CareerOdyssey::new(nodes, config)?;

    let svg = match requested {
        Some(anchor) => {
            if odyssey.layout().node(&anchor).is_none() {
                log::warn!("anchor '{anchor}' not found, centering on the latest node instead");
            }
            odyssey.render_svg(background)?
        }
        None => career_odyssey::render_svg(odyssey.layout(), background)?,
    };

    Ok(svg.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_and_missing_input_mean_stdin() {
        assert_eq!(InputSource::from_arg(None), InputSource::Stdin);
        assert_eq!(InputSource::from_arg(Some("-")), InputSource::Stdin);
        assert_eq!(
            InputSource::from_arg(Some("career.json")),
            InputSource::File(PathBuf::from("career.json"))
        );
    }

    #[test]
    fn default_output_sits_next_to_the_input() -> Result<()> {
        let input = InputSource::File(PathBuf::from("data/career.json"));
        let svg = OutputDestination::resolve(None, &input, None)?;
        assert_eq!(svg, OutputDestination::File(PathBuf::from("data/career.svg")));

        let json = OutputDestination::resolve(None, &input, Some(OutputFormat::Json));
        assert!(json.is_err(), "writing layout json next to career.json would overwrite it");
        Ok(())
    }

    #[test]
    fn format_follows_flag_then_extension() -> Result<()> {
        let file = OutputDestination::File(PathBuf::from("out/Layout.JSON"));
        assert_eq!(file.format(None)?, OutputFormat::Json);
        assert_eq!(file.format(Some(OutputFormat::Svg))?, OutputFormat::Svg);
        assert_eq!(OutputDestination::Stdout.format(None)?, OutputFormat::Svg);
        assert!(OutputDestination::File(PathBuf::from("timeline.png")).format(None).is_err());
        Ok(())
    }
}
