use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use flowcore::config::{
    ENV_CANVAS_HEIGHT, ENV_CANVAS_WIDTH, ENV_GRID_ENABLED, ENV_GRID_SIZE, ENV_HISTORY_LIMIT, EditorConfig,
};
use flowcore::consts::DIRECTION_MARKERS;
use flowcore::doc::{Document, NodeId, NodeKind};
use flowcore::editor::Editor;
use flowcore::geometry::{
    ArrangeKind, MarkerKind, bounding_box, connector_endpoints, direction_triangle, path, points_on_path,
};
use flowcore::persist::{self, LoadError};
use flowcore::reducer::Action;
use serde_json::{Map, Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document rejected: {0}")]
    Load(#[from] LoadError),
    #[error("unknown node `{0}`")]
    UnknownNode(String),
}

#[derive(Parser, Debug)]
#[command(name = "flowctl", about = "Inspect and transform flowchart documents")]
struct Cli {
    #[arg(long, global = true, env = ENV_CANVAS_WIDTH)]
    canvas_width: Option<String>,

    #[arg(long, global = true, env = ENV_CANVAS_HEIGHT)]
    canvas_height: Option<String>,

    #[arg(long, global = true, env = ENV_GRID_SIZE)]
    grid_size: Option<String>,

    #[arg(long, global = true, env = ENV_GRID_ENABLED)]
    grid_enabled: Option<String>,

    #[arg(long, global = true, env = ENV_HISTORY_LIMIT)]
    history_limit: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Editor settings from flags or their `FLOWCORE_*` variables.
    fn editor_config(&self) -> EditorConfig {
        EditorConfig::from_lookup(|key| {
            let value = match key {
                ENV_CANVAS_WIDTH => &self.canvas_width,
                ENV_CANVAS_HEIGHT => &self.canvas_height,
                ENV_GRID_SIZE => &self.grid_size,
                ENV_GRID_ENABLED => &self.grid_enabled,
                ENV_HISTORY_LIMIT => &self.history_limit,
                _ => return None,
            };
            value.clone()
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that a document would load.
    Validate(InputArgs),
    /// Summarize node kinds, connectors and bounds.
    Stats(InputArgs),
    /// Align or distribute nodes and write the result.
    Arrange(ArrangeArgs),
    /// Print SVG path data and marker points per connector.
    Paths(PathsArgs),
    /// Load through the editor and re-export.
    Normalize(NormalizeArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    #[arg(default_value = "-", help = "Document path, or - for stdin")]
    input: String,
}

#[derive(Args, Debug)]
struct ArrangeArgs {
    #[command(flatten)]
    source: InputArgs,

    #[arg(long, help = "align-left, align-center, align-right, align-top, align-middle, align-bottom, dist-h, dist-v")]
    kind: ArrangeKind,

    #[arg(long, value_delimiter = ',', help = "Node ids to arrange; defaults to every node")]
    ids: Vec<String>,

    #[arg(long, help = "Write here instead of stdout")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PathsArgs {
    #[command(flatten)]
    source: InputArgs,

    #[arg(long, default_value_t = DIRECTION_MARKERS)]
    markers: usize,
}

#[derive(Args, Debug)]
struct NormalizeArgs {
    #[command(flatten)]
    source: InputArgs,

    #[arg(long, help = "Write here instead of stdout")]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let cli = Cli::parse();
    let config = cli.editor_config();
    tracing::debug!(?config, "configuration loaded");

    let result = match cli.command {
        Command::Validate(args) => run_validate(&args),
        Command::Stats(args) => run_stats(&args),
        Command::Arrange(args) => run_arrange(config, args),
        Command::Paths(args) => run_paths(&args),
        Command::Normalize(args) => run_normalize(config, args),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_validate(args: &InputArgs) -> Result<(), CliError> {
    let text = read_input(&args.input)?;
    let value: Value = serde_json::from_str(&text)?;
    persist::validate(&value)?;
    let count = |key: &str| value.get(key).and_then(Value::as_object).map_or(0, Map::len);
    println!("ok: {} nodes, {} connectors", count("nodes"), count("connectors"));
    Ok(())
}

fn run_stats(args: &InputArgs) -> Result<(), CliError> {
    let doc = load(&args.input)?;
    let mut kinds = Map::new();
    for kind in NodeKind::ALL {
        let n = doc.nodes.values().filter(|node| node.kind == kind).count();
        kinds.insert(kind.as_str().to_owned(), json!(n));
    }
    let nodes: Vec<_> = doc.nodes.values().collect();
    let bounds = bounding_box(&nodes).map(|r| {
        json!({ "x": r.min.x, "y": r.min.y, "width": r.width(), "height": r.height() })
    });
    print_json(&json!({
        "nodes": doc.nodes.len(),
        "connectors": doc.connectors.len(),
        "kinds": kinds,
        "routingStyle": doc.routing_style,
        "bounds": bounds,
        "grid": doc.grid,
    }))
}

fn run_arrange(config: EditorConfig, args: ArrangeArgs) -> Result<(), CliError> {
    let doc = load(&args.source.input)?;
    let ids: Vec<NodeId> = if args.ids.is_empty() {
        doc.nodes.keys().cloned().collect()
    } else {
        args.ids.iter().map(|s| NodeId::new(s.trim())).collect()
    };
    if let Some(missing) = ids.iter().find(|id| !doc.nodes.contains_key(*id)) {
        return Err(CliError::UnknownNode(missing.to_string()));
    }

    let mut editor = Editor::with_document(doc, config);
    editor.dispatch(&Action::SetMultiSelect(ids));
    let moved = editor.arrange(args.kind);
    tracing::info!(kind = %args.kind, moved, "arranged");
    write_output(args.output.as_ref(), &editor.export_json()?)
}

fn run_paths(args: &PathsArgs) -> Result<(), CliError> {
    let doc = load(&args.source.input)?;
    let mut out = Vec::with_capacity(doc.connectors.len());
    for conn in doc.connectors.values() {
        let (Some(source), Some(target)) = (doc.node(&conn.source), doc.node(&conn.target)) else {
            tracing::warn!(connector = %conn.id, "skipping connector with a missing endpoint");
            continue;
        };
        let (start, end) = connector_endpoints(source, target);
        let markers: Vec<Value> = points_on_path(conn.style, start, end, args.markers)
            .iter()
            .map(|m| {
                let kind = match m.kind {
                    MarkerKind::Direction => "direction",
                    MarkerKind::Head => "head",
                };
                let triangle: Vec<Value> = direction_triangle(m, m.kind.length())
                    .iter()
                    .map(|p| json!({ "x": p.x, "y": p.y }))
                    .collect();
                json!({ "x": m.point.x, "y": m.point.y, "angle": m.angle, "kind": kind, "triangle": triangle })
            })
            .collect();
        out.push(json!({
            "id": conn.id,
            "label": conn.display_label(),
            "style": conn.style,
            "d": path(conn.style, start, end).to_svg(),
            "markers": markers,
        }));
    }
    print_json(&Value::Array(out))
}

fn run_normalize(config: EditorConfig, args: NormalizeArgs) -> Result<(), CliError> {
    let text = read_input(&args.source.input)?;
    let mut editor = Editor::new(config);
    editor.load_json(&text)?;
    write_output(args.output.as_ref(), &editor.export_json()?)
}

fn load(input: &str) -> Result<Document, CliError> {
    let text = read_input(input)?;
    Ok(persist::parse_document(&text)?)
}

fn read_input(input: &str) -> Result<String, CliError> {
    let mut text = String::new();
    let result = if input == "-" {
        io::stdin().read_to_string(&mut text)
    } else {
        File::open(input).and_then(|mut f| f.read_to_string(&mut text))
    };
    result.map_err(|source| CliError::Read { path: input.to_owned(), source })?;
    Ok(text)
}

fn write_output(output: Option<&PathBuf>, text: &str) -> Result<(), CliError> {
    match output {
        Some(path) => fs::write(path, text)
            .map_err(|source| CliError::Write { path: path.display().to_string(), source }),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
