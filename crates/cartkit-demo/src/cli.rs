use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cartkit_store::{CartStore, seed};
use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::logging;
use crate::ops::Action;
use crate::render::{Format, LiveView, Snapshot, render};

#[derive(Debug, Parser)]
#[command(
    name = "cartkit-demo",
    about = "Seed a shopping cart, apply actions, and render every change",
    version
)]
pub struct Cli {
    /// JSON array of items to start from instead of the built-in list.
    #[arg(long, global = true, value_name = "FILE")]
    pub seed: Option<PathBuf>,

    /// Log cart operations (CARTKIT_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render the seeded cart and its aggregates.
    Show(ShowArgs),

    /// Apply actions in order, rendering after every change.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Actions: inc:<id>, dec:<id>, del:<id>, reset.
    #[arg(required = true, value_name = "ACTION")]
    pub actions: Vec<Action>,

    /// Emit one JSON object per change instead of text.
    #[arg(long)]
    pub json: bool,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli, &mut out)
}

/// Run `cli`, writing rendered output to `out`.
pub fn execute(cli: Cli, out: &mut impl Write) -> Result<()> {
    let store = open_store(cli.seed.as_deref())?;
    match cli.command {
        Commands::Show(args) => show(&store, &args, out),
        Commands::Run(args) => run_actions(&store, &args, out),
    }
}

fn open_store(seed: Option<&Path>) -> Result<CartStore> {
    let items = match seed {
        Some(path) => seed::load_items(path)?,
        None => seed::default_items(),
    };
    Ok(CartStore::new(items))
}

fn show(store: &CartStore, args: &ShowArgs, out: &mut impl Write) -> Result<()> {
    let format = Format::from_json_flag(args.json);
    writeln!(out, "{}", render(format, &Snapshot::of(store))?)?;
    Ok(())
}

fn run_actions(store: &CartStore, args: &RunArgs, out: &mut impl Write) -> Result<()> {
    let format = Format::from_json_flag(args.json);
    let view = LiveView::attach(store);
    for action in &args.actions {
        if !action.apply(store) {
            tracing::warn!(action = %action, "no item with that id; cart unchanged");
        }
    }

    for (index, snapshot) in view.snapshots().iter().enumerate() {
        let frame = render(format, snapshot)?;
        match format {
            Format::Json => writeln!(out, "{frame}")?,
            Format::Text => {
                if index > 0 {
                    writeln!(out)?;
                }
                writeln!(out, "[{index}]")?;
                writeln!(out, "{frame}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use clap::Parser;

    use super::{Cli, execute};
    use crate::error::DemoError;

    fn output(args: &[&str]) -> Result<String, DemoError> {
        let cli = Cli::try_parse_from(args).map_err(|e| DemoError::invalid(e.to_string()))?;
        let mut buf = Vec::new();
        execute(cli, &mut buf)?;
        Ok(String::from_utf8(buf).expect("utf8 output"))
    }

    #[test]
    fn show_renders_seed() {
        let text = output(&["cartkit-demo", "show"]).expect("show");
        assert!(text.contains("Google Pixel"));
        assert!(text.trim_end().ends_with("items: 3  total: $1799.97"));
    }

    #[test]
    fn run_renders_a_frame_per_change() {
        let text = output(&["cartkit-demo", "run", "inc:1", "del:9", "reset"]).expect("run");
        assert!(text.starts_with("[0]\n"));
        assert!(text.contains("[1]\n"));
        assert!(text.contains("items: 4  total: $2399.96"));
        assert!(text.contains("[2]\n  (cart is empty)\nitems: 0  total: $0.00"));
        assert!(!text.contains("[3]"));
    }

    #[test]
    fn run_json_emits_lines() {
        let text = output(&["cartkit-demo", "run", "--json", "dec:2", "dec:2"]).expect("run");
        let amounts: Vec<i64> = text
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).expect("json line");
                value["amount"].as_i64().expect("amount")
            })
            .collect();
        assert_eq!(amounts, vec![3, 2, 1]);
    }

    #[test]
    fn seed_file_replaces_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[{{"id":7,"title":"Kettle","price":30.5,"img":"img/kettle.png","amount":2}}]"#
        )
        .expect("write seed");
        let path = file.path().display().to_string();

        let text = output(&["cartkit-demo", "--seed", &path, "show", "--json"]).expect("show");
        let value: serde_json::Value = serde_json::from_str(text.trim()).expect("json");
        assert_eq!(value["amount"], 2);
        assert_eq!(value["total"], 61.0);
    }

    #[test]
    fn bad_seed_file_is_a_store_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.json").display().to_string();
        let err = output(&["cartkit-demo", "show", "--seed", &path]).unwrap_err();
        assert!(matches!(err, DemoError::Store(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn bad_action_is_rejected_by_parser() {
        let err = output(&["cartkit-demo", "run", "buy:1"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("unknown action `buy`"));
    }
}
