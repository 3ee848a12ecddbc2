use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::collection::BoundedOrderedCollection;
use crate::column_sort::{ColumnSort, SortDirection, SortKey};
use crate::config::{self, ConfigError, TrackerConfig};
use crate::model::{now_epoch_secs, Entry};
use crate::tracker::{SelectionTracker, TrackerError};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Tracker(#[from] TrackerError),
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Debug, Parser)]
#[command(name = "seltrack", version, about = "Inspect and edit recorded selection history")]
pub struct Cli {
    /// Path to config.toml (defaults to the per-user data directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Project namespace, overriding the config file.
    #[arg(long, global = true)]
    pub namespace: Option<String>,
    /// Data directory, overriding the config file.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Name,
    Missing,
    Time,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => SortKey::Name,
            SortArg::Missing => SortKey::Missing,
            SortArg::Time => SortKey::Time,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print history and pinned entries.
    List {
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        #[arg(long, requires = "sort")]
        descending: bool,
    },
    /// Record a selection at the front of history.
    Record {
        id: String,
        name: String,
        /// Unix seconds; defaults to now.
        #[arg(long)]
        at: Option<i64>,
    },
    /// Pin an entry already present in history.
    Pin { id: String },
    Unpin { id: String },
    /// Flag an entry whose resource no longer exists (both lists by default).
    MarkMissing {
        id: String,
        #[arg(long)]
        history: bool,
        #[arg(long)]
        pinned: bool,
    },
    /// Remove an entry from history and pinned.
    Remove { id: String },
    ClearHistory,
    SetCapacity { capacity: usize },
    /// Truncate the persisted data file.
    Reset,
    /// Write the effective config to its config path.
    InitConfig,
}

pub fn resolve_config(cli: &Cli) -> Result<TrackerConfig, ConfigError> {
    let mut cfg = config::load(cli.config.as_deref())?;
    if let Some(namespace) = &cli.namespace {
        cfg.namespace = namespace.clone();
    }
    if let Some(data_dir) = &cli.data_dir {
        cfg.data_dir = data_dir.clone();
    }
    config::validate(&cfg)?;
    Ok(cfg)
}

pub fn run(cli: Cli, out: &mut impl Write) -> Result<(), RuntimeError> {
    let cfg = resolve_config(&cli)?;
    if let Command::InitConfig = cli.command {
        config::save(&cfg)?;
        writeln!(out, "wrote config to {}", cfg.config_path.display())?;
        return Ok(());
    }

    let mut tracker = SelectionTracker::open(&cfg)?;
    match cli.command {
        Command::List { sort, descending } => {
            let mut column_sort = ColumnSort::default();
            if let Some(key) = sort {
                column_sort.activate(key.into());
                if descending {
                    column_sort.activate(key.into());
                }
            }
            let store = tracker.store();
            let capacity = store.history().capacity();
            write_section(out, "history", &capacity.to_string(), store.history(), &column_sort)?;
            let capacity = store.pinned().capacity();
            write_section(out, "pinned", &capacity.to_string(), store.pinned(), &column_sort)?;
            return Ok(());
        }
        Command::Record { id, name, at } => {
            let at = at.unwrap_or_else(now_epoch_secs);
            tracker.store_mut().record_selection(&id, &name, at);
            writeln!(out, "recorded {id}")?;
        }
        Command::Pin { id } => report(out, tracker.store_mut().pin(&id), "pinned", &id)?,
        Command::Unpin { id } => report(out, tracker.store_mut().unpin(&id), "unpinned", &id)?,
        Command::MarkMissing {
            id,
            history,
            pinned,
        } => {
            let (history, pinned) = if history || pinned {
                (history, pinned)
            } else {
                (true, true)
            };
            let found = tracker.store_mut().mark_missing(&id, history, pinned);
            report(out, found, "marked missing", &id)?;
        }
        Command::Remove { id } => {
            let removed = tracker.store_mut().remove_missing(&id);
            report(out, removed, "removed", &id)?;
        }
        Command::ClearHistory => {
            tracker.store_mut().clear_history();
            writeln!(out, "cleared history")?;
        }
        Command::SetCapacity { capacity } => {
            tracker.store_mut().set_history_capacity(capacity);
            writeln!(out, "history capacity set to {capacity}")?;
        }
        Command::Reset => {
            tracker.reset()?;
            writeln!(out, "cleared {}", tracker.storage_path().display())?;
            return Ok(());
        }
        Command::InitConfig => {}
    }

    tracker.flush_now()?;
    Ok(())
}

fn report(out: &mut impl Write, changed: bool, verb: &str, id: &str) -> std::io::Result<()> {
    if changed {
        writeln!(out, "{verb} {id}")
    } else {
        writeln!(out, "no entry {id}; nothing {verb}")
    }
}

fn write_section(
    out: &mut impl Write,
    title: &str,
    capacity: &str,
    collection: &BoundedOrderedCollection,
    sort: &ColumnSort,
) -> std::io::Result<()> {
    writeln!(out, "{title} ({}/{capacity}){}", collection.len(), sort_hint(sort))?;
    let now = now_epoch_secs();
    for (index, entry) in sort.apply(collection).into_iter().enumerate() {
        writeln!(out, "  {:>2}. {}", index + 1, entry_line(entry, now))?;
    }
    Ok(())
}

fn sort_hint(sort: &ColumnSort) -> String {
    match sort.active() {
        Some((key, direction)) => {
            let arrow = if direction == SortDirection::Descending {
                "desc"
            } else {
                "asc"
            };
            format!(" sorted by {key:?} {arrow}")
        }
        None => String::new(),
    }
}

fn entry_line(entry: &Entry, now: i64) -> String {
    let missing = if entry.is_missing { "  [missing]" } else { "" };
    format!(
        "{}  ({})  {}{missing}",
        entry.display_name,
        entry.id,
        relative_age(entry.last_selected_at, now)
    )
}

fn relative_age(selected_epoch_secs: i64, now: i64) -> String {
    let age = now.saturating_sub(selected_epoch_secs);
    if age < 60 {
        return "just now".to_string();
    }
    if age < 3600 {
        return format!("{}m ago", age / 60);
    }
    if age < 86_400 {
        return format!("{}h ago", age / 3600);
    }
    format!("{}d ago", age / 86_400)
}
