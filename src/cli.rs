//! Argument parsing for the `snapgraph` binary.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crate::archive::{self, ArchiveReader};
use crate::config::ArchiveConfig;
use crate::errors::GraphError;
use crate::graph::{AttributeIndexType, ElementKind, GraphStore};
use crate::registry::AttributeRegistry;

pub const COMMANDS: [&str; 4] = ["info", "dump", "verify", "entries"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLineConfig {
    pub command: String,
    pub input: String,
    pub graph_entry: Option<String>,
    pub compact: bool,
}

impl CommandLineConfig {
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut command = None;
        let mut input = None;
        let mut graph_entry = None;
        let mut compact = false;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match *arg {
                "--input" | "-i" => {
                    input = Some(
                        iter.next()
                            .ok_or_else(|| "--input requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--graph-entry" => {
                    graph_entry = Some(
                        iter.next()
                            .ok_or_else(|| "--graph-entry requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--compact" => compact = true,
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                other => {
                    if command.is_some() {
                        return Err(format!("unexpected argument {other}"));
                    }
                    if !COMMANDS.contains(&other) {
                        return Err(format!("unknown command {other}"));
                    }
                    command = Some(other.to_string());
                }
            }
        }
        Ok(Self {
            command: command.ok_or_else(|| "missing command".to_string())?,
            input: input.ok_or_else(|| "--input is required".to_string())?,
            graph_entry,
            compact,
        })
    }

    pub fn help() -> &'static str {
        "Usage: snapgraph <info|dump|verify|entries> --input PATH [--graph-entry NAME] [--compact]\n\
         \n\
         info     schema, element counts and attribute declarations\n\
         dump     print the JSON graph document\n\
         verify   load the whole archive, exit 1 if it is unreadable\n\
         entries  list container entries and their sizes\n\
         \n\
         Set SNAPGRAPH_LOG (e.g. debug) to enable logging on stderr.\n"
    }

    pub fn archive_config(&self) -> ArchiveConfig {
        let mut cfg = ArchiveConfig::default();
        if let Some(entry) = &self.graph_entry {
            cfg.graph_entry = entry.clone();
        }
        cfg
    }
}

/// Run the configured command, returning the text to print.
pub fn run(config: &CommandLineConfig) -> Result<String, GraphError> {
    let cfg = config.archive_config();
    let path = Path::new(&config.input);
    match config.command.as_str() {
        "info" => Ok(describe(&load(path, &cfg)?)),
        "verify" => {
            let store = load(path, &cfg)?;
            Ok(format!(
                "ok vertices={} transactions={} attributes={}",
                store.vertex_count(),
                store.transaction_count(),
                ElementKind::ALL
                    .iter()
                    .map(|kind| store.attribute_count(*kind))
                    .sum::<usize>()
            ))
        }
        "dump" => {
            let mut reader = ArchiveReader::open(BufReader::new(File::open(path)?))?;
            let document = archive::read_document(&mut reader, &cfg)?;
            let text = if config.compact {
                serde_json::to_string(&document)
            } else {
                serde_json::to_string_pretty(&document)
            };
            text.map_err(|e| GraphError::invalid_value(e.to_string()))
        }
        "entries" => {
            let reader = ArchiveReader::open(BufReader::new(File::open(path)?))?;
            let lines: Vec<String> = reader
                .entries()
                .iter()
                .map(|entry| format!("{}\t{}", entry.name, entry.len))
                .collect();
            Ok(lines.join("\n"))
        }
        other => Err(GraphError::invalid_input(format!("unknown command {other}"))),
    }
}

fn load(path: &Path, cfg: &ArchiveConfig) -> Result<GraphStore, GraphError> {
    archive::load_from_path(path, cfg, Arc::new(AttributeRegistry::with_builtins()))
}

fn describe(store: &GraphStore) -> String {
    let mut lines = vec![
        format!("schema={}", store.schema()),
        format!(
            "vertices={} transactions={} links={} edges={}",
            store.vertex_count(),
            store.transaction_count(),
            store.link_count(),
            store.edge_count()
        ),
    ];
    for kind in ElementKind::ALL {
        for &id in store.attributes(kind) {
            if let Ok(descriptor) = store.descriptor(id) {
                let mut line = format!(
                    "{kind}.{}: {} (default {})",
                    descriptor.name, descriptor.type_name, descriptor.default
                );
                if store.primary_key(kind).contains(&id) {
                    line.push_str(" [key]");
                }
                if matches!(store.attribute_index(id), Ok(AttributeIndexType::Unordered)) {
                    line.push_str(" [indexed]");
                }
                lines.push(line);
            }
        }
    }
    lines.join("\n")
}
