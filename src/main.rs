use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use freshcache::cache::FixedClock;
use freshcache::{Config, FetchAction, QueryParams, RecordId, Selector, Store};

#[derive(Parser, Debug)]
#[command(name = "freshcache")]
#[command(about = "Inspect cache freshness verdicts for a store snapshot")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/freshcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Store snapshot as JSON
  #[arg(short, long)]
  store: PathBuf,

  /// Evaluate as of this Unix time in milliseconds instead of now
  #[arg(long)]
  now: Option<i64>,

  /// Pretty-print the output
  #[arg(long)]
  pretty: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Select one record
  Record { entity_type: String, id: String },
  /// Select one record, printing {} unless it is ready
  RecordOrEmpty { entity_type: String, id: String },
  /// Select a collection page
  Collection {
    entity_type: String,
    /// Query parameter as key=value; values are parsed as JSON when possible
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, Value)>,
  },
  /// Select for a fetch action read from a JSON file ("-" for stdin)
  Select { action: PathBuf },
}

fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let _guard = init_tracing(&config);

  let now = match args.now {
    Some(ms) => DateTime::from_timestamp_millis(ms).ok_or_else(|| eyre!("Invalid --now: {}", ms))?,
    None => Utc::now(),
  };
  let store = load_store(&args.store)?;
  info!(
    entity_types = store.entity_types().count(),
    %now,
    "loaded store snapshot"
  );

  let selector = Selector::from_config(&config).with_clock(FixedClock(now));
  debug!(stale_after = %selector.stale_after(), "selector ready");

  let output = match &args.command {
    Command::Record { entity_type, id } => {
      to_json(&selector.select_record(&store, entity_type, &RecordId::new(id.as_str())))?
    }
    Command::RecordOrEmpty { entity_type, id } => {
      match selector.select_record_or_empty(&store, entity_type, &RecordId::new(id.as_str())) {
        Some(record) => to_json(record)?,
        None => Value::Object(Default::default()),
      }
    }
    Command::Collection {
      entity_type,
      params,
    } => {
      let params: QueryParams = params.iter().cloned().collect();
      to_json(&selector.select_collection(&store, entity_type, &params))?
    }
    Command::Select { action } => {
      let action = load_action(action)?;
      let selection = selector
        .select(&store, &action)
        .map_err(|e| eyre!("Cannot select for action: {}", e))?;
      to_json(&selection)?
    }
  };

  let rendered = if args.pretty {
    serde_json::to_string_pretty(&output)?
  } else {
    serde_json::to_string(&output)?
  };
  println!("{}", rendered);

  Ok(())
}

/// Log to stderr so stdout carries only the JSON result.
fn init_tracing(config: &Config) -> WorkerGuard {
  let filter = EnvFilter::try_from_env("FRESHCACHE_LOG")
    .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_deref().unwrap_or("warn")));
  let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_target(false)
    .init();

  guard
}

fn load_store(path: &Path) -> Result<Store> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read store snapshot {}: {}", path.display(), e))?;

  serde_json::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse store snapshot {}: {}", path.display(), e))
}

fn load_action(path: &Path) -> Result<FetchAction> {
  let contents = if path.as_os_str() == "-" {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .map_err(|e| eyre!("Failed to read fetch action from stdin: {}", e))?;
    buf
  } else {
    std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read fetch action {}: {}", path.display(), e))?
  };

  serde_json::from_str(&contents).map_err(|e| eyre!("Failed to parse fetch action: {}", e))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
  serde_json::to_value(value).map_err(|e| eyre!("Failed to serialize view: {}", e))
}

/// Parse `key=value`, reading the value as JSON and falling back to a string.
fn parse_param(raw: &str) -> Result<(String, Value), String> {
  let (key, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
  if key.is_empty() {
    return Err(format!("empty parameter name in '{}'", raw));
  }
  let value =
    serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
  Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_param_json_value() {
    assert_eq!(parse_param("page=1").unwrap(), ("page".to_string(), json!(1)));
    assert_eq!(
      parse_param("tags=[\"a\"]").unwrap(),
      ("tags".to_string(), json!(["a"]))
    );
  }

  #[test]
  fn test_parse_param_string_fallback() {
    assert_eq!(
      parse_param("sort=name").unwrap(),
      ("sort".to_string(), json!("name"))
    );
    assert_eq!(parse_param("q=").unwrap(), ("q".to_string(), json!("")));
  }

  #[test]
  fn test_parse_param_rejects_malformed() {
    assert!(parse_param("page").is_err());
    assert!(parse_param("=1").is_err());
  }

  #[test]
  fn test_args_parse_collection() {
    let args = Args::parse_from([
      "freshcache",
      "--store",
      "snapshot.json",
      "--now",
      "1700000000000",
      "collection",
      "widgets",
      "-p",
      "page=1",
    ]);
    assert_eq!(args.now, Some(1_700_000_000_000));
    match args.command {
      Command::Collection {
        entity_type,
        params,
      } => {
        assert_eq!(entity_type, "widgets");
        assert_eq!(params, vec![("page".to_string(), json!(1))]);
      }
      other => panic!("unexpected command {:?}", other),
    }
  }
}
