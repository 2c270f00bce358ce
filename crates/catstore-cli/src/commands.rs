use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use catstore_store::mime::{self, DefaultMimeResolver, SNIFF_LEN};
use catstore_types::uri::CONTENT_SCHEME;
use catstore_store::{
    CommitOutcome, ContentId, ContentItem, ContentUri, FileSystemContentStore, Record, RecordRef,
    ResolvedContentItem, StorageProvider, StoreConfig, TransactionId,
};
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;
    let open = || FileSystemContentStore::open(&config).context("failed to open content store");
    match cli.command {
        Command::Stage(args) => cmd_stage(&open()?, args, format),
        Command::Commit(args) => cmd_commit(&open()?, &parse_txn(&args.txn)?, format),
        Command::Rollback(args) => cmd_rollback(&open()?, args, format),
        Command::Put(args) => cmd_put(&open()?, args, false, format),
        Command::Update(args) => cmd_put(&open()?, args, true, format),
        Command::Delete(args) => cmd_delete(&open()?, args, format),
        Command::Get(args) => cmd_get(&open()?, args),
        Command::Info(args) => cmd_info(&open()?, args, format),
        Command::Ls => cmd_ls(&open()?, format),
        Command::Pending => cmd_pending(&open()?, format),
        Command::Recover => cmd_recover(&open()?, format),
        Command::Config => cmd_config(&config, format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = &cli.base_dir {
        config.base_content_directory = Some(dir.clone());
    }
    Ok(config)
}

fn parse_txn(s: &str) -> anyhow::Result<TransactionId> {
    TransactionId::new(s).with_context(|| format!("invalid transaction id {s:?}"))
}

/// Accept either a bare id or a `content:{id}` reference.
fn parse_target(s: &str) -> anyhow::Result<ContentId> {
    match s.strip_prefix(CONTENT_SCHEME).and_then(|rest| rest.strip_prefix(':')) {
        Some(_) => Ok(ContentUri::parse(s)?.id().clone()),
        None => Ok(ContentId::new(s)?),
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build a content item from a file on disk.
fn load_item(args: &PutArgs) -> anyhow::Result<ContentItem> {
    let id = ContentId::new(args.id.as_str())?;
    let path = args.file.as_path();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let size = file.metadata()?.len();
    let mime_type = match &args.mime {
        Some(mime) => mime.clone(),
        None => guess_mime(path)?,
    };
    let filename = match &args.name {
        Some(name) => Some(name.clone()),
        None => path.file_name().and_then(|n| n.to_str()).map(str::to_string),
    };
    debug!(id = %id, size, mime = %mime_type, "loaded source file");

    let mut item = ContentItem::new(id.clone(), file, size, mime_type)
        .with_record(Arc::new(RecordRef::new(id.as_str())));
    item.filename = filename;
    Ok(item)
}

fn guess_mime(path: &Path) -> anyhow::Result<String> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(mime::resolve(&DefaultMimeResolver, path, &head))
}

fn staged_json(txn: &TransactionId, items: &[ResolvedContentItem]) -> serde_json::Value {
    json!({
        "transaction": txn,
        "staged": items.iter().map(|item| json!({
            "id": item.id,
            "uri": item.uri.to_string(),
            "path": item.path,
            "size": item.size,
            "mime_type": item.mime_type,
            "filename": item.filename,
        })).collect::<Vec<_>>(),
    })
}

fn cmd_stage(store: &FileSystemContentStore, args: StageArgs, format: OutputFormat) -> anyhow::Result<()> {
    let txn = match &args.txn {
        Some(t) => parse_txn(t)?,
        None => TransactionId::generate(),
    };
    let item = load_item(&args.put)?;
    let staged = if args.update {
        store.update(&txn, vec![item])?
    } else {
        store.create(&txn, vec![item])?
    };

    match format {
        OutputFormat::Json => print_json(&staged_json(&txn, &staged)),
        OutputFormat::Text => {
            for item in &staged {
                println!("  {} {} ({} bytes)", "staged:".green(), item.uri.to_string().cyan(), item.size);
            }
            println!("Transaction: {}", txn.to_string().yellow());
            println!("Run `catstore commit {txn}` to apply or `catstore rollback {txn}` to discard.");
            Ok(())
        }
    }
}

fn cmd_commit(store: &FileSystemContentStore, txn: &TransactionId, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = store
        .commit(txn)
        .with_context(|| format!("commit of transaction {txn} failed"))?;

    if format == OutputFormat::Json {
        return print_json(&json!({ "transaction": txn, "outcome": outcome }));
    }
    match &outcome {
        CommitOutcome::Written(ids) => {
            println!("{} Committed {} item(s) in {}", "✓".green().bold(), ids.len(), txn.to_string().yellow());
            for id in ids {
                println!("  {} {}", "written:".green(), id);
            }
        }
        CommitOutcome::Deleted(ids) => {
            println!("{} Committed {} deletion(s) in {}", "✓".green().bold(), ids.len(), txn.to_string().yellow());
            for id in ids {
                println!("  {} {}", "deleted:".red(), id);
            }
        }
        CommitOutcome::NoOp => println!("Nothing staged in {}.", txn.to_string().yellow()),
    }
    Ok(())
}

fn cmd_rollback(store: &FileSystemContentStore, args: TxnArgs, format: OutputFormat) -> anyhow::Result<()> {
    let txn = parse_txn(&args.txn)?;
    store.rollback(&txn)?;
    match format {
        OutputFormat::Json => print_json(&json!({ "transaction": txn, "rolled_back": true })),
        OutputFormat::Text => {
            println!("{} Rolled back {}", "✓".green(), txn.to_string().yellow());
            Ok(())
        }
    }
}

fn cmd_put(store: &FileSystemContentStore, args: PutArgs, update: bool, format: OutputFormat) -> anyhow::Result<()> {
    let txn = TransactionId::generate();
    let item = load_item(&args)?;
    let staged = if update {
        store.update(&txn, vec![item])
    } else {
        store.create(&txn, vec![item])
    };
    if let Err(e) = staged {
        store.rollback(&txn)?;
        return Err(e).context("staging failed");
    }
    cmd_commit(store, &txn, format)
}

fn cmd_delete(store: &FileSystemContentStore, args: DeleteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let txn = TransactionId::generate();
    let records = args
        .ids
        .iter()
        .map(|id| parse_target(id).map(|id| Arc::new(RecordRef::new(id.as_str())) as Arc<dyn Record>))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let staged = store.delete(&txn, &records)?;
    if staged.len() < records.len() && format == OutputFormat::Text {
        println!("{} {} id(s) have no stored content", "!".yellow(), records.len() - staged.len());
    }
    cmd_commit(store, &txn, format)
}

fn cmd_get(store: &FileSystemContentStore, args: GetArgs) -> anyhow::Result<()> {
    let id = parse_target(&args.target)?;
    let mut stream = store.read(&id).with_context(|| format!("failed to read {id}"))?;
    match &args.output {
        Some(path) => {
            let mut out = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let n = io::copy(&mut stream, &mut out)?;
            eprintln!("{} Wrote {} bytes to {}", "✓".green(), n, path.display());
        }
        None => {
            io::copy(&mut stream, &mut io::stdout().lock())?;
        }
    }
    Ok(())
}

fn cmd_info(store: &FileSystemContentStore, args: InfoArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = parse_target(&args.target)?;
    let stream = store.read(&id).with_context(|| format!("failed to read {id}"))?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "id": stream.id,
            "uri": stream.uri.to_string(),
            "path": stream.path,
            "filename": stream.filename,
            "size": stream.size,
            "mime_type": stream.mime_type,
        })),
        OutputFormat::Text => {
            println!("{}", stream.uri.to_string().cyan().bold());
            println!("  File: {}", stream.filename);
            println!("  Size: {} bytes", stream.size);
            println!("  Type: {}", stream.mime_type);
            println!("  Path: {}", stream.path.display().to_string().dimmed());
            Ok(())
        }
    }
}

fn cmd_ls(store: &FileSystemContentStore, format: OutputFormat) -> anyhow::Result<()> {
    let ids = store.list_ids()?;
    match format {
        OutputFormat::Json => print_json(&json!(ids)),
        OutputFormat::Text => {
            if ids.is_empty() {
                println!("No stored content.");
            }
            for id in &ids {
                println!("{id}");
            }
            Ok(())
        }
    }
}

fn cmd_pending(store: &FileSystemContentStore, format: OutputFormat) -> anyhow::Result<()> {
    let pending = store.pending_transactions()?;
    match format {
        OutputFormat::Json => print_json(&json!(pending)),
        OutputFormat::Text => {
            if pending.is_empty() {
                println!("No pending transactions.");
            }
            for txn in &pending {
                let ids = store.staged_writes(txn)?;
                println!("{}  {} staged item(s)", txn.to_string().yellow(), ids.len());
            }
            Ok(())
        }
    }
}

fn cmd_recover(store: &FileSystemContentStore, format: OutputFormat) -> anyhow::Result<()> {
    let purged = store.recover_staging()?;
    match format {
        OutputFormat::Json => print_json(&json!({ "purged": purged })),
        OutputFormat::Text => {
            println!("{} Purged {} abandoned transaction(s)", "✓".green().bold(), purged.len());
            for txn in &purged {
                println!("  {}", txn.to_string().dimmed());
            }
            Ok(())
        }
    }
}

fn cmd_config(config: &StoreConfig, format: OutputFormat) -> anyhow::Result<()> {
    let resolved = config.resolve_base_directory();
    match format {
        OutputFormat::Json => print_json(&json!({
            "base_content_directory": config.base_content_directory,
            "resolved": resolved,
        })),
        OutputFormat::Text => {
            let configured = config
                .base_content_directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(unset)".into());
            println!("base_content_directory = {}", configured.bold());
            println!("resolved               = {}", resolved.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    fn run(base: &Path, args: &[&str]) -> anyhow::Result<()> {
        let base = base.to_str().unwrap();
        let argv = ["catstore", "--base-dir", base]
            .into_iter()
            .chain(args.iter().copied());
        run_command(Cli::try_parse_from(argv).unwrap())
    }

    fn open(base: &Path) -> FileSystemContentStore {
        FileSystemContentStore::open_at(base).unwrap()
    }

    #[test]
    fn put_then_get_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("note.txt");
        fs::write(&src, b"hello").unwrap();
        let out = dir.path().join("out.txt");

        run(dir.path(), &["put", "abc123", src.to_str().unwrap()]).unwrap();
        run(dir.path(), &["get", "content:abc123", "-o", out.to_str().unwrap()]).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"hello");

        let stream = open(dir.path()).read(&ContentId::new("abc123").unwrap()).unwrap();
        assert_eq!(stream.filename, "note.txt");
        assert_eq!(stream.mime_type, "text/plain");
    }

    #[test]
    fn stage_is_invisible_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("blob.bin");
        fs::write(&src, b"x").unwrap();

        run(dir.path(), &["stage", "--txn", "txn-1", "abc123", src.to_str().unwrap()]).unwrap();
        let id = ContentId::new("abc123").unwrap();
        assert!(!open(dir.path()).contains(&id));

        run(dir.path(), &["commit", "txn-1"]).unwrap();
        assert!(open(dir.path()).contains(&id));
    }

    #[test]
    fn delete_removes_content() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, b"a").unwrap();
        run(dir.path(), &["put", "abc123", src.to_str().unwrap()]).unwrap();

        run(dir.path(), &["delete", "abc123", "missing1"]).unwrap();
        assert!(open(dir.path()).list_ids().unwrap().is_empty());
    }

    #[test]
    fn recover_purges_abandoned_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, b"a").unwrap();
        run(dir.path(), &["stage", "--txn", "txn-1", "abc123", src.to_str().unwrap()]).unwrap();

        run(dir.path(), &["--format", "json", "recover"]).unwrap();
        assert!(open(dir.path()).pending_transactions().unwrap().is_empty());
    }

    #[test]
    fn info_of_missing_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), &["info", "nothing"]).unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn bare_ids_may_contain_colons() {
        assert_eq!(parse_target("2024:report").unwrap().as_str(), "2024:report");
        assert_eq!(parse_target("content:abc123").unwrap().as_str(), "abc123");
        assert!(parse_target("content:").is_err());
    }

    #[test]
    fn colon_id_round_trips_through_put_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, b"a").unwrap();
        run(dir.path(), &["put", "2024:report", src.to_str().unwrap()]).unwrap();
        run(dir.path(), &["info", "2024:report"]).unwrap();
        run(dir.path(), &["info", "content:2024:report"]).unwrap();
    }

    #[test]
    fn invalid_transaction_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(dir.path(), &["commit", "../x"]).is_err());
    }

    #[test]
    fn config_flag_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catstore.toml");
        fs::write(&path, "base_content_directory = \"/srv/content\"\n").unwrap();
        let cli = Cli::try_parse_from(["catstore", "--config", path.to_str().unwrap(), "ls"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.base_content_directory.as_deref(), Some(Path::new("/srv/content")));
    }
}
