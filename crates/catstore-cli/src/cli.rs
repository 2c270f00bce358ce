use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "catstore",
    about = "Transactional file-system content store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base content directory (overrides the config file)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Stage a file under a transaction without committing it
    Stage(StageArgs),
    /// Commit everything staged under a transaction
    Commit(TxnArgs),
    /// Discard everything staged under a transaction
    Rollback(TxnArgs),
    /// Store a new file and commit immediately
    Put(PutArgs),
    /// Replace a stored file and commit immediately
    Update(PutArgs),
    /// Delete stored content and commit immediately
    Delete(DeleteArgs),
    /// Write stored content to stdout or a file
    Get(GetArgs),
    /// Show metadata of stored content
    Info(InfoArgs),
    /// List stored content ids
    Ls,
    /// List transactions with staged writes on disk
    Pending,
    /// Roll back every transaction left on disk
    Recover,
    /// Show the resolved configuration
    Config,
}

#[derive(Args)]
pub struct PutArgs {
    /// Content id
    pub id: String,
    /// File to store
    pub file: PathBuf,
    /// Mime type (guessed from the file when omitted)
    #[arg(long)]
    pub mime: Option<String>,
    /// Stored filename (defaults to the source file name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct StageArgs {
    /// Transaction id (generated when omitted)
    #[arg(short, long)]
    pub txn: Option<String>,
    /// Stage as a replacement of existing content
    #[arg(long)]
    pub update: bool,
    #[command(flatten)]
    pub put: PutArgs,
}

#[derive(Args)]
pub struct TxnArgs {
    pub txn: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct GetArgs {
    /// Content id or `content:{id}` reference
    pub target: String,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Content id or `content:{id}` reference
    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_stage_with_flattened_args() {
        let cli = Cli::try_parse_from([
            "catstore", "stage", "--txn", "txn-1", "--update", "abc", "file.bin", "--mime", "text/plain",
        ])
        .unwrap();
        let Command::Stage(args) = cli.command else {
            panic!("expected stage");
        };
        assert_eq!(args.txn.as_deref(), Some("txn-1"));
        assert!(args.update);
        assert_eq!(args.put.id, "abc");
        assert_eq!(args.put.mime.as_deref(), Some("text/plain"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["catstore", "ls", "--base-dir", "/srv", "--format", "json"])
            .unwrap();
        assert_eq!(cli.base_dir, Some(PathBuf::from("/srv")));
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn delete_requires_ids() {
        assert!(Cli::try_parse_from(["catstore", "delete"]).is_err());
    }
}
