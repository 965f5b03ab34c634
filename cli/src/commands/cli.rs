use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "statekeep", version, about = "Inspect and exercise memento repositories")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.statekeep/config.toml or ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the file repository directory.
    #[arg(long, global = true)]
    pub dir: Option<String>,

    /// Use a throwaway in-memory repository.
    #[arg(long, global = true, conflicts_with = "dir")]
    pub memory: bool,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Repository statistics.
    Stats,
    /// List stored mementos, oldest first.
    List,
    /// Show the most recent memento.
    Latest,
    /// Show one memento.
    Show(IdArgs),
    /// Delete one memento.
    Delete(IdArgs),
    /// Delete every memento.
    Clear(ClearArgs),
    /// Drive scripted lifecycle cycles against demo observers.
    Simulate(SimulateArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct IdArgs {
    #[arg(long)]
    pub id: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ClearArgs {
    /// Required; clearing cannot be undone.
    #[arg(long)]
    pub yes: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of resumed -> inactive -> paused -> resumed rounds.
    #[arg(long, default_value_t = 1)]
    pub cycles: u32,

    /// Finish with a detached report (terminating save).
    #[arg(long)]
    pub terminate: bool,
}
