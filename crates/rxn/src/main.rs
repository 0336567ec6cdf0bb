use std::path::PathBuf;

use clap::Parser;
use rxn::{
    Graph, Trajectory,
    config::{CONFIG_FILE, Config},
};

/// Refine a reaction pathway cut out of a reactive MD trajectory
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// the MD trajectory in XYZ format
    xyz: PathBuf,

    /// the 0-based frame where the reaction starts
    #[arg(short, long)]
    start: usize,

    /// the 0-based frame where the reaction ends
    #[arg(short, long)]
    end: usize,

    /// Config file to load
    #[arg(short, long, default_value_t = String::from(CONFIG_FILE))]
    config: String,

    /// Directory to run the refinement in. Defaults to the current directory.
    #[arg(short, long, default_value_t = String::from("."))]
    dir: String,

    /// Only prepare the path for interpolation, skipping the end-point
    /// re-optimization and the growing string. Defaults to false.
    #[arg(short, long, default_value_t = false)]
    prepare: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();
    let args = Args::parse();
    let config = Config::load(&args.config)?;
    let dir = PathBuf::from(&args.dir);
    std::fs::create_dir_all(&dir)?;

    let mut graph = Graph::new();
    Trajectory {
        md: args.xyz,
        start: args.start,
        end: args.end,
        dir,
        prepare_only: args.prepare,
    }
    .build(&mut graph, &config)?;
    let res = graph.run();
    for (name, status) in graph.statuses() {
        println!("{name:<12}{status}");
    }
    res?;
    Ok(())
}
