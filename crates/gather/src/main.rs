use std::path::PathBuf;

use clap::Parser;
use gather::{
    GapPolicy,
    config::{CONFIG_FILE, Config},
};

/// Collect the energies, temperatures, and geometries of a TeraChem MD run,
/// including restarted segments, into one set of files
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// the run directory to search for output files and trajectories
    #[arg(value_parser, default_value_t = String::from("."))]
    dir: String,

    /// Config file to load. Defaults to gather.toml in the run directory,
    /// which is skipped if it does not exist.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// What to do with frames missing some of their data. Overrides the
    /// config file.
    #[arg(short, long, value_enum)]
    gaps: Option<GapPolicy>,

    /// Keep every frame of each output/trajectory pair instead of only the
    /// frames present in both. Defaults to false.
    #[arg(short, long, default_value_t = false)]
    no_truncate: bool,

    /// Print the configuration being used and exit. Defaults to false.
    #[arg(short, long, default_value_t = false)]
    show_config: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();
    let args = Args::parse();
    let dir = PathBuf::from(&args.dir);
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(dir.join(CONFIG_FILE))?,
    };
    if let Some(gaps) = args.gaps {
        config = config.gaps(gaps);
    }
    if args.no_truncate {
        config = config.truncate(false);
    }
    if args.show_config {
        print!("{config}");
        return Ok(());
    }

    let report = gather::gather(&dir, &config)?;
    println!(
        "gathered {} frames from {} pairs with {} warnings",
        report.frames,
        report.pairs.len(),
        report.warnings.len()
    );
    Ok(())
}
