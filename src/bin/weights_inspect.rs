use std::path::PathBuf;

use ai_2048_td::features::Topology;
use ai_2048_td::weights::WeightStore;
use anyhow::Context;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "weights-inspect", about = "Summarize an n-tuple weight file")]
struct Args {
    path: PathBuf,
    /// Topology the file was written with, <cells>x<hints> or "default"
    #[arg(long, default_value = "default")]
    init: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let topology: Topology = args.init.parse().context("parsing --init")?;
    let store = WeightStore::load(&args.path, topology)
        .with_context(|| format!("loading {}", args.path.display()))?;

    println!("file:      {}", args.path.display());
    println!("topology:  {} ({} entries per table)", topology, topology.table_len());
    println!("tables:    {}", store.tables().len());
    for (group, table) in store.tables().iter().enumerate() {
        let mut non_zero = 0usize;
        let (mut min, mut max, mut sum) = (f32::INFINITY, f32::NEG_INFINITY, 0.0f64);
        for &w in table.iter() {
            if w != 0.0 {
                non_zero += 1;
            }
            min = min.min(w);
            max = max.max(w);
            sum += w as f64;
        }
        println!(
            "group {group}: non-zero {non_zero} ({:.3}%) | min {min:.4} | max {max:.4} | mean {:.6}",
            100.0 * non_zero as f64 / table.len() as f64,
            sum / table.len() as f64,
        );
    }
    Ok(())
}
