use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use storefront_dashboard_lib::sample_data::{
    generate_sample_orders, write_orders_csv, SampleDataConfig, DEFAULT_SAMPLE_FILE_NAME,
    DEFAULT_SAMPLE_ROWS,
};

/// Writes a synthetic order file the dashboard can load.
#[derive(Debug, Parser)]
#[command(name = "generate_orders", version)]
struct Args {
    #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS)]
    rows: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value = DEFAULT_SAMPLE_FILE_NAME)]
    output: PathBuf,
}

fn run(args: &Args) -> Result<usize, String> {
    let mut config = SampleDataConfig::new(chrono::Local::now().date_naive());
    config.rows = args.rows;
    config.seed = args.seed;

    let orders = generate_sample_orders(&config);
    let file = File::create(&args.output)
        .map_err(|e| format!("failed to create {}: {e}", args.output.display()))?;
    write_orders_csv(BufWriter::new(file), &orders)
        .map_err(|e| format!("failed to write {}: {e}", args.output.display()))?;
    Ok(orders.len())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(rows) => {
            log::info!("wrote {rows} orders to {}", args.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
