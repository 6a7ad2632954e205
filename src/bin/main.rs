// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use clap::Parser;
use mm1q_sim::config::Config;
use mm1q_sim::output::Summary;
use mm1q_sim::simulation::Simulation;
use mm1q_sim::theory::Mm1Theory;
use mm1q_sim::user_config::UserConfig;

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
struct Args {
    /// Simulation configuration.
    #[arg(long, short, default_value_t = String::from("conf.json"))]
    conf: String,
    /// Create a template for the simulation configuration.
    #[arg(long, short)]
    template: bool,
    /// Initial seed to initialize the pseudo-random number generators
    #[arg(long, default_value_t = 0)]
    seed_init: u64,
    /// Final seed to initialize the pseudo-random number generators
    #[arg(long, default_value_t = 10)]
    seed_end: u64,
    /// Number of parallel workers
    #[arg(long, default_value_t = std::thread::available_parallelism().map_or(1, |x| x.get()))]
    concurrency: usize,
    /// Name of the path where to save the metrics collected.
    #[arg(long, default_value_t = String::from("data/"))]
    output_path: String,
    /// Append to the output file.
    #[arg(long, default_value_t = false)]
    append: bool,
    /// Additional fields recorded in the CSV output file.
    #[arg(long, default_value_t = String::from(""))]
    additional_fields: String,
    /// Header of additional fields recorded in the CSV output file.
    #[arg(long, default_value_t = String::from(""))]
    additional_header: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    // If requested, save a template configuration file and quit.
    let conf_path = std::path::Path::new(&args.conf);
    if args.template {
        if conf_path.exists() {
            log::warn!("File {:#?} exists and will not be overwritten", conf_path);
        } else {
            std::fs::write(
                conf_path,
                serde_json::to_string_pretty(&UserConfig::default())?,
            )?;
        }
        return Ok(());
    }

    // Check command-line arguments.
    anyhow::ensure!(
        args.additional_fields.matches(',').count() == args.additional_header.matches(',').count(),
        "--additional_fields and --additional_header have a different number of commas"
    );
    anyhow::ensure!(args.concurrency > 0, "vanishing number of workers");

    // Read the user's configuration file.
    anyhow::ensure!(
        conf_path.exists(),
        "Configuration file {:#?} does not exist",
        conf_path
    );
    let conf_file = std::fs::File::open(conf_path)?;
    let reader = std::io::BufReader::new(conf_file);
    let user_config: UserConfig = serde_json::from_reader(reader)?;
    user_config.validate()?;

    // Create the configurations of all the experiments
    let configurations = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
    for seed in args.seed_init..args.seed_end {
        configurations
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned lock"))?
            .push(Config {
                seed,
                user_config: user_config.clone(),
            });
    }

    let num_experiments = args.seed_end.saturating_sub(args.seed_init) as usize;
    if num_experiments == 0 {
        log::warn!("no seeds in [{}, {})", args.seed_init, args.seed_end);
        return Ok(());
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for i in 0..std::cmp::min(args.concurrency, num_experiments) {
        let tx = tx.clone();
        let configurations = configurations.clone();
        tokio::spawn(async move {
            log::info!("spawned worker #{}", i);
            loop {
                let config = match configurations.lock() {
                    Ok(mut configurations) => configurations.pop(),
                    Err(_) => None,
                };
                let config = match config {
                    Some(config) => config,
                    None => break,
                };
                let seed = config.seed;
                match Simulation::new(config).and_then(|sim| sim.run()) {
                    Ok(output) => {
                        if tx.send(output).is_err() {
                            break;
                        }
                    }
                    Err(err) => log::error!("error when running simulation with seed {}: {}", seed, err),
                };
            }
            log::info!("terminated worker #{}", i);
        });
    }
    drop(tx);

    // wait until all the simulations have been done
    let mut outputs = vec![];
    while let Some(output) = rx.recv().await {
        outputs.push(output);
    }
    anyhow::ensure!(!outputs.is_empty(), "no simulation completed successfully");

    // report a summary across all the seeds
    let summary = Summary::new(&outputs);
    log::info!(
        "summary of {} runs out of {} experiments\n{}",
        summary.len(),
        num_experiments,
        summary
    );
    if user_config.balking.is_none() {
        match Mm1Theory::new(user_config.arrival_rate, user_config.service_rate) {
            Some(theory) => log::info!(
                "theoretical steady state: W = {:.4}, Wq = {:.4}, L = {:.4}, Lq = {:.4}, rho = {:.4}",
                theory.mean_system_time,
                theory.mean_wait_time,
                theory.mean_number_in_system,
                theory.mean_queue_length,
                theory.utilization
            ),
            None => log::warn!(
                "unstable system: arrival rate {} >= service rate {}",
                user_config.arrival_rate,
                user_config.service_rate
            ),
        }
    }

    // save output to files
    mm1q_sim::output::save_outputs(
        &outputs,
        &args.output_path,
        args.append,
        &Config::header(),
        &args.additional_header,
        &args.additional_fields,
    )
}
