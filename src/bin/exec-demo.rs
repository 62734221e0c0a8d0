use std::path::PathBuf;
use std::process::exit;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bounded_exec::{
    AnyExecutor, Executor, ExecutorConfig, ExecutorError, Job, LifecycleExecutor, Result, Value,
};

const DEFAULT_SEED: u64 = 42;

#[derive(Parser)]
#[command(name = "exec-demo", version, about = "Runs bounded executor scenarios")]
struct Cli {
    /// Number of workers; 0 disables execution entirely
    #[arg(long, global = true, value_name = "N")]
    workers: Option<usize>,

    /// Maximum number of outstanding jobs
    #[arg(long, global = true, value_name = "N")]
    capacity: Option<usize>,

    /// JSON executor configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for the simulated workloads
    #[arg(long, global = true, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue one job and print from both sides
    Basic,
    /// Submit jobs with try_enqueue, backing off while the executor is full
    NonBlocking {
        /// Number of jobs to submit
        #[arg(long, default_value_t = 8)]
        jobs: usize,
    },
    /// Get a value back from a job through a channel
    Result,
    /// Enqueue from many threads and collect every result
    Concurrent {
        /// Number of submitting threads
        #[arg(long, default_value_t = 16)]
        jobs: usize,
    },
    /// Wait for two jobs to complete
    Wait,
    /// Queue jobs while stopped, then start the executor
    Lifecycle,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ExecutorConfig::from_json_file(path)?,
        None => ExecutorConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(capacity) = cli.capacity {
        config = config.queue_capacity(capacity);
    }
    let mut rng = StdRng::seed_from_u64(cli.seed);

    info!("exec-demo {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Workers: {}, capacity: {}",
        config.workers,
        config.effective_capacity()
    );

    match cli.command {
        Commands::Basic => basic(&config),
        Commands::NonBlocking { jobs } => non_blocking(&config, jobs, &mut rng),
        Commands::Result => result(&config, &mut rng),
        Commands::Concurrent { jobs } => concurrent(&config, jobs, &mut rng),
        Commands::Wait => wait(&config),
        Commands::Lifecycle => lifecycle(&config),
    }
}

fn basic(config: &ExecutorConfig) -> Result<()> {
    let exec = AnyExecutor::from_config(config)?;

    // Blocks only if the executor is busy.
    exec.enqueue(|| println!("World"));
    println!("Hello");

    exec.wait();
    Ok(())
}

fn non_blocking(config: &ExecutorConfig, jobs: usize, rng: &mut StdRng) -> Result<()> {
    let exec = AnyExecutor::from_config(config)?;

    let mut submitted = 0;
    while submitted < jobs {
        let work = Duration::from_millis(rng.gen_range(0..30));
        match exec.try_enqueue(move || {
            thread::sleep(work);
            println!("Some task has finished");
        }) {
            Ok(()) => submitted += 1,
            Err(ExecutorError::QueueFull) => {
                println!("Executor is full, can't enqueue more jobs at the moment ...");
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => return Err(e),
        }
    }

    exec.wait();
    Ok(())
}

fn result(config: &ExecutorConfig, rng: &mut StdRng) -> Result<()> {
    let exec = AnyExecutor::from_config(config)?;
    let value: u32 = rng.gen_range(0..10);

    let (tx, rx) = mpsc::channel();
    let job = Job::with_values(
        move |value: u32, label: &'static str| {
            println!("Some work is done here ...");
            let _ = tx.send(format!("{label} = {value}"));
        },
        vec![Value::new(value), Value::new("result")],
    )?;
    exec.enqueue_job(job);
    exec.wait();

    match rx.try_recv() {
        Ok(line) => println!("{line}"),
        Err(_) => println!("no result, execution is disabled"),
    }
    Ok(())
}

fn concurrent(config: &ExecutorConfig, jobs: usize, rng: &mut StdRng) -> Result<()> {
    let exec = AnyExecutor::from_config(config)?;
    let amounts: Vec<u32> = (0..jobs).map(|_| rng.gen_range(0..10)).collect();

    let (tx, rx) = mpsc::channel();
    thread::scope(|s| {
        for amount in amounts {
            let tx = tx.clone();
            let exec = &exec;
            // Different threads share one executor.
            s.spawn(move || {
                exec.enqueue(move || {
                    println!("Finished processing {amount}");
                    let _ = tx.send(amount);
                });
            });
        }
    });
    drop(tx);
    exec.wait();

    for amount in rx.try_iter() {
        println!("result = {amount}");
    }
    Ok(())
}

fn wait(config: &ExecutorConfig) -> Result<()> {
    let exec = AnyExecutor::from_config(config)?;

    for id in 0..2 {
        exec.enqueue(move || {
            thread::sleep(Duration::from_millis(1));
            println!("Job {id} done");
        });
    }
    exec.wait();
    println!("All jobs done");
    Ok(())
}

fn lifecycle(config: &ExecutorConfig) -> Result<()> {
    let exec = LifecycleExecutor::from_config(config)?;

    let (tx, rx) = mpsc::channel();
    for id in 0..exec.capacity() {
        let tx = tx.clone();
        exec.try_enqueue(move || {
            let _ = tx.send(id);
        })?;
    }
    drop(tx);
    println!("Queued {} jobs while stopped", exec.queued());

    exec.start()?;
    exec.wait();
    exec.stop()?;

    println!("Executed {} jobs after start", rx.try_iter().count());
    Ok(())
}
