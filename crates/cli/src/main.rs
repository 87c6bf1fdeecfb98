//! Offload CLI - call native entry points and watch work come back.

use anyhow::Result;
use clap::{Parser, Subcommand};
use offload_addon::{
    add_multiple_numbers, add_two_numbers, get_hello, sleep_callback, sleep_callback_async,
    AddonError, Value,
};
use offload_work::{Backend, ExecutionContext, ExecutorConfig};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "offload")]
#[command(about = "Run blocking work off the main thread and call back on it", long_about = None)]
struct Cli {
    /// Worker threads
    #[arg(long, global = true)]
    workers: Option<usize>,
    /// Executor backend (thread-pool, tokio)
    #[arg(long, global = true)]
    backend: Option<Backend>,
    /// JSON executor config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print retired work summaries as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the greeting
    Hello,
    /// Add two numbers
    Add {
        #[arg(allow_negative_numbers = true)]
        a: String,
        #[arg(allow_negative_numbers = true)]
        b: String,
    },
    /// Add any number of numbers
    Sum {
        #[arg(allow_negative_numbers = true)]
        values: Vec<String>,
    },
    /// Sleep, then call back
    Sleep {
        /// Milliseconds
        #[arg(allow_negative_numbers = true)]
        ms: String,
        /// Sleep on a worker and return immediately
        #[arg(long = "async")]
        non_blocking: bool,
    },
    /// Argument passing, then blocking and non-blocking sleep
    Demo {
        /// Sleep length in milliseconds
        #[arg(long, default_value = "2000")]
        ms: u32,
    },
    /// Submit many sleeps at once and report them as they finish
    Burst {
        /// Number of sleeps
        #[arg(long, default_value = "8")]
        count: u32,
        /// Shortest sleep in milliseconds; the others are multiples of it
        #[arg(long, default_value = "25")]
        base_ms: u32,
    },
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let base = match &cli.config {
        Some(path) => ExecutorConfig::load(path)?,
        None => ExecutorConfig::default(),
    };
    let config = apply_flags(base.with_env()?, &cli);
    let context = ExecutionContext::new(config.build()?);
    info!(backend = %config.backend, workers = config.workers, "executor ready");

    match cli.command {
        Commands::Hello => {
            println!("{}", get_hello(&[]).map_err(raise)?);
        }
        Commands::Add { a, b } => {
            let args = [Value::parse_literal(&a), Value::parse_literal(&b)];
            let sum = add_two_numbers(&args).map_err(raise)?;
            println!("{} + {} = {sum}", args[0], args[1]);
        }
        Commands::Sum { values } => {
            let args: Vec<Value> = values.iter().map(|v| Value::parse_literal(v)).collect();
            let sum = add_multiple_numbers(&args).map_err(raise)?;
            let terms: Vec<String> = args.iter().map(ToString::to_string).collect();
            println!("{} = {sum}", terms.join(" + "));
        }
        Commands::Sleep { ms, non_blocking } => {
            let start = Instant::now();
            let callback = Value::function("callback", move |args| match args.first() {
                None => println!("Done sleeping after {:?}.", start.elapsed()),
                Some(err) => println!("Sleep failed: {err}"),
            });
            let args = [Value::parse_literal(&ms), callback];

            if non_blocking {
                let handle = sleep_callback_async(&context.dispatcher(), &args).map_err(raise)?;
                println!("Returned after {:?}; waiting for {}.", start.elapsed(), handle.id());
                context.run()?;
            } else {
                sleep_callback(&args).map_err(raise)?;
                println!("Returned after {:?}.", start.elapsed());
            }
        }
        Commands::Demo { ms } => demo(&context, ms)?,
        Commands::Burst { count, base_ms } => burst(&context, count, base_ms)?,
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&context.take_history())?);
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Flags win over the environment and the config file.
fn apply_flags(mut config: ExecutorConfig, cli: &Cli) -> ExecutorConfig {
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    config
}

/// Report an addon error as the host exception it stands for.
fn raise(err: AddonError) -> anyhow::Error {
    anyhow::anyhow!("{:?}: {err}", err.exception_kind())
}

fn demo(context: &ExecutionContext, ms: u32) -> Result<()> {
    let sum = add_two_numbers(&[Value::from(10.0), Value::from(20.0)]).map_err(raise)?;
    println!("10 + 20 = {sum}");
    let args: Vec<Value> = [20.0, 30.0, 100.0, 500.0].into_iter().map(Value::from).collect();
    let sum = add_multiple_numbers(&args).map_err(raise)?;
    println!("20 + 30 + 100 + 500 = {sum}");
    println!();

    println!("Calling blocking sleep.");
    sleep_callback(&[
        Value::from(ms),
        Value::function("callback", |_| println!("Done with blocking sleep.")),
    ])
    .map_err(raise)?;
    println!("We are now past the sleepCallback call.\n\n");

    println!("Calling non-blocking sleep.");
    sleep_callback_async(
        &context.dispatcher(),
        &[
            Value::from(ms),
            Value::function("callback", |_| println!("Done with non-blocking sleep.")),
        ],
    )
    .map_err(raise)?;
    println!("We are now past the sleepCallbackAsync call.");

    context.run()?;
    Ok(())
}

fn burst(context: &ExecutionContext, count: u32, base_ms: u32) -> Result<()> {
    let dispatcher = context.dispatcher();
    let arrivals = Rc::new(RefCell::new(Vec::new()));
    let start = Instant::now();

    // Longest first, so arrival order is the reverse of submission order.
    for index in 0..count {
        let ms = base_ms.saturating_mul(count - index);
        let arrivals = arrivals.clone();
        let callback = Value::function(format!("sleep-{index}"), move |args| {
            let outcome = args.first().map(ToString::to_string);
            arrivals.borrow_mut().push((index, ms, start.elapsed(), outcome));
        });
        sleep_callback_async(&dispatcher, &[Value::from(ms), callback]).map_err(raise)?;
    }
    info!(count, pending = context.pending(), "burst submitted");

    let delivered = context.run()?;
    for (index, ms, elapsed, outcome) in arrivals.borrow().iter() {
        match outcome {
            None => println!("#{index:<3} {ms:>6}ms  done at {elapsed:?}"),
            Some(err) => println!("#{index:<3} {ms:>6}ms  failed at {elapsed:?}: {err}"),
        }
    }
    println!(
        "{delivered} completions in {:?} on {} worker(s)",
        start.elapsed(),
        context.executor().workers()
    );
    Ok(())
}
