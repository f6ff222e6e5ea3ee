//! Compare a slow function called directly and through the cache.
//!
//! ```bash
//! cargo run --example memo -- --iterations 200 --distinct 5 --delay-ms 2
//! ```

use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use memo_rs::cache::{Cache, CacheConfig};
use memo_rs::callable::Callable;
use memo_rs::fingerprint::{Cacheable, FieldHasher};
use memo_rs::value::{Coerce, Value};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Number of calls.
    #[arg(long, default_value = "100")]
    iterations: usize,

    /// Number of distinct arguments cycled through.
    #[arg(long, default_value = "3")]
    distinct: usize,

    /// Simulated cost of one call.
    #[arg(long, default_value = "1")]
    delay_ms: u64,

    /// Cache capacity.
    #[arg(long, default_value = "16")]
    capacity: usize,

    /// Hits per slot before it expires.
    #[arg(long, default_value = "1000")]
    ttl: u32,

    /// Enable result prediction.
    #[arg(long)]
    predictive: bool,

    /// Log level.
    #[arg(long, default_value = "info")]
    log_level: simplelog::LevelFilter,
}

#[derive(Debug, Clone, PartialEq)]
struct Record {
    example: String,
}

impl Cacheable for Record {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        hasher.field(&self.example);
    }
}

impl Coerce for Record {}

fn slow_lookup(index: i32, delay: Duration) -> Record {
    thread::sleep(delay);
    Record {
        example: format!("record #{}", index),
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let delay = Duration::from_millis(args.delay_ms);
    let distinct = args.distinct.max(1) as i32;

    let start = Instant::now();
    for i in 0..args.iterations {
        let record = slow_lookup(i as i32 % distinct, delay);
        log::debug!("direct: {:?}", record);
    }
    let direct = start.elapsed();

    let mut cache = Cache::<Record>::with_config(CacheConfig {
        capacity: args.capacity,
        default_ttl: args.ttl,
        predictive_mode: args.predictive,
        ..Default::default()
    });
    let lookup = Callable::new("slow_lookup");

    let start = Instant::now();
    for i in 0..args.iterations {
        let index = i as i32 % distinct;
        let record = cache.invoke(&lookup, &[Value::Int(index)], |_| slow_lookup(index, delay))?;
        log::debug!("cached: {:?}", record);
    }
    let cached = start.elapsed();

    // Identity dedup: structurally equal records share one slot.
    let first = cache.acquire_ref(Record {
        example: "shared".to_string(),
    })?;
    let second = cache.acquire_ref(Record {
        example: "shared".to_string(),
    })?;
    log::info!("acquire: {} and {} are the same slot: {}", first, second, first == second);

    println!("direct: {:?}", direct);
    println!("cached: {:?}", cached);
    println!("stats:  {:?}", cache.stats());

    Ok(())
}
