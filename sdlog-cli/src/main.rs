mod hexdump;
mod units;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sdlog_lib::constants::{DEFAULT_FIRST_DATA_SECTOR, DEFAULT_SPI_HZ, DEFAULT_VALUES_PER_SAMPLE};
use sdlog_lib::download::DownloadConfig;
use sdlog_lib::frame::OpcodeMap;
use sdlog_lib::ready::{FixedDelay, GpioReady, ReadySignal};
use sdlog_lib::sink::{CsvSink, JsonlSink};
use sdlog_lib::transport::SpiTransport;
use sdlog_lib::{DataLogger, ProtocolConfig, download};
use tracing::warn;

/// Download and test tool for the SPI-attached sample logger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    link: LinkArgs,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    #[command(subcommand)]
    command: CliCommand,
}

/// Bus and readiness-line settings shared by every subcommand.
#[derive(Args, Debug)]
struct LinkArgs {
    /// SPI device node
    #[arg(long, default_value = "/dev/spidev0.1")]
    device: PathBuf,

    /// SPI clock in Hz
    #[arg(short = 'f', long, default_value_t = DEFAULT_SPI_HZ)]
    frequency: u32,

    /// SPI mode
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    mode: u8,

    /// GPIO character device carrying the data-ready line
    #[arg(long, default_value = "/dev/gpiochip0")]
    gpiochip: PathBuf,

    /// Line offset of the data-ready input
    #[arg(long, default_value_t = 5)]
    ready_line: u32,

    /// Microseconds between data-ready polls
    #[arg(long, default_value_t = 1000)]
    poll_interval_us: u64,

    /// Assume readiness after this many milliseconds instead of polling the line
    #[arg(long)]
    fixed_delay_ms: Option<u64>,

    /// Use the swapped read/write opcode assignment
    #[arg(long)]
    swap_opcodes: bool,

    /// Give up on a sector after this many checksum failures
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Download samples and append them to a log file
    Download(DownloadArgs),
    /// Fetch a single sector and hex-dump it
    ReadSector {
        /// Zero-based sector index
        sector: u32,
    },
    /// Tell the firmware to leave transfer mode
    Quit,
    /// Echo test over the link
    Loopback {
        /// Number of bytes to echo
        #[arg(default_value_t = 10_000)]
        iterations: u32,
    },
    /// Watch the data-ready line and report level changes
    MonitorReady,
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Number of samples to download
    #[arg(short = 'n', long, default_value_t = 3600)]
    samples: u32,

    /// Output file; defaults to data_log_<timestamp> with the format's extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// First sector of the data region
    #[arg(long, default_value_t = DEFAULT_FIRST_DATA_SECTOR)]
    first_sector: u32,

    /// 16-bit values per sample
    #[arg(long, default_value_t = DEFAULT_VALUES_PER_SAMPLE)]
    values_per_sample: u16,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Csv,
    Jsonl,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(cli.verbosity.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        CliCommand::Download(args) => run_download(&cli.link, args).await,
        CliCommand::ReadSector { sector } => run_read_sector(&cli.link, sector).await,
        CliCommand::Quit => run_quit(&cli.link).await,
        CliCommand::Loopback { iterations } => run_loopback(&cli.link, iterations).await,
        CliCommand::MonitorReady => run_monitor_ready(&cli.link).await,
    }
}

/// Open the bus and readiness source described by `link` as one session.
fn open_logger(link: &LinkArgs) -> Result<DataLogger<SpiTransport, Box<dyn ReadySignal>>> {
    let transport = SpiTransport::open(&link.device, link.frequency, link.mode)
        .with_context(|| format!("opening SPI device {}", link.device.display()))?;

    let ready: Box<dyn ReadySignal> = match link.fixed_delay_ms {
        Some(ms) => Box::new(FixedDelay::new(Duration::from_millis(ms))),
        None => Box::new(open_ready_line(link)?),
    };

    let mut config = ProtocolConfig::default();
    if link.swap_opcodes {
        config = config.with_opcodes(OpcodeMap::WRITE_TEST);
    }
    if let Some(ceiling) = link.max_attempts {
        config = config.with_max_attempts(ceiling);
    }

    Ok(DataLogger::new(transport, ready, config))
}

fn open_ready_line(link: &LinkArgs) -> Result<GpioReady> {
    GpioReady::open(
        &link.gpiochip,
        link.ready_line,
        Duration::from_micros(link.poll_interval_us),
    )
    .with_context(|| {
        format!(
            "requesting ready line {} on {}",
            link.ready_line,
            link.gpiochip.display()
        )
    })
}

/// Cancel the session token when Ctrl-C arrives.
fn hook_interrupt(device: &DataLogger<SpiTransport, Box<dyn ReadySignal>>) {
    let cancel = device.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

async fn run_download(link: &LinkArgs, args: DownloadArgs) -> Result<()> {
    let output = args.output.unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!("data_log_{stamp}.{}", args.format.extension()))
    });

    let config = DownloadConfig {
        target_samples: args.samples,
        first_data_sector: args.first_sector,
        values_per_sample: args.values_per_sample,
    };

    let mut device = open_logger(link)?;
    hook_interrupt(&device);

    println!("Downloading {} samples to {}", args.samples, output.display());
    let written = match args.format {
        OutputFormat::Csv => {
            let mut sink = CsvSink::open(&output)
                .with_context(|| format!("opening {}", output.display()))?;
            download(&mut device, &config, &mut sink).await?
        }
        OutputFormat::Jsonl => {
            let mut sink = JsonlSink::open(&output)
                .with_context(|| format!("opening {}", output.display()))?;
            download(&mut device, &config, &mut sink).await?
        }
    };
    println!("Data log saved to {} ({written} samples)", output.display());
    Ok(())
}

async fn run_read_sector(link: &LinkArgs, sector: u32) -> Result<()> {
    let mut device = open_logger(link)?;
    hook_interrupt(&device);

    let payload = device.fetch_sector(sector).await?;
    println!("Sector {sector}:");
    hexdump::print_sector(&payload);
    Ok(())
}

async fn run_quit(link: &LinkArgs) -> Result<()> {
    let mut device = open_logger(link)?;
    device.quit().await?;
    println!("Quit command sent");
    Ok(())
}

async fn run_loopback(link: &LinkArgs, iterations: u32) -> Result<()> {
    let mut device = open_logger(link)?;
    hook_interrupt(&device);

    println!(
        "Mode: {}, Speed: {}, Iterations: {iterations}",
        link.mode,
        units::format_frequency(link.frequency)
    );

    let start = Instant::now();
    let errors = device.loopback_test(iterations).await?;
    let elapsed = start.elapsed();

    if errors == 0 {
        println!(
            "All {iterations} bytes sent and received successfully in {} - Transfer speed: {}",
            units::format_time(elapsed),
            units::format_throughput(iterations, elapsed)
        );
    } else {
        println!("Errors: {errors}");
    }
    Ok(())
}

async fn run_monitor_ready(link: &LinkArgs) -> Result<()> {
    let ready = open_ready_line(link)?;
    println!("> Monitoring data-ready line for state changes (Ctrl-C to stop)...");

    let mut last = ready.level()?;
    println!("Initial line state: {}", u8::from(last));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                let current = ready.level()?;
                if current != last {
                    println!("data-ready line changed to: {}", u8::from(current));
                    last = current;
                }
            }
        }
    }
    Ok(())
}
