use anyhow::{Context, Result, bail};
use bytes::BytesMut;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::process;
use tokio::io::{AsyncRead, AsyncReadExt};

use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use muse_core_lib::{DecodeError, MuseVersion, Packet, PacketStream, find_start, parse_version};

/// Decoder for the Muse EEG headset's serial stream.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode binary telemetry packets from a file, a device node or stdin.
    Decode {
        /// Where to read telemetry from. Defaults to stdin.
        #[arg(short, long, conflicts_with = "hex")]
        input: Option<PathBuf>,
        /// Decode these hex-encoded bytes instead of reading input.
        #[arg(long)]
        hex: Option<String>,
        /// Bytes handed to the decoder per read, to mimic a serial link.
        #[arg(short, long, default_value_t = 512)]
        chunk_size: usize,
        /// Print one JSON object per packet.
        #[arg(long)]
        json: bool,
        /// Stop after this many packets.
        #[arg(short = 'n', long)]
        max_packets: Option<usize>,
    },
    /// Find and parse the version handshake line.
    Version {
        /// Where to read the line from. Defaults to stdin unless LINE is given.
        #[arg(short, long, conflicts_with = "line")]
        input: Option<PathBuf>,
        /// The handshake line itself.
        line: Option<String>,
        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    // Packets go to stdout, so logs stay on stderr
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // INFO by default, DEBUG with -v, TRACE with -vv; RUST_LOG still wins
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file, &cli.verbose)?;

    let result = match cli.command {
        Command::Decode {
            input,
            hex,
            chunk_size,
            json,
            max_packets,
        } => {
            let options = DecodeOptions {
                chunk_size: chunk_size.max(1),
                json,
                max_packets,
            };
            match hex {
                Some(hex) => {
                    let bytes = hex::decode(hex.trim()).context("Invalid hex input")?;
                    run_decode(bytes.as_slice(), &options).await
                }
                None => match input {
                    Some(path) => {
                        let file = tokio::fs::File::open(&path)
                            .await
                            .with_context(|| format!("Failed to open {:?}", path))?;
                        run_decode(file, &options).await
                    }
                    None => run_decode(tokio::io::stdin(), &options).await,
                },
            }
        }
        Command::Version { input, line, json } => run_version(input, line, json).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}

struct DecodeOptions {
    chunk_size: usize,
    json: bool,
    max_packets: Option<usize>,
}

#[derive(Debug, Default)]
struct DecodeSummary {
    packets: usize,
    bytes_read: usize,
}

async fn run_decode<R>(mut reader: R, options: &DecodeOptions) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut stream = PacketStream::with_capacity(options.chunk_size * 2);
    let mut chunk = BytesMut::zeroed(options.chunk_size);
    let mut summary = DecodeSummary::default();
    let mut printed: Vec<Packet> = Vec::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    'read: loop {
        let n = tokio::select! {
            read = reader.read(&mut chunk) => read.context("Failed to read telemetry")?,
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping");
                break 'read;
            }
        };
        if n == 0 {
            break;
        }
        summary.bytes_read += n;
        debug!(bytes = n, buffered = stream.buffered(), "read chunk");

        stream.extend(&chunk[..n]);
        stream.poll(|packet| printed.push(packet));

        for packet in printed.drain(..) {
            print_packet(&packet, options.json)?;
            summary.packets += 1;
            if options.max_packets.is_some_and(|max| summary.packets >= max) {
                break 'read;
            }
        }
    }

    if stream.buffered() > 0 {
        warn!(bytes = stream.buffered(), "input ended inside a packet");
    }
    info!(
        packets = summary.packets,
        bytes = summary.bytes_read,
        resyncs = stream.resyncs(),
        discarded = stream.discarded(),
        "decode finished"
    );

    Ok(())
}

fn print_packet(packet: &Packet, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(packet).context("Failed to serialize packet")?);
        return Ok(());
    }

    match packet {
        Packet::Sync => println!("SYNC"),
        Packet::Error { code } => println!("ERROR code={:#010x}", code),
        Packet::Battery(battery) => println!(
            "BATTERY {}% gauge={}mV adc={}mV temp={}C",
            battery.percent, battery.fuel_gauge_mv, battery.adc_mv, battery.temp_c
        ),
        Packet::DrlRef(drl_ref) => println!("DRL/REF drl={} ref={}", drl_ref.drl, drl_ref.reference),
        Packet::Eeg(_) | Packet::Accelerometer(_) => {
            let samples = packet.samples().unwrap_or_default();
            let dropped = packet.dropped_samples().unwrap_or_default();
            println!("{} {:?} dropped={}", packet.packet_type(), samples, dropped);
        }
    }
    Ok(())
}

async fn run_version(input: Option<PathBuf>, line: Option<String>, json: bool) -> Result<()> {
    let buf = match (line, input) {
        (Some(line), _) => {
            let mut bytes = line.into_bytes();
            // A line passed on the command line has no terminator of its own
            if !matches!(bytes.last(), Some(b'\n' | b'\r')) {
                bytes.push(b'\n');
            }
            bytes
        }
        (None, Some(path)) => tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?,
        (None, None) => {
            let mut bytes = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut bytes)
                .await
                .context("Failed to read stdin")?;
            bytes
        }
    };

    let Some(start) = find_start(&buf) else {
        bail!("No MUSE version line found in {} bytes", buf.len());
    };
    if start > 0 {
        debug!(skipped = start, "skipped bytes before version line");
    }

    let version = match parse_version(&buf[start..]) {
        Ok((version, used)) => {
            debug!(offset = start, used, "parsed version line");
            version
        }
        Err(DecodeError::NeedMoreData) => bail!("Version line is incomplete"),
        Err(e) => bail!("Failed to parse version line: {} ({})", e, e.code().message()),
    };

    print_version(&version, json)
}

fn print_version(version: &MuseVersion, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(version).context("Failed to serialize version")?);
        return Ok(());
    }

    println!("{}", version);
    println!("  Image:        {}", version.image_type);
    println!("  Hardware:     {}.{}", version.hw_version.major, version.hw_version.minor);
    println!("  Firmware:     {} (build {})", version.fw_version, version.build_number);
    println!("  Bootloader:   {}", version.bl_version);
    println!(
        "  Target HW:    {}.{}",
        version.target_hw_version.major, version.target_hw_version.minor
    );
    if !version.fw_type.to_string().is_empty() {
        println!("  Firmware type: {}", version.fw_type);
    }
    Ok(())
}
