//! RV64 emulator CLI.
//!
//! This binary provides the two run modes of the emulator. It performs:
//! 1. **Simple run:** Loads hex instruction words at address 0, runs them in UserOnly mode
//!    while the PC stays inside the loaded code, and writes the final registers.
//! 2. **Machine run:** Loads a flat or ELF image into a configurable machine, optionally
//!    with the "virt" devices, and runs until power-off, exit or a fatal error.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rvemu_core::common::{EmuError, LoadError};
use rvemu_core::config::Config;
use rvemu_core::sim::{Image, RunOutcome, Simulator};
use rvemu_core::soc::RunState;
use rvemu_core::stats::STATS_SECTIONS;

#[derive(Parser, Debug)]
#[command(
    name = "rvemu",
    author,
    version,
    about = "RV64 machine emulator",
    long_about = "Run hex programs in UserOnly mode, or boot a flat/ELF image on an emulated machine.\n\nExamples:\n  rvemu simple prog.hex -\n  rvemu run firmware.bin --virt --ram-size 0x8000000"
)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Statistics sections printed to stderr at the end (comma separated, or "all").
    #[arg(long, global = true, value_delimiter = ',')]
    stats: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run hex instruction words at address 0 and dump the registers.
    Simple {
        /// Hex input, one instruction word per line ("-" for stdin).
        hex_input: PathBuf,
        /// Register dump destination ("-" for stdout).
        output: PathBuf,
    },
    /// Boot a flat binary or ELF image on a configurable machine.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Boot image (flat binary or ELF).
    rom: PathBuf,

    /// JSON configuration file; the flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base address of the code region.
    #[arg(long, value_parser = parse_num)]
    rom_base: Option<u64>,

    /// Size of the code region.
    #[arg(long, value_parser = parse_num)]
    rom_size: Option<u64>,

    /// Base address of the data region.
    #[arg(long, value_parser = parse_num)]
    ram_base: Option<u64>,

    /// Size of the data region.
    #[arg(long, value_parser = parse_num)]
    ram_size: Option<u64>,

    /// log2 of the translation and decode cache sizes.
    #[arg(long, value_parser = parse_num)]
    cache_bits: Option<u64>,

    /// Devices are updated every 2^T steps.
    #[arg(long, value_parser = parse_num)]
    dev_update_period: Option<u64>,

    /// Keep the hart in User mode and service ecall in the emulator.
    #[arg(long)]
    user_only: bool,

    /// Attach the UART, CLINT, PLIC and SysCon.
    #[arg(long)]
    virt: bool,

    /// Trace every executed instruction (needs --log-level trace).
    #[arg(long)]
    trace: bool,
}

/// Parses `0x`-prefixed hexadecimal or decimal numbers.
fn parse_num(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("`{text}` is not a number: {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Simple { hex_input, output } => cmd_simple(&hex_input, &output, &cli.stats),
        Commands::Run(args) => cmd_run(&args, &cli.stats),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_stats(sim: &mut Simulator, sections: &[String]) {
    if sections.is_empty() {
        return;
    }
    let stats = sim.cpu.collect_stats();
    if sections.iter().any(|s| s == "all") {
        stats.print();
    } else {
        stats.print_sections(sections);
    }
}

fn check_sections(sections: &[String]) {
    for section in sections {
        if section != "all" && !STATS_SECTIONS.contains(&section.as_str()) {
            let known = STATS_SECTIONS.join(", ");
            eprintln!("warning: unknown stats section `{section}` (known: {known})");
        }
    }
}

/// Simple mode: hex words at 0, UserOnly, run while the PC is in the loaded code.
fn cmd_simple(input: &Path, output: &Path, stats: &[String]) -> Result<ExitCode, EmuError> {
    check_sections(stats);
    let image = if input == Path::new("-") {
        Image::hex_from_reader(io::stdin().lock(), input)?
    } else {
        let file = File::open(input)
            .map_err(|source| LoadError::Io { path: input.to_path_buf(), source })?;
        Image::hex_from_reader(file, input)?
    };

    let mut sim = Simulator::new(Config::simple(), image)?;
    let range = sim.code_range();
    let outcome = sim.run_while_in(range);
    print_stats(&mut sim, stats);
    let outcome = outcome?;
    tracing::debug!("simple run finished: {outcome:?}");

    let written = if output == Path::new("-") {
        sim.cpu.dump_registers(&mut io::stdout().lock())
    } else {
        File::create(output).and_then(|mut file| {
            sim.cpu.dump_registers(&mut file)?;
            file.flush()
        })
    };
    if let Err(e) = written {
        eprintln!("error: cannot write {}: {e}", output.display());
        return Ok(ExitCode::FAILURE);
    }
    Ok(match outcome {
        RunOutcome::Stopped(RunState::Exited(code)) => ExitCode::from(code as u8),
        _ => ExitCode::SUCCESS,
    })
}

fn build_config(args: &RunArgs) -> Result<Config, EmuError> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(base) = args.rom_base {
        config.memory.rom_base = base;
        config.general.start_pc = base;
    }
    if let Some(size) = args.rom_size {
        config.memory.rom_size = size;
    }
    if let Some(base) = args.ram_base {
        config.memory.ram_base = base;
    }
    if let Some(size) = args.ram_size {
        config.memory.ram_size = size;
    }
    if let Some(bits) = args.cache_bits {
        config.general.cache_bits = u32::try_from(bits).unwrap_or(u32::MAX);
    }
    if let Some(period) = args.dev_update_period {
        config.general.device_update_period = u32::try_from(period).unwrap_or(u32::MAX);
    }
    config.general.user_only |= args.user_only;
    config.devices.virt |= args.virt;
    config.general.trace_instructions |= args.trace;
    config.validate()?;
    Ok(config)
}

/// Machine mode: boot an image and run until the machine stops.
fn cmd_run(args: &RunArgs, stats: &[String]) -> Result<ExitCode, EmuError> {
    check_sections(stats);
    let config = build_config(args)?;
    let image = Image::from_file(&args.rom)?;
    let mut sim = Simulator::new(config, image)?;

    let result = sim.run();
    print_stats(&mut sim, stats);
    match result {
        Ok(RunState::Exited(code)) => Ok(ExitCode::from(code as u8)),
        Ok(state) => {
            tracing::info!("machine stopped: {state:?}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let _ = sim.cpu.dump_state(&mut io::stderr().lock());
            Err(e)
        }
    }
}
