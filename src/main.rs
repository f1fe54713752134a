use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use midisynth::smf::{self, Division};
use midisynth::{Player, RenderConfig, SystemMode};

/// Frames rendered per block
const BLOCK_FRAMES: usize = 1024;

/// Render Standard MIDI Files with a four-operator FM synthesizer
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a MIDI file to a stereo 16-bit WAV file
    Render {
        /// Path to the .mid file
        input: PathBuf,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// TOML render settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output sample rate in Hz, overrides the config
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Loop passes, overrides the config
        #[arg(long)]
        loops: Option<u32>,

        /// Reset standard: default, gm, gs or xg
        #[arg(long)]
        mode: Option<SystemMode>,
    },
    /// Print the header and timing of a MIDI file
    Info {
        /// Path to the .mid file
        input: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let result = match args.command {
        Commands::Render {
            input,
            output,
            config,
            sample_rate,
            loops,
            mode,
        } => {
            let mut render_config = match config {
                Some(path) => RenderConfig::load(path),
                None => Ok(RenderConfig::default()),
            }
            .unwrap_or_else(|e| {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            });
            if let Some(sample_rate) = sample_rate {
                render_config.sample_rate = sample_rate;
            }
            if let Some(loops) = loops {
                render_config.loop_count = loops;
            }
            if let Some(mode) = mode {
                render_config.system_mode = mode;
            }
            render(&input, &output, &render_config)
        }
        Commands::Info { input } => print_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn render(input: &Path, output: &Path, config: &RenderConfig) -> Result<()> {
    config.validate()?;
    let bytes =
        std::fs::read(input).with_context(|| format!("reading '{}'", input.display()))?;

    let mut player = Player::new(config.sample_rate);
    if !player.load(&bytes) {
        bail!("'{}' is not a playable MIDI file", input.display());
    }
    player.set_loop_count(config.loop_count);
    let synth = player.synthesizer_mut();
    synth.set_system_mode(config.system_mode);
    synth.set_master_volume(config.master_volume);
    synth.set_master_balance(config.master_balance);

    let mut samples = Vec::new();
    let mut block = vec![0i32; 2 * BLOCK_FRAMES];
    while !player.is_finished() {
        player.render(&mut block);
        samples.extend_from_slice(&block);
    }

    let tail_frames = (config.tail_seconds * config.sample_rate as f32) as usize;
    let mut tail = 0;
    while tail < tail_frames && player.synthesizer().active_notes() > 0 {
        player.render(&mut block);
        samples.extend_from_slice(&block);
        tail += BLOCK_FRAMES;
    }

    midisynth::wav::write_wav(output, &samples, config.sample_rate)?;
    info!(
        "wrote {} ({:.2} s, {} loops)",
        output.display(),
        samples.len() as f64 / 2.0 / f64::from(config.sample_rate),
        player.loops()
    );
    Ok(())
}

fn print_info(input: &Path) -> Result<()> {
    let bytes =
        std::fs::read(input).with_context(|| format!("reading '{}'", input.display()))?;
    let song = smf::parse(&bytes)?;

    println!("format:   {}", song.format);
    println!("tracks:   {}", song.tracks.len());
    match song.division {
        Division::TicksPerQuarter(tpq) => println!("division: {} ticks per quarter", tpq),
        Division::Smpte { fps, subframes } => {
            println!("division: SMPTE {} fps, {} subframes", fps, subframes)
        }
    }

    let mut player = Player::new(44100);
    if player.load(&bytes) {
        let sequencer = player.sequencer();
        println!("events:   {}", sequencer.len());
        println!(
            "length:   {:.3} s",
            sequencer.get_total_time() as f64 / 1_000_000.0
        );
        if let Some(loop_time) = sequencer.loop_time() {
            println!("loop:     {:.3} s", loop_time as f64 / 1_000_000.0);
        }
        println!("tempos:   {}", sequencer.tempo_map().changes().len());
    }
    Ok(())
}
