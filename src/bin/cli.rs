// CLI binary — panicking on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use pulse_lights::demo::create_demo_rig;
use pulse_lights::events::{
    EventDiff, EventMap, EventValue, BPM_CONFIDENCE_EVENT, BPM_EVENT,
};
use pulse_lights::rig::Frame;

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pulselights-cli", about = "PulseLights headless show driver", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output raw JSON frames instead of a text summary
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the demo rig with synthesized audio-analysis events
    Run {
        /// Seconds to run
        #[arg(long, default_value_t = 10.0)]
        duration: f64,

        /// Engine frame rate
        #[arg(long, default_value_t = 20.0)]
        fps: f64,

        /// Simulated tempo
        #[arg(long, default_value_t = 128.0)]
        bpm: f64,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Run flat out instead of pacing to the frame rate
        #[arg(long)]
        no_pace: bool,
    },
    /// List the demo rig's patch: lights, types, addresses, groups
    Lights,
}

/// Tracks previous event values so each tick carries real diffs, the
/// way the input layer would compute them.
#[derive(Default)]
struct EventFeed {
    prev: HashMap<String, EventValue>,
}

impl EventFeed {
    fn push(&mut self, data: &mut EventMap, name: &str, value: f64) {
        let new = EventValue::Scalar(value);
        let old = self
            .prev
            .insert(name.to_owned(), new.clone())
            .unwrap_or(EventValue::Scalar(0.0));
        data.insert(name.to_owned(), EventDiff::from_change(old, new));
    }
}

/// Synthesize one tick of analysis data: a confident BPM, an RMS level
/// wobbling with the beat, and kick/snare onsets on alternating beats.
fn synthesize(feed: &mut EventFeed, now: f64, bpm: f64) -> EventMap {
    let beat_len = 60.0 / bpm;
    let beat_phase = (now / beat_len).fract();
    let beat_index = (now / beat_len) as u64;

    let mut data = EventMap::new();
    feed.push(&mut data, BPM_EVENT, bpm);
    feed.push(&mut data, BPM_CONFIDENCE_EVENT, 0.95);

    let rms = 0.55 + 0.4 * (std::f64::consts::TAU * beat_phase).cos() * (-3.0 * beat_phase).exp();
    feed.push(&mut data, "audio/level/rms", rms.clamp(0.0, 1.0));

    // Sharp onset at the top of each beat, decaying fast.
    let onset = if beat_phase < 0.1 { 1.0 - beat_phase * 8.0 } else { 0.0 };
    if beat_index % 2 == 0 {
        feed.push(&mut data, "audio/onset/kick", onset);
        feed.push(&mut data, "audio/onset/snare", 0.0);
    } else {
        feed.push(&mut data, "audio/onset/kick", 0.0);
        feed.push(&mut data, "audio/onset/snare", onset);
    }
    data
}

/// Print the channels that changed since the previous frame.
fn print_frame_diff(now: f64, frame: &Frame, prev: Option<&Frame>) {
    let mut changes = Vec::new();
    for (light, params) in &frame.lights {
        let before = prev.and_then(|p| p.lights.get(light));
        for (param, value) in params {
            if before.and_then(|b| b.get(param)) != Some(value) {
                changes.push(format!("{light}.{param}={value}"));
            }
        }
    }
    if !changes.is_empty() {
        println!("[{now:7.2}s] {}", changes.join(" "));
    }
}

fn run(duration: f64, fps: f64, bpm: f64, seed: Option<u64>, no_pace: bool, json: bool) {
    let mut rig = match create_demo_rig() {
        Ok(rig) => rig,
        Err(e) => {
            eprintln!("[PulseLights] Invalid demo configuration: {e}");
            std::process::exit(1);
        }
    };
    if let Some(seed) = seed {
        rig = rig.with_seed(seed);
    }

    let frame_len = Duration::from_secs_f64(1.0 / fps);
    let frames = (duration * fps) as u64;
    let mut feed = EventFeed::default();
    let mut prev: Option<Frame> = None;
    let started = Instant::now();

    for i in 0..frames {
        // The engine runs on a synthetic clock derived from the frame
        // index, so a seeded run is reproducible at any pace.
        let now = i as f64 / fps;
        let data = synthesize(&mut feed, now, bpm);
        let frame = rig.tick(&data, now);

        if json {
            println!("{}", serde_json::to_string(&frame).unwrap());
        } else {
            print_frame_diff(now, &frame, prev.as_ref());
        }
        prev = Some(frame);

        if !no_pace {
            let next_frame = frame_len * (i + 1) as u32;
            if let Some(sleep) = next_frame.checked_sub(started.elapsed()) {
                thread::sleep(sleep);
            }
        }
    }
}

fn list_lights(json: bool) {
    let rig = match create_demo_rig() {
        Ok(rig) => rig,
        Err(e) => {
            eprintln!("[PulseLights] Invalid demo configuration: {e}");
            std::process::exit(1);
        }
    };

    if json {
        let patch: Vec<serde_json::Value> = rig
            .lights()
            .iter()
            .map(|l| {
                serde_json::json!({
                    "name": l.name(),
                    "type": l.kind().name(),
                    "address": l.address(),
                    "channels": l.kind().channels(),
                    "groups": l.groups(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&patch).unwrap());
        return;
    }

    for light in rig.lights() {
        println!(
            "{:10} {:14} @ {:3} ({} ch)  groups: {}",
            light.name(),
            light.kind().name(),
            light.address(),
            light.kind().channels(),
            light.groups().join(", "),
        );
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            duration,
            fps,
            bpm,
            seed,
            no_pace,
        } => run(duration, fps, bpm, seed, no_pace, cli.json),
        Commands::Lights => list_lights(cli.json),
    }
}
