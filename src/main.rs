// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{crate_version, Parser, Subcommand};
use crossbeam_channel::Receiver;
use tracing::info;

use ndimedia::{
    config::Settings,
    dispatch::FrameDispatcher,
    finder::Finder,
    ndi::mock,
    options::OptionMap,
    samples::{BinarySample, PooledAudioSample, VideoSample},
    sink::{ChannelSink, Sink},
    state::StateMachine,
    ticker::AudioTicker,
    timecode::Timespan,
    tracks::{TrackCatalog, TrackType},
    url, MediaEvent, Player,
};

/// How many samples of each kind may wait in a sink before new ones are dropped.
const SINK_CAPACITY: usize = 64;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "An NDI media player core."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays a simulated source through the player and reports what arrived.
    Simulate {
        /// The media URL to open, e.g. ndi://HOST (Camera 1).
        url: String,
        /// The path to the player settings.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// How long to play for.
        #[arg(short, long, default_value_t = 5)]
        seconds: u32,
        /// The frame rate of the simulated source.
        #[arg(short, long, default_value_t = 30)]
        fps: u32,
    },
    /// Parses a media URL and prints the source it names.
    ParseUrl {
        /// The media URL to parse.
        url: String,
    },
    /// Lists the sources a finder discovers on a simulated network.
    Sources {
        /// The path to the player settings.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            url,
            config,
            seconds,
            fps,
        } => simulate(&url, &load_settings(config.as_deref())?, seconds, fps.max(1))?,
        Commands::ParseUrl { url } => {
            let source = url::parse(&url)?;
            println!("Source: {}", source);
            if let Some(name) = source.name {
                println!("  Name: {}", name);
            }
            if let Some(address) = source.address {
                println!("  Address: {}", address);
            }
        }
        Commands::Sources { config } => {
            let settings = load_settings(config.as_deref())?;
            let library = mock::Library::new();
            library.add_source("STUDIO (Camera 1)", "10.0.0.21:5961", "public", false);
            library.add_source("STUDIO (Camera 2)", "10.0.0.22:5961", "public", false);
            library.add_source("CONTROL (Program)", "10.0.1.5:5961", "control", false);

            let mut finder = Finder::new(Arc::new(library), settings.finder().to_settings());
            if !finder.initialize() {
                return Err("unable to start source discovery".into());
            }
            let sources = finder.sources().unwrap_or_default();
            println!("Sources (count: {}):", sources.len());
            for source in sources {
                println!("- {} ({})", source, source.url);
            }
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings, Box<dyn Error>> {
    match path {
        Some(path) => Ok(Settings::deserialize(path)?),
        None => Ok(Settings::default()),
    }
}

/// Everything the simulation's sinks have received so far.
#[derive(Default)]
struct Received {
    audio: usize,
    audio_values: usize,
    video: usize,
    video_bytes: usize,
    metadata: usize,
}

struct Outputs {
    audio: Arc<dyn Sink<PooledAudioSample>>,
    audio_rx: Receiver<PooledAudioSample>,
    video: Arc<dyn Sink<VideoSample>>,
    video_rx: Receiver<VideoSample>,
    metadata: Arc<dyn Sink<BinarySample>>,
    metadata_rx: Receiver<BinarySample>,
}

impl Outputs {
    fn new() -> Outputs {
        let (audio, audio_rx) = ChannelSink::<PooledAudioSample>::bounded("audio", SINK_CAPACITY);
        let (video, video_rx) = ChannelSink::<VideoSample>::bounded("video", SINK_CAPACITY);
        let (metadata, metadata_rx) =
            ChannelSink::<BinarySample>::bounded("metadata", SINK_CAPACITY);
        Outputs {
            audio,
            audio_rx,
            video,
            video_rx,
            metadata,
            metadata_rx,
        }
    }

    fn attach(&self, player: &Player) {
        player.set_audio_sink(Some(Arc::downgrade(&self.audio)));
        player.set_video_sink(Some(Arc::downgrade(&self.video)));
        player.set_metadata_sink(Some(Arc::downgrade(&self.metadata)));
    }

    fn drain(&self, received: &mut Received) {
        for mut sample in self.audio_rx.try_iter() {
            received.audio += 1;
            received.audio_values += sample.buffer().len();
        }
        for sample in self.video_rx.try_iter() {
            received.video += 1;
            received.video_bytes += sample.buffer().len();
        }
        received.metadata += self.metadata_rx.try_iter().count();
    }
}

fn simulate(
    media_url: &str,
    settings: &Settings,
    seconds: u32,
    fps: u32,
) -> Result<(), Box<dyn Error>> {
    let library = mock::Library::new();
    let player = Arc::new(Player::new(Arc::new(library.clone())));
    let events = player.events();

    let ticker = AudioTicker::start(settings.audio_tick_interval()?)?;
    ticker.register(&player);

    let outputs = Outputs::new();
    outputs.attach(&player);

    player.open(media_url, &OptionMap::new(), settings)?;
    for kind in [TrackType::Audio, TrackType::Video, TrackType::Metadata] {
        player.select_track(kind, 0);
    }
    let receiver = library
        .last_receiver()
        .ok_or("the simulated receiver went away")?;

    let total_frames = seconds as i64 * fps as i64;
    let samples_per_frame = (48_000 / fps) as i32;
    let frame_duration = Duration::from_secs_f64(1.0 / fps as f64);
    let mut received = Received::default();

    for frame in 0..total_frames {
        let timecode = Timespan::from_rate(frame, fps as i64);
        receiver.push_video(mock::video_frame(320, 180, fps as i32, 1, timecode.ticks()));
        receiver.push_audio(mock::audio_frame(2, samples_per_frame, 48_000, timecode.ticks()));
        if frame % fps as i64 == 0 {
            receiver.push_metadata(mock::metadata_frame(
                &format!("<tally frame=\"{}\"/>", frame),
                timecode.ticks(),
            ));
        }

        // Pause for the third quarter of the run.
        if frame == total_frames / 2 {
            player.set_rate(0.0);
        } else if frame == total_frames * 3 / 4 {
            player.set_rate(1.0);
        }

        player.tick_input(timecode);
        player.tick_video();
        outputs.drain(&mut received);
        for event in events.try_iter() {
            print_event(event);
        }

        spin_sleep::sleep(frame_duration);
    }

    // Let the ticker drain the last audio.
    spin_sleep::sleep(settings.audio_tick_interval()? * 2);
    outputs.drain(&mut received);

    println!("{}", player.info());
    println!(
        "Video: {}x{} at {:.2} fps, {} bytes/s",
        player.video_track_dimensions(0).0,
        player.video_track_dimensions(0).1,
        player.video_track_frame_rate(0),
        player.video_track_bitrate(0)
    );
    println!(
        "Audio: {} channels at {} Hz",
        player.audio_track_channels(0),
        player.audio_track_sample_rate(0)
    );
    println!("{}", player.stats());
    println!(
        "Received: {} audio samples ({} values), {} video samples ({} bytes), {} metadata samples",
        received.audio,
        received.audio_values,
        received.video,
        received.video_bytes,
        received.metadata
    );

    drop(receiver);
    player.close();
    for event in events.try_iter() {
        print_event(event);
    }
    info!(frames = total_frames, "Simulation complete");
    Ok(())
}

fn print_event(event: MediaEvent) {
    println!("Event: {:?}", event);
}
