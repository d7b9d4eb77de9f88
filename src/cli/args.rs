//! CLI argument definitions using Clap

use clap::Parser;

/// Herald - play reminders and live announcements on a networked speaker
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(version)]
#[command(about = "Play audio files or broadcast your microphone to an AirPlay or Google Cast speaker")]
#[command(long_about = None)]
pub struct Cli {
    /// Discover speakers on the network and save one as the target
    #[arg(long, group = "mode")]
    pub setup: bool,

    /// Pair with the saved speaker (AirPlay PIN pairing)
    #[arg(long, group = "mode")]
    pub pair: bool,

    /// List speakers currently visible on the network
    #[arg(long, group = "mode")]
    pub list: bool,

    /// Broadcast the microphone live until interrupted
    #[arg(long, group = "mode")]
    pub live: bool,

    /// Record N seconds from the microphone, then play the clip
    #[arg(long, value_name = "SECONDS", group = "mode")]
    pub record: Option<u64>,

    /// Audio file to play (a path, or a name inside the audio directory)
    #[arg(value_name = "FILE", group = "mode")]
    pub file: Option<String>,

    /// Port for the local streaming server
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Discovery timeout in seconds
    #[arg(short = 't', long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

/// What one invocation should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Setup,
    Pair,
    List,
    Live,
    Record(u64),
    Play(String),
}

impl Cli {
    /// The selected mode; None when no mode argument was given.
    pub fn mode(&self) -> Option<Mode> {
        if self.setup {
            Some(Mode::Setup)
        } else if self.pair {
            Some(Mode::Pair)
        } else if self.list {
            Some(Mode::List)
        } else if self.live {
            Some(Mode::Live)
        } else if let Some(seconds) = self.record {
            Some(Mode::Record(seconds))
        } else {
            self.file.clone().map(Mode::Play)
        }
    }
}
