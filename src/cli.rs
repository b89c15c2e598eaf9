use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "subtitle-sink")]
#[command(about = "Move downloaded subtitles next to the matching episodes of a TV library")]
pub struct Cli {
    /// Config file (defaults to /etc/subtitle-sink.cfg, then the user config dir)
    #[arg(short, long, env = "SUBTITLE_SINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Process the files already in the inbox and exit instead of watching
    #[arg(long)]
    pub once: bool,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}
