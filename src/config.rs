use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8765";

/// Pomodoro timer daemon that tells the browser extension what to block.
#[derive(Debug, Clone, Parser)]
#[command(name = "focusflow", version, about)]
pub struct Config {
    /// Address the WebSocket server binds to
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub addr: SocketAddr,

    /// Where settings, history and the blocked-site list are stored
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the tick and completion sounds
    #[arg(long)]
    pub mute: bool,

    /// Skip desktop notifications
    #[arg(long)]
    pub no_notify: bool,
}

impl Config {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".local/share/focusflow")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["focusflow"]);
        assert_eq!(config.addr, DEFAULT_ADDR.parse().unwrap());
        assert!(!config.verbose);
        assert!(!config.mute);
        assert!(!config.no_notify);
    }

    #[test]
    fn flags_and_overrides() {
        let config = Config::parse_from([
            "focusflow",
            "-v",
            "--mute",
            "--no-notify",
            "--addr",
            "0.0.0.0:9000",
            "--data-dir",
            "/tmp/ff",
        ]);
        assert!(config.verbose && config.mute && config.no_notify);
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/ff"));
    }
}
