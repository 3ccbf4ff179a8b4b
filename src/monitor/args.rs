use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "focuswatch", version, long_about = None)]
#[command(about = "Tracks screen time and enforces focus mode for the host it is attached to")]
pub struct MonitorArgs {
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
    #[arg(long, default_value = "local", help = "User to monitor until the host says otherwise")]
    pub user: String,
    #[arg(long, help = "Json file overriding the monitor timings")]
    pub config: Option<PathBuf>,
    /// This option is for debugging purposes only. Logs go to stderr.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tracing::level_filters::LevelFilter;

    use super::MonitorArgs;

    #[test]
    fn test_defaults() {
        let args = MonitorArgs::parse_from(["focuswatch"]);
        assert_eq!(args.user, "local");
        assert!(args.dir.is_none());
        assert!(!args.log_console);
    }

    #[test]
    fn test_log_filter() {
        let args =
            MonitorArgs::parse_from(["focuswatch", "--log-filter", "info", "--user", "bob"]);
        assert_eq!(args.log, Some(LevelFilter::INFO));
        assert_eq!(args.user, "bob");
    }
}
