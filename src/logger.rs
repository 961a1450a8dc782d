//! Process-wide logging setup on top of `log4rs`.
//!
//! Two rolling files are written under the log directory: `catalog.log` for
//! everything and `audit.log` for the `catalog::audit` target, which records
//! every write the repositories perform.

use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

pub const AUDIT_TARGET: &str = "catalog::audit";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_RETENTION: u32 = 7;

type SetupResult = Result<(), Box<dyn std::error::Error>>;

/// Initializes logging from a log4rs YAML file.
///
/// # Errors
/// Returns an error if the file cannot be read or a logger is already installed.
pub fn init_file(path: &Path) -> SetupResult {
    log4rs::init_file(path, log4rs::config::Deserializers::default())?;
    Ok(())
}

pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder().build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    let appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?;
    Ok(appender)
}

/// Builds the rolling-file configuration without installing it.
///
/// - `dir`: log directory, current directory when `None`
/// - `level`: error|warn|info|debug|trace
/// - `retention`: rolled files kept per log (default 7)
///
/// # Errors
/// Returns an error if the directory cannot be created or an appender fails to open its file.
pub fn build_config(dir: Option<&Path>, level: Option<&str>, retention: Option<u32>) -> Result<Config, Box<dyn std::error::Error>> {
    let base = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    std::fs::create_dir_all(&base)?;
    let keep = retention.unwrap_or(DEFAULT_RETENTION).max(1);
    let lvl = level.map_or(LevelFilter::Info, parse_level);
    let config = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "catalog", keep)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(&base, "audit", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, LevelFilter::Info))
        .build(Root::builder().appender("app").build(lvl))?;
    Ok(config)
}

/// Installs the rolling-file configuration for the process.
///
/// # Errors
/// See [`build_config`]; also fails if a logger is already installed.
pub fn configure_logging(dir: Option<&Path>, level: Option<&str>, retention: Option<u32>) -> SetupResult {
    let config = build_config(dir, level, retention)?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Configure logging from `CATALOG_LOG_DIR`, `CATALOG_LOG_LEVEL` and `CATALOG_LOG_RETENTION`.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env() -> SetupResult {
    let dir = std::env::var("CATALOG_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("CATALOG_LOG_LEVEL").ok();
    let retention = std::env::var("CATALOG_LOG_RETENTION").ok().and_then(|s| s.parse::<u32>().ok());
    configure_logging(dir.as_deref(), level.as_deref(), retention)
}
