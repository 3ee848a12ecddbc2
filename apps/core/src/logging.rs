use std::any::Any;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::model::now_epoch_secs;

const LOG_FILE_NAME: &str = "seltrack.log";

static LOGGER: OnceLock<FileLogger> = OnceLock::new();
static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// Size-based rotation of the active log into `<prefix><unix-secs>.log`
/// archives next to it.
#[derive(Debug, Clone, Copy)]
struct Rotation {
    archive_prefix: &'static str,
    max_bytes: u64,
    keep: usize,
}

const ROTATION: Rotation = Rotation {
    archive_prefix: "seltrack-",
    max_bytes: 1_000_000,
    keep: 5,
};

impl Rotation {
    fn rotate_if_needed(&self, log_path: &Path) -> Result<(), std::io::Error> {
        let len = match fs::metadata(log_path) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        };
        if len < self.max_bytes {
            return Ok(());
        }

        let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
        fs::rename(log_path, self.free_archive_path(dir, now_epoch_secs()))?;
        self.prune(dir)
    }

    /// First unused archive name at or after `stamp`, so two rotations in the
    /// same second keep both files.
    fn free_archive_path(&self, dir: &Path, mut stamp: i64) -> PathBuf {
        loop {
            let candidate = dir.join(format!("{}{stamp}.log", self.archive_prefix));
            if !candidate.exists() {
                return candidate;
            }
            stamp += 1;
        }
    }

    fn archive_stamp(&self, path: &Path) -> Option<i64> {
        path.file_name()?
            .to_str()?
            .strip_prefix(self.archive_prefix)?
            .strip_suffix(".log")?
            .parse()
            .ok()
    }

    /// Deletes the oldest archives beyond `keep`. Unrelated files are ignored.
    fn prune(&self, dir: &Path) -> Result<(), std::io::Error> {
        let mut archives: Vec<(i64, PathBuf)> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                self.archive_stamp(&path).map(|stamp| (stamp, path))
            })
            .collect();

        archives.sort_unstable_by_key(|(stamp, _)| *stamp);
        let excess = archives.len().saturating_sub(self.keep);
        for (_, oldest) in archives.into_iter().take(excess) {
            if let Err(error) = fs::remove_file(&oldest) {
                eprintln!("[seltrack] failed to prune {}: {error}", oldest.display());
            }
        }
        Ok(())
    }
}

struct FileLogger {
    file: Mutex<File>,
    level: Level,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        let line = format_line(
            now_epoch_secs(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        );
        let _ = file.write_all(line.as_bytes());
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Routes `log` records into `<log_dir>/seltrack.log`, rotating the file when
/// it grows past 1 MB. Only the first call installs a logger. `Off` installs
/// nothing and touches no files.
pub fn init(log_dir: &Path, level: LevelFilter) -> Result<(), std::io::Error> {
    let Some(max_level) = level.to_level() else {
        log::set_max_level(LevelFilter::Off);
        return Ok(());
    };

    fs::create_dir_all(log_dir)?;
    let log_path = log_file_path(log_dir);
    ROTATION.rotate_if_needed(&log_path)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let logger = LOGGER.get_or_init(|| FileLogger {
        file: Mutex::new(file),
        level: max_level,
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }

    install_panic_hook();
    Ok(())
}

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

fn format_line(ts: i64, level: Level, target: &str, message: &str) -> String {
    format!("[{ts}] [{level}] {target}: {message}\n")
}

fn panic_payload_text(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return text;
    }
    payload
        .downcast_ref::<String>()
        .map_or("panic payload unavailable", String::as_str)
}

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let prior = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map_or_else(|| "unknown".to_string(), |l| format!("{}:{}", l.file(), l.line()));
            log::error!("panic at {location}: {}", panic_payload_text(info.payload()));
            log::logger().flush();
            prior(info);
        }));
    });
}
