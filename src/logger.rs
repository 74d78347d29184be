use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{LevelFilter, filter_fn};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::LogConfig;

/// 反馈日志使用的 target，`info!(target: FEEDBACK, ...)` 的事件会额外写入反馈日志
pub const FEEDBACK: &str = "feedback";

static TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub struct LogFiles {
    pub debug: PathBuf,
    pub feedback: PathBuf,
}

/// 控制台 + 调试日志文件 + 反馈日志文件
pub fn init(config: &LogConfig) -> Result<LogFiles> {
    let files = log_files(&config.dir)?;
    let debug_file = File::create(&files.debug)
        .with_context(|| format!("无法创建调试日志: {}", files.debug.display()))?;
    let feedback_file = File::create(&files.feedback)
        .with_context(|| format!("无法创建反馈日志: {}", files.feedback.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.console_level));
    let console = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_target(false)
        .with_filter(filter);

    let debug = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_owned()))
        .with_writer(Mutex::new(debug_file))
        .with_filter(LevelFilter::DEBUG);

    let feedback = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_owned()))
        .with_writer(Mutex::new(feedback_file))
        .with_filter(filter_fn(|metadata| metadata.target() == FEEDBACK));

    tracing_subscriber::registry()
        .with(console)
        .with(debug)
        .with(feedback)
        .try_init()
        .context("日志初始化失败")?;

    Ok(files)
}

fn log_files(dir: &Path) -> Result<LogFiles> {
    fs::create_dir_all(dir).with_context(|| format!("无法创建日志目录: {}", dir.display()))?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    Ok(LogFiles {
        debug: dir.join(format!("debug_{}.txt", timestamp)),
        feedback: dir.join(format!("feedback_{}.txt", timestamp)),
    })
}
