use std::io::{self, Write};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, info, instrument};

static ILLEGAL_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("文件名正则编译失败"));

/// 显示提示并读取一行输入（已去除首尾空白）
#[instrument]
pub fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    debug!("用户输入: {}", input.trim());
    Ok(input.trim().to_owned())
}

/// 把文件系统不允许的字符替换为 `_`
pub fn sanitize_filename(name: &str) -> String {
    ILLEGAL_FILENAME_CHARS.replace_all(name, "_").into_owned()
}

#[instrument]
pub fn display_elapsed_time(duration: std::time::Duration) {
    let total_ms = duration.as_millis();

    if total_ms >= 60000 {
        let mins = total_ms / 60000;
        let secs = (total_ms % 60000) / 1000;
        info!("✅ 完成！耗时: {}分{}秒", mins, secs);
    } else if total_ms >= 1000 {
        let secs = total_ms / 1000;
        let ms_remaining = total_ms % 1000;
        info!("✅ 完成！耗时: {}秒{}毫秒", secs, ms_remaining);
    } else {
        info!("✅ 完成！耗时: {}毫秒", total_ms);
    }
}
