use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tracing::error;

use booktoki_fetch::config::Config;
use booktoki_fetch::{JpegRenderer, Paginator, display_elapsed_time, logger, prompt};

fn main() -> Result<()> {
    let config = Config::load()?;
    logger::init(&config.log)?;

    println!("\n=== novel-pages ===");
    let input = prompt("请输入小说根目录路径: ")?;
    let root = Path::new(&input);
    if !root.is_dir() {
        println!("[ERROR] 找不到目录: {}", input);
        return Ok(());
    }

    let renderer = match JpegRenderer::from_candidates(&config.paginator) {
        Ok(renderer) => renderer,
        Err(e) => {
            println!("[ERROR] {:#}", e);
            error!("字体加载失败: {:#}", e);
            return Ok(());
        }
    };

    let start = Instant::now();
    match Paginator::new(renderer, config.paginator.clone())
        .and_then(|paginator| paginator.convert_folder(root))
    {
        Ok(report) => println!(
            "[DONE] 转换完成: 成功 {} 个, 失败 {} 个",
            report.converted.len(),
            report.failed.len()
        ),
        Err(e) => {
            println!("[ERROR] {:#}", e);
            error!("转换中止: {:#}", e);
        }
    }
    display_elapsed_time(start.elapsed());
    Ok(())
}
