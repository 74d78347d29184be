use std::time::Instant;

use anyhow::Result;
use tracing::error;

use booktoki_fetch::config::Config;
use booktoki_fetch::{
    BookTokiCrawler, ChromeLauncher, ConsoleCaptchaGate, Navigator, display_elapsed_time, logger,
    prompt,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let log_files = logger::init(&config.log)?;
    println!(
        "[INFO] 日志文件: {}, {}",
        log_files.debug.display(),
        log_files.feedback.display()
    );

    println!("\n=== booktoki-fetch ===");
    let url = prompt("请输入要访问的 URL: ")?;
    if url.is_empty() {
        println!("未输入 URL, 程序结束。");
        return Ok(());
    }

    let navigator = Navigator::new(
        ChromeLauncher::new(config.browser.clone()),
        config.navigator.clone(),
    );
    let mut crawler = BookTokiCrawler::new(
        navigator,
        config.site.clone(),
        config.scraper.clone(),
        ConsoleCaptchaGate,
    );

    let start = Instant::now();
    if let Err(e) = crawler.run(&url).await {
        println!("[ERROR] {:#}", e);
        error!("运行中止: {:#}", e);
    }
    crawler.close().await;
    display_elapsed_time(start.elapsed());

    println!("[INFO] 作业已完成。");
    Ok(())
}
