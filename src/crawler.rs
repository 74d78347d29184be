pub mod downloader;
pub mod parser;
pub mod processor;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{error, info, instrument, warn};

pub use downloader::{CaptchaGate, ConsoleCaptchaGate, Downloader, FetchedPage};
pub use parser::{Episode, NovelInfo, Parser};
pub use processor::Processor;

use crate::config::ScraperConfig;
use crate::epub::Epub;
use crate::extractor::SiteSelectors;
use crate::logger::FEEDBACK;
use crate::navigator::Navigator;
use crate::navigator::clock::{Clock, TokioClock};
use crate::navigator::driver::Launcher;

/// 一次运行的结果汇总
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub base_folder: Option<PathBuf>,
    pub saved: usize,
    pub failed: usize,
    pub epub: Option<PathBuf>,
}

pub struct BookTokiCrawler<L: Launcher, G: CaptchaGate, C: Clock = TokioClock> {
    parser: Parser,
    downloader: Downloader<L, C>,
    processor: Processor,
    gate: G,
    config: ScraperConfig,
}

impl<L: Launcher, G: CaptchaGate, C: Clock> BookTokiCrawler<L, G, C> {
    pub fn new(
        navigator: Navigator<L, C>,
        selectors: SiteSelectors,
        config: ScraperConfig,
        gate: G,
    ) -> Self {
        Self {
            parser: Parser::new(selectors),
            downloader: Downloader::new(navigator),
            processor: Processor::new(config.output_dir.clone(), config.max_line_length),
            gate,
            config,
        }
    }

    /// 主页 → 作品信息 → 目录 → 逐回次保存 → EPUB
    ///
    /// 主页绕过失败或作品信息缺失时返回错误；之后的失败只影响对应的单元。
    #[instrument(skip(self))]
    pub async fn run(&mut self, start_url: &str) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();

        let main_page = self.fetch(start_url).await?;
        let info = self.parser.novel_info(&main_page.html)?;
        println!("[INFO] 作品信息: {:?}", info);

        let base = self.processor.make_base_folder(&info).await?;
        println!("[FOLDER] {} 已创建.", base.display());
        report.base_folder = Some(base.clone());

        match self.parser.episodes(&main_page.html, &main_page.url) {
            Ok(episodes) => {
                for episode in &episodes {
                    println!("[EPISODE] 正在处理 {}: {}", episode.label(), episode.title);
                    match self.crawl_episode(&base, episode).await {
                        Ok(path) => {
                            report.saved += 1;
                            println!("[SAVE] {}", path.display());
                            info!(target: FEEDBACK, "回次保存成功: {} {}", episode.label(), path.display());
                        }
                        Err(e) => {
                            report.failed += 1;
                            println!("[ERROR] {} 处理失败: {:#}", episode.label(), e);
                            error!(target: FEEDBACK, "回次处理失败: {} {}: {:#}", episode.label(), episode.url, e);
                        }
                    }
                }
            }
            Err(e) => {
                println!("[ERROR] 目录解析失败: {:#}", e);
                error!("目录解析失败: {:#}", e);
            }
        }
        println!("[DONE] 全部回次处理完成.");

        if self.config.build_epub {
            match self.build_epub(&base, &info).await {
                Ok(path) => {
                    println!("[EPUB] EPUB 生成完成: {}", path.display());
                    report.epub = Some(path);
                }
                Err(e) => {
                    println!("[ERROR] EPUB 生成失败: {:#}", e);
                    error!("EPUB 生成失败: {:#}", e);
                }
            }
        }

        println!(
            "[INFO] 保存 {} 个回次, 失败 {} 个.",
            report.saved, report.failed
        );
        info!(
            target: FEEDBACK,
            "运行汇总: 保存 {} 失败 {} EPUB {:?}",
            report.saved, report.failed, report.epub
        );
        Ok(report)
    }

    /// 取页面；遇到验证码表单时等待人工处理后重新读取
    async fn fetch(&mut self, url: &str) -> Result<FetchedPage> {
        let page = self.downloader.page(url).await?;
        if !self.parser.captcha_required(&page.html) {
            return Ok(page);
        }

        warn!("检测到验证码表单: {}", page.url);
        self.gate.wait_for_captcha().await?;
        self.downloader.current().await
    }

    #[instrument(skip_all, fields(number = %episode.number))]
    async fn crawl_episode(&mut self, base: &Path, episode: &Episode) -> Result<PathBuf> {
        let folder = self.processor.make_episode_folder(base, episode).await?;
        let page = self.fetch(episode.url.as_str()).await?;
        let text = self.parser.chapter_text(&page.html)?;
        self.processor.write_chapter(&folder, episode, &text).await
    }

    async fn build_epub(&self, base: &Path, info: &NovelInfo) -> Result<PathBuf> {
        let epub = Epub::from_folder(base, info, &self.config.language).await?;
        epub.generate().await
    }

    pub async fn close(&mut self) {
        self.downloader.close().await;
    }
}
