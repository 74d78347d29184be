use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, instrument};
use url::Url;

use crate::navigator::clock::{Clock, TokioClock};
use crate::navigator::driver::Launcher;
use crate::navigator::Navigator;

/// 绕过挑战后拿到的页面
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub html: String,
}

/// 站点验证码需要人工完成时的等待方式
pub trait CaptchaGate {
    async fn wait_for_captcha(&self) -> Result<()>;
}

/// 在控制台提示并等待回车，不阻塞运行时线程
pub struct ConsoleCaptchaGate;

impl CaptchaGate for ConsoleCaptchaGate {
    async fn wait_for_captcha(&self) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all("\n[CAPTCHA] 检测到验证码, 请在浏览器中手动完成.\n[完成后按回车] >> ".as_bytes())
            .await?;
        stdout.flush().await?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .context("无法读取控制台输入")?;
        Ok(())
    }
}

/// 通过 [`Navigator`] 取页面
pub struct Downloader<L: Launcher, C: Clock = TokioClock> {
    navigator: Navigator<L, C>,
}

impl<L: Launcher, C: Clock> Downloader<L, C> {
    pub fn new(navigator: Navigator<L, C>) -> Self {
        Self { navigator }
    }

    #[instrument(skip(self))]
    pub async fn page(&mut self, url: &str) -> Result<FetchedPage> {
        let attempts = self.navigator.max_attempts();
        if !self.navigator.visit(url, attempts).await {
            anyhow::bail!("无法绕过页面保护: {}", url);
        }
        self.current().await
    }

    /// 重新读取当前页面（例如人工处理验证码之后）
    pub async fn current(&mut self) -> Result<FetchedPage> {
        let html = self
            .navigator
            .current_content()
            .await
            .context("无法读取页面内容")?;
        let address = self
            .navigator
            .current_url()
            .await
            .context("无法读取当前地址")?;
        let url = Url::parse(&address).with_context(|| format!("地址无效: {}", address))?;
        info!("页面读取完成: {} ({} 字节)", url, html.len());
        Ok(FetchedPage { url, html })
    }

    pub async fn close(&mut self) {
        self.navigator.close().await;
    }
}
