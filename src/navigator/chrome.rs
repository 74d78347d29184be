use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, EnableParams, SetBlockedUrLsParams,
};
use chromiumoxide::cdp::browser_protocol::page::{AddScriptToEvaluateOnNewDocumentParams, FrameId};
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, ExecutionContextId};
use chromiumoxide::layout::Point;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::driver::{BrowserDriver, FrameInfo, Launcher};
use crate::config::BrowserConfig;

/// 在任何页面脚本执行前隐藏自动化标记
static STEALTH_SCRIPT: &str = r#"
    delete Object.getPrototypeOf(navigator).webdriver;
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
"#;

pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<chromiumoxide::BrowserConfig> {
        let (width, height) = self.config.window_size;
        let mut builder = chromiumoxide::BrowserConfig::builder()
            .window_size(width, height)
            .viewport(None)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-infobars")
            .arg("--disable-login-animations")
            .arg("--no-default-browser-check")
            .arg("--no-first-run")
            .arg("--force-webrtc-ip-handling-policy=disable_non_proxied_udp")
            .arg(format!("--lang={}", self.config.language));

        if !self.config.headless {
            builder = builder.with_head();
        }
        if self.config.block_images {
            builder = builder.arg("--blink-settings=imagesEnabled=false");
        }
        if let Some(dir) = &self.config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(executable) = &self.config.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        for arg in &self.config.extra_args {
            builder = builder.arg(arg.as_str());
        }

        builder
            .build()
            .map_err(|e| anyhow::anyhow!("浏览器配置构建失败: {}", e))
    }
}

impl ChromeLauncher {
    /// 拦截图片、CSS、字体等资源，失败不影响会话
    async fn block_resources(&self, page: &Page) {
        let urls = &self.config.blocked_urls;
        if urls.is_empty() {
            return;
        }
        let blocked = async {
            page.execute(EnableParams::default()).await?;
            page.execute(SetBlockedUrLsParams::new(urls.clone())).await?;
            anyhow::Ok(())
        };
        match blocked.await {
            Ok(()) => debug!("资源拦截设置完成: {} 条规则", urls.len()),
            Err(e) => warn!("资源拦截设置失败: {:#}", e),
        }
    }
}

impl Launcher for ChromeLauncher {
    type Driver = ChromeDriver;

    #[instrument(skip_all)]
    async fn launch(&self) -> Result<ChromeDriver> {
        debug!("浏览器驱动创建开始");
        let (browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .context("浏览器启动失败")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP 事件处理出错: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("无法创建标签页")?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .context("隐身脚本注入失败")?;
        self.block_resources(&page).await;

        info!("浏览器驱动创建完成");
        Ok(ChromeDriver {
            browser,
            page,
            handler,
            context: None,
        })
    }
}

pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    context: Option<ExecutionContextId>,
}

impl BrowserDriver for ChromeDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.context = None;
        self.page
            .goto(url)
            .await
            .with_context(|| format!("页面跳转失败: {}", url))?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.page.content().await.context("无法读取页面源码")
    }

    async fn current_url(&mut self) -> Result<Option<String>> {
        self.page.url().await.context("无法读取当前地址")
    }

    async fn execute(&mut self, script: &str) -> Result<Value> {
        let mut builder = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .await_promise(true);
        if let Some(context) = self.context {
            builder = builder.context_id(context);
        }
        let params = builder
            .build()
            .map_err(|e| anyhow::anyhow!("脚本参数构建失败: {}", e))?;

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .context("脚本执行失败")?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn has_element(&mut self, selector: &str) -> Result<bool> {
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        Ok(self.execute(&script).await?.as_bool().unwrap_or(false))
    }

    async fn frames(&mut self) -> Result<Vec<FrameInfo>> {
        let mut frames = Vec::new();
        for id in self.page.frames().await.context("无法枚举 frame")? {
            let url = self.page.frame_url(id.clone()).await?.unwrap_or_default();
            frames.push(FrameInfo {
                id: id.inner().clone(),
                url,
            });
        }
        Ok(frames)
    }

    async fn enter_frame(&mut self, frame: &FrameInfo) -> Result<()> {
        let context = self
            .page
            .frame_execution_context(FrameId::new(frame.id.clone()))
            .await?
            .ok_or_else(|| anyhow::anyhow!("frame 没有可用的执行上下文: {}", frame.url))?;
        self.context = Some(context);
        Ok(())
    }

    async fn leave_frame(&mut self) -> Result<()> {
        self.context = None;
        Ok(())
    }

    async fn click_at(&mut self, x: f64, y: f64) -> Result<()> {
        self.page
            .click(Point::new(x, y))
            .await
            .with_context(|| format!("鼠标点击失败: ({}, {})", x, y))?;
        Ok(())
    }

    async fn clear_cookies(&mut self) -> Result<()> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .context("清除 cookie 失败")?;
        Ok(())
    }

    async fn quit(mut self) -> Result<()> {
        let closed = self.browser.close().await.context("浏览器关闭失败");
        if closed.is_ok() {
            self.browser.wait().await.context("等待浏览器进程退出失败")?;
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}
