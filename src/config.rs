use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::extractor::SiteSelectors;

static CONFIG_FILE: &str = "config";
static ENV_PREFIX: &str = "BOOKTOKI";

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub navigator: NavigatorConfig,
    pub browser: BrowserConfig,
    pub site: SiteSelectors,
    pub scraper: ScraperConfig,
    pub paginator: PaginatorConfig,
    pub log: LogConfig,
}

impl Config {
    /// 读取工作目录下可选的 `config.toml`，再叠加 `BOOKTOKI_*` 环境变量
    pub fn load() -> Result<Self> {
        Self::load_with(Self::environment())
    }

    /// `BOOKTOKI_NAVIGATOR__MAX_ATTEMPTS=3` 形式：前缀后单下划线，层级间双下划线
    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("navigator.interstitial_phrases")
            .with_list_parse_key("navigator.frame_keywords")
            .with_list_parse_key("browser.blocked_urls")
            .with_list_parse_key("paginator.font_candidates")
    }

    fn load_with(environment: config::Environment) -> Result<Self> {
        config::Config::builder()
            .add_source(
                config::File::with_name(CONFIG_FILE)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(environment)
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("配置文件反序列化失败: {}", e))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("配置文件反序列化失败: {}", e))
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct NavigatorConfig {
    pub max_attempts: u32,
    pub challenge_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub structure_timeout_ms: u64,
    pub structure_poll_ms: u64,
    pub structure_selector: String,
    pub frame_settle_ms: u64,
    pub checkbox_timeout_ms: u64,
    pub checkbox_poll_ms: u64,
    pub post_click_ms: u64,
    pub post_challenge_ms: u64,
    pub retry_delay_ms: u64,
    pub scroll_positions: Vec<u32>,
    pub scroll_delay_ms: u64,
    pub interstitial_phrases: Vec<String>,
    pub frame_keywords: Vec<String>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            challenge_timeout_ms: 5000,
            poll_interval_ms: 1000,
            structure_timeout_ms: 5000,
            structure_poll_ms: 500,
            structure_selector: "body".to_owned(),
            frame_settle_ms: 2000,
            checkbox_timeout_ms: 3000,
            checkbox_poll_ms: 500,
            post_click_ms: 2000,
            post_challenge_ms: 1000,
            retry_delay_ms: 3000,
            scroll_positions: vec![200, 500],
            scroll_delay_ms: 500,
            interstitial_phrases: [
                "checking your browser",
                "사람인지 확인",
                "보안을 검토",
                "security check",
                "just a moment",
                "please wait",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            frame_keywords: ["turnstile", "challenge", "cloudflare"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl NavigatorConfig {
    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_millis(self.challenge_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn structure_timeout(&self) -> Duration {
        Duration::from_millis(self.structure_timeout_ms)
    }

    pub fn structure_poll(&self) -> Duration {
        Duration::from_millis(self.structure_poll_ms)
    }

    pub fn frame_settle(&self) -> Duration {
        Duration::from_millis(self.frame_settle_ms)
    }

    pub fn checkbox_timeout(&self) -> Duration {
        Duration::from_millis(self.checkbox_timeout_ms)
    }

    pub fn checkbox_poll(&self) -> Duration {
        Duration::from_millis(self.checkbox_poll_ms)
    }

    pub fn post_click(&self) -> Duration {
        Duration::from_millis(self.post_click_ms)
    }

    pub fn post_challenge(&self) -> Duration {
        Duration::from_millis(self.post_challenge_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub user_data_dir: Option<PathBuf>,
    pub chrome_executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub language: String,
    pub block_images: bool,
    /// 通过 `Network.setBlockedURLs` 拦截的资源模式
    pub blocked_urls: Vec<String>,
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            user_data_dir: Some(PathBuf::from("./chrome_profile")),
            chrome_executable: None,
            window_size: (1920, 1080),
            language: "ko-KR".to_owned(),
            block_images: true,
            blocked_urls: [
                "*.png", "*.jpg", "*.jpeg", "*.gif", "*.svg", "*.ico", "*.css", "*.woff",
                "*.woff2", "*.ttf", "*.eot", "*.mp4", "*.webm", "*.ogg",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ScraperConfig {
    pub output_dir: PathBuf,
    pub max_line_length: usize,
    pub build_epub: bool,
    pub language: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            max_line_length: 80,
            build_epub: true,
            language: "ko".to_owned(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct PaginatorConfig {
    pub font_candidates: Vec<PathBuf>,
    pub font_size: f32,
    pub line_spacing: f32,
    pub width: u32,
    pub margin_left: u32,
    pub margin_right: u32,
    pub margin_top: u32,
    pub margin_bottom: u32,
    pub min_height: u32,
    pub lines_per_page: usize,
    pub background: String,
    pub foreground: String,
    pub jpeg_quality: u8,
    pub workers: Option<usize>,
    pub fallback_encoding: String,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            font_candidates: [
                "NanumGothicBold.ttf",
                "malgunbd.ttf",
                "gulim.ttc",
                "C:/Windows/Fonts/malgunbd.ttf",
                "C:/Windows/Fonts/NanumGothicBold.ttf",
                "/usr/share/fonts/truetype/nanum/NanumGothicBold.ttf",
                "/usr/share/fonts/nanum/NanumGothicBold.ttf",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            font_size: 24.0,
            line_spacing: 2.0,
            width: 1500,
            margin_left: 100,
            margin_right: 100,
            margin_top: 100,
            margin_bottom: 150,
            min_height: 800,
            lines_per_page: 25,
            background: "#FFFEFC".to_owned(),
            foreground: "#000000".to_owned(),
            jpeg_quality: 95,
            workers: None,
            fallback_encoding: "euc-kr".to_owned(),
        }
    }
}

impl PaginatorConfig {
    /// 文字可用宽度（图片宽度减去左右边距）
    pub fn available_width(&self) -> f32 {
        self.width.saturating_sub(self.margin_left + self.margin_right) as f32
    }

    pub fn line_pitch(&self) -> u32 {
        (self.font_size * self.line_spacing) as u32
    }

    pub fn lines_per_page(&self) -> usize {
        self.lines_per_page.max(1)
    }

    pub fn page_height(&self, line_count: usize) -> u32 {
        let text_height = line_count as u32 * self.line_pitch();
        (self.margin_top + text_height + self.margin_bottom).max(self.min_height)
    }

    pub fn worker_count(&self) -> usize {
        if let Some(workers) = self.workers {
            return workers.max(1);
        }
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub console_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            console_level: "info".to_owned(),
        }
    }
}
