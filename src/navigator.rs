pub mod chrome;
pub mod clock;
pub mod detector;
pub mod driver;

pub use chrome::{ChromeDriver, ChromeLauncher};
pub use clock::{Clock, TokioClock};
pub use detector::ChallengeDetector;
pub use driver::{BrowserDriver, FrameInfo, Launcher};

use anyhow::Result;
use tracing::{debug, error, info, instrument, warn};

use crate::config::NavigatorConfig;
use crate::logger::FEEDBACK;

/// 在验证框 iframe 内执行，返回复选框中心点（iframe 视口坐标）
static CHECKBOX_POINT_SCRIPT: &str = r#"
(() => {
    const box = document.querySelector("input[type='checkbox']");
    if (!box || box.disabled) {
        return null;
    }
    const rect = box.getBoundingClientRect();
    if (rect.width === 0 || rect.height === 0) {
        return null;
    }
    return { x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 };
})()
"#;

static STORAGE_SIZE_SCRIPT: &str =
    "({ local: window.localStorage.length, session: window.sessionStorage.length })";

static CLEAR_STORAGE_SCRIPT: &str = "window.localStorage.clear(); window.sessionStorage.clear();";

static BROWSER_INFO_SCRIPT: &str = r#"({
    userAgent: navigator.userAgent,
    webdriver: navigator.webdriver ?? null,
    languages: navigator.languages,
    platform: navigator.platform,
    hardwareConcurrency: navigator.hardwareConcurrency,
    deviceMemory: navigator.deviceMemory ?? null,
    screen: { width: screen.width, height: screen.height, depth: screen.colorDepth }
})"#;

const SNIPPET_LEN: usize = 500;

/// 拦截页绕过导航器
///
/// 持有唯一的浏览器会话：首次访问时创建，传输层出错后在下一次尝试时重建，
/// 调用 [`Navigator::close`] 时销毁。
pub struct Navigator<L: Launcher, C: Clock = TokioClock> {
    launcher: L,
    clock: C,
    config: NavigatorConfig,
    interstitials: ChallengeDetector,
    challenge_frames: ChallengeDetector,
    session: Option<L::Driver>,
}

impl<L: Launcher> Navigator<L> {
    pub fn new(launcher: L, config: NavigatorConfig) -> Self {
        Self::with_clock(launcher, TokioClock, config)
    }
}

impl<L: Launcher, C: Clock> Navigator<L, C> {
    pub fn with_clock(launcher: L, clock: C, config: NavigatorConfig) -> Self {
        let interstitials = ChallengeDetector::new(&config.interstitial_phrases);
        let challenge_frames = ChallengeDetector::new(&config.frame_keywords);
        Self {
            launcher,
            clock,
            config,
            interstitials,
            challenge_frames,
            session: None,
        }
    }

    pub fn interstitials_mut(&mut self) -> &mut ChallengeDetector {
        &mut self.interstitials
    }

    pub fn challenge_frames_mut(&mut self) -> &mut ChallengeDetector {
        &mut self.challenge_frames
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    pub fn is_alive(&self) -> bool {
        self.session.is_some()
    }

    /// 访问页面，最多尝试 `max_attempts` 次，成功后可通过 [`Navigator::current_content`] 读取源码
    #[instrument(skip(self))]
    pub async fn visit(&mut self, url: &str, max_attempts: u32) -> bool {
        let max_attempts = max_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug!("页面访问尝试: {} ({}/{})", url, attempt, max_attempts);
            match self.attempt(url).await {
                Ok(true) => {
                    info!(target: FEEDBACK, "Cloudflare 绕过成功: {}", url);
                    return true;
                }
                Ok(false) => {
                    warn!(
                        target: FEEDBACK,
                        "Cloudflare 绕过失败 (尝试 {}/{}): {}", attempt, max_attempts, url
                    );
                    if attempt < max_attempts {
                        if let Err(e) = self.reset_client_state().await {
                            warn!("清理浏览器状态失败: {:#}", e);
                        }
                        self.clock.sleep(self.config.retry_delay()).await;
                    }
                }
                Err(e) => {
                    error!("页面访问出错 (尝试 {}/{}): {:#}", attempt, max_attempts, e);
                    if attempt < max_attempts {
                        self.close().await;
                        self.clock.sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }
        false
    }

    /// 当前页面源码，没有会话或读取失败时为 `None`
    pub async fn current_content(&mut self) -> Option<String> {
        let driver = self.session.as_mut()?;
        match driver.content().await {
            Ok(html) => Some(html),
            Err(e) => {
                error!("页面内容获取失败: {:#}", e);
                None
            }
        }
    }

    pub async fn current_url(&mut self) -> Option<String> {
        let driver = self.session.as_mut()?;
        match driver.current_url().await {
            Ok(url) => url,
            Err(e) => {
                error!("当前地址获取失败: {:#}", e);
                None
            }
        }
    }

    /// 关闭浏览器会话，可重复调用
    pub async fn close(&mut self) {
        let Some(driver) = self.session.take() else {
            return;
        };
        match driver.quit().await {
            Ok(()) => debug!("浏览器已关闭"),
            Err(e) => error!("浏览器关闭失败: {:#}", e),
        }
    }

    async fn attempt(&mut self, url: &str) -> Result<bool> {
        self.ensure_session().await?;
        let Some(driver) = self.session.as_mut() else {
            anyhow::bail!("浏览器会话不可用");
        };

        Attempt {
            driver,
            clock: &self.clock,
            config: &self.config,
            interstitials: &self.interstitials,
            challenge_frames: &self.challenge_frames,
        }
        .run(url)
        .await
    }

    async fn ensure_session(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }
        info!("浏览器初始化开始");
        let mut driver = self.launcher.launch().await?;
        match driver.execute(BROWSER_INFO_SCRIPT).await {
            Ok(browser_info) => debug!(
                "浏览器信息:\n{}",
                serde_json::to_string_pretty(&browser_info).unwrap_or_default()
            ),
            Err(e) => warn!("浏览器信息收集失败: {:#}", e),
        }
        self.session = Some(driver);
        Ok(())
    }

    async fn reset_client_state(&mut self) -> Result<()> {
        let Some(driver) = self.session.as_mut() else {
            return Ok(());
        };
        if let Ok(sizes) = driver.execute(STORAGE_SIZE_SCRIPT).await {
            debug!("清理前的存储条目数: {}", sizes);
        }
        driver.clear_cookies().await?;
        driver.execute(CLEAR_STORAGE_SCRIPT).await?;
        debug!("cookie 与本地存储已清理");
        Ok(())
    }
}

/// 单次访问尝试的状态机：加载 -> (验证中) -> 已加载 / 失败
struct Attempt<'a, D: BrowserDriver, C: Clock> {
    driver: &'a mut D,
    clock: &'a C,
    config: &'a NavigatorConfig,
    interstitials: &'a ChallengeDetector,
    challenge_frames: &'a ChallengeDetector,
}

impl<D: BrowserDriver, C: Clock> Attempt<'_, D, C> {
    /// 只有导航本身出错才向上传播（会话会被重建）；读取失败视为尚未通过
    async fn run(&mut self, url: &str) -> Result<bool> {
        self.driver.navigate(url).await?;

        match self.driver.content().await {
            Ok(html) => {
                let hits = self.interstitials.matches(&html);
                if hits.is_empty() {
                    debug!("未检测到拦截页");
                    return Ok(self.verify_structure().await);
                }
                warn!("检测到拦截页: {}", hits.join(", "));
            }
            Err(e) => debug!("页面源码暂不可读, 按拦截页处理: {:#}", e),
        }

        self.emulate_human().await;
        if self.solve_checkbox().await {
            debug!("已点击验证复选框");
        }
        self.clock.sleep(self.config.post_challenge()).await;

        if self.wait_for_clearance().await {
            return Ok(self.verify_structure().await);
        }

        if let Ok(html) = self.driver.content().await {
            debug!("拦截页仍存在, 源码片段:\n{}", snippet(&html, SNIPPET_LEN));
        }
        Ok(false)
    }

    /// 几次滚动，模拟用户在场
    async fn emulate_human(&mut self) {
        debug!("用户行为模拟开始");
        for position in &self.config.scroll_positions {
            let script = format!("window.scrollTo(0, {});", position);
            if let Err(e) = self.driver.execute(&script).await {
                warn!("用户行为模拟失败: {:#}", e);
                return;
            }
            self.clock.sleep(self.config.scroll_delay()).await;
        }
    }

    /// 在 iframe 内定位复选框，回到主文档后换算坐标并发送真实鼠标点击
    async fn solve_checkbox(&mut self) -> bool {
        self.clock.sleep(self.config.frame_settle()).await;

        let frames = match self.driver.frames().await {
            Ok(frames) => frames,
            Err(e) => {
                warn!("frame 枚举失败: {:#}", e);
                return false;
            }
        };
        let Some(frame) = frames
            .into_iter()
            .find(|frame| self.challenge_frames.is_match(&frame.url))
        else {
            debug!("未找到验证框 iframe");
            return false;
        };

        debug!("验证框 iframe: {}", frame.url);
        if let Err(e) = self.driver.enter_frame(&frame).await {
            warn!("无法切换到验证框 iframe: {:#}", e);
            return false;
        }
        let point = self.locate_checkbox().await;
        if let Err(e) = self.driver.leave_frame().await {
            warn!("无法切回主文档: {:#}", e);
            return false;
        }
        let Some((x, y)) = point else {
            debug!("复选框在限定时间内不可点击");
            return false;
        };

        let (dx, dy) = match self.driver.execute(&frame_offset_script(&frame.url)).await {
            Ok(value) => point_of(&value).unwrap_or_else(|| {
                debug!("主文档中未找到对应的 iframe 元素, 按零偏移点击");
                (0.0, 0.0)
            }),
            Err(e) => {
                debug!("iframe 位置获取失败: {:#}", e);
                (0.0, 0.0)
            }
        };

        match self.driver.click_at(x + dx, y + dy).await {
            Ok(()) => {
                debug!("鼠标点击复选框: ({}, {})", x + dx, y + dy);
                self.clock.sleep(self.config.post_click()).await;
                true
            }
            Err(e) => {
                warn!("复选框点击失败: {:#}", e);
                false
            }
        }
    }

    async fn locate_checkbox(&mut self) -> Option<(f64, f64)> {
        let deadline = self.clock.now() + self.config.checkbox_timeout();
        loop {
            match self.driver.execute(CHECKBOX_POINT_SCRIPT).await {
                Ok(value) => {
                    if let Some(point) = point_of(&value) {
                        return Some(point);
                    }
                }
                Err(e) => debug!("复选框定位出错: {:#}", e),
            }
            if self.clock.now() >= deadline {
                return None;
            }
            self.clock.sleep(self.config.checkbox_poll()).await;
        }
    }

    async fn wait_for_clearance(&mut self) -> bool {
        debug!("等待 JS 验证结束");
        let deadline = self.clock.now() + self.config.challenge_timeout();
        loop {
            match self.driver.content().await {
                Ok(html) if !self.interstitials.is_match(&html) => {
                    debug!("JS 验证已通过");
                    return true;
                }
                Ok(_) => {}
                // 验证通过后的跳转会销毁旧的执行上下文
                Err(e) => debug!("页面源码暂不可读: {:#}", e),
            }
            if self.clock.now() >= deadline {
                return false;
            }
            self.clock.sleep(self.config.poll_interval()).await;
        }
    }

    async fn verify_structure(&mut self) -> bool {
        let selector = &self.config.structure_selector;
        let deadline = self.clock.now() + self.config.structure_timeout();
        loop {
            match self.driver.has_element(selector).await {
                Ok(true) => {
                    debug!("页面正常加载");
                    return true;
                }
                Ok(false) => {}
                Err(e) => debug!("页面结构查询出错: {:#}", e),
            }
            if self.clock.now() >= deadline {
                warn!("页面结构校验失败, 未找到 {}", selector);
                return false;
            }
            self.clock.sleep(self.config.structure_poll()).await;
        }
    }
}

/// 主文档中与验证 frame 对应的 iframe 元素内容区左上角
fn frame_offset_script(frame_url: &str) -> String {
    format!(
        r#"
(() => {{
    const target = {};
    const frames = Array.from(document.querySelectorAll("iframe"));
    const frame = frames.find(f => f.src && (f.src === target || target.startsWith(f.src)))
        ?? (frames.length === 1 ? frames[0] : null);
    if (!frame) {{
        return null;
    }}
    const rect = frame.getBoundingClientRect();
    return {{ x: rect.left + frame.clientLeft, y: rect.top + frame.clientTop }};
}})()
"#,
        serde_json::Value::String(frame_url.to_owned())
    )
}

fn point_of(value: &serde_json::Value) -> Option<(f64, f64)> {
    Some((value.get("x")?.as_f64()?, value.get("y")?.as_f64()?))
}

fn snippet(html: &str, len: usize) -> String {
    let count = html.chars().count();
    if count <= len * 2 {
        return html.to_owned();
    }
    let head: String = html.chars().take(len).collect();
    let tail: String = html.chars().skip(count - len).collect();
    format!("{}\n...\n{}", head, tail)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use serde_json::{Value, json};

    use super::*;

    static PAGE: &str = "<html><head><title>북토끼</title></head><body>본문</body></html>";
    static CHALLENGE: &str =
        "<html><head><title>Just a moment...</title></head><body>Checking your browser</body></html>";

    #[derive(Default)]
    struct Script {
        pages: Vec<String>,
        served: usize,
        has_body: bool,
        frames: Vec<FrameInfo>,
        cleared_page: Option<String>,
        fail_navigations: usize,
        fail_content_calls: Vec<usize>,
        in_frame: bool,

        launches: usize,
        navigations: usize,
        content_calls: usize,
        scrolls: usize,
        frame_queries: usize,
        clicks: usize,
        click_points: Vec<(f64, f64)>,
        cookie_clears: usize,
        storage_clears: usize,
        quits: usize,
    }

    impl Script {
        fn serving(pages: &[&str]) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                pages: pages.iter().map(|p| p.to_string()).collect(),
                has_body: true,
                ..Default::default()
            }))
        }
    }

    struct FakeLauncher(Rc<RefCell<Script>>);

    struct FakeDriver(Rc<RefCell<Script>>);

    impl Launcher for FakeLauncher {
        type Driver = FakeDriver;

        async fn launch(&self) -> Result<FakeDriver> {
            self.0.borrow_mut().launches += 1;
            Ok(FakeDriver(self.0.clone()))
        }
    }

    impl BrowserDriver for FakeDriver {
        async fn navigate(&mut self, _url: &str) -> Result<()> {
            let mut script = self.0.borrow_mut();
            script.navigations += 1;
            if script.fail_navigations > 0 {
                script.fail_navigations -= 1;
                anyhow::bail!("chrome not reachable");
            }
            Ok(())
        }

        async fn content(&mut self) -> Result<String> {
            let mut script = self.0.borrow_mut();
            script.content_calls += 1;
            if script.fail_content_calls.contains(&script.content_calls) {
                anyhow::bail!("Execution context was destroyed");
            }
            let index = script.served.min(script.pages.len() - 1);
            script.served += 1;
            Ok(script.pages[index].clone())
        }

        async fn current_url(&mut self) -> Result<Option<String>> {
            Ok(Some("https://booktoki.example/novel/1".to_owned()))
        }

        async fn execute(&mut self, js: &str) -> Result<Value> {
            let mut script = self.0.borrow_mut();
            if js.contains("scrollTo") {
                script.scrolls += 1;
            } else if js.contains("checkbox") {
                // 只有在 iframe 上下文里才能找到复选框
                if script.in_frame {
                    return Ok(json!({ "x": 10.0, "y": 20.0 }));
                }
            } else if js.contains("iframe") {
                if !script.in_frame {
                    return Ok(json!({ "x": 100.0, "y": 200.0 }));
                }
            } else if js.contains("clear()") {
                script.storage_clears += 1;
            }
            Ok(Value::Null)
        }

        async fn has_element(&mut self, _selector: &str) -> Result<bool> {
            Ok(self.0.borrow().has_body)
        }

        async fn frames(&mut self) -> Result<Vec<FrameInfo>> {
            let mut script = self.0.borrow_mut();
            script.frame_queries += 1;
            Ok(script.frames.clone())
        }

        async fn enter_frame(&mut self, _frame: &FrameInfo) -> Result<()> {
            self.0.borrow_mut().in_frame = true;
            Ok(())
        }

        async fn leave_frame(&mut self) -> Result<()> {
            self.0.borrow_mut().in_frame = false;
            Ok(())
        }

        async fn click_at(&mut self, x: f64, y: f64) -> Result<()> {
            let mut script = self.0.borrow_mut();
            assert!(!script.in_frame, "mouse events target the top-level page");
            script.clicks += 1;
            script.click_points.push((x, y));
            if let Some(page) = script.cleared_page.take() {
                script.pages = vec![page];
                script.served = 0;
            }
            Ok(())
        }

        async fn clear_cookies(&mut self) -> Result<()> {
            self.0.borrow_mut().cookie_clears += 1;
            Ok(())
        }

        async fn quit(self) -> Result<()> {
            self.0.borrow_mut().quits += 1;
            Ok(())
        }
    }

    #[derive(Clone)]
    struct ManualClock {
        start: Instant,
        elapsed: Rc<Cell<Duration>>,
        sleeps: Rc<Cell<usize>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                elapsed: Rc::new(Cell::new(Duration::ZERO)),
                sleeps: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + self.elapsed.get()
        }

        async fn sleep(&self, duration: Duration) {
            self.elapsed.set(self.elapsed.get() + duration);
            self.sleeps.set(self.sleeps.get() + 1);
        }
    }

    fn navigator(script: &Rc<RefCell<Script>>, clock: &ManualClock) -> Navigator<FakeLauncher, ManualClock> {
        Navigator::with_clock(
            FakeLauncher(script.clone()),
            clock.clone(),
            NavigatorConfig::default(),
        )
    }

    fn turnstile_frame() -> FrameInfo {
        FrameInfo {
            id: "F1".to_owned(),
            url: "https://challenges.cloudflare.com/cdn-cgi/challenge-platform/turnstile".to_owned(),
        }
    }

    #[tokio::test]
    async fn plain_page_loads_on_first_check() {
        let script = Script::serving(&[PAGE]);
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(navigator.visit("https://booktoki.example/novel/1", 2).await);

        let script = script.borrow();
        assert_eq!(script.launches, 1);
        assert_eq!(script.navigations, 1);
        assert_eq!(script.scrolls, 0);
        assert_eq!(script.frame_queries, 0);
        assert_eq!(clock.sleeps.get(), 0);
    }

    #[tokio::test]
    async fn content_is_available_after_visit() {
        let script = Script::serving(&[PAGE]);
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert_eq!(navigator.current_content().await, None);
        assert!(navigator.visit("https://booktoki.example/novel/1", 1).await);
        assert_eq!(navigator.current_content().await.as_deref(), Some(PAGE));
        assert_eq!(
            navigator.current_url().await.as_deref(),
            Some("https://booktoki.example/novel/1")
        );
    }

    #[tokio::test]
    async fn checkbox_challenge_is_passed() {
        let script = Script::serving(&[CHALLENGE]);
        {
            let mut script = script.borrow_mut();
            script.frames = vec![
                FrameInfo {
                    id: "AD".to_owned(),
                    url: "https://ads.example/banner".to_owned(),
                },
                turnstile_frame(),
            ];
            script.cleared_page = Some(PAGE.to_owned());
        }
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(navigator.visit("https://booktoki.example/novel/1", 2).await);

        let script = script.borrow();
        assert_eq!(script.navigations, 1);
        assert_eq!(script.scrolls, 2);
        assert_eq!(script.clicks, 1);
        // iframe 内坐标加上 iframe 在主文档中的偏移
        assert_eq!(script.click_points, vec![(110.0, 220.0)]);
        assert!(!script.in_frame);
        assert_eq!(script.cookie_clears, 0);
    }

    #[tokio::test]
    async fn unreadable_content_during_clearance_is_retried() {
        let script = Script::serving(&[CHALLENGE, PAGE]);
        // 第二次读取（首次重新轮询）时执行上下文被跳转销毁
        script.borrow_mut().fail_content_calls = vec![2];
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(navigator.visit("https://booktoki.example/novel/1", 2).await);

        let script = script.borrow();
        assert_eq!(script.launches, 1);
        assert_eq!(script.quits, 0);
        assert_eq!(script.navigations, 1);
        assert_eq!(script.cookie_clears, 0);
        assert!(script.content_calls >= 3);
    }

    #[tokio::test]
    async fn unreadable_first_content_takes_challenge_path() {
        let script = Script::serving(&[PAGE]);
        script.borrow_mut().fail_content_calls = vec![1];
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(navigator.visit("https://booktoki.example/novel/1", 1).await);

        let script = script.borrow();
        assert_eq!(script.launches, 1);
        assert_eq!(script.quits, 0);
        assert_eq!(script.scrolls, 2);
    }

    #[tokio::test]
    async fn missing_structure_fails_plain_page() {
        let script = Script::serving(&[PAGE]);
        script.borrow_mut().has_body = false;
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(!navigator.visit("https://booktoki.example/novel/1", 1).await);

        let script = script.borrow();
        assert_eq!(script.scrolls, 0);
        assert_eq!(script.frame_queries, 0);
        assert_eq!(script.cookie_clears, 0);
        // 结构校验轮询到超时为止
        assert_eq!(clock.elapsed.get(), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn retry_waits_between_attempts() {
        let script = Script::serving(&[PAGE]);
        script.borrow_mut().has_body = false;
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(!navigator.visit("https://booktoki.example/novel/1", 2).await);

        let script = script.borrow();
        assert_eq!(script.navigations, 2);
        assert_eq!(script.cookie_clears, 1);
        assert_eq!(script.storage_clears, 1);
        // 两次结构校验超时加一次重试间隔
        assert_eq!(clock.elapsed.get(), Duration::from_millis(5000 + 3000 + 5000));
    }

    #[tokio::test]
    async fn persistent_challenge_exhausts_attempts() {
        let script = Script::serving(&[CHALLENGE]);
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(!navigator.visit("https://booktoki.example/novel/1", 3).await);

        let script = script.borrow();
        assert_eq!(script.launches, 1);
        assert_eq!(script.navigations, 3);
        assert_eq!(script.frame_queries, 3);
        assert_eq!(script.clicks, 0);
        assert_eq!(script.cookie_clears, 2);
        assert_eq!(script.storage_clears, 2);
        assert!(navigator.is_alive());
        // 每次尝试的重新轮询都受超时限制
        assert!(clock.elapsed.get() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn transport_error_recreates_session() {
        let script = Script::serving(&[PAGE]);
        script.borrow_mut().fail_navigations = 1;
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(navigator.visit("https://booktoki.example/novel/1", 2).await);

        let script = script.borrow();
        assert_eq!(script.launches, 2);
        assert_eq!(script.quits, 1);
        assert_eq!(script.navigations, 2);
    }

    #[tokio::test]
    async fn transport_error_on_last_attempt_keeps_session() {
        let script = Script::serving(&[PAGE]);
        script.borrow_mut().fail_navigations = 5;
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(!navigator.visit("https://booktoki.example/novel/1", 1).await);
        assert!(navigator.is_alive());
        assert_eq!(script.borrow().quits, 0);

        navigator.close().await;
        navigator.close().await;
        assert!(!navigator.is_alive());
        assert_eq!(script.borrow().quits, 1);
    }

    #[tokio::test]
    async fn missing_structure_downgrades_cleared_challenge() {
        let script = Script::serving(&[CHALLENGE]);
        {
            let mut script = script.borrow_mut();
            script.frames = vec![turnstile_frame()];
            script.cleared_page = Some(PAGE.to_owned());
            script.has_body = false;
        }
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);

        assert!(!navigator.visit("https://booktoki.example/novel/1", 1).await);
        assert_eq!(script.borrow().clicks, 1);
    }

    #[tokio::test]
    async fn injected_phrase_triggers_challenge_path() {
        let script = Script::serving(&["<html><body>잠시만 기다려 주세요</body></html>", PAGE]);
        let clock = ManualClock::new();
        let mut navigator = navigator(&script, &clock);
        navigator.interstitials_mut().push("잠시만 기다려");

        assert!(navigator.visit("https://booktoki.example/novel/1", 1).await);
        assert_eq!(script.borrow().scrolls, 2);
        assert_eq!(script.borrow().frame_queries, 1);
    }

    #[test]
    fn snippet_keeps_head_and_tail() {
        let html = "가".repeat(30) + &"나".repeat(30);
        assert_eq!(snippet(&html, 40), html);
        let short = snippet(&html, 10);
        assert!(short.starts_with(&"가".repeat(10)));
        assert!(short.ends_with(&"나".repeat(10)));
        assert!(short.contains("\n...\n"));
    }
}
