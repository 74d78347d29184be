use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;

use booktoki_fetch::config::{NavigatorConfig, ScraperConfig};
use booktoki_fetch::crawler::{BookTokiCrawler, CaptchaGate};
use booktoki_fetch::extractor::SiteSelectors;
use booktoki_fetch::navigator::{BrowserDriver, Clock, FrameInfo, Launcher, Navigator};

static MAIN_PAGE: &str = r#"<html><body>
<div class="col-sm-8">
  <div class="view-content"><span>제목</span></div>
  <div class="view-content">
    <i class="fa fa-building-o"></i> 문피아
    <i class="fa fa-tag"></i> 판타지
    <i class="fa fa-user"></i> 싱숑
  </div>
</div>
<form id="serial-move"><ul class="list-body">
  <li class="list-item"><div class="wr-num">1</div>
    <div class="wr-subject"><a href="/novel/1">1화</a></div></li>
  <li class="list-item"><div class="wr-num">2</div>
    <div class="wr-subject"><a href="/novel/2">2화</a></div></li>
  <li class="list-item"><div class="wr-num">3</div>
    <div class="wr-subject"><a href="/novel/3">3화</a></div></li>
</ul></form>
</body></html>"#;

static CAPTCHA_PAGE: &str = r#"<html><body><div class="form-body">
<form class="form" action="/bbs/captcha_check.php"></form></div></body></html>"#;

#[derive(Default)]
struct Site {
    pages: HashMap<String, String>,
    current: String,
    captcha_url: Option<String>,
    captcha_solved: bool,
}

struct SiteLauncher(Rc<RefCell<Site>>);

struct SiteDriver(Rc<RefCell<Site>>);

impl Launcher for SiteLauncher {
    type Driver = SiteDriver;

    async fn launch(&self) -> Result<SiteDriver> {
        Ok(SiteDriver(self.0.clone()))
    }
}

impl BrowserDriver for SiteDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.0.borrow_mut().current = url.to_owned();
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        let site = self.0.borrow();
        if site.captcha_url.as_deref() == Some(site.current.as_str()) && !site.captcha_solved {
            return Ok(CAPTCHA_PAGE.to_owned());
        }
        Ok(site
            .pages
            .get(&site.current)
            .cloned()
            .unwrap_or_else(|| "<html><body>404</body></html>".to_owned()))
    }

    async fn current_url(&mut self) -> Result<Option<String>> {
        Ok(Some(self.0.borrow().current.clone()))
    }

    async fn execute(&mut self, _script: &str) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn has_element(&mut self, _selector: &str) -> Result<bool> {
        Ok(true)
    }

    async fn frames(&mut self) -> Result<Vec<FrameInfo>> {
        Ok(Vec::new())
    }

    async fn enter_frame(&mut self, _frame: &FrameInfo) -> Result<()> {
        Ok(())
    }

    async fn leave_frame(&mut self) -> Result<()> {
        Ok(())
    }

    async fn click_at(&mut self, _x: f64, _y: f64) -> Result<()> {
        Ok(())
    }

    async fn clear_cookies(&mut self) -> Result<()> {
        Ok(())
    }

    async fn quit(self) -> Result<()> {
        Ok(())
    }
}

struct SolvingGate {
    site: Rc<RefCell<Site>>,
    calls: Rc<Cell<usize>>,
}

impl CaptchaGate for SolvingGate {
    async fn wait_for_captcha(&self) -> Result<()> {
        // 等待期间把执行权交还给运行时
        tokio::task::yield_now().await;
        self.calls.set(self.calls.get() + 1);
        self.site.borrow_mut().captcha_solved = true;
        Ok(())
    }
}

struct InstantClock(Instant);

impl Clock for InstantClock {
    fn now(&self) -> Instant {
        self.0
    }

    async fn sleep(&self, _duration: Duration) {}
}

fn site() -> Rc<RefCell<Site>> {
    let mut pages = HashMap::new();
    pages.insert(
        "https://booktoki.example/novel/list".to_owned(),
        MAIN_PAGE.to_owned(),
    );
    pages.insert(
        "https://booktoki.example/novel/1".to_owned(),
        format!(
            r#"<div id="novel_content"><p>{}</p><p>끝</p></div>"#,
            "가".repeat(85)
        ),
    );
    pages.insert(
        "https://booktoki.example/novel/2".to_owned(),
        r#"<div id="novel_content"><p>둘째</p></div>"#.to_owned(),
    );
    Rc::new(RefCell::new(Site {
        pages,
        captcha_url: Some("https://booktoki.example/novel/2".to_owned()),
        ..Default::default()
    }))
}

#[tokio::test]
async fn crawls_episodes_and_packages_epub() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    let calls = Rc::new(Cell::new(0));

    let navigator = Navigator::with_clock(
        SiteLauncher(site.clone()),
        InstantClock(Instant::now()),
        NavigatorConfig::default(),
    );
    let config = ScraperConfig {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let gate = SolvingGate {
        site: site.clone(),
        calls: calls.clone(),
    };
    let mut crawler =
        BookTokiCrawler::new(navigator, SiteSelectors::default(), config, gate);

    let report = crawler
        .run("https://booktoki.example/novel/list")
        .await
        .unwrap();
    crawler.close().await;

    let base = dir.path().join("[싱숑][판타지][제목]");
    assert_eq!(report.base_folder.as_deref(), Some(base.as_path()));
    assert_eq!(report.saved, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(calls.get(), 1);

    let first = std::fs::read_to_string(base.join("1회").join("1회차.txt")).unwrap();
    assert_eq!(first, format!("{}\n{}\n끝", "가".repeat(80), "가".repeat(5)));
    let second = std::fs::read_to_string(base.join("2회").join("2회차.txt")).unwrap();
    assert_eq!(second, "둘째");
    assert!(!base.join("3회").join("3회차.txt").exists());

    assert_eq!(report.epub, Some(base.join("[싱숑][판타지][제목].epub")));
    assert!(base.join("[싱숑][판타지][제목].epub").is_file());
}

#[tokio::test]
async fn missing_main_info_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    site.borrow_mut().pages.insert(
        "https://booktoki.example/novel/list".to_owned(),
        "<html><body>빈 페이지</body></html>".to_owned(),
    );

    let navigator = Navigator::with_clock(
        SiteLauncher(site.clone()),
        InstantClock(Instant::now()),
        NavigatorConfig::default(),
    );
    let config = ScraperConfig {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let gate = SolvingGate {
        site,
        calls: Rc::new(Cell::new(0)),
    };
    let mut crawler =
        BookTokiCrawler::new(navigator, SiteSelectors::default(), config, gate);

    assert!(crawler.run("https://booktoki.example/novel/list").await.is_err());
    crawler.close().await;
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
