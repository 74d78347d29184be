use anyhow::Result;
use serde_json::Value;

/// 页面中的一个 frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub id: String,
    pub url: String,
}

/// 可控制的浏览器会话
///
/// 所有脚本和元素查询都在“当前上下文”中执行：默认是主文档，
/// [`BrowserDriver::enter_frame`] 之后是该 frame，直到 [`BrowserDriver::leave_frame`]。
pub trait BrowserDriver {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// 当前主文档的完整 HTML
    async fn content(&mut self) -> Result<String>;

    async fn current_url(&mut self) -> Result<Option<String>>;

    async fn execute(&mut self, script: &str) -> Result<Value>;

    async fn has_element(&mut self, selector: &str) -> Result<bool>;

    async fn frames(&mut self) -> Result<Vec<FrameInfo>>;

    async fn enter_frame(&mut self, frame: &FrameInfo) -> Result<()>;

    async fn leave_frame(&mut self) -> Result<()>;

    /// 在主文档视口坐标处发送真实的鼠标点击（按下并抬起）
    async fn click_at(&mut self, x: f64, y: f64) -> Result<()>;

    async fn clear_cookies(&mut self) -> Result<()>;

    async fn quit(self) -> Result<()>;
}

/// 按需创建浏览器会话
pub trait Launcher {
    type Driver: BrowserDriver;

    async fn launch(&self) -> Result<Self::Driver>;
}
