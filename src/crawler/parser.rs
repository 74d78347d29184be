use anyhow::Result;
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::extractor::{
    SiteSelectors, stripped_text, stripped_text_excluding, text_after_icon, text_lines,
};

/// 作品主页上的基本信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NovelInfo {
    pub title: String,
    pub publisher: String,
    pub genre: String,
    pub author: String,
}

/// 目录中的一个回次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub number: String,
    pub title: String,
    pub url: Url,
}

impl Episode {
    /// 回次标签，文件夹与控制台输出共用
    pub fn label(&self) -> String {
        format!("{}회", self.number)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Parser {
    selectors: SiteSelectors,
}

impl Parser {
    pub fn new(selectors: SiteSelectors) -> Self {
        Self { selectors }
    }

    /// 页面是否是需要人工处理的验证码表单
    pub fn captcha_required(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        let action = self.selectors.captcha_action.to_lowercase();
        document
            .select(&self.selectors.captcha_form)
            .next()
            .and_then(|form| form.value().attr("action"))
            .is_some_and(|form_action| form_action.to_lowercase().contains(&action))
    }

    #[instrument(skip_all)]
    pub fn novel_info(&self, html: &str) -> Result<NovelInfo> {
        info!("正在解析作品信息");
        let document = Html::parse_document(html);

        let Some(info_elem) = document.select(&self.selectors.info).next() else {
            anyhow::bail!("未找到作品信息区域");
        };

        let blocks: Vec<_> = info_elem.select(&self.selectors.view_content).collect();
        let Some(first) = blocks.first() else {
            anyhow::bail!("未找到 view-content 区域");
        };

        let mut info = NovelInfo {
            title: first
                .select(&self.selectors.title)
                .next()
                .map(stripped_text)
                .unwrap_or_default(),
            ..Default::default()
        };

        if let Some(details) = blocks.get(1) {
            let after = |selector| {
                details
                    .select(selector)
                    .next()
                    .and_then(text_after_icon)
                    .unwrap_or_default()
            };
            info.publisher = after(&self.selectors.publisher_icon);
            info.genre = after(&self.selectors.genre_icon);
            info.author = after(&self.selectors.author_icon);
        }

        info!("作品信息解析完成: {:?}", info);
        Ok(info)
    }

    /// 目录列表；缺少列表容器时报错，列表为空时返回空集合
    #[instrument(skip_all)]
    pub fn episodes(&self, html: &str, page_url: &Url) -> Result<Vec<Episode>> {
        let document = Html::parse_document(html);

        let Some(form) = document.select(&self.selectors.episode_form).next() else {
            anyhow::bail!("未找到回次表单");
        };
        let Some(list) = form.select(&self.selectors.episode_list).next() else {
            anyhow::bail!("未找到回次列表");
        };

        let mut episodes = Vec::new();
        for item in list.select(&self.selectors.episode_item) {
            let number = item
                .select(&self.selectors.episode_number)
                .next()
                .map(stripped_text)
                .unwrap_or_default();

            let Some(link) = item.select(&self.selectors.episode_link).next() else {
                debug!("回次 {} 没有链接, 跳过", number);
                continue;
            };
            let Some(href) = link.value().attr("href").filter(|h| !h.trim().is_empty()) else {
                debug!("回次 {} 链接为空, 跳过", number);
                continue;
            };
            let url = match page_url.join(href.trim()) {
                Ok(url) => url,
                Err(e) => {
                    warn!("回次 {} 链接无效 {}: {}", number, href, e);
                    continue;
                }
            };

            episodes.push(Episode {
                title: stripped_text_excluding(link, "span"),
                number,
                url,
            });
        }

        info!("共解析到 {} 个回次", episodes.len());
        Ok(episodes)
    }

    #[instrument(skip_all)]
    pub fn chapter_text(&self, html: &str) -> Result<String> {
        let document = Html::parse_document(html);
        let Some(body) = document.select(&self.selectors.body).next() else {
            anyhow::bail!("未找到正文区域");
        };
        Ok(text_lines(body))
    }
}
