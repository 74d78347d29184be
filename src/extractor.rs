use scraper::{ElementRef, Selector};
use serde::{Deserialize, Deserializer};

/// 站点页面中固定区域的选择器，可在 `[site]` 配置段中覆盖
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    #[serde(deserialize_with = "deserialize_selector")]
    pub info: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub view_content: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub title: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub publisher_icon: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub genre_icon: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub author_icon: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub episode_form: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub episode_list: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub episode_item: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub episode_number: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub episode_link: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub body: Selector,
    #[serde(deserialize_with = "deserialize_selector")]
    pub captcha_form: Selector,
    pub captcha_action: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            info: selector("div.col-sm-8"),
            view_content: selector("div.view-content"),
            title: selector("span"),
            publisher_icon: selector("i.fa.fa-building-o"),
            genre_icon: selector("i.fa.fa-tag"),
            author_icon: selector("i.fa.fa-user"),
            episode_form: selector("form#serial-move"),
            episode_list: selector("ul.list-body"),
            episode_item: selector("li.list-item"),
            episode_number: selector("div.wr-num"),
            episode_link: selector("div.wr-subject > a"),
            body: selector("div#novel_content"),
            captcha_form: selector("div.form-body > form.form"),
            captcha_action: "captcha_check.php".to_owned(),
        }
    }
}

fn selector(s: &str) -> Selector {
    Selector::parse(s).expect("内置选择器无效")
}

fn deserialize_selector<'de, D>(deserializer: D) -> Result<Selector, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;

    Selector::parse(&s).map_err(|e| serde::de::Error::custom(format!("Invalid selector: {}", e)))
}

/// 图标元素之后第一个非空的兄弟文本
///
/// 兄弟节点若是元素，只有当它只包含唯一一个文本后代链时才取其文本。
pub fn text_after_icon(icon: ElementRef) -> Option<String> {
    for sibling in icon.next_siblings() {
        let text = match sibling.value().as_text() {
            Some(text) => Some(&**text),
            None => ElementRef::wrap(sibling).and_then(single_string),
        };
        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            return Some(text.to_owned());
        }
    }
    None
}

fn single_string(elem: ElementRef<'_>) -> Option<&str> {
    let mut children = elem.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    if let Some(text) = only.value().as_text() {
        return Some(&**text);
    }
    ElementRef::wrap(only).and_then(single_string)
}

/// 所有文本节点去除首尾空白后直接拼接
pub fn stripped_text(elem: ElementRef) -> String {
    elem.text().map(str::trim).filter(|t| !t.is_empty()).collect()
}

/// 同 [`stripped_text`]，但跳过嵌套在 `tag` 元素内的文本
pub fn stripped_text_excluding(elem: ElementRef, tag: &str) -> String {
    elem.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let nested = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != elem.id())
                .any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|e| e.name() == tag)
                });
            (!nested).then(|| text.trim())
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// 每个文本节点去除首尾空白后单独成行，丢弃空行
pub fn text_lines(elem: ElementRef) -> String {
    elem.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
