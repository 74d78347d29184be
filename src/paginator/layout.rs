use tracing::warn;

/// 文字宽度测量（像素）
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> f32;
}

/// 单行折行：宽度不超出时原样返回，否则按空白分词贪心装箱
///
/// 单词本身超宽时不再强制断开，只记录警告。
pub fn process_line<M: TextMeasure + ?Sized>(
    line: &str,
    measure: &M,
    available_width: f32,
) -> Vec<String> {
    if line.trim().is_empty() || measure.text_width(line) <= available_width {
        return vec![line.to_owned()];
    }

    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_width = 0.0;

    for word in line.split_whitespace() {
        let word_width = measure.text_width(&format!("{} ", word));
        if current.is_empty() || current_width + word_width <= available_width {
            current.push(word);
            current_width += word_width;
        } else {
            lines.push(current.join(" "));
            current = vec![word];
            current_width = word_width;
        }
    }
    if !current.is_empty() {
        lines.push(current.join(" "));
    }

    for wrapped in &lines {
        if measure.text_width(wrapped) > available_width {
            warn!(
                "行宽超出可用宽度: {}...",
                wrapped.chars().take(50).collect::<String>()
            );
        }
    }
    lines
}

/// 对全文逐行折行，行尾的 `\r` 会被去掉
pub fn process_text<M: TextMeasure + ?Sized>(
    text: &str,
    measure: &M,
    available_width: f32,
) -> Vec<String> {
    text.split('\n')
        .flat_map(|line| process_line(line.trim_end_matches('\r'), measure, available_width))
        .collect()
}

/// 按固定行数分页，最后一页保留剩余全部行
pub fn split_into_pages(lines: Vec<String>, lines_per_page: usize) -> Vec<Vec<String>> {
    let lines_per_page = lines_per_page.max(1);
    let mut pages = Vec::with_capacity(lines.len().div_ceil(lines_per_page));
    let mut iter = lines.into_iter().peekable();
    while iter.peek().is_some() {
        pages.push(iter.by_ref().take(lines_per_page).collect());
    }
    pages
}
