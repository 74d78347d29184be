/// 有序、大小写不敏感的子串匹配集合
///
/// 用于识别拦截页文案，也用于识别验证框 iframe 的 URL。
#[derive(Debug, Clone)]
pub struct ChallengeDetector {
    phrases: Vec<String>,
}

impl ChallengeDetector {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut detector = Self {
            phrases: Vec::new(),
        };
        for phrase in phrases {
            detector.push(phrase);
        }
        detector
    }

    /// 追加一个短语，空串和重复项会被忽略
    pub fn push(&mut self, phrase: impl AsRef<str>) {
        let phrase = phrase.as_ref().trim().to_lowercase();
        if phrase.is_empty() || self.phrases.contains(&phrase) {
            return;
        }
        self.phrases.push(phrase);
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// 按配置顺序返回所有命中的短语
    pub fn matches(&self, haystack: &str) -> Vec<&str> {
        let haystack = haystack.to_lowercase();
        self.phrases
            .iter()
            .filter(|phrase| haystack.contains(phrase.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        let haystack = haystack.to_lowercase();
        self.phrases
            .iter()
            .any(|phrase| haystack.contains(phrase.as_str()))
    }
}
