use super::escape_xml;

static XHTML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
"#;

#[derive(Debug, Clone)]
pub struct Chapter {
    pub index: usize,
    pub title: String,
    pub filename: String,
    pub content: String,
}

impl Chapter {
    pub fn new(index: usize, title: String, content: String) -> Self {
        Self {
            index,
            filename: format!("chap_{}.xhtml", index),
            title,
            content,
        }
    }

    /// 正文原样放进 `<pre>`，保留换行
    pub fn xhtml(&self, lang: &str) -> String {
        let title = escape_xml(&self.title);
        let mut xhtml = String::from(XHTML_HEAD);
        xhtml.push_str(&format!(
            r#"<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{}">
<head>
    <title>{}</title>
    <meta http-equiv="Content-Type" content="text/html; charset=UTF-8"/>
</head>
<body>
<h2>{}</h2><pre>"#,
            escape_xml(lang),
            title,
            title
        ));
        xhtml.push_str(&escape_xml(&self.content));
        xhtml.push_str(
            r#"</pre>
</body>
</html>"#,
        );
        xhtml
    }
}
