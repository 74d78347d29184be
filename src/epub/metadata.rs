use tracing::{info, instrument};

use super::{Epub, escape_xml};

pub static CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

pub struct Metadata;

impl Metadata {
    /// 生成content.opf内容
    #[instrument(skip_all)]
    pub fn content_opf(epub: &Epub) -> String {
        info!("正在生成content.opf");
        let mut content_opf = String::new();
        Self::opf_header(&mut content_opf);
        Self::opf_metadata(&mut content_opf, epub);
        Self::opf_manifest(&mut content_opf, epub);
        Self::opf_spine(&mut content_opf, epub);
        Self::opf_footer(&mut content_opf);
        content_opf
    }

    /// 生成toc.ncx内容（扁平结构）
    #[instrument(skip_all)]
    pub fn toc_ncx(epub: &Epub) -> String {
        info!("正在生成toc.ncx");
        let mut toc_ncx = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx version="2005-1" xmlns="http://www.daisy.org/z3986/2005/ncx/">
    <head>
        <meta name="dtb:uid" content="{}"/>
        <meta name="dtb:depth" content="1"/>
        <meta name="dtb:totalPageCount" content="0"/>
        <meta name="dtb:maxPageNumber" content="0"/>
    </head>
    <docTitle>
        <text>{}</text>
    </docTitle>
    <navMap>"#,
            escape_xml(&epub.id),
            escape_xml(&epub.title)
        );

        for (order, chapter) in epub.chapters.iter().enumerate() {
            toc_ncx.push_str(&format!(
                r#"
        <navPoint id="navPoint{0}" playOrder="{0}">
            <navLabel>
                <text>{1}</text>
            </navLabel>
            <content src="Text/{2}"/>
        </navPoint>"#,
                order + 1,
                escape_xml(&chapter.title),
                chapter.filename
            ));
        }

        toc_ncx.push_str(
            r#"
    </navMap>
</ncx>"#,
        );
        toc_ncx
    }

    fn opf_header(content_opf: &mut String) {
        content_opf.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="2.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId">"#,
        );
    }

    fn opf_metadata(content_opf: &mut String, epub: &Epub) {
        content_opf.push_str(&format!(
            r#"
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
        <dc:identifier id="BookId">{}</dc:identifier>
        <dc:title>{}</dc:title>
        <dc:language>{}</dc:language>
        <dc:creator opf:role="aut">{}</dc:creator>"#,
            escape_xml(&epub.id),
            escape_xml(&epub.title),
            escape_xml(&epub.lang),
            escape_xml(&epub.author)
        ));

        if !epub.publisher.is_empty() {
            content_opf.push_str(&format!(
                r#"
        <dc:publisher>{}</dc:publisher>"#,
                escape_xml(&epub.publisher)
            ));
        }
        if !epub.genre.is_empty() {
            content_opf.push_str(&format!(
                r#"
        <dc:subject>{}</dc:subject>"#,
                escape_xml(&epub.genre)
            ));
        }

        content_opf.push_str(&format!(
            r#"
        <dc:date>{}</dc:date>
        <meta name="generator" content="booktoki-fetch"/>
    </metadata>"#,
            chrono::Local::now().format("%Y-%m-%d")
        ));
    }

    fn opf_manifest(content_opf: &mut String, epub: &Epub) {
        content_opf.push_str(
            r#"
    <manifest>
        <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#,
        );
        for chapter in &epub.chapters {
            content_opf.push_str(&format!(
                r#"
        <item id="chap{}" href="Text/{}" media-type="application/xhtml+xml"/>"#,
                chapter.index, chapter.filename
            ));
        }
        content_opf.push_str(
            r#"
    </manifest>"#,
        );
    }

    fn opf_spine(content_opf: &mut String, epub: &Epub) {
        content_opf.push_str(
            r#"
    <spine toc="ncx">"#,
        );
        for chapter in &epub.chapters {
            content_opf.push_str(&format!(
                r#"
        <itemref idref="chap{}"/>"#,
                chapter.index
            ));
        }
        content_opf.push_str(
            r#"
    </spine>"#,
        );
    }

    fn opf_footer(content_opf: &mut String) {
        content_opf.push_str(
            r#"
</package>"#,
        );
    }
}
