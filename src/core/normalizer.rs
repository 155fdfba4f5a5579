use ego_tree::{NodeId, NodeRef};
use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, LinkStyle, Options};
use htmd::HtmlToMarkdown;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

fn compile(selector: &str) -> Selector {
    Selector::parse(selector).expect("hardcoded selector is valid")
}

static MEDIA_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile("img, video, iframe, style, script, noscript"));

static REGION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    compile(".ad, .advertisement, .sidebar, .footer, .navigation, .menu, .header-image")
});

static SKIN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile(".wp-block-verse"));

static CAPTION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile(".wp-caption-text, .gallery-caption"));

/// 由最具體到最寬鬆
static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        ".entry-content",
        "article .post-content",
        ".content-area",
        "main",
        "article div:nth-child(2)",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

static ARTICLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile("article"));

static EXCESS_NEWLINES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n{3,}").expect("EXCESS_NEWLINES_RE: hardcoded regex is valid")
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

// 空的表格結構保留，避免欄位錯位
const TABLE_ELEMENTS: &[&str] = &["table", "thead", "tbody", "tfoot", "tr", "td", "th"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// false 時移除 `.wp-block-verse`（造型 / skin 區塊）
    pub include_skins: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            include_skins: true,
        }
    }
}

/// 完整的文章頁 HTML → markdown 內文
pub fn extract_main_content(html: &str, options: NormalizeOptions) -> String {
    let cleaned = clean_html(html, options);
    html_to_markdown(&cleaned)
}

/// 移除非內容元素、去掉樣式屬性，回傳內容容器的 inner HTML。
/// scraper 的樹是唯讀的，所以先收集要丟掉的 NodeId，序列化時跳過。
pub fn clean_html(html: &str, options: NormalizeOptions) -> String {
    let document = Html::parse_document(html);

    let mut to_remove: HashSet<NodeId> = HashSet::new();
    collect(&document, &MEDIA_SELECTOR, &mut to_remove);
    collect(&document, &REGION_SELECTOR, &mut to_remove);
    if !options.include_skins {
        collect(&document, &SKIN_SELECTOR, &mut to_remove);
    }
    collect(&document, &CAPTION_SELECTOR, &mut to_remove);

    let container = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| first_kept(&document, selector, &to_remove))
        .or_else(|| first_kept(&document, &ARTICLE_SELECTOR, &to_remove));

    let Some(container) = container else {
        tracing::debug!("No content container found");
        return String::new();
    };

    let mut output = String::new();
    serialize_children(*container, &to_remove, &mut output);
    output
}

/// HTML → markdown：ATX 標題、fenced code、`-` 清單、`**粗體**`、`*斜體*`、行內連結，不輸出圖片
pub fn html_to_markdown(html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["img"])
        .options(Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            bullet_list_marker: BulletListMarker::Dash,
            link_style: LinkStyle::Inlined,
            ..Default::default()
        })
        .build();

    let markdown = match converter.convert(html) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::warn!("⚠️ Markdown conversion failed, falling back to plain text: {}", e);
            Html::parse_fragment(html).root_element().text().collect()
        }
    };

    collapse_blank_lines(&markdown)
}

/// 三個以上連續換行壓成兩個
pub fn collapse_blank_lines(markdown: &str) -> String {
    EXCESS_NEWLINES_RE
        .replace_all(markdown, "\n\n")
        .trim_matches('\n')
        .to_string()
}

fn collect(document: &Html, selector: &Selector, to_remove: &mut HashSet<NodeId>) {
    to_remove.extend(document.select(selector).map(|element| element.id()));
}

fn first_kept<'a>(
    document: &'a Html,
    selector: &Selector,
    to_remove: &HashSet<NodeId>,
) -> Option<ElementRef<'a>> {
    document
        .select(selector)
        .find(|element| !is_removed(element, to_remove))
}

fn is_removed(element: &ElementRef, to_remove: &HashSet<NodeId>) -> bool {
    to_remove.contains(&element.id()) || element.ancestors().any(|a| to_remove.contains(&a.id()))
}

fn is_presentation_attr(name: &str) -> bool {
    matches!(name, "class" | "style" | "id") || name.starts_with("data-")
}

fn has_content(node: NodeRef<'_, Node>, to_remove: &HashSet<NodeId>) -> bool {
    node.children().any(|child| {
        if to_remove.contains(&child.id()) {
            return false;
        }
        match child.value() {
            Node::Text(text) => !text.trim().is_empty(),
            Node::Element(element) => {
                VOID_ELEMENTS.contains(&element.name()) || has_content(child, to_remove)
            }
            _ => false,
        }
    })
}

fn serialize_children(node: NodeRef<'_, Node>, to_remove: &HashSet<NodeId>, output: &mut String) {
    for child in node.children() {
        if to_remove.contains(&child.id()) {
            continue;
        }

        match child.value() {
            Node::Text(text) => escape_into(text, output, false),
            Node::Element(element) => {
                let name = element.name();

                // 移除圖片後變空的元素整個略過：行內元素變成空字串，
                // 區塊元素只剩前後段落間的空行，不會留下 `## ` 或 `-`
                if !VOID_ELEMENTS.contains(&name)
                    && !TABLE_ELEMENTS.contains(&name)
                    && !has_content(child, to_remove)
                {
                    continue;
                }

                output.push('<');
                output.push_str(name);
                for (attr, value) in element.attrs() {
                    if is_presentation_attr(attr) {
                        continue;
                    }
                    output.push(' ');
                    output.push_str(attr);
                    output.push_str("=\"");
                    escape_into(value, output, true);
                    output.push('"');
                }
                output.push('>');

                if VOID_ELEMENTS.contains(&name) {
                    continue;
                }

                serialize_children(child, to_remove, output);
                output.push_str("</");
                output.push_str(name);
                output.push('>');
            }
            _ => {}
        }
    }
}

fn escape_into(text: &str, output: &mut String, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if attribute => output.push_str("&quot;"),
            c => output.push(c),
        }
    }
}
