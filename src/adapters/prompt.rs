use crate::utils::error::Result;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static FRONTMATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---\r?\n(.*?)\r?\n---").expect("FRONTMATTER_RE: hardcoded regex is valid")
});

static FOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^folder:[ \t]*(.+?)[ \t]*\r?$").expect("FOLDER_RE: hardcoded regex is valid")
});

pub const DEFAULT_FOLDER: &str = "default";

/// 系統提示檔。開頭的 `---` 區塊可用 `folder:` 指定輸出子目錄。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFile {
    pub text: String,
    pub folder: Option<String>,
}

impl PromptFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(text))
    }

    pub fn parse(text: String) -> Self {
        let folder = FRONTMATTER_RE
            .captures(&text)
            .and_then(|frontmatter| {
                FOLDER_RE
                    .captures(frontmatter.get(1)?.as_str())
                    .map(|caps| caps[1].to_string())
            })
            .filter(|folder| !folder.is_empty());

        Self { text, folder }
    }

    pub fn output_folder(&self) -> &str {
        self.folder.as_deref().unwrap_or(DEFAULT_FOLDER)
    }
}
