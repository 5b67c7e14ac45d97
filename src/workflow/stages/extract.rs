//! 提取阶段：取得原始文本并按标题识别九个章节

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use phf::phf_map;
use regex::Regex;
use tracing::debug;

use crate::clients::TextExtractor;
use crate::error::StageError;
use crate::models::{ExtractionResult, Section, StageKind, StagePayload, StageResult};
use crate::workflow::context::WorkflowContext;
use crate::workflow::stage::Stage;

/// 标题关键字 -> 章节
static SECTION_HEADINGS: phf::Map<&'static str, Section> = phf_map! {
    "introduction" => Section::Introduction,
    "background" => Section::Introduction,
    "content" => Section::Content,
    "contents" => Section::Content,
    "main content" => Section::Content,
    "body" => Section::Content,
    "discussion" => Section::Content,
    "references" => Section::References,
    "bibliography" => Section::References,
    "citations" => Section::Citations,
    "citation" => Section::Citations,
    "works cited" => Section::Citations,
    "data" => Section::Data,
    "data analysis" => Section::Data,
    "results" => Section::Data,
    "tables" => Section::Tables,
    "table" => Section::Tables,
    "images" => Section::Images,
    "figures" => Section::Images,
    "recommendations" => Section::Recommendations,
    "recommendation" => Section::Recommendations,
    "summary" => Section::Summary,
    "conclusion" => Section::Summary,
    "conclusions" => Section::Summary,
};

/// 标题行：可选的 markdown `#`、编号前缀和结尾冒号
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#+\s*)?(?:\d+(?:\.\d+)*[.)]?\s+)?([A-Za-z][A-Za-z ]*?)\s*:?\s*$").unwrap()
});

fn heading_section(line: &str) -> Option<Section> {
    let caps = HEADING_RE.captures(line)?;
    let key = caps.get(1)?.as_str().to_ascii_lowercase();
    SECTION_HEADINGS.get(key.as_str()).copied()
}

/// 按标题切分章节；同一章节出现多次时拼接
///
/// 没有任何可识别标题时，全文视为正文
pub fn detect_sections(raw_text: &str) -> BTreeMap<Section, Option<String>> {
    let mut bodies: BTreeMap<Section, Vec<&str>> = BTreeMap::new();
    let mut current: Option<Section> = None;

    for line in raw_text.lines() {
        if let Some(section) = heading_section(line) {
            bodies.entry(section).or_default();
            current = Some(section);
        } else if let Some(section) = current {
            bodies.entry(section).or_default().push(line);
        }
    }

    if bodies.is_empty() {
        bodies.insert(Section::Content, raw_text.lines().collect());
    }

    Section::ALL
        .into_iter()
        .map(|section| {
            let body = bodies
                .get(&section)
                .map(|lines| lines.join("\n").trim().to_string());
            (section, body)
        })
        .collect()
}

pub struct ExtractStage {
    extractor: Arc<dyn TextExtractor>,
}

impl ExtractStage {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Stage for ExtractStage {
    fn kind(&self) -> StageKind {
        StageKind::Extract
    }

    async fn run(&self, ctx: &WorkflowContext) -> Result<StageResult, StageError> {
        let raw_text = self.extractor.extract(&ctx.submission.source).await?;
        let sections = detect_sections(&raw_text);
        let content_tags: BTreeSet<String> = sections
            .iter()
            .filter(|(_, body)| body.is_some())
            .map(|(section, _)| section.as_str().to_string())
            .collect();

        debug!(
            "{} 提取 {} 字符，识别章节: {:?}",
            ctx.submission,
            raw_text.chars().count(),
            content_tags
        );

        Ok(StageResult::ok(StagePayload::Extraction(ExtractionResult {
            raw_text,
            sections,
            content_tags,
        })))
    }
}
