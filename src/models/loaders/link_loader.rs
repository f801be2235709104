use crate::models::record::TargetLink;
use anyhow::{Context, Result};
use lopdf::{Document, Object};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use tokio::fs;
use tracing::{debug, info, warn};

/// 被视为图纸链接的关键字（不区分大小写）
const DRAWING_KEYWORD: &str = "drawing";

#[derive(Debug, Deserialize)]
struct LinkList {
    links: Vec<String>,
}

/// 纯文本中的 http(s) 链接
fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s"'<>()\[\]]+"#).expect("valid regex"))
}

/// 从源文档中提取待处理的链接
///
/// - `.toml`：读取 `links = [...]`
/// - `.pdf`：读取链接注释中的 URI
/// - 其他：提取文本中所有 http(s) 链接
///
/// 图纸链接会被排除。读取或解析失败时返回空列表，不返回错误。
pub async fn load_links(source_path: &Path) -> Vec<TargetLink> {
    match read_links(source_path).await {
        Ok(links) => {
            info!(
                "✓ 从 {} 提取到 {} 个链接",
                source_path.display(),
                links.len()
            );
            links
        }
        Err(e) => {
            warn!("提取链接失败 {}: {:#}", source_path.display(), e);
            Vec::new()
        }
    }
}

async fn read_links(source_path: &Path) -> Result<Vec<TargetLink>> {
    let bytes = fs::read(source_path)
        .await
        .with_context(|| format!("无法读取文件: {}", source_path.display()))?;

    let extension = source_path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());

    let uris = match extension.as_deref() {
        Some("toml") => {
            let content = String::from_utf8(bytes)
                .with_context(|| format!("文件不是 UTF-8 编码: {}", source_path.display()))?;
            parse_toml_links(&content)
                .with_context(|| format!("无法解析TOML文件: {}", source_path.display()))?
        }
        Some("pdf") => {
            let uris = extract_pdf_uris(&bytes)
                .with_context(|| format!("无法解析PDF文件: {}", source_path.display()))?;
            if uris.is_empty() {
                warn!("PDF 中没有链接注释: {}", source_path.display());
            }
            uris
        }
        _ => extract_text_urls(&String::from_utf8_lossy(&bytes)),
    };

    Ok(filter_drawing_links(uris))
}

fn parse_toml_links(content: &str) -> Result<Vec<String>> {
    let list: LinkList = toml::from_str(content)?;
    Ok(list.links)
}

/// 按页面顺序提取 PDF 链接注释（`/Annots` → `/A` → `/URI`）中的 URI
///
/// 支持对象流中的注释和十六进制字符串
pub fn extract_pdf_uris(bytes: &[u8]) -> Result<Vec<String>> {
    let doc = Document::load_mem(bytes).context("PDF 文档结构无效")?;

    let mut uris = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .with_context(|| format!("第 {} 页不是字典对象", page_number))?;

        let Some(annots) = page
            .get(b"Annots")
            .ok()
            .and_then(|annots| resolve(&doc, annots))
            .and_then(|annots| annots.as_array().ok())
        else {
            continue;
        };

        for annot in annots {
            if let Some(uri) = annotation_uri(&doc, annot) {
                uris.push(uri);
            }
        }
    }
    debug!("PDF 共 {} 页，提取到 {} 个 URI", doc.get_pages().len(), uris.len());
    Ok(uris)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn annotation_uri(doc: &Document, annot: &Object) -> Option<String> {
    let annot = resolve(doc, annot)?.as_dict().ok()?;
    let action = resolve(doc, annot.get(b"A").ok()?)?.as_dict().ok()?;
    let uri = resolve(doc, action.get(b"URI").ok()?)?.as_str().ok()?;
    Some(String::from_utf8_lossy(uri).into_owned())
}

/// 提取文本中的 http(s) 链接
pub fn extract_text_urls(content: &str) -> Vec<String> {
    url_regex()
        .find_iter(content)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string())
        .collect()
}

/// 排除图纸链接，保持原有顺序
pub fn filter_drawing_links(uris: Vec<String>) -> Vec<TargetLink> {
    uris.into_iter()
        .map(|uri| uri.trim().to_string())
        .filter(|uri| !uri.is_empty())
        .filter(|uri| {
            let is_drawing = uri.to_lowercase().contains(DRAWING_KEYWORD);
            if is_drawing {
                debug!("跳过图纸链接: {}", uri);
            }
            !is_drawing
        })
        .map(TargetLink::new)
        .collect()
}
