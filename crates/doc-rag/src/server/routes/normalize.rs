//! Normalization endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use uuid::Uuid;

use super::Form;
use crate::error::{Error, Result};
use crate::ingestion::split_extracts;
use crate::normalizer::{ensure_xml, OutputFormat, XmlNormalizer};
use crate::server::state::AppState;
use crate::types::{NormalizeResponse, ProcessingMode};

/// Output format from a format name or a mode label; pretty XML when absent
fn parse_format(value: Option<&str>) -> Result<OutputFormat> {
    let Some(value) = value else {
        return Ok(OutputFormat::PrettyXml);
    };
    OutputFormat::parse(value)
        .or_else(|| ProcessingMode::parse(value).and_then(OutputFormat::for_mode))
        .ok_or_else(|| Error::Config(format!("Unknown output format '{}'", value)))
}

/// Tag names separated by commas or whitespace
fn parse_tags(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// POST /api/normalize - Multipart `document`, optional `format` and `remove_tags`
pub async fn normalize(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<NormalizeResponse>> {
    let form = Form::read(multipart).await?;

    let upload = form.file("document")?;
    let filename = upload
        .filename
        .as_deref()
        .and_then(|n| std::path::Path::new(n).file_name())
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| Error::UnsupportedFileType("document has no file name".to_string()))?;
    ensure_xml(&filename)?;

    let format = parse_format(form.text("format").as_deref())?;
    let mut config = state.config().normalizer.clone();
    let tags = parse_tags(form.text("remove_tags").as_deref());
    if !tags.is_empty() {
        config.remove_tags = tags;
    }

    // One directory per request keeps artifacts of equally named uploads apart
    let request_dir = state
        .config()
        .server
        .work_dir
        .join("normalize")
        .join(Uuid::new_v4().to_string());
    tokio::fs::create_dir_all(&request_dir).await?;
    let source = request_dir.join(&filename);
    tokio::fs::write(&source, &upload.data).await?;

    let artifact_path = XmlNormalizer::new(config).normalize(&source, format).await?;
    let content = tokio::fs::read_to_string(&artifact_path).await?;

    Ok(Json(NormalizeResponse {
        line_count: split_extracts(&content).len(),
        artifact_path,
        content,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{serve, stub_state};
    use super::*;
    use reqwest::multipart::{Form as MultipartForm, Part};
    use serde_json::Value;
    use tempfile::TempDir;

    #[test]
    fn test_parse_format_and_tags() {
        assert_eq!(parse_format(None).unwrap(), OutputFormat::PrettyXml);
        assert_eq!(
            parse_format(Some("direct_json")).unwrap(),
            OutputFormat::DirectJson
        );
        assert_eq!(
            parse_format(Some("XML to JSON")).unwrap(),
            OutputFormat::CleanedJson
        );
        assert!(parse_format(Some("OFFICE File")).is_err());
        assert_eq!(parse_tags(Some("nav, footer  toc")), vec!["nav", "footer", "toc"]);
    }

    #[tokio::test]
    async fn test_normalize_upload() {
        let dir = TempDir::new().unwrap();
        let base = serve(stub_state(&dir, false)).await;

        let form = MultipartForm::new()
            .text("format", "cleaned_json")
            .text("remove_tags", "nav")
            .part(
                "document",
                Part::bytes(b"<doc><nav>Menu</nav><p>Body text</p></doc>".to_vec())
                    .file_name("page.xml"),
            );
        let response: Value = reqwest::Client::new()
            .post(format!("{}/normalize", base))
            .multipart(form)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let content = response["content"].as_str().unwrap();
        assert!(content.contains("Body text"));
        assert!(!content.contains("Menu"));
        assert!(response["artifact_path"]
            .as_str()
            .unwrap()
            .ends_with("page_cleaned_json.txt"));
        assert!(response["line_count"].as_u64().unwrap() > 1);
    }

    #[tokio::test]
    async fn test_rejects_non_xml() {
        let dir = TempDir::new().unwrap();
        let base = serve(stub_state(&dir, false)).await;

        let form = MultipartForm::new()
            .part("document", Part::bytes(b"x".to_vec()).file_name("a.docx"));
        let response = reqwest::Client::new()
            .post(format!("{}/normalize", base))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }
}
