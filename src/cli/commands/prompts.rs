use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::PromptConfig;
use crate::prompts::langfuse::CreatePrompt;
use crate::prompts::{source_from_config, FilePromptSource, LangfuseClient, PromptId, PromptSource};

#[derive(Subcommand)]
pub enum PromptCommands {
    #[command(about = "Create every catalog prompt in Langfuse from local template files")]
    Upload {
        #[arg(long, help = "Template directory (defaults to PROMPTS_DIR)")]
        dir: Option<PathBuf>,
    },

    #[command(about = "Resolve every catalog prompt from the configured source")]
    Check,
}

pub async fn handle(cmd: PromptCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = PromptConfig::from_env().context("Invalid prompt configuration")?;

    match cmd {
        PromptCommands::Upload { dir } => {
            let dir = dir.unwrap_or_else(|| config.dir.clone());
            let client = LangfuseClient::from_config(&config.langfuse)?;
            upload(&FilePromptSource::new(dir), &client, &output_format).await
        }
        PromptCommands::Check => {
            let source = source_from_config(&config)?;
            check(source.as_ref(), &output_format).await
        }
    }
}

async fn upload(
    files: &FilePromptSource,
    client: &LangfuseClient,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    let mut created = 0usize;
    let mut failed = 0usize;

    for id in PromptId::catalog() {
        let name = id.name();
        let result = match files.get(id).await {
            Ok(template) => client.create_prompt(&CreatePrompt::for_catalog(id, template.text)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                created += 1;
                output_success(output_format, &format!("Created {}", name), None)?;
            }
            Err(e) => {
                failed += 1;
                output_error(output_format, &format!("{}: {}", name, e), Some("UPLOAD_FAILED"))?;
            }
        }
    }

    output_success(
        output_format,
        &format!("Uploaded {} prompts, {} failed", created, failed),
        Some(json!({ "created": created, "failed": failed })),
    )?;

    if failed > 0 {
        bail!("{} prompt(s) failed to upload", failed);
    }
    Ok(())
}

async fn check(source: &dyn PromptSource, output_format: &OutputFormat) -> anyhow::Result<()> {
    let mut missing = Vec::new();

    for id in PromptId::catalog() {
        if let Err(e) = source.get(id).await {
            output_error(output_format, &e.to_string(), Some("PROMPT_UNRESOLVED"))?;
            missing.push(id.name());
        }
    }

    if !missing.is_empty() {
        bail!("{} prompt(s) could not be resolved: {}", missing.len(), missing.join(", "));
    }

    output_success(
        output_format,
        &format!("All {} prompts resolved", PromptId::catalog().len()),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn shipped_templates() -> FilePromptSource {
        FilePromptSource::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("prompts"))
    }

    #[tokio::test]
    async fn test_upload_posts_every_catalog_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/public/v2/prompts"))
            .and(header("authorization", "Basic cGs6c2s="))
            .and(body_partial_json(serde_json::json!({ "type": "text", "labels": ["production"] })))
            .respond_with(ResponseTemplate::new(201))
            .expect(PromptId::catalog().len() as u64)
            .mount(&server)
            .await;

        let client = LangfuseClient::new(server.uri(), "pk".into(), "sk".into());
        upload(&shipped_templates(), &client, &OutputFormat::Json).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_continues_past_a_failure_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/public/v2/prompts"))
            .and(body_partial_json(serde_json::json!({ "name": "image/prompt-idea" })))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/public/v2/prompts"))
            .respond_with(ResponseTemplate::new(201))
            .expect(PromptId::catalog().len() as u64 - 1)
            .mount(&server)
            .await;

        let client = LangfuseClient::new(server.uri(), "pk".into(), "sk".into());
        let err = upload(&shipped_templates(), &client, &OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 prompt(s) failed"));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_check_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("image-prompt.txt"), "x").unwrap();

        let source = FilePromptSource::new(dir.path());
        let err = check(&source, &OutputFormat::Json).await.unwrap_err();
        assert!(err.to_string().contains("bridge-to-image/message"));
        assert!(!err.to_string().contains("image/prompt-idea"));
    }

    #[tokio::test]
    async fn test_check_passes_on_shipped_templates() {
        check(&shipped_templates(), &OutputFormat::Json).await.unwrap();
    }
}
