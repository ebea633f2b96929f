//! Completion command handler.

use super::CompleteArgs;
use super::pricing::{load_config, pricing_table};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use vasari::{
    CompletionExecutor, CompletionRequest, ConfigError, ConfigErrorKind, CostAccountant,
    CostAccumulator, ImageInput, JsonError, JsonErrorKind, MetricsCostSink, ResponseExpectation,
    ResponseSchema, StructuredResult, VasariResult,
};

/// Run one completion and print the answer followed by its cost.
#[instrument(skip_all, fields(model = %args.model, provider = ?args.provider))]
pub async fn run_complete(args: CompleteArgs) -> VasariResult<()> {
    let config = load_config(args.provider)?;
    let key_var = args.provider.key_var();
    let api_key = std::env::var(key_var)
        .map_err(|_| ConfigError::new(ConfigErrorKind::MissingEnv(key_var.to_string())))?;

    let total = Arc::new(CostAccumulator::new());
    let executor = CompletionExecutor::from_config(
        &config,
        args.provider.config_name(),
        &api_key,
        "",
        pricing_table(args.provider, &config).await?,
        CostAccountant::new()
            .with_sink(total.clone())
            .with_sink(Arc::new(MetricsCostSink::new())),
    )?;

    let request = build_request(&args)?;
    info!(approx_tokens = request.approx_tokens(), "Sending completion");

    let result = if args.cached {
        executor.complete_cached(request).await?
    } else {
        executor.complete(request).await?
    };

    println!("{}", render(&result)?);
    eprintln!("cost: ${:.6}", total.total());
    Ok(())
}

/// Request described by the command-line arguments.
fn build_request(args: &CompleteArgs) -> VasariResult<CompletionRequest> {
    let mut builder = CompletionRequest::builder();
    builder.prompt(args.prompt.as_str()).model(args.model.as_str());
    if let Some(max_tokens) = args.max_tokens {
        builder.max_tokens(max_tokens);
    }
    if let Some(temperature) = args.temperature {
        builder.temperature(temperature);
    }
    for path in &args.images {
        builder.image(ImageInput::open(path)?);
    }
    if let Some(path) = &args.schema {
        builder.expectation(ResponseExpectation::Structured(load_schema(path)?));
    }
    builder.build()
}

/// Read a JSON schema file.
///
/// The schema's `title` names it, falling back to the file stem; its
/// `description` is used when present.
fn load_schema(path: &Path) -> VasariResult<ResponseSchema> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::new(ConfigErrorKind::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    })?;
    let schema: Value = serde_json::from_str(&text).map_err(|e| {
        JsonError::new(JsonErrorKind::Decode(format!("{}: {}", path.display(), e)))
    })?;

    let name = schema
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "response".to_string());
    let description = schema
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Schema from {}", path.display()));

    Ok(ResponseSchema::new(name, description, schema))
}

fn render(result: &StructuredResult) -> VasariResult<String> {
    match result {
        StructuredResult::Text(text) => Ok(text.clone()),
        StructuredResult::Structured(value) => serde_json::to_string_pretty(value)
            .map_err(|e| JsonError::new(JsonErrorKind::Encode(e.to_string())).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Provider;
    use serde_json::json;

    fn args() -> CompleteArgs {
        CompleteArgs {
            model: "openai/gpt-4o".to_string(),
            prompt: "What is the capital of Japan?".to_string(),
            images: Vec::new(),
            schema: None,
            max_tokens: Some(256),
            temperature: None,
            cached: false,
            provider: Provider::OpenRouter,
        }
    }

    #[test]
    fn schema_name_comes_from_title_or_file_stem() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let titled = dir.path().join("a.json");
        std::fs::write(&titled, r#"{"title": "Capital", "type": "object"}"#)?;
        let untitled = dir.path().join("city.json");
        std::fs::write(&untitled, r#"{"type": "object", "description": "A city"}"#)?;

        let schema = load_schema(&titled)?;
        assert_eq!(schema.name(), "Capital");
        assert!(schema.description().starts_with("Schema from"));

        let schema = load_schema(&untitled)?;
        assert_eq!(schema.name(), "city");
        assert_eq!(schema.description(), "A city");
        Ok(())
    }

    #[test]
    fn malformed_schema_file_is_a_json_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json")?;

        let err = load_schema(&path).expect_err("not json");
        assert!(matches!(
            err.kind(),
            vasari::VasariErrorKind::Json(e) if matches!(e.kind, JsonErrorKind::Decode(_))
        ));
        Ok(())
    }

    #[test]
    fn request_carries_the_arguments() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("capital.json");
        std::fs::write(&path, json!({"type": "object"}).to_string())?;

        let mut args = args();
        args.schema = Some(path);
        let request = build_request(&args)?;

        assert_eq!(request.model(), "openai/gpt-4o");
        assert_eq!(*request.max_tokens(), 256);
        assert_eq!(*request.temperature(), 1.0);
        assert_eq!(request.expectation().schema().map(|s| s.name().as_str()), Some("capital"));
        Ok(())
    }

    #[test]
    fn structured_results_render_as_pretty_json() -> anyhow::Result<()> {
        let rendered = render(&StructuredResult::Structured(json!({"city": "Tokyo"})))?;
        assert_eq!(rendered, "{\n  \"city\": \"Tokyo\"\n}");
        assert_eq!(render(&StructuredResult::Text("Tokyo".to_string()))?, "Tokyo");
        Ok(())
    }
}
