//! Structured response resolution ladder.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use vasari_core::{ResponseExpectation, ResponseSchema, StructuredResult};
use vasari_error::{
    ProviderError, ProviderErrorKind, StructuredErrorKind, VasariErrorKind, VasariResult,
};
use vasari_models::{JsonFixer, StructuredResolver};

fn expectation() -> ResponseExpectation {
    ResponseExpectation::Structured(ResponseSchema::new(
        "Capital",
        "A capital city",
        json!({
            "type": "object",
            "properties": {
                "city": {"type": "string"},
                "population": {"type": "integer"}
            },
            "required": ["city"]
        }),
    ))
}

/// Fixer that answers from a fixed result and records what it was given.
struct RecordingFixer {
    answer: Result<Value, ProviderErrorKind>,
    seen: Mutex<Vec<String>>,
}

impl RecordingFixer {
    fn answering(answer: Value) -> Self {
        Self {
            answer: Ok(answer),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing(kind: ProviderErrorKind) -> Self {
        Self {
            answer: Err(kind),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl JsonFixer for RecordingFixer {
    async fn fix(&self, broken: &str, _schema: &ResponseSchema) -> VasariResult<Value> {
        self.seen.lock().unwrap().push(broken.to_string());
        match &self.answer {
            Ok(value) => Ok(value.clone()),
            Err(kind) => Err(ProviderError::new(kind.clone()).into()),
        }
    }
}

#[tokio::test]
async fn plain_text_passes_through() -> anyhow::Result<()> {
    let result = StructuredResolver::new()
        .resolve("  Tokyo\n", &ResponseExpectation::PlainText, None)
        .await?;
    assert_eq!(result, StructuredResult::Text("  Tokyo\n".to_string()));
    Ok(())
}

#[tokio::test]
async fn valid_json_never_reaches_the_fixer() -> anyhow::Result<()> {
    let fixer = RecordingFixer::answering(json!({"city": "Osaka"}));
    let result = StructuredResolver::new()
        .resolve(
            "Here you go:\n```json\n{\"city\": \"Tokyo\", \"population\": 14000000}\n```",
            &expectation(),
            Some(&fixer),
        )
        .await?;

    assert_eq!(
        result.as_value(),
        Some(&json!({"city": "Tokyo", "population": 14000000}))
    );
    assert!(fixer.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn single_quotes_and_trailing_commas_are_repaired_locally() -> anyhow::Result<()> {
    let fixer = RecordingFixer::answering(json!({"city": "Osaka"}));
    let result = StructuredResolver::new()
        .resolve("{'city': 'Tokyo', 'population': 14000000,}", &expectation(), Some(&fixer))
        .await?;

    assert_eq!(
        result.as_value(),
        Some(&json!({"city": "Tokyo", "population": 14000000}))
    );
    assert!(fixer.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn schema_mismatch_goes_to_the_fixer_once() -> anyhow::Result<()> {
    let fixer = RecordingFixer::answering(json!({"city": "Tokyo"}));
    let result = StructuredResolver::new()
        .resolve("{\"town\": \"Tokyo\"}", &expectation(), Some(&fixer))
        .await?;

    assert_eq!(result.as_value(), Some(&json!({"city": "Tokyo"})));
    assert_eq!(fixer.calls(), vec!["{\"town\": \"Tokyo\"}".to_string()]);
    Ok(())
}

#[tokio::test]
async fn unrequested_keys_go_to_the_fixer() -> anyhow::Result<()> {
    let fixer = RecordingFixer::answering(json!({"city": "Tokyo"}));
    let raw = "{\"city\": \"Tokyo\", \"country\": \"Japan\"}";
    let result = StructuredResolver::new()
        .resolve(raw, &expectation(), Some(&fixer))
        .await?;

    assert_eq!(result.as_value(), Some(&json!({"city": "Tokyo"})));
    assert_eq!(fixer.calls(), vec![raw.to_string()]);
    Ok(())
}

#[tokio::test]
async fn unrequested_keys_fail_validation_without_a_fixer() {
    let raw = "{\"city\": \"Tokyo\", \"country\": \"Japan\"}";
    let err = StructuredResolver::new()
        .resolve(raw, &expectation(), None)
        .await
        .expect_err("extra key");

    match err.kind() {
        VasariErrorKind::Structured(e) => match &e.kind {
            StructuredErrorKind::Validation(reason) => assert!(reason.contains("country")),
            other => panic!("unexpected structured error: {other}"),
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn without_a_fixer_the_ladder_stops_at_repair() {
    let err = StructuredResolver::new()
        .resolve("{\"city\": 42}", &expectation(), None)
        .await
        .expect_err("wrong type");

    match err.kind() {
        VasariErrorKind::Structured(e) => match &e.kind {
            StructuredErrorKind::Validation(reason) => assert!(reason.contains("/city")),
            other => panic!("unexpected structured error: {other}"),
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn fixer_failure_carries_the_raw_text() {
    let fixer = RecordingFixer::failing(ProviderErrorKind::Timeout("slow".to_string()));
    let raw = "```\nnot json at all\n```";
    let err = StructuredResolver::new()
        .resolve(raw, &expectation(), Some(&fixer))
        .await
        .expect_err("fixer failed");

    match err.kind() {
        VasariErrorKind::Structured(e) => match &e.kind {
            StructuredErrorKind::FixExhausted { reason, raw: kept } => {
                assert!(reason.contains("timed out"));
                assert_eq!(kept, raw);
            }
            other => panic!("unexpected structured error: {other}"),
        },
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fixer.calls(), vec!["not json at all".to_string()]);
}

#[tokio::test]
async fn invalid_fixer_output_is_exhausted() {
    let fixer = RecordingFixer::answering(json!({"population": 3}));
    let err = StructuredResolver::new()
        .resolve("nothing useful", &expectation(), Some(&fixer))
        .await
        .expect_err("fixer output misses city");

    assert!(matches!(
        err.kind(),
        VasariErrorKind::Structured(e)
            if matches!(&e.kind, StructuredErrorKind::FixExhausted { raw, .. } if raw == "nothing useful")
    ));
    assert_eq!(fixer.calls().len(), 1);
}

#[tokio::test]
async fn json_object_expectation_parses_without_a_schema() -> anyhow::Result<()> {
    let result = StructuredResolver::new()
        .resolve("```json\n{\"anything\": [1, 2,],}\n```", &ResponseExpectation::JsonObject, None)
        .await?;
    assert_eq!(result.as_value(), Some(&json!({"anything": [1, 2]})));
    Ok(())
}

#[tokio::test]
async fn broken_schema_is_reported() {
    let expectation = ResponseExpectation::Structured(ResponseSchema::new(
        "Broken",
        "Not a schema",
        json!({"type": "no-such-type"}),
    ));
    let err = StructuredResolver::new()
        .resolve("{}", &expectation, None)
        .await
        .expect_err("schema does not compile");

    assert!(matches!(
        err.kind(),
        VasariErrorKind::Structured(e) if matches!(e.kind, StructuredErrorKind::InvalidSchema(_))
    ));
}
