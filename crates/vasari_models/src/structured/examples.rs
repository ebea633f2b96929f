//! Worked examples for response schemas.
//!
//! Models follow a schema far more reliably when the prompt shows an
//! instance of it. Examples are written once per schema by a model and
//! cached by the schema's content.

use async_trait::async_trait;
use tracing::{debug, instrument};
use vasari_cache::{CompletionCache, CompletionCacheConfig, cache_key};
use vasari_core::ResponseSchema;
use vasari_error::VasariResult;

/// Cache namespace for schema examples.
pub const SCHEMA_EXAMPLE_NAMESPACE: &str = "schema_examples";

/// Writes example instances of a schema.
#[async_trait]
pub trait ExampleWriter: Send + Sync {
    /// Answer `prompt` with plain text from `model`.
    async fn write_example(&self, prompt: &str, model: &str) -> VasariResult<String>;
}

/// Prompt asking a model for examples of `schema`.
pub fn example_prompt(schema: &ResponseSchema) -> String {
    format!(
        "Provide example json objects that follow the schema of the model:{}\n\
         The examples must be json, not yaml.\n\
         If the model has a list property, give one example where the list is empty \
         and another where it holds several items.\n\
         The `type` field is required by the schema, so include it in every example.",
        schema.schema()
    )
}

/// Caching front for an [`ExampleWriter`].
#[derive(Debug, Clone)]
pub struct SchemaExampleProvider {
    model: String,
    cache: CompletionCache<String>,
}

impl SchemaExampleProvider {
    /// Provider asking `model` for examples, caching under `config`'s root.
    ///
    /// The namespace in `config` is replaced with [`SCHEMA_EXAMPLE_NAMESPACE`].
    ///
    /// # Errors
    ///
    /// Returns a cache error if the cache directory cannot be created.
    pub fn new(model: impl Into<String>, config: &CompletionCacheConfig) -> VasariResult<Self> {
        let config = config
            .clone()
            .with_namespace(SCHEMA_EXAMPLE_NAMESPACE.to_string());
        Ok(Self {
            model: model.into(),
            cache: CompletionCache::new(&config)?,
        })
    }

    /// Model examples are requested from.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Example text for `schema`, written on first use.
    ///
    /// Concurrent requests for the same schema share one call to `writer`.
    ///
    /// # Errors
    ///
    /// Returns the writer's error; failures are not cached.
    #[instrument(skip_all, fields(schema = %schema.name(), model = %self.model))]
    pub async fn example_for(
        &self,
        schema: &ResponseSchema,
        writer: &dyn ExampleWriter,
    ) -> VasariResult<String> {
        let key = cache_key(schema.schema())?;
        let prompt = example_prompt(schema);
        self.cache
            .get_or_try_insert_with(key, async {
                debug!("Writing schema example");
                writer.write_example(&prompt, &self.model).await
            })
            .await
    }
}
