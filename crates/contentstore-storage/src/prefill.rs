//! Bulk generation of sample records.
//!
//! For each requested content type the builder counts the existing records,
//! skips or tops up according to the skip policy and the record cap, and asks
//! a generator for the shortfall. Generated records are saved through
//! [`Storage::save`], so lifecycle listeners see them.
//!
//! A missing table or an unknown content type only fails that type, as does
//! a generated record with a column its content type lacks; in that case
//! none of the type's records are saved. A generator failure aborts the
//! whole batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use contentstore_core::{Connection, ContentRecord, ContentType, Error, Result};
use contentstore_schema::coerce_count;
use serde::Serialize;

use crate::Storage;
use crate::sample::SampleContentFactory;

/// Produces populated, unsaved records of one content type.
pub trait RecordGenerator {
    /// Generate `count` records.
    ///
    /// Fails with [`Error::Generator`] when the content source is unreachable.
    fn generate(&mut self, count: u64) -> Result<Vec<ContentRecord>>;
}

impl<F> RecordGenerator for F
where
    F: FnMut(u64) -> Result<Vec<ContentRecord>>,
{
    fn generate(&mut self, count: u64) -> Result<Vec<ContentRecord>> {
        self(count)
    }
}

/// Creates a [`RecordGenerator`] for a content type.
pub trait GeneratorFactory {
    /// A generator for `content_type`.
    fn create(&self, content_type: &Arc<ContentType>) -> Result<Box<dyn RecordGenerator>>;
}

impl<F> GeneratorFactory for F
where
    F: Fn(&Arc<ContentType>) -> Result<Box<dyn RecordGenerator>>,
{
    fn create(&self, content_type: &Arc<ContentType>) -> Result<Box<dyn RecordGenerator>> {
        self(content_type)
    }
}

/// Outcome of a prefill batch, keyed by the names the caller passed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrefillResponse {
    /// Saved records per content type.
    pub created: BTreeMap<String, Vec<ContentRecord>>,
    /// User-facing error per content type.
    pub errors: BTreeMap<String, String>,
    /// True when a generator failure stopped the batch early.
    pub aborted: bool,
}

impl PrefillResponse {
    /// Number of records created for `name`.
    pub fn created_count(&self, name: &str) -> usize {
        self.created.get(name).map_or(0, Vec::len)
    }

    /// True when no content type reported an error.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Orchestrates sample record generation over a set of content types.
pub struct PrefillBuilder<'s, C: Connection> {
    storage: &'s Storage<C>,
    factory: Box<dyn GeneratorFactory + 's>,
    max_count: u64,
}

impl<C: Connection> std::fmt::Debug for PrefillBuilder<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefillBuilder")
            .field("max_count", &self.max_count)
            .finish_non_exhaustive()
    }
}

impl<'s, C: Connection> PrefillBuilder<'s, C> {
    /// Create a builder with an explicit generator factory and record cap.
    pub fn new(storage: &'s Storage<C>, factory: impl GeneratorFactory + 's, max_count: u64) -> Self {
        Self {
            storage,
            factory: Box::new(factory),
            max_count,
        }
    }

    /// Create a builder using the built-in sample content generator and the
    /// configured record cap.
    pub fn with_sample_content(storage: &'s Storage<C>) -> Self {
        let max_count = storage.config().prefill_max_count;
        Self::new(storage, SampleContentFactory::new(), max_count)
    }

    /// Record cap above which non-empty content types are skipped.
    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    /// Override the record cap.
    pub fn set_max_count(&mut self, max_count: u64) -> &mut Self {
        self.max_count = max_count;
        self
    }

    /// Override the record cap from a loosely typed value, coerced to a
    /// non-negative integer (`"12abc"` is 12, negatives are 0).
    pub fn set_max_count_value(&mut self, max_count: &serde_json::Value) -> &mut Self {
        self.set_max_count(coerce_count(max_count))
    }

    /// Replace the generator factory.
    pub fn set_generator_factory(&mut self, factory: impl GeneratorFactory + 's) -> &mut Self {
        self.factory = Box::new(factory);
        self
    }

    /// Generate up to `count` records for each named content type.
    ///
    /// With `skip_non_empty`, a content type that already holds `max_count`
    /// records or more is skipped, and otherwise only the shortfall between
    /// `count` and its existing records is generated.
    #[tracing::instrument(level = "debug", skip(self, names))]
    pub fn build<I, S>(&self, names: I, count: u64, skip_non_empty: bool) -> PrefillResponse
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut response = PrefillResponse::default();

        for name in names {
            let name = name.as_ref();
            let ct = match self.storage.content_type(name) {
                Ok(ct) => ct,
                Err(e) => {
                    response.errors.insert(name.to_string(), e.to_string());
                    continue;
                }
            };

            let existing = match self.storage.count(name) {
                Ok(existing) => existing,
                Err(e) if e.is_table_not_found() => {
                    tracing::warn!(content_type = name, "Prefill skipped, table missing");
                    response.errors.insert(
                        name.to_string(),
                        format!(
                            "Table not found for ContentType {name}, a database update is probably required."
                        ),
                    );
                    continue;
                }
                Err(e) => {
                    response.errors.insert(name.to_string(), e.to_string());
                    continue;
                }
            };

            if skip_non_empty && existing >= self.max_count {
                tracing::debug!(content_type = name, existing, max_count = self.max_count, "Prefill skipped, already has records");
                response.errors.insert(
                    name.to_string(),
                    format!("Skipped {name} (already has records)"),
                );
                continue;
            }

            let wanted = if skip_non_empty {
                count.saturating_sub(existing)
            } else {
                count
            };
            if wanted == 0 {
                continue;
            }

            match self.generate(&ct, wanted) {
                Ok(records) => {
                    tracing::info!(content_type = name, created = records.len(), "Prefilled content type");
                    response.created.insert(name.to_string(), records);
                }
                Err(Error::Generator(reason)) => {
                    tracing::warn!(content_type = name, %reason, "Content generator failed, aborting prefill");
                    response.errors.insert(
                        name.to_string(),
                        "Timeout attempting connection to the 'Lorem Ipsum' generator. Unable to add dummy content."
                            .to_string(),
                    );
                    response.aborted = true;
                    return response;
                }
                Err(e) => {
                    response.errors.insert(name.to_string(), e.to_string());
                }
            }
        }

        response
    }

    fn generate(&self, ct: &Arc<ContentType>, count: u64) -> Result<Vec<ContentRecord>> {
        let mut generator = self.factory.create(ct)?;
        let mut records = generator.generate(count)?;
        for record in &mut records {
            if record.content_type().is_none() {
                record.set_content_type(Arc::clone(ct));
            }
        }
        // Check every record before the first write.
        for record in &records {
            record.to_write_pairs()?;
        }
        for record in &mut records {
            self.storage.save(record)?;
        }
        Ok(records)
    }
}
