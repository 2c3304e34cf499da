//! Built-in sample content: lorem ipsum text and random field values.

use std::sync::Arc;

use contentstore_core::{ContentRecord, ContentType, FieldDef, FieldKind, Result, Value};
use contentstore_schema::slugify;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::prefill::{GeneratorFactory, RecordGenerator};

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in", "reprehenderit",
    "voluptate", "velit", "esse", "cillum", "fugiat", "nulla", "pariatur", "excepteur", "sint",
    "occaecat", "cupidatat", "non", "proident", "sunt", "culpa", "qui", "officia", "deserunt",
    "mollit", "anim", "id", "est", "laborum",
];

/// Generates records with lorem ipsum text for a content type.
///
/// Text fields get words, sentences or paragraphs depending on their kind,
/// numeric and date fields get random values, and fields with a configured
/// default keep it. Relation and select fields without default are left
/// unset. The slug is derived from the title.
#[derive(Debug)]
pub struct SampleContentGenerator {
    content_type: Arc<ContentType>,
    rng: StdRng,
}

impl SampleContentGenerator {
    /// A generator seeded from system entropy.
    pub fn new(content_type: Arc<ContentType>) -> Self {
        Self {
            content_type,
            rng: StdRng::from_entropy(),
        }
    }

    /// A deterministic generator.
    pub fn with_seed(content_type: Arc<ContentType>, seed: u64) -> Self {
        Self {
            content_type,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn record(&mut self) -> ContentRecord {
        let ct = Arc::clone(&self.content_type);
        let mut record = ContentRecord::new(Arc::clone(&ct));

        for field in ct.configured_fields() {
            if let Some(value) = self.value_for(field) {
                record.set(field.name.as_str(), value);
            }
        }

        let title = record.title().unwrap_or_else(|| self.words(3, 6));
        let stamp = self.datetime();
        record.set("slug", slugify(&title));
        record.set("status", ct.default_status.as_str());
        record.set("ownerid", 1);
        record.set("datecreated", stamp.as_str());
        record.set("datechanged", stamp.as_str());
        record.set("datepublish", stamp);
        record
    }

    fn value_for(&mut self, field: &FieldDef) -> Option<Value> {
        if let Some(default) = &field.default {
            return Some(default.clone());
        }
        let value = match field.kind {
            FieldKind::Text => Value::Text(capitalize(&self.words(3, 7))),
            FieldKind::Slug => Value::Text(self.words(2, 4).replace(' ', "-")),
            FieldKind::Textarea => Value::Text(self.sentences(2, 4)),
            FieldKind::Markdown => Value::Text(
                (0..self.rng.gen_range(2..=3))
                    .map(|_| self.sentences(2, 5))
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
            FieldKind::Html => Value::Text(
                (0..self.rng.gen_range(2..=4))
                    .map(|_| format!("<p>{}</p>", self.sentences(3, 6)))
                    .collect::<String>(),
            ),
            FieldKind::Integer => Value::BigInt(self.rng.gen_range(1..=100)),
            FieldKind::Float => Value::Double(f64::from(self.rng.gen_range(0..10_000_u32)) / 100.0),
            FieldKind::Checkbox => Value::Bool(self.rng.gen_bool(0.5)),
            FieldKind::Date => Value::Text(self.date()),
            FieldKind::DateTime => Value::Text(self.datetime()),
            FieldKind::Select | FieldKind::Relation => return None,
        };
        Some(value)
    }

    fn words(&mut self, min: usize, max: usize) -> String {
        let n = self.rng.gen_range(min..=max);
        (0..n)
            .filter_map(|_| WORDS.choose(&mut self.rng).copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn sentences(&mut self, min: usize, max: usize) -> String {
        let n = self.rng.gen_range(min..=max);
        (0..n)
            .map(|_| format!("{}.", capitalize(&self.words(5, 12))))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn date(&mut self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.rng.gen_range(2015..=2024),
            self.rng.gen_range(1..=12),
            self.rng.gen_range(1..=28)
        )
    }

    fn datetime(&mut self) -> String {
        let date = self.date();
        format!(
            "{date} {:02}:{:02}:{:02}",
            self.rng.gen_range(0..24),
            self.rng.gen_range(0..60),
            self.rng.gen_range(0..60)
        )
    }
}

impl RecordGenerator for SampleContentGenerator {
    fn generate(&mut self, count: u64) -> Result<Vec<ContentRecord>> {
        tracing::debug!(content_type = %self.content_type.key, count, "Generating sample records");
        Ok((0..count).map(|_| self.record()).collect())
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Creates a [`SampleContentGenerator`] per content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleContentFactory {
    seed: Option<u64>,
}

impl SampleContentFactory {
    /// Generators seeded from system entropy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic generators.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl GeneratorFactory for SampleContentFactory {
    fn create(&self, content_type: &Arc<ContentType>) -> Result<Box<dyn RecordGenerator>> {
        let ct = Arc::clone(content_type);
        Ok(Box::new(match self.seed {
            Some(seed) => SampleContentGenerator::with_seed(ct, seed),
            None => SampleContentGenerator::new(ct),
        }))
    }
}
