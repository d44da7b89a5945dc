// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validates records against their stream's JSON schema and tracks
//! unexpected top-level fields, in either counted or uncounted mode.

use jsonschema::Validator;
use parking_lot::RwLock;
use rw_core::{ConfiguredCatalog, RecordMessage, StreamDescriptor};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counted mode stops recording violations for a stream once it has seen
/// this many error-bearing records — a noisy stream shouldn't blow out
/// memory with a million identical error strings.
const COUNTED_MODE_LIMIT: usize = 10;

#[derive(Default)]
struct StreamViolations {
    distinct_messages: HashSet<String>,
    error_record_count: usize,
    unexpected_fields: HashSet<String>,
}

enum CompiledSchema {
    Ready(Validator),
    /// The stream's schema failed to compile; recorded once, validation for
    /// this stream is skipped thereafter rather than treating it as fatal.
    Broken,
}

/// Whether a stream keeps validating after it hits the per-stream violation
/// cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Counted,
    Uncounted,
}

pub struct RecordSchemaValidator {
    mode: ValidationMode,
    schemas: RwLock<HashMap<StreamDescriptor, CompiledSchema>>,
    violations: RwLock<HashMap<StreamDescriptor, StreamViolations>>,
    catalog_fields: HashMap<StreamDescriptor, HashSet<String>>,
    unknown_stream_records: AtomicUsize,
}

impl RecordSchemaValidator {
    pub fn new(mode: ValidationMode, catalog: &ConfiguredCatalog) -> Self {
        let catalog_fields = catalog
            .streams
            .iter()
            .map(|stream| {
                let fields = stream
                    .json_schema
                    .get("properties")
                    .and_then(|p| p.as_object())
                    .map(|props| props.keys().cloned().collect())
                    .unwrap_or_default();
                (stream.descriptor.clone(), fields)
            })
            .collect();
        Self {
            mode,
            schemas: RwLock::new(HashMap::new()),
            violations: RwLock::new(HashMap::new()),
            catalog_fields,
            unknown_stream_records: AtomicUsize::new(0),
        }
    }

    /// Validates one record against its stream's schema, and tracks any
    /// top-level fields absent from the catalog's declared properties.
    pub fn validate(&self, record: &RecordMessage, catalog: &ConfiguredCatalog) {
        let descriptor = record.descriptor();

        if let Some(object) = record.data.as_object() {
            if let Some(expected) = self.catalog_fields.get(&descriptor) {
                let unexpected: Vec<String> =
                    object.keys().filter(|key| !expected.contains(key.as_str())).cloned().collect();
                if !unexpected.is_empty() {
                    let mut violations = self.violations.write();
                    let entry = violations.entry(descriptor.clone()).or_default();
                    entry.unexpected_fields.extend(unexpected);
                }
            }
        }

        if self.mode == ValidationMode::Counted {
            let already_capped = self
                .violations
                .read()
                .get(&descriptor)
                .map(|v| v.error_record_count >= COUNTED_MODE_LIMIT)
                .unwrap_or(false);
            if already_capped {
                return;
            }
        }

        let Some(stream) = catalog.find(&descriptor) else {
            self.unknown_stream_records.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(stream = %descriptor, "record emitted for a stream not present in the catalog");
            return;
        };

        let errors = {
            let mut schemas = self.schemas.write();
            let schema =
                schemas.entry(descriptor.clone()).or_insert_with(|| match jsonschema::validator_for(&stream.json_schema) {
                    Ok(validator) => CompiledSchema::Ready(validator),
                    Err(_) => CompiledSchema::Broken,
                });
            match schema {
                CompiledSchema::Ready(validator) => {
                    validator.iter_errors(&record.data).map(|err| err.to_string()).collect::<Vec<_>>()
                }
                CompiledSchema::Broken => Vec::new(),
            }
        };

        if errors.is_empty() {
            return;
        }

        let mut violations = self.violations.write();
        let entry = violations.entry(descriptor).or_default();
        entry.error_record_count += 1;
        entry.distinct_messages.extend(errors);
    }

    /// `(distinct error messages, records with at least one error)` per
    /// stream, for end-of-run reporting.
    pub fn schema_errors(&self) -> HashMap<StreamDescriptor, (Vec<String>, usize)> {
        self.violations
            .read()
            .iter()
            .map(|(descriptor, v)| {
                let mut messages: Vec<String> = v.distinct_messages.iter().cloned().collect();
                messages.sort();
                (descriptor.clone(), (messages, v.error_record_count))
            })
            .collect()
    }

    pub fn unexpected_fields(&self) -> HashMap<StreamDescriptor, Vec<String>> {
        self.violations
            .read()
            .iter()
            .map(|(descriptor, v)| {
                let mut fields: Vec<String> = v.unexpected_fields.iter().cloned().collect();
                fields.sort();
                (descriptor.clone(), fields)
            })
            .collect()
    }

    /// Count of records whose stream descriptor was absent from the
    /// catalog entirely, for end-of-run reporting.
    pub fn unknown_stream_record_count(&self) -> usize {
        self.unknown_stream_records.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
