// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog/message transforms applied between the source and destination
//! loops (custom namespace mapping, PII redaction, etc). Field selection is
//! deliberately not a mapper — it is an engine-loop step (see
//! [`apply_field_selection`]).

use rw_core::{ConfiguredCatalog, ConfiguredStream, Message};

pub trait AirbyteMapper: Send + Sync {
    fn map_catalog(&self, catalog: ConfiguredCatalog) -> ConfiguredCatalog;
    fn map_message(&self, message: Message) -> Message;
}

/// A no-op mapper, the default when a sync configures nothing custom.
pub struct IdentityMapper;

impl AirbyteMapper for IdentityMapper {
    fn map_catalog(&self, catalog: ConfiguredCatalog) -> ConfiguredCatalog {
        catalog
    }

    fn map_message(&self, message: Message) -> Message {
        message
    }
}

/// Folds a chain of mappers left to right over both the catalog and every
/// message.
pub struct ComposedMapper(pub Vec<Box<dyn AirbyteMapper>>);

impl ComposedMapper {
    pub fn new(mappers: Vec<Box<dyn AirbyteMapper>>) -> Self {
        Self(mappers)
    }
}

impl AirbyteMapper for ComposedMapper {
    fn map_catalog(&self, catalog: ConfiguredCatalog) -> ConfiguredCatalog {
        self.0.iter().fold(catalog, |acc, mapper| mapper.map_catalog(acc))
    }

    fn map_message(&self, message: Message) -> Message {
        self.0.iter().fold(message, |acc, mapper| mapper.map_message(acc))
    }
}

/// Retains only a stream's selected top-level fields on a record's data
/// object, when that stream's [`ConfiguredStream::selected_fields`] is set.
/// Messages other than records, and records for streams without a selection,
/// pass through unchanged.
pub fn apply_field_selection(catalog: &ConfiguredCatalog, message: Message) -> Message {
    let Message::Record { mut record } = message else {
        return message;
    };
    let descriptor = record.descriptor();
    let Some(stream) = catalog.find(&descriptor) else {
        return Message::Record { record };
    };
    let Some(selected) = stream_selected_fields(stream) else {
        return Message::Record { record };
    };
    if let Some(object) = record.data.as_object_mut() {
        object.retain(|key, _| selected.iter().any(|field| field == key));
    }
    Message::Record { record }
}

fn stream_selected_fields(stream: &ConfiguredStream) -> Option<&Vec<String>> {
    stream.selected_fields.as_ref()
}

#[cfg(test)]
#[path = "mapper_tests.rs"]
mod tests;
