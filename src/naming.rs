//! Naming resolver: final file names and destination keys in the bucket.
//!
//! Keys are the prefix and the file name glued together with no escaping or
//! normalisation. A name containing `/` therefore lands in a nested-looking key,
//! and two items resolving to the same key overwrite each other (last writer wins).

use crate::classify::ClassificationDecision;
use crate::contract::SourceItem;

pub fn resolve_name(item: &SourceItem, decision: &ClassificationDecision) -> String {
    match decision {
        ClassificationDecision::ExportAs(format) => format!("{}{}", item.name, format.extension),
        ClassificationDecision::RawFetch | ClassificationDecision::SkipUnsupported { .. } => {
            item.name.clone()
        }
    }
}

pub fn resolve_destination_key(prefix: &str, file_name: &str) -> String {
    format!("{prefix}{file_name}")
}
