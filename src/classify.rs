//! Content classification: decides how each listed item is read from the source store.

/// MIME type prefix shared by every Drive-native (non-binary) document family.
pub const NATIVE_PREFIX: &str = "application/vnd.google-apps.";

/// Target format for a server-side export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    pub mime_type: &'static str,
    /// Appended verbatim to the item's name, leading dot included.
    pub extension: &'static str,
}

pub const PDF: ExportFormat = ExportFormat {
    mime_type: "application/pdf",
    extension: ".pdf",
};

pub const XLSX: ExportFormat = ExportFormat {
    mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    extension: ".xlsx",
};

pub const PNG: ExportFormat = ExportFormat {
    mime_type: "image/png",
    extension: ".png",
};

/// Native families with a known export target, keyed by the suffix after [`NATIVE_PREFIX`].
const EXPORT_FORMATS: &[(&str, ExportFormat)] = &[
    ("document", PDF),
    ("spreadsheet", XLSX),
    ("presentation", PDF),
    ("drawing", PNG),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationDecision {
    RawFetch,
    ExportAs(ExportFormat),
    SkipUnsupported { reason: String },
}

impl ClassificationDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, ClassificationDecision::SkipUnsupported { .. })
    }
}

pub fn classify(content_type: &str) -> ClassificationDecision {
    let Some(family) = content_type.strip_prefix(NATIVE_PREFIX) else {
        return ClassificationDecision::RawFetch;
    };

    match EXPORT_FORMATS.iter().find(|(name, _)| *name == family) {
        Some((_, format)) => ClassificationDecision::ExportAs(*format),
        None => ClassificationDecision::SkipUnsupported {
            reason: format!("no export format for native type {content_type}"),
        },
    }
}
