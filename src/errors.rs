//! Error taxonomy for the translation engine (C8).
//!
//! Each fallible component gets its own variant family; [`TranslationError`]
//! is the crate-level sum type the dispatch loop and CLI front end work
//! with. Exit-code mapping lives next to `main` since it is a CLI concern.

use std::path::PathBuf;

use thiserror::Error;

/// Failure constructing or validating a C1 template entity.
#[derive(Debug, Error)]
#[error("invalid template: field '{field}': {reason}")]
pub struct InvalidTemplate {
    pub field: String,
    pub reason: String,
}

impl InvalidTemplate {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure emitting a built template to YAML (C3).
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write output to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize node at '{node_path}': {reason}")]
    Serialization { node_path: String, reason: String },
}

/// Failure mapping a single Terraform resource to TOSCA (C6/C9).
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("resource mapping failed for {resource_type} '{resource_name}': {cause}")]
    ResourceMapping {
        resource_type: String,
        resource_name: String,
        cause: String,
    },
    #[error("post-pass mapper '{mapper}' could not find required node '{node_name}'")]
    PostPassMissingNode { mapper: String, node_name: String },
}

/// Top-level error kind, one variant per §6.1 exit code (except success).
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid template: {0}")]
    InvalidTemplate(#[from] InvalidTemplate),

    #[error("malformed parsed-plan document: {0}")]
    ParseInputMalformed(String),

    #[error("variable extraction failed: {0}")]
    VariableExtraction(String),

    #[error("reference resolution failed: {0}")]
    ReferenceResolution(String),

    #[error(transparent)]
    ResourceMapping(#[from] MappingError),

    #[error(transparent)]
    OutputIo(#[from] EmitError),
}

impl TranslationError {
    /// Exit code per §6.1. Success (0) is represented by `Ok` at the CLI
    /// boundary and has no corresponding variant here.
    pub fn exit_code(&self) -> i32 {
        match self {
            TranslationError::InvalidInput(_) => 1,
            TranslationError::ParseInputMalformed(_) => 2,
            TranslationError::VariableExtraction(_) => 3,
            TranslationError::ResourceMapping(MappingError::ResourceMapping { .. }) => 4,
            TranslationError::ReferenceResolution(_) => 5,
            TranslationError::OutputIo(_) => 6,
            TranslationError::ResourceMapping(MappingError::PostPassMissingNode { .. }) => 7,
            TranslationError::InvalidTemplate(_) => 9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec_table() {
        assert_eq!(TranslationError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            TranslationError::ParseInputMalformed("x".into()).exit_code(),
            2
        );
        assert_eq!(
            TranslationError::VariableExtraction("x".into()).exit_code(),
            3
        );
        assert_eq!(
            TranslationError::ResourceMapping(MappingError::ResourceMapping {
                resource_type: "aws_vpc".into(),
                resource_name: "main".into(),
                cause: "boom".into(),
            })
            .exit_code(),
            4
        );
        assert_eq!(
            TranslationError::ReferenceResolution("x".into()).exit_code(),
            5
        );
    }

    #[test]
    fn invalid_template_display() {
        let e = InvalidTemplate::new("tosca_definitions_version", "must be tosca_2_0");
        assert!(e.to_string().contains("tosca_definitions_version"));
    }
}
