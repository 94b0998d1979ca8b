// src/errors/mod.rs
//! Code generation errors.
//!
//! Everything here is a bug in the caller or in this crate, never a condition
//! of the graph being compiled: a missing descriptor, a handle whose shape
//! disagrees with its representation, a Cranelift module failure. Callers
//! propagate these with `?` and abandon the function under construction.
//! Failures of managed-value callbacks at generated-code run time are not
//! reported through this type.
//!
//! Error codes:
//! - E3001: unsupported feature
//! - E3003: representation mismatch
//! - E3005: internal error
//! - E3007: missing descriptor
//! - E3008: descriptor attached twice

use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// The kind of code generation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenErrorKind {
    /// A machine type the emitter has no lowering for
    UnsupportedFeature {
        feature: &'static str,
        context: Option<String>,
    },

    /// A value handle or address does not match the descriptor's representation
    RepresentationMismatch {
        operation: &'static str,
        expected: String,
        found: String,
    },

    /// Internal invariant violation or backend failure
    InternalError {
        message: &'static str,
        context: Option<String>,
    },

    /// A value type entered code generation without a descriptor
    MissingDescriptor { type_name: String },

    /// A second descriptor was attached to a value type
    DescriptorAlreadyAttached { type_name: String },
}

/// Code generation error.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct CodegenError {
    /// The kind of error.
    pub kind: CodegenErrorKind,
}

impl CodegenError {
    /// Create an unsupported feature error
    pub fn unsupported(feature: &'static str) -> Self {
        CodegenErrorKind::UnsupportedFeature {
            feature,
            context: None,
        }
        .into()
    }

    /// Create an unsupported feature error with context
    pub fn unsupported_with_context(feature: &'static str, context: impl Into<String>) -> Self {
        CodegenErrorKind::UnsupportedFeature {
            feature,
            context: Some(context.into()),
        }
        .into()
    }

    /// A handle or address disagrees with the representation it is used with.
    pub fn representation_mismatch(
        operation: &'static str,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        let (expected, found) = (expected.to_string(), found.to_string());
        tracing::error!(operation, %expected, %found, "representation mismatch");
        CodegenErrorKind::RepresentationMismatch {
            operation,
            expected,
            found,
        }
        .into()
    }

    /// Create an internal error
    pub fn internal(message: &'static str) -> Self {
        CodegenErrorKind::InternalError {
            message,
            context: None,
        }
        .into()
    }

    /// Create an internal error with context
    pub fn internal_with_context(message: &'static str, context: impl Into<String>) -> Self {
        CodegenErrorKind::InternalError {
            message,
            context: Some(context.into()),
        }
        .into()
    }

    /// Wrap a Cranelift module error
    pub fn cranelift(e: impl fmt::Display) -> Self {
        CodegenErrorKind::InternalError {
            message: "cranelift error",
            context: Some(e.to_string()),
        }
        .into()
    }

    /// A value type reached code generation with no descriptor attached.
    pub fn missing_descriptor(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        tracing::error!(%type_name, "value type has no descriptor");
        CodegenErrorKind::MissingDescriptor { type_name }.into()
    }

    /// A value type already carries a descriptor.
    pub fn descriptor_already_attached(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        tracing::error!(%type_name, "descriptor attached twice");
        CodegenErrorKind::DescriptorAlreadyAttached { type_name }.into()
    }

    /// True for errors that indicate a caller broke the descriptor contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self.kind,
            CodegenErrorKind::MissingDescriptor { .. }
                | CodegenErrorKind::DescriptorAlreadyAttached { .. }
                | CodegenErrorKind::RepresentationMismatch { .. }
        )
    }
}

impl From<CodegenErrorKind> for CodegenError {
    fn from(kind: CodegenErrorKind) -> Self {
        CodegenError { kind }
    }
}

impl Diagnostic for CodegenError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code: &'static str = match &self.kind {
            CodegenErrorKind::UnsupportedFeature { .. } => "E3001",
            CodegenErrorKind::RepresentationMismatch { .. } => "E3003",
            CodegenErrorKind::InternalError { .. } => "E3005",
            CodegenErrorKind::MissingDescriptor { .. } => "E3007",
            CodegenErrorKind::DescriptorAlreadyAttached { .. } => "E3008",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help: &'static str = match &self.kind {
            CodegenErrorKind::MissingDescriptor { .. } => {
                "attach a descriptor to the value type before compiling graphs that use it"
            }
            CodegenErrorKind::DescriptorAlreadyAttached { .. } => {
                "each value type carries exactly one descriptor for its whole lifetime"
            }
            CodegenErrorKind::RepresentationMismatch { .. } => {
                "the value was produced for a different representation than the one consuming it"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

impl fmt::Display for CodegenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenErrorKind::UnsupportedFeature { feature, context } => {
                write!(f, "unsupported feature: {}", feature)?;
                if let Some(ctx) = context {
                    write!(f, " ({})", ctx)?;
                }
                Ok(())
            }
            CodegenErrorKind::RepresentationMismatch {
                operation,
                expected,
                found,
            } => {
                write!(
                    f,
                    "{}: representation mismatch: expected {}, found {}",
                    operation, expected, found
                )
            }
            CodegenErrorKind::InternalError { message, context } => {
                write!(f, "internal error: {}", message)?;
                if let Some(ctx) = context {
                    write!(f, " ({})", ctx)?;
                }
                Ok(())
            }
            CodegenErrorKind::MissingDescriptor { type_name } => {
                write!(f, "value type '{}' has no descriptor", type_name)
            }
            CodegenErrorKind::DescriptorAlreadyAttached { type_name } => {
                write!(f, "value type '{}' already has a descriptor", type_name)
            }
        }
    }
}

/// Result type alias for codegen operations.
pub type CodegenResult<T> = Result<T, CodegenError>;
