//! Validation Utilities

use validator::{ValidationErrors, ValidationErrorsKind};

use super::error::AppError;

/// Convert validation errors to AppError.
///
/// Every violation is collected, including nested struct and list errors,
/// and aggregated into a single message so the caller sees the complete
/// list of failures in one response.
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut messages = collect_messages(&errors);
    messages.sort();

    if messages.is_empty() {
        return AppError::Validation("Validation failed".into());
    }

    AppError::Validation(messages.join("; "))
}

/// Flatten a `ValidationErrors` tree into `field path: message` strings.
pub fn collect_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut out = Vec::new();
    walk("", errors, &mut out);
    out
}

fn walk(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                for e in errs {
                    let message = e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed constraint `{}`", e.code));
                    out.push(format!("{}: {}", path, message));
                }
            }
            ValidationErrorsKind::Struct(nested) => walk(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    walk(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}
