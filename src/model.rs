use crate::error::LlmError;

/// Provider key and native model name split out of a composite address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModel {
    /// Registry key identifying the provider, such as `openai`.
    pub provider: String,
    /// Model name as the provider itself understands it.
    pub model: String,
}

/// Splits a `"provider:model"` address into its two halves.
///
/// Only the first `:` separates; native model names may themselves contain
/// the separator, so everything after the first one belongs to the model.
///
/// # Examples
///
/// ```
/// use musubi::model::parse_model;
///
/// let parsed = parse_model("openai:gpt-4o").unwrap();
/// assert_eq!(parsed.provider, "openai");
/// assert_eq!(parsed.model, "gpt-4o");
///
/// let parsed = parse_model("openai:gpt-4:vision").unwrap();
/// assert_eq!(parsed.model, "gpt-4:vision");
/// ```
///
/// # Errors
///
/// Returns [`LlmError::InvalidModelFormat`] when the address is empty, has no
/// separator, or the provider half is empty.
pub fn parse_model(model: &str) -> Result<ParsedModel, LlmError> {
    let invalid = || LlmError::InvalidModelFormat {
        model: model.to_string(),
    };

    let (provider, rest) = model.split_once(':').ok_or_else(invalid)?;
    if provider.is_empty() {
        return Err(invalid());
    }

    Ok(ParsedModel {
        provider: provider.to_string(),
        model: rest.to_string(),
    })
}
