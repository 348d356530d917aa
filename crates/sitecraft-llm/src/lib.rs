mod anthropic;
mod openai;
mod retry;
mod traits;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
pub use retry::with_retry;
pub use traits::{CompletionRequest, LlmClient, LlmError, ProviderType};

/// Read the API key for a provider from its environment variable
pub fn api_key_from_env(provider: ProviderType) -> Result<String, LlmError> {
    let var = provider.api_key_var();
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(LlmError::MissingApiKey(var.to_string())),
    }
}

/// Create a client by provider type
pub fn create_client(
    provider: ProviderType,
    api_key: String,
    model: Option<&str>,
) -> Result<Box<dyn LlmClient>, LlmError> {
    let client: Box<dyn LlmClient> = match provider {
        ProviderType::Anthropic => {
            let client = AnthropicClient::new(api_key)?;
            Box::new(match model {
                Some(m) => client.with_model(m),
                None => client,
            })
        }
        ProviderType::OpenAi => {
            let client = OpenAiClient::new(api_key)?;
            Box::new(match model {
                Some(m) => client.with_model(m),
                None => client,
            })
        }
    };
    Ok(client)
}
