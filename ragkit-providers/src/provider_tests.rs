//! Provider construction tests (no server or API key needed)
//!
//! Run with: cargo test --package ragkit-providers --all-features

use crate::{services_from_config, Embeddings, Error, Provider, ProviderKind, RagConfig};

#[test]
#[cfg(feature = "ollama")]
fn test_ollama_creation() {
    use crate::ollama::Ollama;
    let provider = Ollama::new("http://localhost:11434");
    assert!(provider.is_ok());
    let provider = provider.unwrap();
    assert_eq!(Provider::name(&provider), "ollama");
    assert_eq!(Embeddings::name(&provider), "ollama");
}

#[test]
#[cfg(feature = "openai")]
fn test_openai_creation() {
    use crate::openai::OpenAI;
    let provider = OpenAI::new("test-key");
    assert!(provider.is_ok());
    let provider = provider.unwrap();
    assert_eq!(Provider::name(&provider), "openai");
    assert_eq!(provider.base_url(), crate::openai::DEFAULT_BASE_URL);
}

#[test]
#[cfg(feature = "openai")]
fn test_openai_compatible_endpoints() {
    use crate::openai::OpenAI;
    let local = OpenAI::with_base_url("test-key", "http://localhost:1234/v1/").unwrap();
    assert_eq!(local.base_url(), "http://localhost:1234/v1");
}

#[test]
#[cfg(feature = "ollama")]
fn test_services_default_to_ollama() {
    let services = services_from_config(&RagConfig::default()).unwrap();
    assert_eq!(services.embedder.name(), "ollama");
    assert_eq!(services.provider.name(), "ollama");
}

#[test]
#[cfg(feature = "openai")]
fn test_services_openai_with_key() {
    let config = RagConfig {
        provider: ProviderKind::OpenAi,
        api_key: Some("test-key".into()),
        ..RagConfig::default()
    };
    let services = services_from_config(&config).unwrap();
    assert_eq!(services.embedder.name(), "openai");
}

#[test]
#[cfg(feature = "openai")]
fn test_services_openai_without_key() {
    if std::env::var("OPENAI_API_KEY").is_ok() {
        return;
    }
    let config = RagConfig {
        provider: ProviderKind::OpenAi,
        ..RagConfig::default()
    };
    let err = services_from_config(&config).err().unwrap();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_mock_creation() {
    use crate::mock::{MockEmbeddings, MockProvider};
    assert_eq!(MockProvider::new("hi").name(), "mock");
    assert_eq!(MockEmbeddings::new(4).name(), "mock");
}
