use anyhow::{Result, anyhow};
use std::future::Future;
use std::pin::Pin;

mod mymemory;
mod openai;
mod retry;

pub use mymemory::MyMemory;
pub use openai::OpenAI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    MyMemory,
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::MyMemory => "mymemory",
            ProviderKind::OpenAI => "openai",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "mymemory" => Ok(ProviderKind::MyMemory),
            "openai" => Ok(ProviderKind::OpenAI),
            other => Err(anyhow!(
                "unknown translation provider '{}' (expected mymemory or openai)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// A remote translation service.
pub trait Provider: Clone + Send + Sync {
    fn name(&self) -> &'static str;
    fn translate(&self, request: TranslationRequest) -> ProviderFuture;
}

#[derive(Debug, Clone)]
pub enum ProviderImpl {
    MyMemory(MyMemory),
    OpenAI(OpenAI),
}

impl Provider for ProviderImpl {
    fn name(&self) -> &'static str {
        match self {
            ProviderImpl::MyMemory(provider) => provider.name(),
            ProviderImpl::OpenAI(provider) => provider.name(),
        }
    }

    fn translate(&self, request: TranslationRequest) -> ProviderFuture {
        match self {
            ProviderImpl::MyMemory(provider) => provider.translate(request),
            ProviderImpl::OpenAI(provider) => provider.translate(request),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    pub key: Option<String>,
    pub email: Option<String>,
    pub model: Option<String>,
}

pub fn build_provider(kind: ProviderKind, options: ProviderOptions) -> Result<ProviderImpl> {
    match kind {
        ProviderKind::MyMemory => {
            let key = resolve_key(kind, options.key.as_deref()).ok();
            Ok(ProviderImpl::MyMemory(MyMemory::new(options.email, key)))
        }
        ProviderKind::OpenAI => {
            let key = resolve_key(kind, options.key.as_deref())?;
            let mut provider = OpenAI::new(key);
            if let Some(model) = options.model {
                provider = provider.with_model(model);
            }
            Ok(ProviderImpl::OpenAI(provider))
        }
    }
}

pub fn resolve_key(provider: ProviderKind, override_key: Option<&str>) -> Result<String> {
    if let Some(key) = override_key.filter(|value| !value.trim().is_empty()) {
        return Ok(key.to_string());
    }

    match provider {
        ProviderKind::OpenAI => get_env("OPENAI_API_KEY"),
        ProviderKind::MyMemory => get_env("MYMEMORY_API_KEY"),
    }
    .ok_or_else(|| anyhow!("API key not found for provider {}", provider.as_str()))
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_round_trip() {
        for kind in [ProviderKind::MyMemory, ProviderKind::OpenAI] {
            assert_eq!(ProviderKind::from_name(kind.as_str()).unwrap(), kind);
        }
        assert_eq!(
            ProviderKind::from_name(" OpenAI ").unwrap(),
            ProviderKind::OpenAI
        );
        assert!(ProviderKind::from_name("babelfish").is_err());
    }

    #[test]
    fn explicit_key_wins() {
        assert_eq!(
            resolve_key(ProviderKind::OpenAI, Some("sk-test")).unwrap(),
            "sk-test"
        );
    }

    #[test]
    fn mymemory_needs_no_key() {
        let provider = build_provider(ProviderKind::MyMemory, ProviderOptions::default()).unwrap();
        assert_eq!(provider.name(), "mymemory");
    }
}
