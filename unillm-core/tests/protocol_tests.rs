//! Property tests for validation and request conversion

use proptest::prelude::*;
use unillm_core::config::{ProviderConfig, ProviderType};
use unillm_core::protocol::{
    ChatRequest, ContentPart, Function, FunctionParameter, MediaSource, Message,
};
use unillm_core::providers::{
    AnthropicProvider, ChatAdapter, GeminiProvider, OpenAIProvider,
};

fn openai() -> OpenAIProvider {
    OpenAIProvider::new(ProviderConfig::new(ProviderType::OpenAI, "sk"))
}

fn anthropic() -> AnthropicProvider {
    AnthropicProvider::new(ProviderConfig::new(ProviderType::Anthropic, "sk-ant"))
}

fn gemini() -> GeminiProvider {
    GeminiProvider::new(ProviderConfig::new(ProviderType::Gemini, "AIza"))
}

prop_compose! {
    fn valid_request()(
        model in "[a-z][a-z0-9-]{0,15}",
        turns in prop::collection::vec("[a-zA-Z ]{1,24}", 1..5),
        temperature in prop::option::of(0u8..=4),
        max_tokens in prop::option::of(1u32..4096),
        with_function in any::<bool>(),
    ) -> ChatRequest {
        let messages = turns
            .into_iter()
            .enumerate()
            .map(|(i, text)| if i % 2 == 0 { Message::user(text) } else { Message::assistant(text) })
            .collect();
        let mut request = ChatRequest::new(model, messages);
        if let Some(t) = temperature {
            // Quarter steps are exact in f32
            request = request.with_temperature(f32::from(t) * 0.25);
        }
        if let Some(n) = max_tokens {
            request = request.with_max_tokens(n);
        }
        if with_function {
            request = request
                .with_functions(vec![Function::new("lookup", FunctionParameter::object())]);
        }
        request
    }
}

proptest! {
    #[test]
    fn valid_requests_pass_every_adapter(request in valid_request()) {
        prop_assert!(request.validate().is_empty());
        prop_assert!(openai().validate_chat_request(&request).is_empty());
        prop_assert!(anthropic().validate_chat_request(&request).is_empty());
        prop_assert!(gemini().validate_chat_request(&request).is_empty());
    }

    #[test]
    fn conversion_is_repeatable(request in valid_request()) {
        let first = serde_json::to_value(openai().convert_chat_request(&request).unwrap()).unwrap();
        let second = serde_json::to_value(openai().convert_chat_request(&request).unwrap()).unwrap();
        prop_assert_eq!(first, second);

        let adapter = anthropic();
        let first = serde_json::to_value(adapter.convert_chat_request(&request).unwrap()).unwrap();
        let second = serde_json::to_value(adapter.convert_chat_request(&request).unwrap()).unwrap();
        prop_assert_eq!(first, second);

        let adapter = gemini();
        let first = serde_json::to_value(adapter.convert_chat_request(&request).unwrap()).unwrap();
        let second = serde_json::to_value(adapter.convert_chat_request(&request).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn seeded_violations_are_all_reported(request in valid_request()) {
        let mut broken = request.with_force_function("undeclared");
        broken.messages[0] = broken.messages[0].clone().with_part(ContentPart::image(MediaSource {
            mime_type: "image/png".into(),
            data: Some("AAAA".into()),
            url: Some("https://example.com/a.png".into()),
            path: None,
        }));

        let problems = broken.validate();
        prop_assert!(problems.iter().any(|p| p.contains("undeclared")));
        prop_assert!(problems.iter().any(|p| p.contains("exactly one of data, url or path")));

        broken.messages.clear();
        prop_assert!(broken.validate().iter().any(|p| p == "messages must not be empty"));
    }
}

#[test]
fn test_problems_are_collected_not_short_circuited() {
    let request = ChatRequest::new("", Vec::new())
        .with_temperature(3.0)
        .with_max_tokens(0);

    let problems = request.validate();
    assert_eq!(problems.len(), 4, "{:?}", problems);
}

#[test]
fn test_capability_problems_name_the_provider() {
    let request = ChatRequest::new(
        "m",
        vec![Message::user("listen").with_part(ContentPart::audio(MediaSource::url(
            "audio/wav",
            "https://example.com/a.wav",
        )))],
    );

    assert_eq!(
        openai().validate_chat_request(&request),
        vec!["unsupported content type audio for openai".to_string()]
    );
    assert!(gemini().validate_chat_request(&request).is_empty());
}

#[tokio::test]
async fn test_path_media_is_inlined_before_dispatch() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.pdf");
    std::fs::write(&file, b"%PDF-1.4").unwrap();

    let source = MediaSource::path("application/pdf", &file);
    let request = ChatRequest::new(
        "claude",
        vec![Message::user("read").with_part(ContentPart::pdf(source.clone()))],
    );
    assert_eq!(anthropic().validate_chat_request(&request).len(), 1);

    let inlined = source.load_path().await.unwrap();
    assert_eq!(inlined.data.as_deref(), Some("JVBERi0xLjQ="));
    let request = ChatRequest::new(
        "claude",
        vec![Message::user("read").with_part(ContentPart::pdf(inlined))],
    );
    assert!(anthropic().validate_chat_request(&request).is_empty());
}
