use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use recipe_parser::config::{ProviderConfig, RetryConfig};
use recipe_parser::parser::{AI_REVIEW_WARNING, FALLBACK_WARNING, UNABLE_TO_PARSE};
use recipe_parser::{
    extract_json_object, normalize_ingredient, try_structured_parsing, AppConfig, ParsedRecipe,
    ProviderKind, RecipeError, RecipeExtractor, RecipeParser,
};
use serde_json::json;

const SECTIONED: &str = "Ingredients:\n- 2 cups flour\n- 1 egg\nInstructions:\n1. Mix\n2. Bake";

struct CountingExtractor {
    calls: AtomicU32,
}

#[async_trait]
impl RecipeExtractor for CountingExtractor {
    fn name(&self) -> &str {
        "counting"
    }

    async fn extract(&self, _text: &str) -> Result<ParsedRecipe, RecipeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ParsedRecipe {
            title: "From AI".to_string(),
            ingredients: vec!["flour".to_string(), "egg".to_string()],
            instructions: "Mix\nBake".to_string(),
            ..Default::default()
        })
    }
}

#[test]
fn test_normalizes_ingredient_line() {
    let parsed = normalize_ingredient("2 small yellow squash, diced");
    assert_eq!(parsed.name, "yellow squash");
    assert_eq!(parsed.quantity.as_deref(), Some("2"));
    assert_eq!(parsed.size.as_deref(), Some("small"));
    assert_eq!(parsed.original, "2 small yellow squash, diced");
}

#[test]
fn test_first_valid_object_wins() {
    let text = r#"noise {"broken": } then {"title": "Soup"} and {"title": "Stew"}"#;
    assert_eq!(extract_json_object(text), Some(r#"{"title": "Soup"}"#));
    assert_eq!(extract_json_object("no braces here"), None);
}

#[tokio::test]
async fn test_fenced_json_recipe() {
    let content = "Here you go:\n```json\n{\"title\":\"Soup\",\"ingredients\":[\"1 cup broth\"],\"instructions\":\"Heat it.\"}\n```";
    let result = RecipeParser::offline().parse(content).await;

    let (recipe, warnings) = result.into_result().unwrap();
    assert_eq!(recipe.title, "Soup");
    assert_eq!(recipe.ingredients, vec!["broth"]);
    assert_eq!(recipe.instructions, "Heat it.");
    assert!(warnings.is_empty());
}

#[tokio::test]
async fn test_sectioned_text_uses_fallback() {
    let result = RecipeParser::offline().parse(SECTIONED).await;

    let recipe = result.recipe().unwrap();
    assert_eq!(recipe.ingredients, vec!["2 cups flour", "1 egg"]);
    assert_eq!(recipe.instructions, "Mix\nBake");
    assert_eq!(result.warnings(), [FALLBACK_WARNING.to_string()]);
}

#[tokio::test]
async fn test_unrecognisable_text_fails() {
    let result = RecipeParser::offline().parse("hello world").await;
    assert!(!result.is_success());
    assert!(result.error().unwrap().starts_with(UNABLE_TO_PARSE));
    assert!(result.warnings().is_empty());
}

#[tokio::test]
async fn test_structured_tier_takes_precedence() {
    let json_block = "```json\n{\"title\":\"Pancakes\",\"ingredients\":[\"2 cups flour\",{\"item\":\"eggs\",\"amount\":2}],\"instructions\":[\"Mix\",\"Fry\"]}\n```";
    let content = format!("{SECTIONED}\n{json_block}");
    let extractor = Arc::new(CountingExtractor {
        calls: AtomicU32::new(0),
    });
    let parser = RecipeParser::new(extractor.clone());

    let result = parser.parse(&content).await;
    let expected = try_structured_parsing(&content).unwrap();
    assert_eq!(result.recipe(), Some(&expected));
    assert_eq!(expected.ingredients, vec!["flour", "eggs"]);
    assert!(result.warnings().is_empty());
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_injected_extractor_handles_free_text() {
    let extractor = Arc::new(CountingExtractor {
        calls: AtomicU32::new(0),
    });
    let parser = RecipeParser::builder()
        .extractor(extractor.clone())
        .build()
        .unwrap();

    let result = parser.parse(SECTIONED).await;
    assert_eq!(result.recipe().unwrap().title, "From AI");
    assert_eq!(result.warnings(), [AI_REVIEW_WARNING.to_string()]);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_result_serialization() {
    let success = RecipeParser::offline().parse(SECTIONED).await;
    let value = serde_json::to_value(&success).unwrap();
    assert_eq!(value["success"], json!(true));
    assert_eq!(value["recipe"]["instructions"], json!("Mix\nBake"));
    assert!(value.get("error").is_none());

    let failure = RecipeParser::offline().parse("").await;
    let value = serde_json::to_value(&failure).unwrap();
    assert_eq!(value["success"], json!(false));
    assert!(value["error"].as_str().unwrap().contains("cannot be empty"));
    assert!(value.get("recipe").is_none());
}

fn openai_config(server_url: String) -> AppConfig {
    let mut providers = HashMap::new();
    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 2000,
            api_key: Some("test-key".to_string()),
            base_url: Some(server_url),
            endpoint: None,
            assistant_id: None,
            persona: None,
            max_poll_attempts: 10,
        },
    );
    AppConfig {
        default_provider: "openai".to_string(),
        providers,
        retry: RetryConfig {
            max_retries: 0,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_ai_tier_against_openai_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let reply = r#"{"title": "Pancakes", "ingredients": ["2 cups flour", "1 egg"], "instructions": ["Mix", "Fry"], "error": ""}"#;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"choices": [{"message": {"content": reply}}]}).to_string())
        .create_async()
        .await;

    let parser = RecipeParser::builder()
        .config(openai_config(server.url()))
        .provider(ProviderKind::OpenAI)
        .build()
        .unwrap();
    let result = parser.parse("Pancakes: mix flour and egg, then fry.").await;

    let recipe = result.recipe().unwrap();
    assert_eq!(recipe.title, "Pancakes");
    assert_eq!(recipe.ingredients, vec!["flour", "egg"]);
    assert_eq!(result.warnings(), [AI_REVIEW_WARNING.to_string()]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_ai_outage_falls_back_to_patterns() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let parser = RecipeParser::builder()
        .config(openai_config(server.url()))
        .build()
        .unwrap();
    let result = parser.parse(SECTIONED).await;

    assert_eq!(result.recipe().unwrap().ingredients, vec!["2 cups flour", "1 egg"]);
    assert_eq!(result.warnings(), [FALLBACK_WARNING.to_string()]);
    mock.assert_async().await;
}

/// Address of a server that accepts connections and never answers.
fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            held.push(stream);
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_builder_timeout_applies_to_configured_chain() {
    let parser = RecipeParser::builder()
        .config(openai_config(silent_server()))
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), parser.parse(SECTIONED))
        .await
        .expect("AI call was not cut short by the builder timeout");
    assert_eq!(result.warnings(), [FALLBACK_WARNING.to_string()]);
}
