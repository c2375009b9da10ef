//! Recipe text and titles scraped from web pages.
//!
//! Embedded `application/ld+json` Recipe markup is preferred. Pages without
//! it fall back to the visible text of `<article>`, `<main>` or `<body>`.

use html_escape::decode_html_entities;
use log::debug;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use std::time::Duration;

use crate::error::TransformError;
use crate::model::{InputKind, RecipeInput};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = "Mozilla/5.0 (compatible; SousChefBot/1.0)";
const TITLE_SEPARATORS: [&str; 4] = [" | ", " - ", " — ", " – "];

pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransformError> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// GET a page; non-2xx statuses are errors.
    pub async fn fetch(&self, url: &str) -> Result<String, TransformError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Fetch a page and return its recipe text.
pub async fn fetch_recipe_text(url: &str, limit: usize) -> Result<String, TransformError> {
    let html = PageFetcher::new(None)?.fetch(url).await?;
    recipe_text_from_html(&html, limit)
}

/// Fetch a page and return a display title, falling back to the URL slug.
pub async fn fetch_recipe_title(url: &str) -> Result<String, TransformError> {
    let html = PageFetcher::new(None)?.fetch(url).await?;
    Ok(recipe_title_from_html(&html).unwrap_or_else(|| title_from_url_slug(url)))
}

/// Title and recipe text of a page from a single fetch.
pub async fn fetch_recipe_input(
    url: &str,
    limit: usize,
    timeout: Option<Duration>,
) -> Result<RecipeInput, TransformError> {
    let html = PageFetcher::new(timeout)?.fetch(url).await?;
    let text = recipe_text_from_html(&html, limit)?;
    let name = recipe_title_from_html(&html).unwrap_or_else(|| title_from_url_slug(url));
    Ok(RecipeInput::new(name, text, InputKind::Url))
}

/// Recipe text from an HTML document.
///
/// `limit` only applies to the generic page-text fallback; JSON-LD text is
/// returned whole.
pub fn recipe_text_from_html(html: &str, limit: usize) -> Result<String, TransformError> {
    let document = Html::parse_document(html);

    if let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) {
        for script in document.select(&selector) {
            let raw = script.text().collect::<String>();
            let data: Value = match serde_json::from_str(raw.trim()) {
                Ok(data) => data,
                Err(e) => {
                    debug!("Skipping unparseable JSON-LD block: {}", e);
                    continue;
                }
            };
            if let Some(text) = json_ld_recipe_text(&data) {
                debug!("Using JSON-LD recipe markup ({} chars)", text.len());
                return Ok(text);
            }
        }
    }

    for tag in ["article", "main", "body"] {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        let Some(element) = document.select(&selector).next() else {
            continue;
        };
        let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        if !text.is_empty() {
            debug!("Using <{}> page text ({} chars)", tag, text.chars().count());
            return Ok(text.chars().take(limit).collect());
        }
    }

    Err(TransformError::NoRecipeText)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_recipe_type(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

/// Top-level items, array members and `@graph` members, in document order.
fn json_ld_items(data: &Value) -> Vec<&Value> {
    let mut items = Vec::new();
    match data {
        Value::Array(values) => {
            for value in values {
                items.extend(json_ld_items(value));
            }
        }
        Value::Object(map) => {
            items.push(data);
            if let Some(Value::Array(graph)) = map.get("@graph") {
                items.extend(graph.iter());
            }
        }
        _ => {}
    }
    items
}

fn clean_text(text: &str) -> String {
    collapse_whitespace(&decode_html_entities(text))
}

fn push_instructions(value: &Value, lines: &mut Vec<String>) {
    match value {
        Value::String(s) => lines.push(clean_text(s)),
        Value::Array(steps) => {
            for step in steps {
                push_instructions(step, lines);
            }
        }
        Value::Object(map) => {
            if let Some(items) = map.get("itemListElement") {
                push_instructions(items, lines);
            } else if let Some(Value::String(text)) = map.get("text") {
                lines.push(clean_text(text));
            } else if let Some(Value::String(name)) = map.get("name") {
                lines.push(clean_text(name));
            }
        }
        _ => {}
    }
}

/// Plain-text rendition of the first JSON-LD Recipe in `data`.
pub fn json_ld_recipe_text(data: &Value) -> Option<String> {
    for item in json_ld_items(data).into_iter().filter(|i| is_recipe_type(i)) {
        let mut lines = Vec::new();
        for key in ["name", "description"] {
            if let Some(Value::String(text)) = item.get(key) {
                lines.push(clean_text(text));
            }
        }

        let ingredients: Vec<String> = match item.get("recipeIngredient") {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(clean_text)
                .collect(),
            Some(Value::String(s)) => vec![clean_text(s)],
            _ => Vec::new(),
        };
        if !ingredients.is_empty() {
            lines.push("Ingredients:".to_string());
            lines.extend(ingredients);
        }

        let mut steps = Vec::new();
        if let Some(instructions) = item.get("recipeInstructions") {
            push_instructions(instructions, &mut steps);
        }
        if !steps.is_empty() {
            lines.push("Instructions:".to_string());
            lines.extend(steps);
        }

        lines.retain(|line| !line.is_empty());
        if !lines.is_empty() {
            return Some(lines.join("\n"));
        }
    }
    None
}

/// Collapse whitespace, turn underscores into spaces and keep the part before a site separator.
pub fn clean_title(raw: &str) -> String {
    let title = collapse_whitespace(&decode_html_entities(&raw.replace('_', " ")));
    for separator in TITLE_SEPARATORS {
        if title.contains(separator) {
            if let Some(first) = title
                .split(separator)
                .map(str::trim)
                .find(|part| !part.is_empty())
            {
                return first.to_string();
            }
        }
    }
    title
}

/// First non-empty of `og:title`, `twitter:title`, `<title>` and the first `<h1>`.
pub fn recipe_title_from_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let candidates = [
        (r#"meta[property="og:title"]"#, Some("content")),
        (r#"meta[name="twitter:title"]"#, Some("content")),
        ("title", None),
        ("h1", None),
    ];

    for (css, attribute) in candidates {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        let Some(element) = document.select(&selector).next() else {
            continue;
        };
        let raw = match attribute {
            Some(name) => element.value().attr(name).unwrap_or_default().to_string(),
            None => element.text().collect::<String>(),
        };
        let title = clean_title(&raw);
        if !title.is_empty() {
            return Some(title);
        }
    }
    None
}

/// Display name from the last path segment of a URL.
pub fn title_from_url_slug(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let slug = trimmed.rsplit('/').next().unwrap_or_default();
    let slug = slug.split(['?', '#']).next().unwrap_or_default();
    let cleaned = collapse_whitespace(&slug.replace(['-', '_'], " "));
    if cleaned.is_empty() {
        "Recipe URL".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    fn page_with_json_ld(json_ld: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">{}</script></head>
            <body><article>Ignored article text</article></body></html>"#,
            json_ld
        )
    }

    #[test]
    fn test_json_ld_recipe_is_preferred() {
        let html = page_with_json_ld(
            r#"{"@context": "https://schema.org", "@type": "Recipe",
                "name": "Pancakes", "description": "Fluffy &amp; light",
                "recipeIngredient": ["200 g flour", "2 eggs"],
                "recipeInstructions": [{"@type": "HowToStep", "text": "Mix."}, "Fry."]}"#,
        );
        let text = recipe_text_from_html(&html, 6000).unwrap();
        assert_eq!(
            text,
            "Pancakes\nFluffy & light\nIngredients:\n200 g flour\n2 eggs\nInstructions:\nMix.\nFry."
        );
    }

    #[test]
    fn test_json_ld_graph_and_type_array() {
        let data = json!({
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "WebPage", "name": "Site"},
                {"@type": ["recipe", "NewsArticle"], "name": "Soup",
                 "recipeInstructions": [{"@type": "HowToSection", "name": "Prep",
                    "itemListElement": [{"@type": "HowToStep", "text": "Chop."}]}]}
            ]
        });
        assert_eq!(
            json_ld_recipe_text(&data).as_deref(),
            Some("Soup\nInstructions:\nChop.")
        );
    }

    #[test]
    fn test_non_recipe_json_ld_is_ignored() {
        assert_eq!(json_ld_recipe_text(&json!({"@type": "Organization", "name": "X"})), None);
    }

    #[test]
    fn test_fallback_to_article_text() {
        let html = r#"<html><body><nav>Menu</nav><article><h1>Stew</h1>
            <p>Brown   the beef.</p></article></body></html>"#;
        assert_eq!(recipe_text_from_html(html, 6000).unwrap(), "Stew Brown the beef.");
    }

    #[test]
    fn test_fallback_text_is_truncated() {
        let html = format!("<html><body><main>{}</main></body></html>", "word ".repeat(2000));
        let text = recipe_text_from_html(&html, 6000).unwrap();
        assert_eq!(text.chars().count(), 6000);
    }

    #[test]
    fn test_empty_page_has_no_recipe_text() {
        let err = recipe_text_from_html("<html><body>  </body></html>", 6000).unwrap_err();
        assert!(matches!(err, TransformError::NoRecipeText));
        assert_eq!(err.to_string(), "Could not extract recipe text from this URL.");
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("Best_Pancakes  Ever | My Blog"), "Best Pancakes Ever");
        assert_eq!(clean_title("Tomato Soup - Kitchen"), "Tomato Soup");
        assert_eq!(clean_title("  Plain  "), "Plain");
    }

    #[test]
    fn test_title_candidates_in_order() {
        let html = r#"<html><head><title>Page Title | Site</title>
            <meta name="twitter:title" content="Twitter Title"></head>
            <body><h1>Heading</h1></body></html>"#;
        assert_eq!(recipe_title_from_html(html).as_deref(), Some("Twitter Title"));
        let html = "<html><body><h1> Heading </h1></body></html>";
        assert_eq!(recipe_title_from_html(html).as_deref(), Some("Heading"));
    }

    #[test]
    fn test_title_from_url_slug() {
        assert_eq!(
            title_from_url_slug("https://example.com/recipes/easy_banana-bread?ref=x#top"),
            "easy banana bread"
        );
        assert_eq!(title_from_url_slug("https://example.com/recipes/"), "recipes");
        assert_eq!(title_from_url_slug(""), "Recipe URL");
    }

    #[tokio::test]
    async fn test_fetch_recipe_text_from_server() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pancakes")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(page_with_json_ld(r#"{"@type": "Recipe", "name": "Pancakes"}"#))
            .create_async()
            .await;

        let text = fetch_recipe_text(&format!("{}/pancakes", server.url()), 6000)
            .await
            .unwrap();
        assert_eq!(text, "Pancakes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let err = fetch_recipe_text(&format!("{}/missing", server.url()), 6000)
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_title_falls_back_to_slug() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/lemon-tart")
            .with_status(200)
            .with_body("<html><body><p>No headings</p></body></html>")
            .create_async()
            .await;

        let title = fetch_recipe_title(&format!("{}/lemon-tart", server.url()))
            .await
            .unwrap();
        assert_eq!(title, "lemon tart");
    }

    #[tokio::test]
    async fn test_fetch_recipe_input_uses_page_title() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/soup")
            .with_status(200)
            .with_body(
                "<html><head><title>Tomato Soup | My Blog</title></head>\
                 <body><article>Simmer tomatoes for 20 minutes.</article></body></html>",
            )
            .expect(1)
            .create_async()
            .await;

        let input = fetch_recipe_input(&format!("{}/soup", server.url()), 6000, None)
            .await
            .unwrap();
        assert_eq!(input.name, "Tomato Soup");
        assert_eq!(input.text, "Simmer tomatoes for 20 minutes.");
        assert_eq!(input.source, InputKind::Url);
        mock.assert_async().await;
    }
}
