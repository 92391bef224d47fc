use crate::settings::{self, AppConfig};
use std::time::Duration;
use webpilot_llm::util::mask_api_key;

const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("🩺 WebPilot Doctor\n");

    let mut all_ok = true;

    all_ok &= check_api_key();
    all_ok &= check_model(config);
    all_ok &= check_webdriver(&config.browser.webdriver_url).await;

    println!("\nResolved configuration:\n");
    println!("{}", toml::to_string_pretty(config)?);

    if all_ok {
        println!("✅ All checks passed! Ready to run WebPilot.");
    } else {
        println!("⚠️  Some checks failed. Please fix the issues above.");
        std::process::exit(1);
    }

    Ok(())
}

fn check_api_key() -> bool {
    print!("Checking OpenRouter API key... ");

    match settings::api_key() {
        Ok(key) => {
            println!("✅ {}", mask_api_key(&key));
            true
        }
        Err(_) => {
            println!("❌ OPENROUTER_API_KEY is not set. Add it to .env.");
            false
        }
    }
}

fn check_model(config: &AppConfig) -> bool {
    print!("Checking model... ");

    if config.llm.model.trim().is_empty() {
        println!("❌ llm.model is empty");
        false
    } else {
        println!("✅ {} via {}", config.llm.model, config.llm.base_url);
        true
    }
}

async fn check_webdriver(url: &str) -> bool {
    print!("Checking WebDriver at {url}... ");

    let client = match reqwest::Client::builder().timeout(STATUS_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            println!("❌ HTTP client error: {e}");
            return false;
        }
    };

    let status_url = format!("{}/status", url.trim_end_matches('/'));
    match client.get(&status_url).send().await {
        Ok(response) if response.status().is_success() => {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            match webdriver_ready(&body) {
                Some(false) => {
                    println!("⚠️  reachable but not ready");
                    false
                }
                _ => {
                    println!("✅ Ready");
                    true
                }
            }
        }
        Ok(response) => {
            println!("❌ HTTP {}", response.status());
            false
        }
        Err(_) => {
            println!("❌ Not reachable. Start chromedriver (default port 9515).");
            false
        }
    }
}

/// `value.ready` of a WebDriver status reply
fn webdriver_ready(body: &serde_json::Value) -> Option<bool> {
    body.get("value")?.get("ready")?.as_bool()
}
