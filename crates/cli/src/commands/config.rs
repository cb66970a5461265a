//! Config command - view or modify configuration.

use anyhow::Result;
use mentorlink_core::Config;

pub async fn execute(key: Option<String>, value: Option<String>) -> Result<()> {
    let mut config = Config::load_with_env()?;

    match (key.as_deref(), value) {
        (None, None) => {
            // Show all config
            println!("Current Configuration");
            println!("=====================");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        (Some(key), None) => {
            // Get specific key
            match key {
                "api_base_url" => println!("{}", config.api_base_url),
                "socket_url" => println!("{}", config.socket_url),
                "session_cookie" => match config.session_cookie {
                    Some(_) => println!("(set)"),
                    None => println!("(not set)"),
                },
                "strict_dedup" => println!("{}", config.strict_dedup),
                "inbound_throttle_ms" => println!("{}", config.inbound_throttle_ms),
                "outbound_throttle_ms" => println!("{}", config.outbound_throttle_ms),
                "typing_idle_ms" => println!("{}", config.typing_idle_ms),
                "typing_expiry_ms" => println!("{}", config.typing_expiry_ms),
                _ => println!("Unknown config key: {}", key),
            }
        }
        (Some(key), Some(value)) => {
            // Set specific key
            match key {
                "api_base_url" => {
                    config.api_base_url = value;
                    config.save()?;
                    println!("Set api_base_url = {}", config.api_base_url);
                }
                "socket_url" => {
                    config.socket_url = value;
                    config.save()?;
                    println!("Set socket_url = {}", config.socket_url);
                }
                "session_cookie" => {
                    config.session_cookie = if value.is_empty() { None } else { Some(value) };
                    config.save()?;
                    // The cookie is a credential, never echo it back.
                    println!("Set session_cookie");
                }
                "strict_dedup" => {
                    config.strict_dedup = value.parse()?;
                    config.save()?;
                    println!("Set strict_dedup = {}", config.strict_dedup);
                }
                "inbound_throttle_ms" => {
                    config.inbound_throttle_ms = value.parse()?;
                    config.save()?;
                    println!("Set inbound_throttle_ms = {}", config.inbound_throttle_ms);
                }
                "outbound_throttle_ms" => {
                    config.outbound_throttle_ms = value.parse()?;
                    config.save()?;
                    println!("Set outbound_throttle_ms = {}", config.outbound_throttle_ms);
                }
                "typing_idle_ms" => {
                    config.typing_idle_ms = value.parse()?;
                    config.save()?;
                    println!("Set typing_idle_ms = {}", config.typing_idle_ms);
                }
                "typing_expiry_ms" => {
                    config.typing_expiry_ms = value.parse()?;
                    config.save()?;
                    println!("Set typing_expiry_ms = {}", config.typing_expiry_ms);
                }
                _ => println!("Cannot set config key: {}", key),
            }
        }
        (None, Some(_)) => {
            println!("Must specify a key to set a value");
        }
    }

    Ok(())
}
