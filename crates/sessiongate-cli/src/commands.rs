use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{error, info, warn};

use sessiongate_core::api::{Navigator, Pageable, Response};
use sessiongate_core::{AuthError, Services};

use crate::Command;

/// Sends the user back to `login` by telling them to run it
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect_to_login(&self, route: &str) {
        info!(route, "Redirecting to login");
        eprintln!("Your session has expired. Run `sessiongate login` to sign in again.");
    }
}

pub async fn execute(services: &Services, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => login(services, username, password).await,
        Command::Logout => logout(services),
        Command::Status => status(services),
        Command::Whoami => whoami(services),
        Command::Get {
            path,
            params,
            timeout_ms,
        } => {
            let params = parse_params(&params)?;
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| services.config.get_timeout());
            let body: Value = services.gateway.get(&path, &params, timeout).await?;
            print_json(&body)
        }
        Command::Post { path, body } => {
            let body: Value = serde_json::from_str(&body).context("Request body is not valid JSON")?;
            let response: Value = services.gateway.post(&path, &body).await?;
            print_json(&response)
        }
        Command::Page {
            path,
            params,
            size,
            page,
        } => {
            let params = parse_params(&params)?;
            let pageable = Pageable {
                page_size: size,
                page_number: page,
            };
            let response: Response<Value> = services
                .gateway
                .get_page(&path, &params, Some(pageable), None)
                .await?;
            if let Response::Page(ref page) = response {
                info!(total = page.total_elements, returned = page.data.len(), "Page received");
            }
            print_json(&response)
        }
    }
}

async fn login(services: &Services, username: Option<String>, password: Option<String>) -> Result<()> {
    if services.session.is_authenticated() {
        warn!("Login requested while a valid session exists");
        println!("logged in user doesn't need to login again.");
        return Ok(());
    }

    let username = match username {
        Some(username) => username,
        None => prompt_username()?,
    };
    let password = match password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };

    if username.is_empty() || password.is_empty() {
        return Err(anyhow::anyhow!("Username and password required"));
    }

    match services.session.login(&username, &password).await {
        Ok(context) => {
            let name = context.current_user.display_name().unwrap_or(&username);
            println!("Welcome back, {}!", name);
            Ok(())
        }
        Err(e) => {
            if e.is_credential_rejection() {
                warn!(error = %e, "Login rejected");
            } else {
                error!(error = %e, "Login failed");
            }
            let message = match e {
                AuthError::Network(_) => {
                    "Unable to connect to server. Check your internet connection.".to_string()
                }
                ref other => other.to_string(),
            };
            Err(anyhow::anyhow!(message))
        }
    }
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

fn logout(services: &Services) -> Result<()> {
    services.session.reset().context("Failed to clear session")?;
    println!("Logged out.");
    Ok(())
}

fn status(services: &Services) -> Result<()> {
    if services.session.is_authenticated() {
        let minutes = services.session.minutes_until_expiry().unwrap_or(0);
        let who = services
            .session
            .current_user()
            .and_then(|user| user.display_name().map(str::to_string))
            .unwrap_or_else(|| "unknown user".to_string());
        println!("Logged in as {} (expires in {}m)", who, minutes);
    } else if services.session.get_context().is_some() {
        println!("Session expired. Run `sessiongate login` to sign in again.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

fn whoami(services: &Services) -> Result<()> {
    if !services.session.is_authenticated() {
        return Err(anyhow::anyhow!("Not logged in. Run `sessiongate login` first."));
    }
    let user = services
        .session
        .current_user()
        .ok_or_else(|| anyhow::anyhow!("Session disappeared while reading it"))?;
    print_json(&user)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse repeated `KEY=VALUE` arguments into query pairs
fn parse_params(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| anyhow::anyhow!("Expected KEY=VALUE, got {:?}", pair))
        })
        .collect()
}
