use anyhow::Result;
use api_client::ApiClient;
use colored::*;
use sse::{ConnectionState, ConnectionStatus};
use std::time::{Duration, Instant};

use crate::output::{print_event, TestResult};
use crate::probe::Probe;

pub async fn test_connection(probe: &mut Probe, timeout: Duration) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Connection Test ===".bright_cyan().bold());
    println!("{} Waiting for the stream to report connected...", "→".blue());

    let outcome = probe
        .wait_for(events::CONNECTION, timeout, |event| {
            ConnectionState::from_event(event).is_some_and(|state| {
                matches!(
                    state.status,
                    ConnectionStatus::Connected | ConnectionStatus::Error
                )
            })
        })
        .await;

    match outcome {
        Ok(event) => {
            print_event(&event);
            let connected = ConnectionState::from_event(&event)
                .is_some_and(|state| state.status == ConnectionStatus::Connected);
            if connected {
                println!("{} Stream connected", "✓".green());
                Ok(TestResult::pass(
                    "connection_test",
                    "Realtime stream connected",
                    start.elapsed(),
                ))
            } else {
                println!("{} Stream gave up reconnecting", "✗".red());
                Ok(TestResult::fail(
                    "connection_test",
                    "Stream reached its reconnect limit",
                    start.elapsed(),
                ))
            }
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            Ok(TestResult::fail("connection_test", e.to_string(), start.elapsed()))
        }
    }
}

pub async fn test_heartbeat(probe: &mut Probe, timeout: Duration) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Heartbeat Test ===".bright_cyan().bold());
    println!(
        "{} Waiting up to {:?} for a server heartbeat...",
        "→".blue(),
        timeout
    );

    match probe.wait_for(events::HEARTBEAT, timeout, |_| true).await {
        Ok(event) => {
            print_event(&event);
            println!("{} Heartbeat received", "✓".green());
            Ok(TestResult::pass(
                "heartbeat_test",
                "Server heartbeat received",
                start.elapsed(),
            ))
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            Ok(TestResult::fail("heartbeat_test", e.to_string(), start.elapsed()))
        }
    }
}

pub async fn test_csrf(api: &ApiClient) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: CSRF Token Test ===".bright_cyan().bold());
    println!("{} Fetching a CSRF token...", "→".blue());

    match api.csrf().refresh(api.http()).await {
        Ok(token) if !token.is_empty() => {
            println!("{} Token received ({} chars)", "✓".green(), token.len());
            Ok(TestResult::pass(
                "csrf_test",
                "CSRF token endpoint answered",
                start.elapsed(),
            ))
        }
        Ok(_) => Ok(TestResult::fail(
            "csrf_test",
            "CSRF endpoint returned an empty token",
            start.elapsed(),
        )),
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            Ok(TestResult::fail("csrf_test", e.user_message(), start.elapsed()))
        }
    }
}
