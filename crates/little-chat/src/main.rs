//! A terminal chat with the server at `LITTLE_CHAT_BASE_URL`.
//!
//! Type a message and press enter to send it. `/clear` starts over and
//! `/quit` (or end of input) exits.
//!
//! Requests give up after `LITTLE_CHAT_TIMEOUT_SECS` (30 by default, 0 for
//! no limit). `LITTLE_CHAT_TYPING_MS` sets the typing speed of replies and
//! `LITTLE_CHAT_CACHE` the cache file.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use little_chat::SessionBuilder;
use little_chat::core::DEFAULT_REVEAL_INTERVAL;
use little_chat::http::HttpConfigBuilder;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};

/// How long a request may take unless `LITTLE_CHAT_TIMEOUT_SECS` says
/// otherwise.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (timeout, reveal_interval) = match (
        number_var("LITTLE_CHAT_TIMEOUT_SECS"),
        number_var("LITTLE_CHAT_TYPING_MS"),
    ) {
        (Ok(secs), Ok(millis)) => (
            secs.map_or(DEFAULT_TIMEOUT, Duration::from_secs),
            millis.map_or(DEFAULT_REVEAL_INTERVAL, Duration::from_millis),
        ),
        (Err(err), _) | (_, Err(err)) => {
            eprintln!("{err}");
            return;
        }
    };
    let mut config = match env::var("LITTLE_CHAT_BASE_URL") {
        Ok(base_url) => HttpConfigBuilder::with_base_url(base_url),
        Err(_) => HttpConfigBuilder::default(),
    };
    // Zero waits for the server indefinitely.
    if !timeout.is_zero() {
        config = config.with_timeout(timeout);
    }
    let config = config.build();
    let cache_path = env::var_os("LITTLE_CHAT_CACHE")
        .map(PathBuf::from)
        .unwrap_or_else(default_cache_path);

    let session = match SessionBuilder::with_config(config)
        .with_cache_file(cache_path)
        .with_reveal_interval(reveal_interval)
        .build()
    {
        Ok(session) => session,
        Err(err) => {
            eprintln!("failed to set up the HTTP client: {err}");
            return;
        }
    };

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        // Let the loaded history or the last reply finish typing.
        if session.wait_idle().await.is_err()
            || session.wait_reveals().await.is_err()
        {
            break;
        }

        session.begin_input();
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut lines).await else {
            break;
        };
        match line.trim() {
            "/quit" => break,
            "/clear" => session.clear(),
            _ => session.submit(line),
        }
    }
    session.shutdown();
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

fn number_var(name: &str) -> Result<Option<u64>, String> {
    parse_number(name, env::var(name).ok())
}

fn parse_number(
    name: &str,
    value: Option<String>,
) -> Result<Option<u64>, String> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| format!("{name} must be a number"))
        })
        .transpose()
}

/// Returns a cache file that lives as long as the terminal session, so
/// that two terminals don't share a conversation.
fn default_cache_path() -> PathBuf {
    #[cfg(unix)]
    let name = format!(
        "little-chat-{}.json",
        std::os::unix::process::parent_id()
    );
    #[cfg(not(unix))]
    let name = "little-chat.json".to_owned();
    env::temp_dir().join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("N", None), Ok(None));
        assert_eq!(parse_number("N", Some(" 15\n".to_owned())), Ok(Some(15)));
        assert_eq!(
            parse_number("N", Some("soon".to_owned())),
            Err("N must be a number".to_owned())
        );
    }
}
