use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use gemini_chat::client::HttpChatClient;
use gemini_chat::config::Config;
use gemini_chat::models::{Message, Sender};
use gemini_chat::pdf::{PDF_CONTENT_TYPE, PdfExtractLoader};
use gemini_chat::session::{AttachOutcome, ChatSession, SendOutcome, Upload};

const HELP: &str = "Commands: /upload <path.pdf>  /theme  /history  /quit";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    let client = Arc::new(HttpChatClient::from_config(&config));
    let session = ChatSession::new(client, Arc::new(PdfExtractLoader));

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("💬 Chatbot ({})\n{HELP}\n", config.client.proxy_url).as_bytes())
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let output = match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
            ("/quit", _) => break,
            ("/theme", _) => {
                let theme = session.toggle_theme();
                format!("theme: {theme:?} (next: {})\n", theme.toggle_label())
            }
            ("/history", _) => session.messages().iter().map(render).collect(),
            ("/upload", path) if !path.is_empty() => upload(&session, Path::new(path)).await?,
            ("/upload", _) => "usage: /upload <path.pdf>\n".to_string(),
            _ => {
                if let Some(placeholder) = thinking(&session, line) {
                    stdout.write_all(placeholder.as_bytes()).await?;
                    stdout.flush().await?;
                }
                match session.send(line).await {
                    SendOutcome::Replied(message) => render(&message),
                    SendOutcome::Busy => "(still waiting for the previous reply)\n".to_string(),
                    SendOutcome::Ignored => String::new(),
                }
            }
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

fn thinking(session: &ChatSession, line: &str) -> Option<String> {
    if line.is_empty() || session.is_loading() {
        return None;
    }
    Some(format!("{}\n", gemini_chat::session::THINKING_PLACEHOLDER))
}

async fn upload(session: &ChatSession, path: &Path) -> Result<String> {
    let Some((name, content_type)) = upload_meta(path) else {
        return Ok(format!("{} has no file name\n", path.display()));
    };
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => return Ok(format!("could not read {}: {e}\n", path.display())),
    };

    let before = session.messages().len();
    let outcome = session
        .attach(Upload {
            name: name.clone(),
            content_type: content_type.to_string(),
            bytes,
        })
        .await;

    let mut out: String = session.messages()[before..].iter().map(render).collect();
    if let AttachOutcome::Attached { chars } = outcome {
        out.push_str(&format!(
            "{name}: {chars} characters will be sent with your next message\n"
        ));
    }
    Ok(out)
}

/// File name and declared type. The type comes from the extension, as a
/// browser file picker would report it.
fn upload_meta(path: &Path) -> Option<(String, &'static str)> {
    let name = path.file_name()?.to_str()?.to_string();
    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_CONTENT_TYPE,
        _ => "application/octet-stream",
    };
    Some((name, content_type))
}

fn render(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Bot => "bot",
    };
    format!("[{}] {who}: {}\n", message.created_at.format("%H:%M:%S"), message.text)
}
