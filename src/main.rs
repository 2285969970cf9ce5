//! parley - 终端对话前端
//!
//! 入口：初始化日志、加载配置、装配运行时，然后逐行读取输入。
//! 普通输入走带记忆的对话（带重试），斜杠命令：
//! /ask <问题>、/key <API Key>、/save <标题>、/saved、/history、/clear、/quit

use anyhow::Context;
use parley::config::load_config;
use parley::core::{submit_with_retry, ChatError};
use parley::llm::CredentialSource;
use parley::observability;
use parley::runtime::{build_runtime, Runtime};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(Into::into);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });
    let runtime = build_runtime(&cfg).context("Failed to build runtime")?;

    println!("{} ready. Type /quit to exit.", cfg.app.name.as_deref().unwrap_or("parley"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_reply: Option<String> = None;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "/quit" | "/exit" => break,
            "/clear" => {
                runtime.orchestrator.clear().await;
                println!("(conversation cleared)");
            }
            "/history" => {
                for turn in runtime.orchestrator.history().await {
                    println!("#{} {:?}: {}", turn.sequence(), turn.role(), turn.content());
                }
            }
            "/key" => match runtime.stored_credential.remember(rest) {
                Ok(()) => println!("(API key saved)"),
                Err(e) => eprintln!("Failed to save key: {e}"),
            },
            "/ask" => {
                let key = runtime.credentials.lookup();
                match runtime.orchestrator.query(rest, key.as_deref()).await {
                    Ok(reply) => {
                        println!("{reply}");
                        last_reply = Some(reply);
                    }
                    Err(e) => report(&e),
                }
            }
            "/save" => save_last(&runtime, rest, last_reply.as_deref()),
            "/saved" => match runtime.artifacts.list() {
                Ok(all) => {
                    for a in all {
                        println!("{} [{}] {}", a.created_at.format("%Y-%m-%d %H:%M"), a.id, a.title);
                    }
                }
                Err(e) => eprintln!("Failed to list saved items: {e}"),
            },
            _ => {
                let key = runtime.credentials.lookup();
                match submit_with_retry(&runtime.orchestrator, line, key.as_deref(), &runtime.retry).await {
                    Ok(reply) => {
                        println!("{reply}");
                        last_reply = Some(reply);
                    }
                    Err(e) => report(&e),
                }
            }
        }
    }

    let (prompt, completion, total) = runtime.orchestrator.token_usage();
    tracing::info!(prompt, completion, total, "Session finished");
    Ok(())
}

fn save_last(runtime: &Runtime, title: &str, last_reply: Option<&str>) {
    let Some(content) = last_reply else {
        eprintln!("Nothing to save yet.");
        return;
    };
    let title = match title.trim() {
        "" => "Untitled",
        t => t,
    };
    match runtime.artifacts.save(title, content) {
        Ok(a) => println!("(saved as {})", a.id),
        Err(e) => eprintln!("Failed to save: {e}"),
    }
}

fn report(err: &ChatError) {
    eprintln!("{}", err.kind().guidance());
    tracing::debug!("Request failed: {}", err);
}
