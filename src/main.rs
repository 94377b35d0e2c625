use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use devflow_core::assistant::HttpAssistant;
use devflow_core::cache::StatusCache;
use devflow_core::config::AppConfig;
use devflow_core::interpreter::{format, Interpreter, NO_REPOSITORY};
use devflow_core::session::{ChatSession, ChatTurn, Transcript};
use devflow_core::watcher::{spawn_refresh_worker, WorkspaceWatcher};

/// Chat with your git repository from the terminal
#[derive(Parser, Debug)]
#[command(name = "devflow", version)]
struct Cli {
    /// Workspace directory (defaults to the current directory)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Config file (defaults to ~/.devflow/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Assistant endpoint, overrides config and environment
    #[arg(long)]
    assistant_url: Option<String>,

    /// Do not watch the workspace for file changes
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    devflow_core::util::init_logging();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(AppConfig::default_path);
    let mut config = match &config_path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };
    config.apply_env()?;
    if let Some(url) = cli.assistant_url {
        config.assistant.url = url;
    }

    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().context("resolving current directory")?,
    };

    let assistant = HttpAssistant::from_config(&config.assistant)?;
    info!(
        "Starting DevFlow in {} (assistant: {})",
        workspace.display(),
        assistant.url()
    );

    let cache = StatusCache::with_git();
    let session =
        ChatSession::open(Interpreter::new(Arc::new(assistant)), &workspace).with_cache(cache.clone());

    let mut stdout = tokio::io::stdout();

    // 启动时输出仓库上下文
    match session.repository() {
        Some(repo) => {
            match repo.context().await {
                Ok(ctx) => println_async(&mut stdout, &ctx.headline()).await?,
                Err(e) => warn!("Failed to read repository context: {}", e),
            }
            if let Some(line) = repo.status().await.ok().as_ref().and_then(format::merge_required) {
                println_async(&mut stdout, &line).await?;
            }
            cache.spawn_refresh(repo.root().clone());
        }
        None => println_async(&mut stdout, NO_REPOSITORY).await?,
    }

    // 文件监控 → 合并刷新队列 → 状态缓存
    let mut watcher = None;
    if let (false, Some(root)) = (cli.no_watch, session.root()) {
        let (tx, rx) = mpsc::channel(config.watcher.queue_capacity.max(1));
        let mut w = WorkspaceWatcher::new(tx);
        match w.subscribe(root.path().to_path_buf(), config.watcher.debounce()) {
            Ok(()) => {
                spawn_refresh_worker(cache.clone(), rx, config.watcher.coalesce());
                watcher = Some(w);
            }
            Err(e) => warn!("File watching disabled: {}", e),
        }
    }

    let mut transcript = Transcript::new();
    let mut last_summary: Option<String> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input == "/clear" {
            transcript.clear();
            println_async(&mut stdout, "Transcript cleared.").await?;
            continue;
        }

        transcript.push(ChatTurn::user(input));
        let reply = session.submit(input).await.text();
        transcript.push(ChatTurn::assistant(reply.clone()));
        println_async(&mut stdout, &reply).await?;

        if let Some(root) = session.root() {
            let summary = cache.summary(root).map(|s| s.text);
            if summary.is_some() && summary != last_summary {
                if let Some(text) = &summary {
                    println_async(&mut stdout, &format!("[{}]", text)).await?;
                }
                last_summary = summary;
            }
        }
    }

    if let Some(mut w) = watcher {
        w.unsubscribe();
    }
    info!("Session ended after {} turns", transcript.len());
    Ok(())
}

async fn println_async(stdout: &mut tokio::io::Stdout, text: &str) -> std::io::Result<()> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
