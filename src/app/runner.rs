//! 应用运行器：按子命令分派

use anyhow::{Context, Result};
use ixinventory_scheduler::{PollCategory, PollScheduler};
use ixinventory_server::handlers::{PollOutcome, RefreshResponse};
use ixinventory_server::{AppState, ServerState};
use std::time::Duration;

use super::bootstrap::{self, AppContext};
use super::cli::{Cli, Command, CredentialsAction};

pub async fn run(cli: Cli) -> Result<()> {
    let ctx = bootstrap::init(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => serve(ctx).await,
        Command::Poll { target } => poll(&ctx, &target).await,
        Command::Credentials { action } => credentials(&ctx, action).await,
    }
}

/// 启动 HTTP 服务器和周期轮询，直到 Ctrl-C
async fn serve(ctx: AppContext) -> Result<()> {
    let mut server = ServerState::new(ctx.config.server.clone());
    let state = AppState::new(
        ctx.poller.clone(),
        ctx.credential_file.clone(),
        ctx.logs.clone(),
    );
    server
        .start(state)
        .await
        .context("HTTP 服务器启动失败")?;

    let scheduler = if ctx.config.poller.enabled {
        let scheduler = PollScheduler::new(
            ctx.poller.clone(),
            ctx.db.clone(),
            Duration::from_secs(ctx.config.poller.tick_secs),
        );
        let handle = scheduler.start();
        Some((scheduler, handle))
    } else {
        tracing::info!("[POLLER] 周期轮询已禁用");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("监听 Ctrl-C 信号失败")?;
    tracing::info!("[SERVER] 收到 Ctrl-C，正在关闭");

    if let Some((scheduler, handle)) = scheduler {
        scheduler.stop();
        if let Err(e) = handle.await {
            tracing::error!("[POLLER] 周期轮询任务异常退出: {}", e);
        }
    }
    server.stop().await;
    Ok(())
}

async fn poll(ctx: &AppContext, target: &str) -> Result<()> {
    let output = if target.eq_ignore_ascii_case("all") {
        let outcomes: Vec<PollOutcome> = PollCategory::ALL
            .into_iter()
            .zip(ctx.poller.poll_all().await)
            .map(|(category, result)| match result {
                Ok(report) => PollOutcome::Report(report),
                Err(e) => PollOutcome::Failed {
                    category,
                    error: e.to_string(),
                },
            })
            .collect();
        serde_json::to_string_pretty(&outcomes)?
    } else {
        let category: PollCategory = target.parse()?;
        let report = ctx
            .poller
            .poll(category)
            .await
            .with_context(|| format!("{category} 轮询失败"))?;
        serde_json::to_string_pretty(&report)?
    };

    println!("{output}");
    Ok(())
}

async fn credentials(ctx: &AppContext, action: CredentialsAction) -> Result<()> {
    let output = match action {
        CredentialsAction::Status => serde_json::to_string_pretty(&ctx.resolver.status().await)?,
        CredentialsAction::Refresh => {
            let outcome = ctx.resolver.refresh().await;
            serde_json::to_string_pretty(&RefreshResponse {
                source: outcome.source,
                chassis_count: outcome.entries.len(),
            })?
        }
    };

    println!("{output}");
    Ok(())
}
