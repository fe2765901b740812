mod api;
mod context;
mod digest;
mod router;

use clap::{Parser, Subcommand};
use tally_core::config;
use tracing::info;

use context::AppContext;
use digest::DigestScheduler;

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Tally — sales & money assistant over chat"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server and digest scheduler.
    Serve,
    /// Run one digest pass now, then exit.
    Notify,
    /// Check configuration, provider and channel readiness.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cfg.tally.log_level.clone())),
        )
        .init();

    match cli.command {
        Commands::Serve => {
            let ctx = AppContext::build(cfg).await?;
            if ctx.channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable at least one channel in config.toml.");
            }

            if ctx.config.digest.enabled {
                let scheduler = DigestScheduler::new(
                    ctx.store.clone(),
                    ctx.cache.clone(),
                    ctx.exec.clone(),
                    ctx.channels.clone(),
                    ctx.config.digest.clone(),
                );
                tokio::spawn(scheduler.run());
            }

            let state = api::AppState {
                router: ctx.router.clone(),
                channels: ctx.channels.clone(),
                store: ctx.store.clone(),
            };
            let app = api::build(state);

            info!("Listening on {}", ctx.config.api.bind);
            let listener = tokio::net::TcpListener::bind(&ctx.config.api.bind).await?;
            axum::serve(listener, app).await?;
        }
        Commands::Notify => {
            let ctx = AppContext::build(cfg).await?;
            if ctx.channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable at least one channel in config.toml.");
            }
            let scheduler = DigestScheduler::new(
                ctx.store,
                ctx.cache,
                ctx.exec,
                ctx.channels,
                ctx.config.digest,
            );
            scheduler.tick().await;
        }
        Commands::Status => {
            println!("Tally — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Default provider: {}", cfg.provider.default);

            let key_set = cfg
                .provider
                .anthropic
                .as_ref()
                .map(|a| !a.resolved_api_key().is_empty())
                .unwrap_or(false);
            println!("  anthropic: {}", if key_set { "configured" } else { "missing api key" });
            println!();

            for (name, state) in [
                (
                    "telegram",
                    cfg.channel.telegram.as_ref().map(|c| {
                        channel_state(c.enabled, !c.resolved_bot_token().is_empty())
                    }),
                ),
                (
                    "whatsapp",
                    cfg.channel.whatsapp.as_ref().map(|c| {
                        channel_state(c.enabled, !c.access_token.is_empty() && !c.phone_number_id.is_empty())
                    }),
                ),
                (
                    "sms",
                    cfg.channel.sms.as_ref().map(|c| {
                        channel_state(c.enabled, !c.account_sid.is_empty() && !c.auth_token.is_empty())
                    }),
                ),
            ] {
                println!("  {name}: {}", state.unwrap_or("not configured"));
            }
            println!();

            let store = tally_store::Store::new(&cfg.store).await?;
            let users = store.list_users().await?;
            println!("Users: {}", users.len());
            for user in &users {
                let recent = store.recent_notifications(&user.id, 3).await?;
                if recent.is_empty() {
                    continue;
                }
                let outcomes = recent
                    .iter()
                    .map(|n| format!("{} {} ({})", n.sent_at, n.kind, n.status))
                    .collect::<Vec<_>>()
                    .join(", ");
                let who = user.display_name.as_deref().unwrap_or(&user.chat_id);
                println!("  {who} on {}: {outcomes}", user.platform);
            }
        }
    }

    Ok(())
}

fn channel_state(enabled: bool, credentialed: bool) -> &'static str {
    match (enabled, credentialed) {
        (false, _) => "disabled",
        (true, true) => "configured",
        (true, false) => "enabled but missing credentials",
    }
}
