use anyhow::Context;
use clap::{Parser, Subcommand};
use fluxa::render::{render_tree, sync_status};
use fluxa::{feed_route, AddFeedForm, App, UiFlags};
use fluxa_core::config::Config;
use fluxa_core::{CategoryId, FeedId, FeedPatch, Mutation, MutationError, MutationOutcome};

#[derive(Parser)]
#[command(name = "fluxa", about = "Miniflux feeds from the terminal")]
struct Cli {
    /// Write debug logs to /tmp/fluxa-debug.log (tail -f to inspect).
    #[arg(long)]
    debug: bool,
    /// Server URL, overriding config.toml.
    #[arg(long, global = true)]
    server: Option<String>,
    /// API token, overriding config.toml.
    #[arg(long, global = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resync from the server and print a summary.
    Sync,
    /// Resync and print feeds grouped by category.
    List {
        #[arg(long)]
        unread_only: bool,
    },
    /// Subscribe to a feed.
    AddFeed {
        url: String,
        #[arg(long)]
        category: i64,
        /// Fetch original article content.
        #[arg(long)]
        crawler: bool,
    },
    /// Change a feed's settings.
    EditFeed {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        site_url: Option<String>,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        crawler: Option<bool>,
        #[arg(long)]
        hidden: Option<bool>,
        #[arg(long)]
        disabled: Option<bool>,
    },
    /// Unsubscribe from a feed.
    RemoveFeed { id: i64 },
    /// Mark every entry of a feed as read.
    MarkRead { id: i64 },
    /// Mark every entry of a category as read.
    MarkCategoryRead { id: i64 },
    AddCategory { title: String },
    RenameCategory { id: i64, title: String },
    RemoveCategory { id: i64 },
    /// Keep syncing in the background and print the tree after every change.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/fluxa-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("fluxa debug log started, tail -f /tmp/fluxa-debug.log");
    }

    let mut config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "config unreadable, using defaults");
        Config::defaults()
    });
    if let Some(server) = cli.server {
        config.server.url = server;
    }
    if let Some(token) = cli.token {
        config.server.token = token;
    }

    let app = App::from_config(&config).context("cannot build miniflux client")?;

    match cli.command {
        Command::Sync => {
            let result = app.coordinator.request_sync().await?;
            println!(
                "generation {}: {} feeds in {} categories, {} unread",
                result.generation,
                result.feed_count,
                result.category_count,
                app.store.snapshot().unread_total()
            );
        }
        Command::List { unread_only } => {
            app.coordinator.request_sync().await?;
            let snapshot = app.store.snapshot();
            print!("{}", render_tree(&snapshot, unread_only));
            println!("{}", sync_status(&snapshot, chrono::Utc::now()));
        }
        Command::AddFeed {
            url,
            category,
            crawler,
        } => {
            let mut flags = UiFlags {
                add_feed_open: true,
                ..UiFlags::default()
            };
            let mut form = AddFeedForm::new(url, Some(CategoryId(category)), crawler);
            let outcome = form.submit(&app.gateway, &mut flags).await;
            report(outcome)?;
        }
        Command::EditFeed {
            id,
            title,
            url,
            site_url,
            category,
            crawler,
            hidden,
            disabled,
        } => {
            let patch = FeedPatch {
                title,
                feed_url: url,
                site_url,
                category_id: category.map(CategoryId),
                crawler,
                hide_globally: hidden,
                disabled,
            };
            let outcome = app
                .gateway
                .mutate(Mutation::UpdateFeed {
                    id: FeedId(id),
                    patch,
                })
                .await;
            report(outcome)?;
        }
        Command::RemoveFeed { id } => {
            report(app.gateway.mutate(Mutation::DeleteFeed(FeedId(id))).await)?;
        }
        Command::MarkRead { id } => {
            report(app.gateway.mutate(Mutation::MarkFeedRead(FeedId(id))).await)?;
        }
        Command::MarkCategoryRead { id } => {
            let mutation = Mutation::MarkCategoryRead(CategoryId(id));
            report(app.gateway.mutate(mutation).await)?;
        }
        Command::AddCategory { title } => {
            report(app.gateway.mutate(Mutation::CreateCategory { title }).await)?;
        }
        Command::RenameCategory { id, title } => {
            let mutation = Mutation::UpdateCategory {
                id: CategoryId(id),
                title,
            };
            report(app.gateway.mutate(mutation).await)?;
        }
        Command::RemoveCategory { id } => {
            let mutation = Mutation::DeleteCategory(CategoryId(id));
            report(app.gateway.mutate(mutation).await)?;
        }
        Command::Watch => watch(&app, &config).await?,
    }

    Ok(())
}

fn report(outcome: Result<MutationOutcome, MutationError>) -> anyhow::Result<()> {
    match outcome {
        Ok(outcome) => {
            match outcome.remote.feed_id() {
                Some(id) => println!("ok, feed {id} ({})", feed_route(id)),
                None => println!("ok"),
            }
            println!(
                "store at generation {} ({} feeds)",
                outcome.sync.generation, outcome.sync.feed_count
            );
            Ok(())
        }
        Err(MutationError::Unsynced { remote, cause }) => {
            if let Some(id) = remote.feed_id() {
                println!("server accepted the change, feed {id} ({})", feed_route(id));
            }
            Err(anyhow::anyhow!("local view is stale: {cause}"))
        }
        Err(err) => Err(err.into()),
    }
}

async fn watch(app: &App, config: &Config) -> anyhow::Result<()> {
    let _subscription = app.store.subscribe(|snapshot| {
        println!("--- generation {} ---", snapshot.generation());
        print!("{}", render_tree(snapshot, false));
    });

    let service = app.background_sync(&config.sync);
    let shutdown = service.shutdown_token();
    let handle = tokio::spawn(service.run());

    tokio::signal::ctrl_c().await?;
    shutdown.cancel();
    let attempts = handle.await?;
    tracing::info!(attempts, "watch stopped");
    Ok(())
}
