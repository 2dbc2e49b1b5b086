//! `bookstore-cart`: drive the cart from the command line.
//!
//! State (guest cart, session, flags) lives in a SQLite file, so a sequence
//! of invocations behaves like one storefront session.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::json;

use bookstore_cart::{BookSnapshot, Quantity};
use bookstore_client::{
    AuthToken, CartManager, ClientConfig, HttpCartService, Identity, SessionStore, SqliteStore,
};
use bookstore_core::{BookId, CartItemId, Price, UserId};

#[derive(Parser)]
#[command(name = "bookstore-cart")]
#[command(about = "Bookstore shopping cart client")]
struct Cli {
    /// Backend base URL.
    #[arg(long, global = true, env = "BOOKSTORE_API_URL")]
    api_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Directory holding the local cart database.
    #[arg(long, global = true, env = "BOOKSTORE_DATA_DIR")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current cart.
    Show,
    /// Add a book.
    Add {
        #[arg(long)]
        book_id: i64,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        author: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a line.
    Remove { item_id: CartItemId },
    /// Increase a line by one.
    Inc { item_id: CartItemId },
    /// Decrease a line by one (removes it at zero).
    Dec { item_id: CartItemId },
    /// Empty the cart.
    Clear,
    /// Log in and merge the guest cart into the user's cart.
    Login {
        #[arg(long)]
        user_id: i64,
        #[arg(long, env = "BOOKSTORE_AUTH_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Log out; the guest cart starts empty.
    Logout,
    /// Retry an incomplete login merge.
    RetryMerge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bookstore_observability::init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs.max(1)));
    }
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let store = Arc::new(match &config.data_dir {
        Some(dir) => SqliteStore::in_dir(dir),
        None => SqliteStore::new(),
    });
    let sessions = SessionStore::new(store.clone());
    let remote = HttpCartService::new(&config).context("failed to build HTTP client")?;
    let mut cart =
        CartManager::new(store.clone(), remote).with_request_timeout(config.request_timeout);

    tracing::debug!(api_url = %config.api_url, "starting cart client");

    // Resume the stored session. Merging happens only on `login` and
    // `retry-merge`.
    let stored = sessions.load().await.context("failed to read session")?;
    let mut merge_report = None;
    match stored {
        Some(identity) if !matches!(cli.command, Command::Login { .. } | Command::Logout) => {
            cart.resume(identity).await.context("failed to resume session")?;
        }
        Some(identity) if matches!(cli.command, Command::Logout) => {
            // Logout only needs the mode, not the server cart.
            tracing::debug!(user_id = %identity.user_id, "logging out stored session");
        }
        _ => {
            cart.load().await.context("failed to load cart")?;
        }
    }

    match cli.command {
        Command::Show => {
            cart.view().await.context("failed to read cart")?;
        }
        Command::Add {
            book_id,
            title,
            author,
            price,
            image_url,
            quantity,
        } => {
            let price = Price::new(price).context("invalid price")?;
            let quantity = Quantity::new(quantity).context("invalid quantity")?;
            let mut book = BookSnapshot::new(BookId::new(book_id), title, author, price);
            if let Some(url) = image_url {
                book = book.with_image_url(url);
            }
            cart.add_item(book, quantity).await.context("failed to add item")?;
        }
        Command::Remove { item_id } => {
            cart.remove_item(item_id).await.context("failed to remove item")?;
        }
        Command::Inc { item_id } => {
            cart.increase_qty(item_id).await.context("failed to increase quantity")?;
        }
        Command::Dec { item_id } => {
            cart.decrease_qty(item_id).await.context("failed to decrease quantity")?;
        }
        Command::Clear => {
            cart.clear().await.context("failed to clear cart")?;
        }
        Command::Login { user_id, token } => {
            let identity = Identity::new(UserId::new(user_id), AuthToken::new(token));
            sessions.save(&identity).await.context("failed to save session")?;
            merge_report = Some(cart.login(identity).await.context("login failed")?);
        }
        Command::Logout => {
            cart.logout().await.context("logout failed")?;
            sessions.clear().await.context("failed to clear session")?;
        }
        Command::RetryMerge => {
            merge_report = Some(cart.retry_merge().await.context("merge retry failed")?);
        }
    }

    let output = json!({
        "mode": cart.mode().label(),
        "userId": cart.mode().identity().map(|identity| identity.user_id),
        "cart": cart.summary(),
        "merge": merge_report,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
