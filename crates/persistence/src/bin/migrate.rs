#![deny(warnings)]

use persistence::{default_sqlite_url, init_db, list_saves};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    let pool = init_db(&url).await?;
    let slots = list_saves(&pool).await?;
    println!("DB migrated at {} ({} saves)", url, slots.len());
    Ok(())
}
