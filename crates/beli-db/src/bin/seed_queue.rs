//! # Queue Seed Generator
//!
//! Writes a mutation queue snapshot full of sample offline writes, for
//! exercising replay during development.
//!
//! ## Usage
//! ```bash
//! # 20 mutations (default) into ./beli_sync_dev.db
//! cargo run -p beli-db --bin seed-queue
//!
//! # Custom amount and path
//! cargo run -p beli-db --bin seed-queue -- --count 200 --db ./data/sync.db
//! ```
//!
//! Mutations cycle through every [`MutationKind`] with small realistic
//! payloads (user ids, restaurant ids, list ids, ratings).

use serde_json::{json, Value};
use std::env;

use beli_core::{MutationKind, Payload, PendingMutation, PersistedQueue, DEFAULT_STORAGE_KEY};
use beli_db::{Database, DbConfig};

/// Sample user ids
const USERS: &[&str] = &["u-alex", "u-sam", "u-jordan", "u-riley", "u-morgan"];

/// Sample restaurant ids
const RESTAURANTS: &[&str] = &["r-carbone", "r-lilia", "r-dhamaka", "r-via-carota", "r-katzs"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 20;
    let mut db_path = String::from("./beli_sync_dev.db");
    let mut key = String::from(DEFAULT_STORAGE_KEY);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = parse_count(&args[i + 1])?;
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--key" | "-k" => {
                if i + 1 < args.len() {
                    key = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Beli Sync Queue Seeder");
                println!();
                println!("Usage: seed-queue [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of mutations to queue (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./beli_sync_dev.db)");
                println!("  -k, --key <KEY>    Storage key (default: {})", DEFAULT_STORAGE_KEY);
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => return Err(format!("unknown argument '{}' (see --help)", other).into()),
        }
        i += 1;
    }

    println!("🌱 Beli Sync Queue Seeder");
    println!("=========================");
    println!("Database:  {}", db_path);
    println!("Key:       {}", key);
    println!("Mutations: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");

    let mut queue: PersistedQueue = match db.kv().get(&key).await? {
        Some(raw) => serde_json::from_str(&raw)?,
        None => PersistedQueue::default(),
    };

    let existing = queue.pending_mutations.len();
    if existing > 0 {
        println!("⚠ Queue already holds {} mutations, appending", existing);
    }

    for seed in 0..count {
        let kind = MutationKind::ALL[seed % MutationKind::ALL.len()];
        queue
            .pending_mutations
            .push(PendingMutation::new(kind, sample_payload(kind, seed)));
    }

    db.kv().set(&key, &serde_json::to_string(&queue)?).await?;

    println!(
        "✓ Queue now holds {} mutations",
        queue.pending_mutations.len()
    );

    Ok(())
}

/// Builds a plausible payload for a mutation kind.
fn sample_payload(kind: MutationKind, seed: usize) -> Payload {
    let user = USERS[seed % USERS.len()];
    let other = USERS[(seed + 1) % USERS.len()];
    let restaurant = RESTAURANTS[seed % RESTAURANTS.len()];

    let value: Value = match kind {
        MutationKind::FollowUser | MutationKind::UnfollowUser => {
            json!({ "userId": user, "targetUserId": other })
        }
        MutationKind::LikeActivity
        | MutationKind::UnlikeActivity
        | MutationKind::BookmarkActivity
        | MutationKind::UnbookmarkActivity => {
            json!({ "userId": user, "activityId": format!("act-{}", seed) })
        }
        MutationKind::LikePost
        | MutationKind::UnlikePost
        | MutationKind::BookmarkPost
        | MutationKind::UnbookmarkPost => {
            json!({ "userId": user, "postId": format!("post-{}", seed) })
        }
        MutationKind::AddComment => {
            json!({ "userId": user, "activityId": format!("act-{}", seed), "content": "so good" })
        }
        MutationKind::AddToList | MutationKind::RemoveFromList => {
            json!({ "listId": format!("list-{}", seed % 3), "restaurantId": restaurant })
        }
        MutationKind::CreateList => {
            json!({ "userId": user, "name": format!("Date nights {}", seed) })
        }
        MutationKind::AddReview => {
            json!({ "userId": user, "restaurantId": restaurant, "rating": 8.4, "content": "great pasta" })
        }
        MutationKind::MarkNotificationRead => {
            json!({ "notificationId": format!("notif-{}", seed) })
        }
        MutationKind::MarkBeen | MutationKind::MarkWantToTry | MutationKind::RemoveRelation => {
            json!({ "userId": user, "restaurantId": restaurant })
        }
        MutationKind::UpdateRating => {
            json!({ "userId": user, "restaurantId": restaurant, "rating": 5.0 + (seed % 50) as f64 / 10.0 })
        }
    };

    value.as_object().cloned().unwrap_or_default()
}

/// Parses `--count`, which must be a positive number.
fn parse_count(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("--count expects a positive number, got '{}'", value)),
    }
}
