//! PostgreSQL integration tests.
//!
//! These tests use a shared PostgreSQL container and are ignored by default
//! because they need a Docker daemon. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{ChurchCode, Money, UserId};
use sqlx::PgPool;
use store::{
    Church, Content, ContentType, DeliveryType, EventTicketing, InMemoryStore, InventorySource,
    PostgresStore, Store, StoreError, TicketReservation, TicketType, TierSet,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_schema.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn store() -> PostgresStore {
    let info = get_container_info().await;
    PostgresStore::connect(&info.connection_string).await.unwrap()
}

async fn next_code(store: &PostgresStore) -> ChurchCode {
    let mut tx = store.begin().await.unwrap();
    tx.max_church_code()
        .await
        .unwrap()
        .map_or(ChurchCode::FIRST, |c| c.next())
}

async fn insert_event(store: &PostgresStore, capacity: Option<u32>) -> Content {
    let code = next_code(store).await;
    let church = Church::new(code, format!("Church {code}"), "Douala", "CM", None);
    let mut tx = store.begin().await.unwrap();
    tx.insert_church(&church).await.unwrap();
    tx.commit().await.unwrap();

    let content = Content {
        id: common::ContentId::new(),
        church_id: church.id,
        content_type: ContentType::Event,
        delivery_type: DeliveryType::Digital,
        title: "Conference".to_string(),
        slug: "conference".to_string(),
        description: String::new(),
        start_at: None,
        end_at: None,
        location: String::new(),
        is_paid: true,
        price: Some(Money::from_minor(1000)),
        currency: "XAF".to_string(),
        ticketing: EventTicketing {
            capacity,
            tickets_sold: 0,
            tiers: TierSet::default(),
        },
        published: true,
        created_by: None,
        created_at: Utc::now(),
    };
    store.insert_content(&content).await.unwrap();
    content
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn church_round_trip_and_code_conflicts() {
    let store = store().await;
    let code = next_code(&store).await;

    let church = Church::new(code, format!("Round Trip {code}"), "Douala", "CM", None);
    let mut tx = store.begin().await.unwrap();
    tx.insert_church(&church).await.unwrap();
    tx.commit().await.unwrap();

    let loaded = store.get_church(church.id).await.unwrap().unwrap();
    assert_eq!(loaded.code, code);
    assert_eq!(loaded.title, church.title);

    // Same code again: the unique constraint surfaces as DuplicateCode.
    let dup = Church::new(code, format!("Other {code}"), "", "", None);
    let mut tx = store.begin().await.unwrap();
    let result = tx.insert_church(&dup).await;
    assert!(matches!(result, Err(StoreError::DuplicateCode(_))));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn content_round_trip_preserves_the_ledger() {
    let store = store().await;
    let content = insert_event(&store, Some(25)).await;

    let loaded = store.get_content(content.id).await.unwrap().unwrap();
    assert_eq!(loaded.ticketing.capacity, Some(25));
    assert_eq!(loaded.ticketing.tickets_sold, 0);
    assert!(loaded.ticketing.tiers.is_empty());
    assert_eq!(loaded.price, Some(Money::from_minor(1000)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn record_sale_is_relative_and_check_constrained() {
    let store = store().await;
    let content = insert_event(&store, Some(2)).await;
    let source = InventorySource::Event(content.id);

    let mut tx = store.begin().await.unwrap();
    tx.lock_content(content.id).await.unwrap().unwrap();
    tx.record_sale(&source, 2).await.unwrap();
    tx.commit().await.unwrap();

    let loaded = store.get_content(content.id).await.unwrap().unwrap();
    assert_eq!(loaded.ticketing.tickets_sold, 2);

    // One more unit violates the CHECK constraint and the tx rolls back.
    let mut tx = store.begin().await.unwrap();
    tx.lock_content(content.id).await.unwrap().unwrap();
    assert!(tx.record_sale(&source, 1).await.is_err());
    drop(tx);

    let loaded = store.get_content(content.id).await.unwrap().unwrap();
    assert_eq!(loaded.ticketing.tickets_sold, 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn row_lock_serializes_writers() {
    let store = store().await;
    let content = insert_event(&store, Some(10)).await;
    let source = InventorySource::Event(content.id);

    let mut holder = store.begin().await.unwrap();
    holder.lock_content(content.id).await.unwrap().unwrap();

    // A second transaction must wait for the lock; it only proceeds after
    // the holder commits, and then sees the committed counter.
    let contender_store = store.clone();
    let contender = tokio::spawn(async move {
        let mut tx = contender_store.begin().await.unwrap();
        let locked = tx.lock_content(content.id).await.unwrap().unwrap();
        tx.record_sale(&InventorySource::Event(content.id), 1)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        locked.ticketing.tickets_sold
    });

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    holder.record_sale(&source, 3).await.unwrap();
    holder.commit().await.unwrap();

    let seen_by_contender = contender.await.unwrap();
    assert_eq!(seen_by_contender, 3);

    let loaded = store.get_content(content.id).await.unwrap().unwrap();
    assert_eq!(loaded.ticketing.tickets_sold, 4);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn reservation_sums_filter_by_source_and_expiry() {
    let store = store().await;
    let content = insert_event(&store, Some(10)).await;
    let ticket_type = TicketType::new(content.id, "Standard", Money::from_minor(500), Some(5));
    store.insert_ticket_type(&ticket_type).await.unwrap();

    let now = Utc::now();
    let user = UserId::new();
    let live = TicketReservation::new(
        InventorySource::TicketType(ticket_type.id),
        user,
        3,
        now + Duration::minutes(10),
    );
    let expired = TicketReservation::new(
        InventorySource::TicketType(ticket_type.id),
        user,
        5,
        now - Duration::minutes(1),
    );
    let flat = TicketReservation::new(
        InventorySource::Event(content.id),
        user,
        2,
        now + Duration::minutes(10),
    );
    for r in [&live, &expired, &flat] {
        store.insert_reservation(r).await.unwrap();
    }

    assert_eq!(
        store
            .reservation_sum(&InventorySource::TicketType(ticket_type.id), now)
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        store
            .reservation_sum(&InventorySource::Event(content.id), now)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn in_memory_store_compiles_against_the_same_interface() {
    // Smoke check that both implementations expose identical surface.
    let store: InMemoryStore = InMemoryStore::new();
    assert!(store.get_church(common::ChurchId::new()).await.unwrap().is_none());
}
