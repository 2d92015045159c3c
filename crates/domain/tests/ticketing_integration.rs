//! End-to-end ticketing properties exercised against the in-memory store.
//!
//! The store serializes units of work exactly like the row-locking
//! PostgreSQL implementation, so the no-over-sale and code-allocation
//! guarantees can be checked with real task-level concurrency.

use chrono::{Duration, Utc};
use common::{ChurchCode, ChurchId, ContentId, Money, UserId};
use domain::{
    ChurchRegistry, DomainError, NewChurch, NewOrder, OrderService, ReservationManager,
    TicketingError,
};
use store::{
    Content, ContentType, DeliveryType, EventTicketing, InMemoryStore, InventorySource, Store,
    TicketTier, TicketType, TierConfig, TierSet, User,
};

async fn buyer(store: &InMemoryStore) -> User {
    let unique = UserId::new().as_uuid().simple().to_string();
    let user = User::new("Buyer", format!("+{unique}"));
    store.insert_user(&user).await.unwrap();
    user
}

async fn church(store: &InMemoryStore) -> ChurchId {
    let mut tx = store.begin().await.unwrap();
    let code = tx
        .max_church_code()
        .await
        .unwrap()
        .map_or(ChurchCode::FIRST, |c| c.next());
    let church = store::Church::new(code, format!("Church {code}"), "Douala", "CM", None);
    tx.insert_church(&church).await.unwrap();
    tx.commit().await.unwrap();
    church.id
}

async fn event(store: &InMemoryStore, capacity: Option<u32>, tiers: TierSet) -> Content {
    let church_id = church(store).await;
    let content = Content {
        id: ContentId::new(),
        church_id,
        content_type: ContentType::Event,
        delivery_type: DeliveryType::Digital,
        title: format!("Event {}", ContentId::new()),
        slug: "event".to_string(),
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
            tiers,
        },
        published: true,
        created_by: None,
        created_at: Utc::now(),
    };
    store.insert_content(&content).await.unwrap();
    content
}

fn order_request(user: UserId, content: ContentId, quantity: u32) -> NewOrder {
    NewOrder {
        user_id: user,
        content_id: content,
        quantity,
        delivery_type: None,
        is_ticket: true,
        ticket_type_id: None,
        ticket_tier: None,
        payment_gateway: None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_issuance_never_oversells() {
    let store = InMemoryStore::new();
    let content = event(&store, Some(10), TierSet::default()).await;
    let service = OrderService::new(store.clone());

    // Twelve orders fit at creation time because nothing has been issued
    // yet; issuance is where the ledger decides.
    let mut order_ids = Vec::new();
    for _ in 0..12 {
        let user = buyer(&store).await;
        let order = service
            .create_order(order_request(user.id, content.id, 1))
            .await
            .unwrap();
        order_ids.push(order.id);
    }

    let mut handles = Vec::new();
    for (i, order_id) in order_ids.into_iter().enumerate() {
        let service = OrderService::new(store.clone());
        handles.push(tokio::spawn(async move {
            service.complete_order(order_id, &format!("PAY-{i}")).await
        }));
    }

    let mut successes = 0;
    let mut failures = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(DomainError::Ticketing(TicketingError::InsufficientInventory { .. })) => {
                failures += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 10);
    assert_eq!(failures, 2);
    assert_eq!(store.ticket_count(content.id).await.unwrap(), 10);
    let loaded = store.get_content(content.id).await.unwrap().unwrap();
    assert_eq!(loaded.ticketing.tickets_sold, 10);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_tier_issuance_respects_the_tier_quantity() {
    let store = InMemoryStore::new();
    let tiers = TierSet {
        classic: Some(TierConfig::new(Money::from_minor(1000), Some(100))),
        vip: Some(TierConfig::new(Money::from_minor(2500), Some(3))),
        premium: None,
    };
    let content = event(&store, None, tiers).await;
    let service = OrderService::new(store.clone());

    let mut order_ids = Vec::new();
    for _ in 0..5 {
        let user = buyer(&store).await;
        let order = service
            .create_order(NewOrder {
                ticket_tier: Some(TicketTier::Vip),
                ..order_request(user.id, content.id, 1)
            })
            .await
            .unwrap();
        order_ids.push(order.id);
    }

    let mut handles = Vec::new();
    for (i, order_id) in order_ids.into_iter().enumerate() {
        let service = OrderService::new(store.clone());
        handles.push(tokio::spawn(async move {
            service.complete_order(order_id, &format!("PAY-{i}")).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 3);
    let loaded = store.get_content(content.id).await.unwrap().unwrap();
    assert_eq!(loaded.ticketing.tiers.vip.unwrap().sold, 3);
    assert_eq!(loaded.ticketing.tickets_sold, 3);
}

#[tokio::test]
async fn capacity_ten_sells_exactly_ten() {
    let store = InMemoryStore::new();
    let content = event(&store, Some(10), TierSet::default()).await;
    let service = OrderService::new(store.clone());

    for i in 0..10 {
        let user = buyer(&store).await;
        let order = service
            .create_order(order_request(user.id, content.id, 1))
            .await
            .unwrap();
        service
            .complete_order(order.id, &format!("PAY-{i}"))
            .await
            .unwrap();
    }

    // The eleventh request dies at order creation: the ledger is empty.
    let user = buyer(&store).await;
    let result = service
        .create_order(order_request(user.id, content.id, 1))
        .await;
    assert!(matches!(
        result,
        Err(DomainError::Ticketing(
            TicketingError::InsufficientInventory {
                requested: 1,
                available: 0
            }
        ))
    ));

    let loaded = store.get_content(content.id).await.unwrap().unwrap();
    assert_eq!(loaded.ticketing.tickets_sold, 10);
    assert_eq!(store.ticket_count(content.id).await.unwrap(), 10);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_registrations_get_distinct_gapless_codes() {
    let store = InMemoryStore::new();

    let mut handles = Vec::new();
    for i in 0..50 {
        let registry = ChurchRegistry::new(store.clone());
        handles.push(tokio::spawn(async move {
            registry
                .register(NewChurch {
                    title: format!("Church {i}"),
                    city: String::new(),
                    country: String::new(),
                    owner_id: None,
                })
                .await
        }));
    }

    let mut codes = Vec::new();
    for handle in handles {
        codes.push(handle.await.unwrap().unwrap().code.value());
    }
    codes.sort_unstable();

    let expected: Vec<i64> = (1..=50).collect();
    assert_eq!(codes, expected);
}

#[tokio::test]
async fn unexpired_reservations_block_orders_from_others() {
    let store = InMemoryStore::new();
    let content = event(&store, None, TierSet::default()).await;
    let ticket_type = TicketType::new(content.id, "Standard", Money::from_minor(1500), Some(5));
    store.insert_ticket_type(&ticket_type).await.unwrap();

    let reservations = ReservationManager::new(store.clone());
    let orders = OrderService::new(store.clone());
    let source = InventorySource::TicketType(ticket_type.id);

    let holder = buyer(&store).await;
    reservations
        .reserve(source, holder.id, 3, Duration::minutes(15))
        .await
        .unwrap();

    // quantity 5, 3 reserved: the quote must say 2, not 5.
    assert_eq!(reservations.available(&source).await.unwrap(), Some(2));

    let other = buyer(&store).await;
    let too_many = orders
        .create_order(NewOrder {
            ticket_type_id: Some(ticket_type.id),
            ..order_request(other.id, content.id, 3)
        })
        .await;
    assert!(matches!(
        too_many,
        Err(DomainError::Ticketing(
            TicketingError::InsufficientInventory {
                requested: 3,
                available: 2
            }
        ))
    ));

    let fits = orders
        .create_order(NewOrder {
            ticket_type_id: Some(ticket_type.id),
            ..order_request(other.id, content.id, 2)
        })
        .await;
    assert!(fits.is_ok());
}

#[tokio::test]
async fn buyers_own_hold_is_cleared_at_issue_time() {
    let store = InMemoryStore::new();
    let content = event(&store, None, TierSet::default()).await;
    let ticket_type = TicketType::new(content.id, "Standard", Money::from_minor(1500), Some(5));
    store.insert_ticket_type(&ticket_type).await.unwrap();

    let reservations = ReservationManager::new(store.clone());
    let orders = OrderService::new(store.clone());
    let source = InventorySource::TicketType(ticket_type.id);

    // Checkout: order first, then a hold for the payment window.
    let user = buyer(&store).await;
    let order = orders
        .create_order(NewOrder {
            ticket_type_id: Some(ticket_type.id),
            ..order_request(user.id, content.id, 4)
        })
        .await
        .unwrap();
    reservations
        .reserve(source, user.id, 4, Duration::minutes(15))
        .await
        .unwrap();

    // The hold keeps everyone else out...
    assert_eq!(reservations.available(&source).await.unwrap(), Some(1));

    // ...but not the buyer it belongs to.
    let (_, tickets) = orders.complete_order(order.id, "PAY-77").await.unwrap();
    assert_eq!(tickets.len(), 4);

    let loaded = store.get_ticket_type(ticket_type.id).await.unwrap().unwrap();
    assert_eq!(loaded.sold, 4);
    assert_eq!(reservations.available(&source).await.unwrap(), Some(1));
}

#[tokio::test]
async fn expired_holds_stop_counting_without_any_sweep() {
    let store = InMemoryStore::new();
    let content = event(&store, Some(4), TierSet::default()).await;

    let reservations = ReservationManager::new(store.clone());
    let orders = OrderService::new(store.clone());
    let source = InventorySource::Event(content.id);

    let holder = buyer(&store).await;
    reservations
        .reserve(source, holder.id, 4, Duration::zero())
        .await
        .unwrap();

    // The hold expired immediately, so a full-capacity order goes through.
    assert_eq!(reservations.available(&source).await.unwrap(), Some(4));
    let user = buyer(&store).await;
    let order = orders
        .create_order(order_request(user.id, content.id, 4))
        .await
        .unwrap();
    orders.complete_order(order.id, "PAY-1").await.unwrap();

    // The expired row is still on disk; it just never counts again.
    assert_eq!(store.reservation_row_count().await, 1);
}
