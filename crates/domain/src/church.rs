//! Church registration and code allocation.

use common::{ChurchCode, ChurchId, UserId};
use store::{Church, ChurchAdmin, ChurchRole, Store, StoreError};

use crate::error::{DomainError, not_found};

/// How many code allocation attempts are made before giving up.
///
/// Exhaustion signals pathological contention on registrations and is
/// intentionally fatal rather than silently looping.
const MAX_CODE_ATTEMPTS: u32 = 5;

/// A registration request.
#[derive(Debug, Clone)]
pub struct NewChurch {
    pub title: String,
    pub city: String,
    pub country: String,
    pub owner_id: Option<UserId>,
}

/// Service for registering churches.
///
/// Assigns each new church a unique, monotonic numeric code: `max + 1`,
/// re-derived and retried on a uniqueness conflict with a concurrent
/// registration. Each attempt is its own atomic unit of work.
pub struct ChurchRegistry<S> {
    store: S,
}

impl<S: Store> ChurchRegistry<S> {
    /// Creates a new registry over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a church, allocating its code.
    ///
    /// Each attempt is one unit of work: re-derive `max + 1` and insert
    /// atomically, so no two concurrent registrations can commit the same
    /// code. A conflict with a concurrent attempt is retried with a freshly
    /// derived code.
    #[tracing::instrument(skip(self, new), fields(title = %new.title))]
    pub async fn register(&self, new: NewChurch) -> Result<Church, DomainError> {
        let mut conflict = None;
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let code = tx
                .max_church_code()
                .await?
                .map_or(ChurchCode::FIRST, |c| c.next());
            let church = Church::new(
                code,
                new.title.clone(),
                new.city.clone(),
                new.country.clone(),
                new.owner_id,
            );
            match tx.insert_church(&church).await {
                Ok(()) => {
                    if let Some(owner) = new.owner_id {
                        tx.insert_church_admin(&ChurchAdmin::new(
                            church.id,
                            owner,
                            ChurchRole::Owner,
                        ))
                        .await?;
                    }
                    tx.commit().await?;
                    metrics::counter!("churches_registered_total").increment(1);
                    return Ok(church);
                }
                Err(StoreError::DuplicateCode(taken)) => {
                    tracing::warn!(code = %taken, attempt, "church code collision, retrying");
                    conflict = Some(StoreError::DuplicateCode(taken));
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::error!(
            attempts = MAX_CODE_ATTEMPTS,
            "church code allocation exhausted"
        );
        Err(conflict.expect("exhausted without a conflict").into())
    }

    /// Loads a church by id.
    pub async fn get(&self, id: ChurchId) -> Result<Church, DomainError> {
        self.store
            .get_church(id)
            .await?
            .ok_or_else(|| not_found("church", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;

    fn request(title: &str) -> NewChurch {
        NewChurch {
            title: title.to_string(),
            city: "Douala".to_string(),
            country: "CM".to_string(),
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn codes_start_at_one_and_increase() {
        let store = InMemoryStore::new();
        let registry = ChurchRegistry::new(store);

        let first = registry.register(request("First")).await.unwrap();
        let second = registry.register(request("Second")).await.unwrap();

        assert_eq!(first.code, ChurchCode::new(1));
        assert_eq!(second.code, ChurchCode::new(2));
    }

    #[tokio::test]
    async fn conflicts_are_retried() {
        let store = InMemoryStore::new();
        store.inject_code_conflicts(2);
        let registry = ChurchRegistry::new(store);

        let church = registry.register(request("Resilient")).await.unwrap();
        assert_eq!(church.code, ChurchCode::new(1));
    }

    #[tokio::test]
    async fn exhausted_retries_propagate_the_conflict() {
        let store = InMemoryStore::new();
        store.inject_code_conflicts(MAX_CODE_ATTEMPTS);
        let registry = ChurchRegistry::new(store);

        let result = registry.register(request("Doomed")).await;
        assert!(matches!(
            result,
            Err(DomainError::Store(StoreError::DuplicateCode(_)))
        ));
    }

    #[tokio::test]
    async fn duplicate_title_fails_without_retry() {
        let store = InMemoryStore::new();
        let registry = ChurchRegistry::new(store);

        registry.register(request("Same")).await.unwrap();
        let result = registry.register(request("Same")).await;
        assert!(matches!(
            result,
            Err(DomainError::Store(StoreError::DuplicateTitle(_)))
        ));
    }

    #[tokio::test]
    async fn owner_gets_an_admin_role() {
        let store = InMemoryStore::new();
        let owner = store::User::new("Ada", "+237600000001");
        store.insert_user(&owner).await.unwrap();

        let registry = ChurchRegistry::new(store.clone());
        let church = registry
            .register(NewChurch {
                owner_id: Some(owner.id),
                ..request("Owned")
            })
            .await
            .unwrap();

        let role = store.church_role(church.id, owner.id).await.unwrap();
        assert_eq!(role, Some(ChurchRole::Owner));
    }
}
