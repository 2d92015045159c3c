use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    ChurchCode, ChurchId, ContentId, Money, OrderId, TicketId, TicketTypeId, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::model::{
    BookOrder, Church, ChurchAdmin, ChurchRole, Content, EventTicketing, InventorySource, Ticket,
    TicketReservation, TicketTier, TicketType, TierConfig, TierSet, User,
};
use crate::store::{Store, StoreTx};
use crate::{Result, StoreError};

/// PostgreSQL-backed store implementation.
///
/// Exclusive row locks (`SELECT ... FOR UPDATE`) inside a [`StoreTx`]
/// serialize conflicting availability decisions; sold counters only ever
/// move through relative updates.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL.
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(PgPool::connect(url).await?))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

// -- row mapping --

fn opt_u32(value: Option<i32>) -> Option<u32> {
    value.map(|v| v as u32)
}

fn row_to_church(row: &PgRow) -> Result<Church> {
    Ok(Church {
        id: ChurchId::from_uuid(row.try_get("id")?),
        code: ChurchCode::new(row.try_get("code")?),
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        city: row.try_get("city")?,
        country: row.try_get("country")?,
        owner_id: row
            .try_get::<Option<Uuid>, _>("owner_id")?
            .map(UserId::from_uuid),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        phone_number: row.try_get("phone_number")?,
        role: row.try_get::<String, _>("role")?.parse()?,
        current_church: row
            .try_get::<Option<Uuid>, _>("current_church")?
            .map(ChurchId::from_uuid),
        created_at: row.try_get("created_at")?,
    })
}

fn tier_from_row(row: &PgRow, prefix: &str) -> Result<Option<TierConfig>> {
    let price: Option<i64> = row.try_get(format!("{prefix}_price").as_str())?;
    let Some(price) = price else {
        return Ok(None);
    };
    let quantity: Option<i32> = row.try_get(format!("{prefix}_quantity").as_str())?;
    let sold: i32 = row.try_get(format!("{prefix}_sold").as_str())?;
    Ok(Some(TierConfig {
        price: Money::from_minor(price),
        quantity: opt_u32(quantity),
        sold: sold as u32,
    }))
}

fn row_to_content(row: &PgRow) -> Result<Content> {
    Ok(Content {
        id: ContentId::from_uuid(row.try_get("id")?),
        church_id: ChurchId::from_uuid(row.try_get("church_id")?),
        content_type: row.try_get::<String, _>("content_type")?.parse()?,
        delivery_type: row.try_get::<String, _>("delivery_type")?.parse()?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        start_at: row.try_get("start_at")?,
        end_at: row.try_get("end_at")?,
        location: row.try_get("location")?,
        is_paid: row.try_get("is_paid")?,
        price: row.try_get::<Option<i64>, _>("price")?.map(Money::from_minor),
        currency: row.try_get("currency")?,
        ticketing: EventTicketing {
            capacity: opt_u32(row.try_get("capacity")?),
            tickets_sold: row.try_get::<i32, _>("tickets_sold")? as u32,
            tiers: TierSet {
                classic: tier_from_row(row, "classic")?,
                vip: tier_from_row(row, "vip")?,
                premium: tier_from_row(row, "premium")?,
            },
        },
        published: row.try_get("published")?,
        created_by: row
            .try_get::<Option<Uuid>, _>("created_by")?
            .map(UserId::from_uuid),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_ticket_type(row: &PgRow) -> Result<TicketType> {
    Ok(TicketType {
        id: TicketTypeId::from_uuid(row.try_get("id")?),
        content_id: ContentId::from_uuid(row.try_get("content_id")?),
        name: row.try_get("name")?,
        price: Money::from_minor(row.try_get("price")?),
        quantity: opt_u32(row.try_get("quantity")?),
        sold: row.try_get::<i32, _>("sold")? as u32,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<BookOrder> {
    let tier: Option<String> = row.try_get("ticket_tier")?;
    Ok(BookOrder {
        id: OrderId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        content_id: ContentId::from_uuid(row.try_get("content_id")?),
        delivery_type: row.try_get::<String, _>("delivery_type")?.parse()?,
        quantity: row.try_get::<i32, _>("quantity")? as u32,
        total_price: Money::from_minor(row.try_get("total_price")?),
        is_ticket: row.try_get("is_ticket")?,
        ticket_type_id: row
            .try_get::<Option<Uuid>, _>("ticket_type_id")?
            .map(TicketTypeId::from_uuid),
        ticket_tier: tier.map(|t| t.parse()).transpose()?,
        payment_gateway: row.try_get::<String, _>("payment_gateway")?.parse()?,
        payment_transaction_id: row.try_get("payment_transaction_id")?,
        shipped: row.try_get("shipped")?,
        delivered_at: row.try_get("delivered_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_ticket(row: &PgRow) -> Result<Ticket> {
    let tier: Option<String> = row.try_get("tier")?;
    Ok(Ticket {
        id: TicketId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        content_id: ContentId::from_uuid(row.try_get("content_id")?),
        ticket_type_id: row
            .try_get::<Option<Uuid>, _>("ticket_type_id")?
            .map(TicketTypeId::from_uuid),
        tier: tier.map(|t| t.parse()).transpose()?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        price: Money::from_minor(row.try_get("price")?),
        status: row.try_get::<String, _>("status")?.parse()?,
        seat: row.try_get("seat")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Maps a reservation target onto its (content_id, ticket_type_id, tier)
/// column triple.
fn source_columns(source: &InventorySource) -> (Option<Uuid>, Option<Uuid>, Option<&'static str>) {
    match source {
        InventorySource::TicketType(id) => (None, Some(id.as_uuid()), None),
        InventorySource::Tier(content, tier) => (Some(content.as_uuid()), None, Some(tier.as_str())),
        InventorySource::Event(content) => (Some(content.as_uuid()), None, None),
    }
}

fn sold_column(tier: TicketTier) -> &'static str {
    match tier {
        TicketTier::Classic => "classic_sold",
        TicketTier::Vip => "vip_sold",
        TicketTier::Premium => "premium_sold",
    }
}

/// Maps a unique-constraint violation onto the matching store error.
fn map_conflict(e: sqlx::Error, map: impl Fn(&str) -> Option<StoreError>) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && let Some(constraint) = db_err.constraint()
        && let Some(mapped) = map(constraint)
    {
        return mapped;
    }
    StoreError::Database(e)
}

async fn reservation_sum_on<'e, E>(
    executor: E,
    source: &InventorySource,
    now: DateTime<Utc>,
) -> Result<u32>
where
    E: sqlx::PgExecutor<'e>,
{
    let (content_id, ticket_type_id, tier) = source_columns(source);
    let sum: i64 = match source {
        InventorySource::TicketType(_) => {
            sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(quantity), 0) FROM ticket_reservations
                WHERE ticket_type_id = $1 AND expires_at > $2
                "#,
            )
            .bind(ticket_type_id)
            .bind(now)
            .fetch_one(executor)
            .await?
        }
        InventorySource::Tier(..) => {
            sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(quantity), 0) FROM ticket_reservations
                WHERE content_id = $1 AND tier = $2 AND ticket_type_id IS NULL
                  AND expires_at > $3
                "#,
            )
            .bind(content_id)
            .bind(tier)
            .bind(now)
            .fetch_one(executor)
            .await?
        }
        InventorySource::Event(_) => {
            sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(quantity), 0) FROM ticket_reservations
                WHERE content_id = $1 AND ticket_type_id IS NULL AND tier IS NULL
                  AND expires_at > $2
                "#,
            )
            .bind(content_id)
            .bind(now)
            .fetch_one(executor)
            .await?
        }
    };
    Ok(sum as u32)
}

async fn get_order_on<'e, E>(executor: E, id: OrderId) -> Result<Option<BookOrder>>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query("SELECT * FROM book_orders WHERE id = $1")
        .bind(id.as_uuid())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(row_to_order).transpose()
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTx { tx }))
    }

    async fn get_church(&self, id: ChurchId) -> Result<Option<Church>> {
        let row = sqlx::query("SELECT * FROM churches WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_church).transpose()
    }

    async fn church_role(&self, church: ChurchId, user: UserId) -> Result<Option<ChurchRole>> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM church_admins WHERE church_id = $1 AND user_id = $2",
        )
        .bind(church.as_uuid())
        .bind(user.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(role.map(|r| r.parse()).transpose()?)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, phone_number, role, current_church, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.phone_number)
        .bind(user.role.as_str())
        .bind(user.current_church.map(|id| id.as_uuid()))
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_conflict(e, |constraint| match constraint {
                "users_phone_number_key" => {
                    Some(StoreError::DuplicatePhone(user.phone_number.clone()))
                }
                _ => None,
            })
        })?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn insert_content(&self, content: &Content) -> Result<()> {
        let t = &content.ticketing;
        sqlx::query(
            r#"
            INSERT INTO contents (
                id, church_id, content_type, delivery_type, title, slug, description,
                start_at, end_at, location, is_paid, price, currency,
                capacity, tickets_sold,
                classic_price, classic_quantity, classic_sold,
                vip_price, vip_quantity, vip_sold,
                premium_price, premium_quantity, premium_sold,
                published, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24,
                    $25, $26, $27)
            "#,
        )
        .bind(content.id.as_uuid())
        .bind(content.church_id.as_uuid())
        .bind(content.content_type.as_str())
        .bind(content.delivery_type.as_str())
        .bind(&content.title)
        .bind(&content.slug)
        .bind(&content.description)
        .bind(content.start_at)
        .bind(content.end_at)
        .bind(&content.location)
        .bind(content.is_paid)
        .bind(content.price.map(|p| p.minor()))
        .bind(&content.currency)
        .bind(t.capacity.map(|c| c as i32))
        .bind(t.tickets_sold as i32)
        .bind(t.tiers.classic.map(|c| c.price.minor()))
        .bind(t.tiers.classic.and_then(|c| c.quantity).map(|q| q as i32))
        .bind(t.tiers.classic.map_or(0, |c| c.sold as i32))
        .bind(t.tiers.vip.map(|c| c.price.minor()))
        .bind(t.tiers.vip.and_then(|c| c.quantity).map(|q| q as i32))
        .bind(t.tiers.vip.map_or(0, |c| c.sold as i32))
        .bind(t.tiers.premium.map(|c| c.price.minor()))
        .bind(t.tiers.premium.and_then(|c| c.quantity).map(|q| q as i32))
        .bind(t.tiers.premium.map_or(0, |c| c.sold as i32))
        .bind(content.published)
        .bind(content.created_by.map(|id| id.as_uuid()))
        .bind(content.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_content(&self, id: ContentId) -> Result<Option<Content>> {
        let row = sqlx::query("SELECT * FROM contents WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_content).transpose()
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_types (id, content_id, name, price, quantity, sold, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(ticket_type.id.as_uuid())
        .bind(ticket_type.content_id.as_uuid())
        .bind(&ticket_type.name)
        .bind(ticket_type.price.minor())
        .bind(ticket_type.quantity.map(|q| q as i32))
        .bind(ticket_type.sold as i32)
        .bind(ticket_type.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_conflict(e, |constraint| match constraint {
                "ticket_types_content_id_name_key" => {
                    Some(StoreError::DuplicateName(ticket_type.name.clone()))
                }
                _ => None,
            })
        })?;
        Ok(())
    }

    async fn get_ticket_type(&self, id: TicketTypeId) -> Result<Option<TicketType>> {
        let row = sqlx::query("SELECT * FROM ticket_types WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_ticket_type).transpose()
    }

    async fn list_ticket_types(&self, content: ContentId) -> Result<Vec<TicketType>> {
        let rows =
            sqlx::query("SELECT * FROM ticket_types WHERE content_id = $1 ORDER BY created_at")
                .bind(content.as_uuid())
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_ticket_type).collect()
    }

    async fn insert_reservation(&self, reservation: &TicketReservation) -> Result<()> {
        let (content_id, ticket_type_id, tier) = source_columns(&reservation.source);
        sqlx::query(
            r#"
            INSERT INTO ticket_reservations
                (id, content_id, ticket_type_id, tier, user_id, quantity, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(content_id)
        .bind(ticket_type_id)
        .bind(tier)
        .bind(reservation.user_id.as_uuid())
        .bind(reservation.quantity as i32)
        .bind(reservation.expires_at)
        .bind(reservation.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reservation_sum(&self, source: &InventorySource, now: DateTime<Utc>) -> Result<u32> {
        reservation_sum_on(&self.pool, source, now).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<BookOrder>> {
        get_order_on(&self.pool, id).await
    }

    async fn tickets_for_order(&self, order: OrderId) -> Result<Vec<Ticket>> {
        let rows = sqlx::query("SELECT * FROM tickets WHERE order_id = $1 ORDER BY created_at")
            .bind(order.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_ticket).collect()
    }

    async fn ticket_count(&self, content: ContentId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE content_id = $1")
            .bind(content.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn max_church_code(&mut self) -> Result<Option<ChurchCode>> {
        let code: Option<i64> = sqlx::query_scalar("SELECT MAX(code) FROM churches")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(code.map(ChurchCode::new))
    }

    async fn insert_church(&mut self, church: &Church) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO churches (id, code, title, slug, status, city, country, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(church.id.as_uuid())
        .bind(church.code.value())
        .bind(&church.title)
        .bind(&church.slug)
        .bind(church.status.as_str())
        .bind(&church.city)
        .bind(&church.country)
        .bind(church.owner_id.map(|id| id.as_uuid()))
        .bind(church.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_conflict(e, |constraint| match constraint {
                "churches_code_key" => Some(StoreError::DuplicateCode(church.code)),
                "churches_title_key" => Some(StoreError::DuplicateTitle(church.title.clone())),
                _ => None,
            })
        })?;
        Ok(())
    }

    async fn insert_church_admin(&mut self, admin: &ChurchAdmin) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO church_admins (church_id, user_id, role, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (church_id, user_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(admin.church_id.as_uuid())
        .bind(admin.user_id.as_uuid())
        .bind(admin.role.as_str())
        .bind(admin.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_content(&mut self, id: ContentId) -> Result<Option<Content>> {
        let row = sqlx::query("SELECT * FROM contents WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_content).transpose()
    }

    async fn lock_ticket_type(&mut self, id: TicketTypeId) -> Result<Option<TicketType>> {
        let row = sqlx::query("SELECT * FROM ticket_types WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_ticket_type).transpose()
    }

    async fn reservation_sum(
        &mut self,
        source: &InventorySource,
        now: DateTime<Utc>,
    ) -> Result<u32> {
        reservation_sum_on(&mut *self.tx, source, now).await
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<BookOrder>> {
        let row = sqlx::query("SELECT * FROM book_orders WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn insert_order(&mut self, order: &BookOrder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO book_orders (
                id, user_id, content_id, delivery_type, quantity, total_price, is_ticket,
                ticket_type_id, ticket_tier, payment_gateway, payment_transaction_id,
                shipped, delivered_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.content_id.as_uuid())
        .bind(order.delivery_type.as_str())
        .bind(order.quantity as i32)
        .bind(order.total_price.minor())
        .bind(order.is_ticket)
        .bind(order.ticket_type_id.map(|id| id.as_uuid()))
        .bind(order.ticket_tier.map(|t| t.as_str()))
        .bind(order.payment_gateway.as_str())
        .bind(&order.payment_transaction_id)
        .bind(order.shipped)
        .bind(order.delivered_at)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_tickets(&mut self, tickets: &[Ticket]) -> Result<()> {
        for ticket in tickets {
            sqlx::query(
                r#"
                INSERT INTO tickets
                    (id, order_id, content_id, ticket_type_id, tier, user_id, price, status,
                     seat, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(ticket.id.as_uuid())
            .bind(ticket.order_id.as_uuid())
            .bind(ticket.content_id.as_uuid())
            .bind(ticket.ticket_type_id.map(|id| id.as_uuid()))
            .bind(ticket.tier.map(|t| t.as_str()))
            .bind(ticket.user_id.as_uuid())
            .bind(ticket.price.minor())
            .bind(ticket.status.as_str())
            .bind(&ticket.seat)
            .bind(ticket.created_at)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn record_sale(&mut self, source: &InventorySource, quantity: u32) -> Result<()> {
        let quantity = quantity as i32;
        let result = match source {
            InventorySource::TicketType(id) => {
                sqlx::query("UPDATE ticket_types SET sold = sold + $2 WHERE id = $1")
                    .bind(id.as_uuid())
                    .bind(quantity)
                    .execute(&mut *self.tx)
                    .await?
            }
            InventorySource::Tier(content, tier) => {
                let column = sold_column(*tier);
                let sql = format!(
                    "UPDATE contents SET {column} = {column} + $2, \
                     tickets_sold = tickets_sold + $2 WHERE id = $1"
                );
                sqlx::query(&sql)
                    .bind(content.as_uuid())
                    .bind(quantity)
                    .execute(&mut *self.tx)
                    .await?
            }
            InventorySource::Event(content) => {
                sqlx::query("UPDATE contents SET tickets_sold = tickets_sold + $2 WHERE id = $1")
                    .bind(content.as_uuid())
                    .bind(quantity)
                    .execute(&mut *self.tx)
                    .await?
            }
        };
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                what: "ledger row",
                id: format!("{source:?}"),
            });
        }
        Ok(())
    }

    async fn clear_reservations(&mut self, source: &InventorySource, user: UserId) -> Result<u64> {
        let (content_id, ticket_type_id, tier) = source_columns(source);
        let result = match source {
            InventorySource::TicketType(_) => {
                sqlx::query(
                    "DELETE FROM ticket_reservations WHERE ticket_type_id = $1 AND user_id = $2",
                )
                .bind(ticket_type_id)
                .bind(user.as_uuid())
                .execute(&mut *self.tx)
                .await?
            }
            InventorySource::Tier(..) => {
                sqlx::query(
                    r#"
                    DELETE FROM ticket_reservations
                    WHERE content_id = $1 AND tier = $2 AND ticket_type_id IS NULL
                      AND user_id = $3
                    "#,
                )
                .bind(content_id)
                .bind(tier)
                .bind(user.as_uuid())
                .execute(&mut *self.tx)
                .await?
            }
            InventorySource::Event(_) => {
                sqlx::query(
                    r#"
                    DELETE FROM ticket_reservations
                    WHERE content_id = $1 AND ticket_type_id IS NULL AND tier IS NULL
                      AND user_id = $2
                    "#,
                )
                .bind(content_id)
                .bind(user.as_uuid())
                .execute(&mut *self.tx)
                .await?
            }
        };
        Ok(result.rows_affected())
    }

    async fn set_payment_transaction(
        &mut self,
        order: OrderId,
        transaction_id: &str,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE book_orders SET payment_transaction_id = $2 WHERE id = $1")
                .bind(order.as_uuid())
                .bind(transaction_id)
                .execute(&mut *self.tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                what: "order",
                id: order.to_string(),
            });
        }
        Ok(())
    }

    async fn update_event_ticketing(
        &mut self,
        content: ContentId,
        ticketing: &EventTicketing,
    ) -> Result<()> {
        let t = ticketing;
        let result = sqlx::query(
            r#"
            UPDATE contents SET
                capacity = $2, tickets_sold = $3,
                classic_price = $4, classic_quantity = $5, classic_sold = $6,
                vip_price = $7, vip_quantity = $8, vip_sold = $9,
                premium_price = $10, premium_quantity = $11, premium_sold = $12
            WHERE id = $1
            "#,
        )
        .bind(content.as_uuid())
        .bind(t.capacity.map(|c| c as i32))
        .bind(t.tickets_sold as i32)
        .bind(t.tiers.classic.map(|c| c.price.minor()))
        .bind(t.tiers.classic.and_then(|c| c.quantity).map(|q| q as i32))
        .bind(t.tiers.classic.map_or(0, |c| c.sold as i32))
        .bind(t.tiers.vip.map(|c| c.price.minor()))
        .bind(t.tiers.vip.and_then(|c| c.quantity).map(|q| q as i32))
        .bind(t.tiers.vip.map_or(0, |c| c.sold as i32))
        .bind(t.tiers.premium.map(|c| c.price.minor()))
        .bind(t.tiers.premium.and_then(|c| c.quantity).map(|q| q as i32))
        .bind(t.tiers.premium.map_or(0, |c| c.sold as i32))
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                what: "content",
                id: content.to_string(),
            });
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
