use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{schema::service_state, DbConnection};

/// Single-row table holding the Indexer's progress marker.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = service_state)]
pub struct ServiceState {
    pub id: i16,
    pub last_indexed_block: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceState {
    pub async fn get<'a>(conn: &mut DbConnection<'a>) -> Result<Self, diesel::result::Error> {
        service_state::table.first(conn).await
    }

    /// Advances `last_indexed_block`, in the same transaction as the block's mutations (§4.1
    /// step 4: "update last_indexed_block inside the same transaction, commit").
    pub async fn advance<'a>(
        conn: &mut DbConnection<'a>,
        last_indexed_block: i64,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(service_state::table)
            .filter(service_state::id.eq(1))
            .set((
                service_state::last_indexed_block.eq(last_indexed_block),
                service_state::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }
}
