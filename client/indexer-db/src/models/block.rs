use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{schema::block, DbConnection};

/// One row per finalized block the Indexer has recorded progress against.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = block)]
pub struct Block {
    pub height: i64,
    pub hash: Vec<u8>,
    pub finalized: bool,
    pub indexed_at: DateTime<Utc>,
}

impl Block {
    pub async fn record<'a>(
        conn: &mut DbConnection<'a>,
        height: i64,
        hash: impl Into<Vec<u8>>,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(block::table)
            .values((
                block::height.eq(height),
                block::hash.eq(hash.into()),
                block::finalized.eq(true),
            ))
            .on_conflict(block::height)
            .do_nothing()
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn get_by_height<'a>(
        conn: &mut DbConnection<'a>,
        height: i64,
    ) -> Result<Option<Self>, diesel::result::Error> {
        block::table
            .filter(block::height.eq(height))
            .first(conn)
            .await
            .optional()
    }
}
