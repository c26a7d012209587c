use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{schema::applied_event, DbConnection};

/// Idempotency marker: one row per `(block_height, event_index)` ever applied. Replaying a
/// block that was already applied inserts nothing new, satisfying P1's "exactly once".
#[derive(Debug, Clone, Copy, Queryable, Insertable, Selectable)]
#[diesel(table_name = applied_event)]
pub struct AppliedEvent {
    pub block_height: i64,
    pub event_index: i32,
}

impl AppliedEvent {
    /// Marks `(block_height, event_index)` as applied. Returns `false` without error if it was
    /// already marked, so callers can skip re-running the mutation.
    pub async fn mark_applied<'a>(
        conn: &mut DbConnection<'a>,
        block_height: i64,
        event_index: i32,
    ) -> Result<bool, diesel::result::Error> {
        let inserted = diesel::insert_into(applied_event::table)
            .values((
                applied_event::block_height.eq(block_height),
                applied_event::event_index.eq(event_index),
            ))
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
        Ok(inserted == 1)
    }
}
