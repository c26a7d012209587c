use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value as Json;

use crate::{schema::msp, DbConnection};

/// Table that holds the MSPs known to the store. `forest_root` is a diagnostic cache refreshed
/// by `MutationsApplied`/`MutationsAppliedForProvider`; it is never read when building a proof.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = msp)]
pub struct Msp {
    pub id: Vec<u8>,
    pub capabilities: Json,
    pub forest_root: Option<Vec<u8>>,
}

impl Msp {
    pub async fn upsert<'a>(
        conn: &mut DbConnection<'a>,
        id: impl Into<Vec<u8>>,
        capabilities: Json,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(msp::table)
            .values((
                msp::id.eq(id.into()),
                msp::capabilities.eq(capabilities.clone()),
            ))
            .on_conflict(msp::id)
            .do_update()
            .set(msp::capabilities.eq(capabilities))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
    ) -> Result<(), diesel::result::Error> {
        diesel::delete(msp::table)
            .filter(msp::id.eq(id.as_ref()))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn update_forest_root<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
        new_root: impl Into<Vec<u8>>,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(msp::table)
            .filter(msp::id.eq(id.as_ref()))
            .set(msp::forest_root.eq(Some(new_root.into())))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn get<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
    ) -> Result<Option<Self>, diesel::result::Error> {
        msp::table
            .filter(msp::id.eq(id.as_ref()))
            .first(conn)
            .await
            .optional()
    }
}
