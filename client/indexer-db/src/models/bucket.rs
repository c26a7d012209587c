use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{schema::bucket, DbConnection};

/// Table that holds the buckets. `forest_root` is a diagnostic cache only (§3.3); proof-building
/// always re-queries the chain via C1.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = bucket)]
pub struct Bucket {
    pub id: Vec<u8>,
    pub name: String,
    pub owner: Vec<u8>,
    pub msp_id: Option<Vec<u8>>,
    pub forest_root: Option<Vec<u8>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Bucket {
    pub async fn upsert<'a>(
        conn: &mut DbConnection<'a>,
        id: impl Into<Vec<u8>>,
        name: impl Into<String>,
        owner: impl Into<Vec<u8>>,
        msp_id: Option<Vec<u8>>,
    ) -> Result<(), diesel::result::Error> {
        let id = id.into();
        diesel::insert_into(bucket::table)
            .values((
                bucket::id.eq(&id),
                bucket::name.eq(name.into()),
                bucket::owner.eq(owner.into()),
                bucket::msp_id.eq(&msp_id),
            ))
            .on_conflict(bucket::id)
            .do_update()
            .set(bucket::msp_id.eq(&msp_id))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_deleted<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(bucket::table)
            .filter(bucket::id.eq(id.as_ref()))
            .set(bucket::deleted_at.eq(Some(Utc::now())))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn rebind_msp<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
        msp_id: impl Into<Vec<u8>>,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(bucket::table)
            .filter(bucket::id.eq(id.as_ref()))
            .set(bucket::msp_id.eq(Some(msp_id.into())))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn clear_msp<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(bucket::table)
            .filter(bucket::id.eq(id.as_ref()))
            .set(bucket::msp_id.eq(None::<Vec<u8>>))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn update_forest_root<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
        new_root: impl Into<Vec<u8>>,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(bucket::table)
            .filter(bucket::id.eq(id.as_ref()))
            .set(bucket::forest_root.eq(Some(new_root.into())))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn get<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
    ) -> Result<Option<Self>, diesel::result::Error> {
        bucket::table
            .filter(bucket::id.eq(id.as_ref()))
            .first(conn)
            .await
            .optional()
    }
}
