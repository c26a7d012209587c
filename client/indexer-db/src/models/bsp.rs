use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value as Json;

use crate::{schema::bsp, DbConnection};

/// Table that holds the BSPs known to the store. Mirrors [`super::Msp`]; `forest_root` is a
/// diagnostic cache only.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = bsp)]
pub struct Bsp {
    pub id: Vec<u8>,
    pub capabilities: Json,
    pub forest_root: Option<Vec<u8>>,
}

impl Bsp {
    pub async fn upsert<'a>(
        conn: &mut DbConnection<'a>,
        id: impl Into<Vec<u8>>,
        capabilities: Json,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(bsp::table)
            .values((
                bsp::id.eq(id.into()),
                bsp::capabilities.eq(capabilities.clone()),
            ))
            .on_conflict(bsp::id)
            .do_update()
            .set(bsp::capabilities.eq(capabilities))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
    ) -> Result<(), diesel::result::Error> {
        diesel::delete(bsp::table)
            .filter(bsp::id.eq(id.as_ref()))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn update_forest_root<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
        new_root: impl Into<Vec<u8>>,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(bsp::table)
            .filter(bsp::id.eq(id.as_ref()))
            .set(bsp::forest_root.eq(Some(new_root.into())))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn get<'a>(
        conn: &mut DbConnection<'a>,
        id: impl AsRef<[u8]>,
    ) -> Result<Option<Self>, diesel::result::Error> {
        bsp::table
            .filter(bsp::id.eq(id.as_ref()))
            .first(conn)
            .await
            .optional()
    }
}
