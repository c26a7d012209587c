use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{schema::bsp_file, DbConnection};

/// Association table between BSP and File. Mirrors [`super::MspFile`].
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = bsp_file)]
pub struct BspFile {
    pub bsp_id: Vec<u8>,
    pub file_id: i64,
    pub associated_at_block: i64,
}

impl BspFile {
    pub async fn create<'a>(
        conn: &mut DbConnection<'a>,
        bsp_id: impl Into<Vec<u8>>,
        file_id: i64,
        associated_at_block: i64,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(bsp_file::table)
            .values((
                bsp_file::bsp_id.eq(bsp_id.into()),
                bsp_file::file_id.eq(file_id),
                bsp_file::associated_at_block.eq(associated_at_block),
            ))
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete<'a>(
        conn: &mut DbConnection<'a>,
        bsp_id: impl AsRef<[u8]>,
        file_id: i64,
    ) -> Result<(), diesel::result::Error> {
        diesel::delete(bsp_file::table)
            .filter(bsp_file::bsp_id.eq(bsp_id.as_ref()))
            .filter(bsp_file::file_id.eq(file_id))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete_all_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        file_ids: &[i64],
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(bsp_file::table)
            .filter(bsp_file::file_id.eq_any(file_ids))
            .execute(conn)
            .await
    }

    pub async fn bsp_ids_for_file<'a>(
        conn: &mut DbConnection<'a>,
        file_id: i64,
    ) -> Result<Vec<Vec<u8>>, diesel::result::Error> {
        bsp_file::table
            .filter(bsp_file::file_id.eq(file_id))
            .select(bsp_file::bsp_id)
            .load(conn)
            .await
    }

    pub async fn file_ids_for_bsp<'a>(
        conn: &mut DbConnection<'a>,
        bsp_id: impl AsRef<[u8]>,
    ) -> Result<Vec<i64>, diesel::result::Error> {
        bsp_file::table
            .filter(bsp_file::bsp_id.eq(bsp_id.as_ref()))
            .select(bsp_file::file_id)
            .load(conn)
            .await
    }
}
