use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{schema::msp_file, DbConnection};

/// Association table between MSP and File, recording the block at which the association was
/// created — used to bound how far back a proof needs to look, not for ordering semantics.
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = msp_file)]
pub struct MspFile {
    pub msp_id: Vec<u8>,
    pub file_id: i64,
    pub associated_at_block: i64,
}

impl MspFile {
    pub async fn create<'a>(
        conn: &mut DbConnection<'a>,
        msp_id: impl Into<Vec<u8>>,
        file_id: i64,
        associated_at_block: i64,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(msp_file::table)
            .values((
                msp_file::msp_id.eq(msp_id.into()),
                msp_file::file_id.eq(file_id),
                msp_file::associated_at_block.eq(associated_at_block),
            ))
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete<'a>(
        conn: &mut DbConnection<'a>,
        msp_id: impl AsRef<[u8]>,
        file_id: i64,
    ) -> Result<(), diesel::result::Error> {
        diesel::delete(msp_file::table)
            .filter(msp_file::msp_id.eq(msp_id.as_ref()))
            .filter(msp_file::file_id.eq(file_id))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete_all_for_bucket_msp<'a>(
        conn: &mut DbConnection<'a>,
        msp_id: impl AsRef<[u8]>,
        file_ids: &[i64],
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(msp_file::table)
            .filter(msp_file::msp_id.eq(msp_id.as_ref()))
            .filter(msp_file::file_id.eq_any(file_ids))
            .execute(conn)
            .await
    }

    pub async fn msp_ids_for_file<'a>(
        conn: &mut DbConnection<'a>,
        file_id: i64,
    ) -> Result<Vec<Vec<u8>>, diesel::result::Error> {
        msp_file::table
            .filter(msp_file::file_id.eq(file_id))
            .select(msp_file::msp_id)
            .load(conn)
            .await
    }

    pub async fn file_ids_for_msp<'a>(
        conn: &mut DbConnection<'a>,
        msp_id: impl AsRef<[u8]>,
    ) -> Result<Vec<i64>, diesel::result::Error> {
        msp_file::table
            .filter(msp_file::msp_id.eq(msp_id.as_ref()))
            .select(msp_file::file_id)
            .load(conn)
            .await
    }
}
