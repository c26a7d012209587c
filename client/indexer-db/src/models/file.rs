use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{
    schema::{bsp_file, file, msp_file},
    DbConnection,
};

/// Table that holds the files the store has observed, both pending storage requests and
/// fulfilled ones. Removed once its last provider association disappears with no pending
/// deletion intent outstanding (§4.1 recovery and completion handlers).
#[derive(Debug, Clone, Queryable, Insertable, Selectable)]
#[diesel(table_name = file)]
pub struct File {
    pub id: i64,
    pub file_key: Vec<u8>,
    pub fingerprint: Vec<u8>,
    pub owner: Vec<u8>,
    pub bucket_id: Vec<u8>,
    pub location: String,
    pub size: i64,
    pub deletion_signature: Option<Vec<u8>>,
    pub deletion_signer: Option<Vec<u8>>,
    pub fulfilled: bool,
    pub created_at_block: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = file)]
pub struct NewFile {
    pub file_key: Vec<u8>,
    pub fingerprint: Vec<u8>,
    pub owner: Vec<u8>,
    pub bucket_id: Vec<u8>,
    pub location: String,
    pub size: i64,
    pub created_at_block: i64,
}

impl File {
    /// Inserts a new file row, or is a no-op if the `file_key` already exists (the recovery
    /// path reconstructing a row from an association event never overwrites an existing one).
    pub async fn upsert<'a>(
        conn: &mut DbConnection<'a>,
        new_file: NewFile,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(file::table)
            .values((
                file::file_key.eq(new_file.file_key),
                file::fingerprint.eq(new_file.fingerprint),
                file::owner.eq(new_file.owner),
                file::bucket_id.eq(new_file.bucket_id),
                file::location.eq(new_file.location),
                file::size.eq(new_file.size),
                file::fulfilled.eq(false),
                file::created_at_block.eq(new_file.created_at_block),
            ))
            .on_conflict(file::file_key)
            .do_nothing()
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn get<'a>(
        conn: &mut DbConnection<'a>,
        id: i64,
    ) -> Result<Option<Self>, diesel::result::Error> {
        file::table.find(id).first(conn).await.optional()
    }

    /// Batch fetch for grouping deletion intents by target (§4.2 step 2) without one query per
    /// file.
    pub async fn get_many<'a>(
        conn: &mut DbConnection<'a>,
        ids: &[i64],
    ) -> Result<Vec<Self>, diesel::result::Error> {
        file::table.filter(file::id.eq_any(ids)).load(conn).await
    }

    pub async fn get_by_file_key<'a>(
        conn: &mut DbConnection<'a>,
        file_key: impl AsRef<[u8]>,
    ) -> Result<Option<Self>, diesel::result::Error> {
        file::table
            .filter(file::file_key.eq(file_key.as_ref()))
            .first(conn)
            .await
            .optional()
    }

    pub async fn mark_fulfilled<'a>(
        conn: &mut DbConnection<'a>,
        file_key: impl AsRef<[u8]>,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(file::table)
            .filter(file::file_key.eq(file_key.as_ref()))
            .set(file::fulfilled.eq(true))
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Persists the user's SCALE-encoded deletion signature from `FileDeletionRequested`.
    pub async fn set_deletion_signature<'a>(
        conn: &mut DbConnection<'a>,
        file_key: impl AsRef<[u8]>,
        signature: impl Into<Vec<u8>>,
        signer: impl Into<Vec<u8>>,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(file::table)
            .filter(file::file_key.eq(file_key.as_ref()))
            .set((
                file::deletion_signature.eq(Some(signature.into())),
                file::deletion_signer.eq(Some(signer.into())),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn ids_for_bucket<'a>(
        conn: &mut DbConnection<'a>,
        bucket_id: impl AsRef<[u8]>,
    ) -> Result<Vec<i64>, diesel::result::Error> {
        file::table
            .filter(file::bucket_id.eq(bucket_id.as_ref()))
            .select(file::id)
            .load(conn)
            .await
    }

    pub async fn ids_for_owner<'a>(
        conn: &mut DbConnection<'a>,
        owner: impl AsRef<[u8]>,
    ) -> Result<Vec<i64>, diesel::result::Error> {
        file::table
            .filter(file::owner.eq(owner.as_ref()))
            .select(file::id)
            .load(conn)
            .await
    }

    pub async fn has_msp_associations<'a>(
        conn: &mut DbConnection<'a>,
        file_id: i64,
    ) -> Result<bool, diesel::result::Error> {
        let count: i64 = msp_file::table
            .filter(msp_file::file_id.eq(file_id))
            .count()
            .get_result(conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn has_bsp_associations<'a>(
        conn: &mut DbConnection<'a>,
        file_id: i64,
    ) -> Result<bool, diesel::result::Error> {
        let count: i64 = bsp_file::table
            .filter(bsp_file::file_id.eq(file_id))
            .count()
            .get_result(conn)
            .await?;
        Ok(count > 0)
    }

    /// Deletes the file row if it has no remaining provider associations and no pending
    /// deletion intents, per the `…DeletionsCompleted` handlers in §4.1.
    pub async fn delete_if_orphaned<'a>(
        conn: &mut DbConnection<'a>,
        file_id: i64,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::deletion_intent;

        let has_msp = Self::has_msp_associations(conn, file_id).await?;
        let has_bsp = Self::has_bsp_associations(conn, file_id).await?;
        let pending_intents: i64 = deletion_intent::table
            .filter(deletion_intent::file_id.eq(file_id))
            .count()
            .get_result(conn)
            .await?;

        if has_msp || has_bsp || pending_intents > 0 {
            return Ok(false);
        }

        diesel::delete(file::table)
            .filter(file::id.eq(file_id))
            .execute(conn)
            .await?;
        log::debug!("deleted orphaned file id={file_id}");
        Ok(true)
    }
}
