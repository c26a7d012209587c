use fisherman_common::types::BucketId;
use fisherman_indexer_db::models::{Bucket, File};
use fisherman_indexer_db::DbConnection;

use crate::error::SdkError;

/// Looks up a bucket's indexed state directly from the event store (C2): current name, owner,
/// managing MSP (if any, it may be cleared), and cached forest root. A client checks this
/// before issuing a storage request against a bucket it expects to still be managed.
pub async fn get_bucket<'a>(
    conn: &mut DbConnection<'a>,
    bucket_id: BucketId,
) -> Result<Option<Bucket>, SdkError> {
    Ok(Bucket::get(conn, bucket_id.0).await?)
}

/// File rows currently indexed under a bucket, for a client listing its own content without
/// re-deriving it from chain state.
pub async fn list_bucket_files<'a>(
    conn: &mut DbConnection<'a>,
    bucket_id: BucketId,
) -> Result<Vec<File>, SdkError> {
    let ids = File::ids_for_bucket(conn, bucket_id.0).await?;
    Ok(File::get_many(conn, &ids).await?)
}
