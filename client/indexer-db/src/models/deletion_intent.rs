use std::fmt;
use std::io::Write;

use diesel::deserialize::{FromSql, Result as DeserializeResult};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{IsNull, Output, Result as SerializeResult, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use diesel_async::RunQueryDsl;

use crate::{schema::deletion_intent, DbConnection};

/// Which kind of deletion this intent represents, per §4.1's event taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum IntentKind {
    User,
    Incomplete,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntentKind::User => "user",
            IntentKind::Incomplete => "incomplete",
        })
    }
}

impl ToSql<Text, Pg> for IntentKind {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> SerializeResult {
        out.write_all(self.to_string().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for IntentKind {
    fn from_sql(bytes: PgValue) -> DeserializeResult<Self> {
        match <String as FromSql<Text, Pg>>::from_sql(bytes)?.as_str() {
            "user" => Ok(IntentKind::User),
            "incomplete" => Ok(IntentKind::Incomplete),
            other => Err(format!("unknown deletion_intent.kind: {other}").into()),
        }
    }
}

/// Which kind of provider a deletion intent targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum TargetKind {
    Bsp,
    Bucket,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::Bsp => "bsp",
            TargetKind::Bucket => "bucket",
        })
    }
}

impl ToSql<Text, Pg> for TargetKind {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> SerializeResult {
        out.write_all(self.to_string().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TargetKind {
    fn from_sql(bytes: PgValue) -> DeserializeResult<Self> {
        match <String as FromSql<Text, Pg>>::from_sql(bytes)?.as_str() {
            "bsp" => Ok(TargetKind::Bsp),
            "bucket" => Ok(TargetKind::Bucket),
            other => Err(format!("unknown deletion_intent.target_kind: {other}").into()),
        }
    }
}

/// Lifecycle of a deletion intent as the scheduler processes it (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum IntentStatus {
    /// Not yet included in any submitted extrinsic.
    Pending,
    /// Included in a submitted extrinsic awaiting finality.
    Batched,
    /// The target's completion event was observed and verified; row may be reaped.
    Confirmed,
    /// Submission or verification failed; the next tick retries from `Pending`.
    Failed,
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Batched => "batched",
            IntentStatus::Confirmed => "confirmed",
            IntentStatus::Failed => "failed",
        })
    }
}

impl ToSql<Text, Pg> for IntentStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> SerializeResult {
        out.write_all(self.to_string().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for IntentStatus {
    fn from_sql(bytes: PgValue) -> DeserializeResult<Self> {
        match <String as FromSql<Text, Pg>>::from_sql(bytes)?.as_str() {
            "pending" => Ok(IntentStatus::Pending),
            "batched" => Ok(IntentStatus::Batched),
            "confirmed" => Ok(IntentStatus::Confirmed),
            "failed" => Ok(IntentStatus::Failed),
            other => Err(format!("unknown deletion_intent.status: {other}").into()),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = deletion_intent)]
pub struct DeletionIntent {
    pub id: i64,
    pub file_id: i64,
    pub kind: IntentKind,
    pub target_kind: TargetKind,
    pub target_id: Vec<u8>,
    pub status: IntentStatus,
    pub created_at_block: i64,
}

impl DeletionIntent {
    /// Creates a pending intent, or is a no-op if an intent already exists for this
    /// `(file_id, target_kind, target_id, kind)` — the unique key from §3.3.
    pub async fn create<'a>(
        conn: &mut DbConnection<'a>,
        file_id: i64,
        kind: IntentKind,
        target_kind: TargetKind,
        target_id: impl Into<Vec<u8>>,
        created_at_block: i64,
    ) -> Result<(), diesel::result::Error> {
        diesel::insert_into(deletion_intent::table)
            .values((
                deletion_intent::file_id.eq(file_id),
                deletion_intent::kind.eq(kind),
                deletion_intent::target_kind.eq(target_kind),
                deletion_intent::target_id.eq(target_id.into()),
                deletion_intent::status.eq(IntentStatus::Pending),
                deletion_intent::created_at_block.eq(created_at_block),
            ))
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
        Ok(())
    }

    /// All retry-eligible intents of a given class, read as a snapshot for one scheduler tick
    /// (§4.2 step 1). `Pending` and `Failed` are both eligible: `Failed` exists only so a failed
    /// submission is briefly visible for diagnostics before the next tick retries it; `Batched`
    /// (awaiting finality) is excluded to avoid a second submission racing the first. Grouping by
    /// target is done by the caller, in plain Rust, over this flat list.
    pub async fn pending_by_kind<'a>(
        conn: &mut DbConnection<'a>,
        kind: IntentKind,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        deletion_intent::table
            .filter(deletion_intent::kind.eq(kind))
            .filter(
                deletion_intent::status
                    .eq(IntentStatus::Pending)
                    .or(deletion_intent::status.eq(IntentStatus::Failed)),
            )
            .order(deletion_intent::created_at_block.asc())
            .limit(limit)
            .select(DeletionIntent::as_select())
            .load(conn)
            .await
    }

    pub async fn set_status<'a>(
        conn: &mut DbConnection<'a>,
        id: i64,
        status: IntentStatus,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(deletion_intent::table)
            .filter(deletion_intent::id.eq(id))
            .set(deletion_intent::status.eq(status))
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Marks every intent for this `(target_kind, target_id)` confirmed, then deletes the
    /// confirmed rows. Called once the target's `…DeletionsCompleted` event is verified.
    pub async fn confirm_and_clear<'a>(
        conn: &mut DbConnection<'a>,
        target_kind: TargetKind,
        target_id: impl AsRef<[u8]>,
        file_ids: &[i64],
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(deletion_intent::table)
            .filter(deletion_intent::target_kind.eq(target_kind))
            .filter(deletion_intent::target_id.eq(target_id.as_ref()))
            .filter(deletion_intent::file_id.eq_any(file_ids))
            .execute(conn)
            .await
    }
}
