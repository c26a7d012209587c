// Hand-maintained to match the migrations under `migrations/`; this crate does not run
// `diesel print-schema` against a live database.

diesel::table! {
    block (height) {
        height -> Int8,
        hash -> Bytea,
        finalized -> Bool,
        indexed_at -> Timestamptz,
    }
}

diesel::table! {
    msp (id) {
        id -> Bytea,
        capabilities -> Jsonb,
        forest_root -> Nullable<Bytea>,
    }
}

diesel::table! {
    bsp (id) {
        id -> Bytea,
        capabilities -> Jsonb,
        forest_root -> Nullable<Bytea>,
    }
}

diesel::table! {
    bucket (id) {
        id -> Bytea,
        name -> Text,
        owner -> Bytea,
        msp_id -> Nullable<Bytea>,
        forest_root -> Nullable<Bytea>,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    file (id) {
        id -> Int8,
        file_key -> Bytea,
        fingerprint -> Bytea,
        owner -> Bytea,
        bucket_id -> Bytea,
        location -> Text,
        size -> Int8,
        deletion_signature -> Nullable<Bytea>,
        deletion_signer -> Nullable<Bytea>,
        fulfilled -> Bool,
        created_at_block -> Int8,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    msp_file (msp_id, file_id) {
        msp_id -> Bytea,
        file_id -> Int8,
        associated_at_block -> Int8,
    }
}

diesel::table! {
    bsp_file (bsp_id, file_id) {
        bsp_id -> Bytea,
        file_id -> Int8,
        associated_at_block -> Int8,
    }
}

diesel::table! {
    deletion_intent (id) {
        id -> Int8,
        file_id -> Int8,
        kind -> Text,
        target_kind -> Text,
        target_id -> Bytea,
        status -> Text,
        created_at_block -> Int8,
    }
}

diesel::table! {
    applied_event (block_height, event_index) {
        block_height -> Int8,
        event_index -> Int4,
    }
}

diesel::table! {
    service_state (id) {
        id -> Int2,
        last_indexed_block -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(bucket -> msp (msp_id));
diesel::joinable!(file -> bucket (bucket_id));
diesel::joinable!(msp_file -> msp (msp_id));
diesel::joinable!(msp_file -> file (file_id));
diesel::joinable!(bsp_file -> bsp (bsp_id));
diesel::joinable!(bsp_file -> file (file_id));
diesel::joinable!(deletion_intent -> file (file_id));

diesel::allow_tables_to_appear_in_same_query!(
    block,
    msp,
    bsp,
    bucket,
    file,
    msp_file,
    bsp_file,
    deletion_intent,
    applied_event,
    service_state,
);
