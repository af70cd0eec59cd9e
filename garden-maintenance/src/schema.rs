// Retention columns of the tables purged by the cleanup job.

diesel::table! {
    readings (id) {
        id -> Uuid,
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    rate_limits (id) {
        id -> Int8,
        requested_at -> Timestamptz,
    }
}

diesel::table! {
    refresh_tokens (id) {
        id -> Uuid,
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    password_resets (id) {
        id -> Uuid,
        expires_at -> Timestamptz,
    }
}
