//! Refresh planner statistics and make sure the hot-path indexes exist.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Array, BigInt, Text};

pub const TABLES: &[&str] = &[
    "users",
    "refresh_tokens",
    "password_resets",
    "user_settings",
    "plants",
    "sensors",
    "readings",
    "notifications",
    "rate_limits",
];

pub const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_readings_sensor_recorded ON readings (sensor_id, recorded_at)",
    "CREATE INDEX IF NOT EXISTS idx_readings_recorded_at ON readings (recorded_at)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user_created ON notifications (user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_created_at ON notifications (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user_unread ON notifications (user_id) WHERE read_at IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_notifications_alert_sensor ON notifications (user_id, type, (data ->> 'sensor_id'), created_at)",
    "CREATE INDEX IF NOT EXISTS idx_rate_limits_lookup ON rate_limits (user_id, endpoint, requested_at)",
    "CREATE INDEX IF NOT EXISTS idx_rate_limits_requested_at ON rate_limits (requested_at)",
    "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user_id ON refresh_tokens (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_password_resets_user_id ON password_resets (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_sensors_user_id ON sensors (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_sensors_plant_id ON sensors (plant_id)",
    "CREATE INDEX IF NOT EXISTS idx_sensors_status ON sensors (status)",
    "CREATE INDEX IF NOT EXISTS idx_plants_user_id ON plants (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_plants_type ON plants (type)",
];

#[derive(Debug, Clone, PartialEq, Eq, QueryableByName)]
pub struct TableEstimate {
    #[diesel(sql_type = Text)]
    pub table_name: String,
    #[diesel(sql_type = BigInt)]
    pub estimated_rows: i64,
}

#[derive(QueryableByName)]
struct CountResult {
    #[diesel(sql_type = BigInt)]
    cnt: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeReport {
    pub tables: Vec<TableEstimate>,
    pub index_count: i64,
}

fn table_names() -> Vec<String> {
    TABLES.iter().map(|t| t.to_string()).collect()
}

pub fn run(conn: &mut PgConnection) -> anyhow::Result<OptimizeReport> {
    let report = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        for table in TABLES {
            diesel::sql_query(format!("ANALYZE {table}")).execute(conn)?;
        }
        for ddl in INDEXES {
            diesel::sql_query(*ddl).execute(conn)?;
        }

        let tables = diesel::sql_query(
            "SELECT relname::TEXT AS table_name, GREATEST(reltuples, 0)::BIGINT AS estimated_rows \
             FROM pg_class \
             WHERE relkind = 'r' AND relname = ANY($1) \
             ORDER BY relname",
        )
        .bind::<Array<Text>, _>(table_names())
        .load::<TableEstimate>(conn)?;

        let index_count = diesel::sql_query(
            "SELECT COUNT(*) AS cnt FROM pg_indexes \
             WHERE schemaname = current_schema() AND tablename = ANY($1)",
        )
        .bind::<Array<Text>, _>(table_names())
        .get_result::<CountResult>(conn)?
        .cnt;

        Ok(OptimizeReport { tables, index_count })
    })?;

    for table in &report.tables {
        tracing::info!(table = %table.table_name, estimated_rows = table.estimated_rows, "table statistics");
    }
    tracing::info!(
        tables = report.tables.len(),
        index_count = report.index_count,
        "optimize completed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_index_targets_a_known_table() {
        for ddl in INDEXES {
            let table = ddl
                .split(" ON ")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .unwrap();
            assert!(TABLES.contains(&table), "{table} is not analyzed");
            assert!(ddl.contains("IF NOT EXISTS"));
        }
    }

    #[test]
    fn recreates_every_index_the_migration_creates() {
        let migration = include_str!("../../../migrations/2026-01-01-000000_init/up.sql");
        let names: Vec<&str> = migration
            .lines()
            .filter_map(|line| line.strip_prefix("CREATE INDEX "))
            .filter_map(|rest| rest.split_whitespace().next())
            .collect();
        assert!(names.contains(&"idx_notifications_alert_sensor"));
        for name in names {
            let needle = format!("IF NOT EXISTS {name} ON");
            assert!(INDEXES.iter().any(|ddl| ddl.contains(&needle)), "{name} is not recreated");
        }
    }
}
