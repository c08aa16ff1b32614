//! Centralized database schema definitions for the workspace memory store.
//!
//! Noxis keeps one SQLite file per workspace (`.noxis/memory.db`) holding:
//! 1. `runs`: append-only ledger of command executions.
//! 2. `ai_explanations`: append-only audit trail of explanation prompts.
//! 3. `project_state`: latest-value table keyed by logical name.

pub const MEMORY_DB_NAME: &str = "memory.db";

// SQLite's `%f` yields seconds with millisecond precision.
pub const NOW_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

pub const MEMORY_DB_SCHEMA_RUNS: &str = "
    CREATE TABLE IF NOT EXISTS runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        command TEXT NOT NULL,
        payload_json TEXT
    )
";
/// Run inserts stamp `created_at` at least one millisecond after the newest
/// row, so timestamps strictly increase even within one millisecond.
pub const INSERT_RUN_SQL: &str = "
    INSERT INTO runs(command, payload_json, created_at)
    SELECT ?1, ?2,
        CASE WHEN last IS NULL OR now > last THEN now
             ELSE strftime('%Y-%m-%dT%H:%M:%fZ', last, '+0.001 seconds') END
    FROM (SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now') AS now, MAX(created_at) AS last FROM runs)
";
pub const MEMORY_DB_SCHEMA_RUNS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_runs_command ON runs(command, id)";

pub const MEMORY_DB_SCHEMA_AI_EXPLANATIONS: &str = "
    CREATE TABLE IF NOT EXISTS ai_explanations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        prompt_hash TEXT NOT NULL,
        response TEXT NOT NULL
    )
";

pub const MEMORY_DB_SCHEMA_PROJECT_STATE: &str = "
    CREATE TABLE IF NOT EXISTS project_state (
        key TEXT PRIMARY KEY,
        value_json TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

/// Every statement needed to bring a fresh `memory.db` up to date, in order.
pub const MEMORY_DB_SCHEMA: &[&str] = &[
    MEMORY_DB_SCHEMA_RUNS,
    MEMORY_DB_SCHEMA_RUNS_INDEX,
    MEMORY_DB_SCHEMA_AI_EXPLANATIONS,
    MEMORY_DB_SCHEMA_PROJECT_STATE,
];
