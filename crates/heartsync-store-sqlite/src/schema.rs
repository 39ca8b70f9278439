//! SQL schema for the Heartsync SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id      TEXT PRIMARY KEY,
    identity     TEXT NOT NULL,
    display_name TEXT NOT NULL,
    created_at   TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS seasons (
    season_id             TEXT PRIMARY KEY,
    name                  TEXT NOT NULL,
    start_at              TEXT NOT NULL,
    end_at                TEXT NOT NULL,
    active                INTEGER NOT NULL DEFAULT 0,
    default_visibility    TEXT NOT NULL,   -- VisibilityMode text encoding
    mutual_reveal_enabled INTEGER NOT NULL DEFAULT 1
);

-- The crush ledger. Rows are never deleted; the only updates ever issued
-- are the match flip (status, is_mutual) and the withdrawn flag.
CREATE TABLE IF NOT EXISTS crushes (
    crush_id               TEXT PRIMARY KEY,
    season_id              TEXT NOT NULL REFERENCES seasons(season_id),
    submitter_user_id      TEXT NOT NULL,
    submitter_identity     TEXT NOT NULL,
    submitter_display_name TEXT NOT NULL,
    target_identity        TEXT NOT NULL,
    target_display_name    TEXT NOT NULL,
    visibility             TEXT NOT NULL,
    status                 TEXT NOT NULL DEFAULT 'pending',
    is_mutual              INTEGER NOT NULL DEFAULT 0,
    withdrawn              INTEGER NOT NULL DEFAULT 0,
    created_at             TEXT NOT NULL,
    CHECK (submitter_identity != target_identity)
);

-- At most one live submission per (season, submitter, target).
CREATE UNIQUE INDEX IF NOT EXISTS crushes_live_pair_idx
    ON crushes(season_id, submitter_identity, target_identity)
    WHERE withdrawn = 0;

-- Reciprocal lookup and admirer counts.
CREATE INDEX IF NOT EXISTS crushes_target_idx
    ON crushes(season_id, target_identity) WHERE withdrawn = 0;
CREATE INDEX IF NOT EXISTS crushes_created_idx ON crushes(created_at);

-- Match ids are deterministic: season + the pair sorted lexicographically.
-- Both halves of a mutual pair derive the same id, so insertion is
-- naturally idempotent under concurrent submission.
CREATE TABLE IF NOT EXISTS matches (
    match_id        TEXT PRIMARY KEY,
    season_id       TEXT NOT NULL REFERENCES seasons(season_id),
    user_a_identity TEXT NOT NULL,
    user_b_identity TEXT NOT NULL,
    user_a_name     TEXT NOT NULL,
    user_b_name     TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    CHECK (user_a_identity < user_b_identity)
);

CREATE INDEX IF NOT EXISTS matches_season_idx ON matches(season_id);

-- Derived counters, incremented alongside ledger writes. Never the source
-- of truth: recompute_aggregates rebuilds this table from scratch.
CREATE TABLE IF NOT EXISTS aggregates (
    scope  TEXT NOT NULL,   -- 'global' or 'season:<id>'
    metric TEXT NOT NULL,   -- 'users' | 'crushes' | 'matches'
    value  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (scope, metric)
);

PRAGMA user_version = 1;
";
