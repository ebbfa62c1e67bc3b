//! Persisted schema. Changes must stay additive-compatible: new optional
//! columns only, never renames or drops.

pub const SCHEMA: &str = "
    -- Message corpus. Timestamps are unix seconds (REAL) as delivered by
    -- the chat platform; id is the platform message id, so re-ingesting a
    -- message replaces the row instead of appending.
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        channel_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        text TEXT NOT NULL,
        timestamp REAL NOT NULL,
        thread_id TEXT,
        message_type TEXT DEFAULT 'message',
        mentions_count INTEGER DEFAULT 0,
        links_count INTEGER DEFAULT 0,
        attachments_count INTEGER DEFAULT 0,
        word_count INTEGER DEFAULT 0,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    -- Denormalized cache of platform channel metadata, refreshed
    -- opportunistically whenever a message from the channel is observed.
    CREATE TABLE IF NOT EXISTS channels (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        is_private BOOLEAN DEFAULT FALSE,
        topic TEXT,
        purpose TEXT,
        member_count INTEGER DEFAULT 0,
        last_activity DATETIME,
        last_updated DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    -- Denormalized cache of platform user metadata.
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        display_name TEXT,
        real_name TEXT,
        email TEXT,
        status TEXT,
        timezone TEXT,
        is_bot BOOLEAN DEFAULT FALSE,
        last_seen DATETIME,
        last_updated DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    -- Append-only audit log of context-assembly requests.
    CREATE TABLE IF NOT EXISTS query_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT,
        query TEXT,
        intents TEXT,
        response_length INTEGER,
        response_time_ms INTEGER,
        timestamp REAL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    -- Derived projection of thread activity. messages.thread_id stays
    -- authoritative; this table is rebuilt by the report scheduler.
    CREATE TABLE IF NOT EXISTS thread_summaries (
        thread_id TEXT PRIMARY KEY,
        channel_id TEXT,
        starter_user_id TEXT,
        participant_count INTEGER,
        message_count INTEGER,
        last_reply REAL,
        summary TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_messages_channel_timestamp ON messages (channel_id, timestamp DESC);
    CREATE INDEX IF NOT EXISTS idx_messages_user_timestamp ON messages (user_id, timestamp DESC);
    CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages (thread_id);
    CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages (timestamp DESC);
    CREATE INDEX IF NOT EXISTS idx_query_logs_user ON query_logs (user_id, timestamp DESC);
    CREATE INDEX IF NOT EXISTS idx_thread_summaries_channel ON thread_summaries (channel_id, last_reply DESC);
";
