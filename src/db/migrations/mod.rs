use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

/// Embedded migrations, executed in order on startup. Each statement is
/// written to be safe to re-run.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_user_role",
        r#"
        DO $$ BEGIN
            CREATE TYPE user_role AS ENUM ('admin', 'operator', 'viewer');
        EXCEPTION WHEN duplicate_object THEN NULL;
        END $$;
        "#,
    ),
    (
        "002_create_users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role user_role NOT NULL DEFAULT 'viewer',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            last_login TIMESTAMPTZ,
            active BOOLEAN NOT NULL DEFAULT true
        );
        "#,
    ),
    (
        "003_create_documents",
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id UUID PRIMARY KEY,
            collection TEXT NOT NULL,
            doc JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    ),
    (
        "004_add_indexes",
        r#"
        CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection);
        CREATE INDEX IF NOT EXISTS idx_documents_doc ON documents USING GIN (doc);
        CREATE INDEX IF NOT EXISTS idx_documents_timestamp
            ON documents (collection, (doc->>'timestamp'));
        "#,
    ),
];

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    for (name, sql) in MIGRATIONS {
        sqlx::raw_sql(sql).execute(pool).await?;
        info!("Applied migration: {}", name);
    }

    Ok(())
}
