use crate::traits::AssetStore;
use crate::types::{BatchKind, CaptionerError, CandidateItem, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

// Images that still lack a description, newest first.
const UNDESCRIBED_QUERY: &str = r#"
    SELECT a.id::text AS id
    FROM asset a
    JOIN asset_exif ae ON a.id = ae."assetId"
    WHERE (ae.description IS NULL OR ae.description = '')
    AND a.type = 'IMAGE'
    AND a.id::text <> ALL($2)
    ORDER BY a."createdAt" DESC
    LIMIT $1
"#;

const RECENT_QUERY: &str = r#"
    SELECT a.id::text AS id
    FROM asset a
    WHERE a.type = 'IMAGE'
    AND a.id::text <> ALL($2)
    ORDER BY a."createdAt" DESC
    LIMIT $1
"#;

// Last write wins; there is no check that the description is still empty.
const WRITE_DESCRIPTION: &str = r#"
    UPDATE asset_exif SET description = $1 WHERE "assetId" = $2::uuid
"#;

/// PostgreSQL-backed store using the photo server's own schema.
pub struct PgAssetStore {
    db: PgPool,
}

impl PgAssetStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url)
            .await
            .map_err(CaptionerError::StoreConnect)?;
        Ok(Self { db })
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[async_trait]
impl AssetStore for PgAssetStore {
    async fn next_batch(&self, kind: BatchKind, exclude: &[String]) -> Result<Vec<CandidateItem>> {
        let query = match kind {
            BatchKind::Undescribed => UNDESCRIBED_QUERY,
            BatchKind::BenchmarkSample => RECENT_QUERY,
        };

        let rows = sqlx::query(query)
            .bind(kind.limit() as i64)
            .bind(exclude)
            .fetch_all(&self.db)
            .await
            .map_err(CaptionerError::StoreQuery)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_get::<String, _>("id").map(CandidateItem::new))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CaptionerError::StoreQuery)?;

        debug!(
            "Store returned {} candidates for {:?} ({} excluded)",
            items.len(),
            kind,
            exclude.len()
        );
        Ok(items)
    }

    async fn write_description(&self, item: &CandidateItem, description: &str) -> Result<()> {
        let result = sqlx::query(WRITE_DESCRIPTION)
            .bind(description)
            .bind(&item.id)
            .execute(&self.db)
            .await
            .map_err(CaptionerError::StoreWrite)?;

        if result.rows_affected() == 0 {
            warn!("No exif row for asset {}, description not stored", item.id);
        }
        Ok(())
    }
}
