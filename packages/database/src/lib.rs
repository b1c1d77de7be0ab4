#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Groundwater store contract, implementations, and migrations.
//!
//! [`GroundwaterStore`] is the read contract the query engine depends on.
//! [`queries::SqlStore`] implements it over `switchy_database` (`SQLite` or
//! Postgres) with raw parameterised SQL; [`memory::MemoryStore`] implements
//! it over plain vectors for tests and fixtures. Migrations are embedded
//! from the workspace `migrations/` directory via `switchy_schema`.

pub mod db;
pub mod memory;
pub mod queries;

use include_dir::{Dir, include_dir};
use ingres_database_models::{AssessmentQuery, HistoricalQuery, LatestAssessmentQuery, RegionQuery};
use ingres_groundwater_models::{Assessment, HistoricalPoint, Region};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Read contract over regions, assessments, and historical points.
///
/// Implementations perform filtering, ordering, and pagination exactly as
/// documented on each query type in `ingres_database_models`. No method
/// writes, and no method is expected to be transactionally consistent with
/// any other.
#[async_trait::async_trait]
pub trait GroundwaterStore: Send + Sync {
    /// Reads regions matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails.
    async fn regions(&self, query: &RegionQuery) -> Result<Vec<Region>, DbError>;

    /// Reads assessments matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails.
    async fn assessments(&self, query: &AssessmentQuery) -> Result<Vec<Assessment>, DbError>;

    /// Reads every assessment sitting at its own region's maximum year.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails.
    async fn latest_assessments(
        &self,
        query: &LatestAssessmentQuery,
    ) -> Result<Vec<Assessment>, DbError>;

    /// Returns `MAX(assessment_year)` over the given regions combined, or
    /// `None` if none of them has an assessment.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails.
    async fn max_assessment_year(&self, region_ids: &[i64]) -> Result<Option<i32>, DbError>;

    /// Reads historical points matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails.
    async fn historical_points(
        &self,
        query: &HistoricalQuery,
    ) -> Result<Vec<HistoricalPoint>, DbError>;

    /// Looks up a single region by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails.
    async fn region_by_id(&self, id: i64) -> Result<Option<Region>, DbError> {
        let query = RegionQuery {
            ids: vec![id],
            limit: Some(1),
            ..RegionQuery::default()
        };
        Ok(self.regions(&query).await?.into_iter().next())
    }
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}
