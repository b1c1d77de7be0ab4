//! SQL implementation of [`GroundwaterStore`].
//!
//! Every read is a single raw parameterised statement via
//! `query_raw_params()`. The SQL sticks to the subset shared by `SQLite`
//! and Postgres so the same store works against either backend.

use std::str::FromStr;
use std::sync::Arc;

use ingres_database_models::{
    AssessmentOrder, AssessmentQuery, HistoricalQuery, LatestAssessmentQuery, RegionOrder,
    RegionQuery,
};
use ingres_groundwater_models::{Assessment, HistoricalPoint, Region};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::{DbError, GroundwaterStore};

const ASSESSMENT_COLUMNS: &str = "a.id, a.region_id, a.assessment_year, a.annual_recharge,
     a.extractable_resources, a.total_extraction, a.stage_of_extraction,
     a.extraction_ratio, a.trend, a.assessment_date, a.data_source";

/// Accumulates a WHERE clause and its positional parameters.
#[derive(Default)]
struct Filters {
    frags: Vec<String>,
    params: Vec<DatabaseValue>,
}

impl Filters {
    /// Pushes a parameter and returns its `$n` placeholder.
    fn bind(&mut self, value: DatabaseValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn push(&mut self, frag: String) {
        self.frags.push(frag);
    }

    fn push_in(&mut self, column: &str, ids: &[i64]) {
        if ids.is_empty() {
            return;
        }
        let placeholders = ids
            .iter()
            .map(|id| self.bind(DatabaseValue::Int64(*id)))
            .collect::<Vec<_>>()
            .join(", ");
        self.push(format!("{column} IN ({placeholders})"));
    }

    fn push_year_range(&mut self, column: &str, start: Option<i32>, end: Option<i32>) {
        if let Some(start) = start {
            let p = self.bind(DatabaseValue::Int32(start));
            self.push(format!("{column} >= {p}"));
        }
        if let Some(end) = end {
            let p = self.bind(DatabaseValue::Int32(end));
            self.push(format!("{column} <= {p}"));
        }
    }

    fn where_clause(&self) -> String {
        if self.frags.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.frags.join(" AND "))
        }
    }

    /// Appends `LIMIT`/`OFFSET`. Returns the offset still to be applied in
    /// memory when no limit was given (an `OFFSET` without `LIMIT` is not
    /// portable).
    fn paginate(&mut self, sql: &mut String, limit: Option<u32>, offset: u32) -> usize {
        let Some(limit) = limit else {
            return offset as usize;
        };
        let l = self.bind(DatabaseValue::Int64(i64::from(limit)));
        let o = self.bind(DatabaseValue::Int64(i64::from(offset)));
        sql.push_str(&format!(" LIMIT {l} OFFSET {o}"));
        0
    }
}

/// Escapes `LIKE` wildcards so user text matches literally.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn parse_enum<T: FromStr>(row: &Row, column: &str) -> Result<T, DbError> {
    let raw: String = row.to_value(column).map_err(|e| DbError::Conversion {
        message: format!("Failed to read '{column}': {e}"),
    })?;
    raw.parse().map_err(|_| DbError::Conversion {
        message: format!("Unrecognised value '{raw}' in column '{column}'"),
    })
}

/// Reads an integer column whichever width the backend reports it in.
fn int_value(row: &Row, column: &str) -> Result<Option<i64>, DbError> {
    let wide: Result<Option<i64>, _> = row.to_value(column);
    wide.or_else(|_| {
        let narrow: Result<Option<i32>, _> = row.to_value(column);
        narrow.map(|v| v.map(i64::from))
    })
    .map_err(|e| DbError::Conversion {
        message: format!("Failed to read '{column}': {e}"),
    })
}

fn required_int<T: TryFrom<i64>>(row: &Row, column: &str) -> Result<T, DbError> {
    optional_int(row, column)?.ok_or_else(|| DbError::Conversion {
        message: format!("Missing value in column '{column}'"),
    })
}

fn optional_int<T: TryFrom<i64>>(row: &Row, column: &str) -> Result<Option<T>, DbError> {
    int_value(row, column)?
        .map(|raw| {
            T::try_from(raw).map_err(|_| DbError::Conversion {
                message: format!("Value {raw} out of range in column '{column}'"),
            })
        })
        .transpose()
}

fn region_from_row(row: &Row) -> Result<Region, DbError> {
    Ok(Region {
        id: required_int(row, "id")?,
        name: row.to_value("name").unwrap_or_default(),
        region_type: parse_enum(row, "type")?,
        parent_id: optional_int(row, "parent_id")?,
        code: row.to_value("code").unwrap_or_default(),
        latitude: row.to_value("latitude").unwrap_or(None),
        longitude: row.to_value("longitude").unwrap_or(None),
    })
}

fn assessment_from_row(row: &Row) -> Result<Assessment, DbError> {
    Ok(Assessment {
        id: required_int(row, "id")?,
        region_id: required_int(row, "region_id")?,
        assessment_year: required_int(row, "assessment_year")?,
        annual_recharge: row.to_value("annual_recharge").unwrap_or(0.0),
        extractable_resources: row.to_value("extractable_resources").unwrap_or(0.0),
        total_extraction: row.to_value("total_extraction").unwrap_or(0.0),
        stage_of_extraction: parse_enum(row, "stage_of_extraction")?,
        extraction_ratio: row.to_value("extraction_ratio").unwrap_or(0.0),
        trend: parse_enum(row, "trend")?,
        assessment_date: row.to_value("assessment_date").unwrap_or_default(),
        data_source: row.to_value("data_source").unwrap_or_default(),
    })
}

fn historical_from_row(row: &Row) -> Result<HistoricalPoint, DbError> {
    let month: Option<u8> = optional_int(row, "month")?;
    if let Some(m) = month
        && !(1..=12).contains(&m)
    {
        return Err(DbError::Conversion {
            message: format!("Month out of range: {m}"),
        });
    }

    Ok(HistoricalPoint {
        id: required_int(row, "id")?,
        region_id: required_int(row, "region_id")?,
        year: required_int(row, "year")?,
        month,
        parameter_type: parse_enum(row, "parameter_type")?,
        value: row.to_value("value").unwrap_or(0.0),
        unit: row.to_value("unit").unwrap_or_default(),
    })
}

fn collect<T>(
    rows: &[Row],
    skip: usize,
    convert: fn(&Row) -> Result<T, DbError>,
) -> Result<Vec<T>, DbError> {
    rows.iter().skip(skip).map(convert).collect()
}

/// [`GroundwaterStore`] backed by a `switchy_database` connection.
pub struct SqlStore {
    db: Arc<dyn Database>,
}

impl SqlStore {
    /// Wraps an open database connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub fn database(&self) -> &dyn Database {
        self.db.as_ref()
    }
}

#[async_trait::async_trait]
impl GroundwaterStore for SqlStore {
    async fn regions(&self, query: &RegionQuery) -> Result<Vec<Region>, DbError> {
        let mut filters = Filters::default();
        filters.push_in("id", &query.ids);

        if let Some(region_type) = query.region_type {
            let p = filters.bind(DatabaseValue::String(region_type.to_string()));
            filters.push(format!("type = {p}"));
        }

        if let Some(fragment) = &query.name_contains {
            let p = filters.bind(DatabaseValue::String(like_pattern(fragment)));
            filters.push(format!("LOWER(name) LIKE {p} ESCAPE '\\'"));
        }

        let order = match query.order {
            RegionOrder::Id => "id ASC",
            RegionOrder::Name => "name ASC, id ASC",
        };

        let mut sql = format!(
            "SELECT id, name, type, parent_id, code, latitude, longitude
             FROM regions{} ORDER BY {order}",
            filters.where_clause()
        );
        let skip = filters.paginate(&mut sql, query.limit, 0);

        let rows = self.db.query_raw_params(&sql, &filters.params).await?;
        collect(&rows, skip, region_from_row)
    }

    async fn assessments(&self, query: &AssessmentQuery) -> Result<Vec<Assessment>, DbError> {
        let mut filters = Filters::default();
        filters.push_in("a.region_id", &query.region_ids);

        if let Some(year) = query.year {
            let p = filters.bind(DatabaseValue::Int32(year));
            filters.push(format!("a.assessment_year = {p}"));
        }
        filters.push_year_range("a.assessment_year", query.start_year, query.end_year);

        if !query.stages.is_empty() {
            let placeholders = query
                .stages
                .iter()
                .map(|s| filters.bind(DatabaseValue::String(s.to_string())))
                .collect::<Vec<_>>()
                .join(", ");
            filters.push(format!("a.stage_of_extraction IN ({placeholders})"));
        }

        let order = match query.order {
            AssessmentOrder::YearDesc => "a.assessment_year DESC, a.id ASC",
            AssessmentOrder::ExtractionRatioDesc => "a.extraction_ratio DESC, a.id ASC",
        };

        let mut sql = format!(
            "SELECT {ASSESSMENT_COLUMNS}
             FROM groundwater_assessments a{} ORDER BY {order}",
            filters.where_clause()
        );
        let skip = filters.paginate(&mut sql, query.limit, query.offset);

        let rows = self.db.query_raw_params(&sql, &filters.params).await?;
        collect(&rows, skip, assessment_from_row)
    }

    async fn latest_assessments(
        &self,
        query: &LatestAssessmentQuery,
    ) -> Result<Vec<Assessment>, DbError> {
        let mut filters = Filters::default();
        filters.push_in("a.region_id", &query.region_ids);

        if let Some(region_type) = query.region_type {
            let p = filters.bind(DatabaseValue::String(region_type.to_string()));
            filters.push(format!("r.type = {p}"));
        }

        if let Some(state_id) = query.within_state {
            let p = filters.bind(DatabaseValue::Int64(state_id));
            filters.push(format!("(r.id = {p} OR r.parent_id = {p})"));
        }

        let sql = format!(
            "SELECT {ASSESSMENT_COLUMNS}
             FROM groundwater_assessments a
             JOIN regions r ON r.id = a.region_id
             JOIN (
                 SELECT region_id, MAX(assessment_year) AS max_year
                 FROM groundwater_assessments
                 GROUP BY region_id
             ) latest ON latest.region_id = a.region_id
                     AND latest.max_year = a.assessment_year{}
             ORDER BY a.region_id ASC, a.id ASC",
            filters.where_clause()
        );

        let rows = self.db.query_raw_params(&sql, &filters.params).await?;
        collect(&rows, 0, assessment_from_row)
    }

    async fn max_assessment_year(&self, region_ids: &[i64]) -> Result<Option<i32>, DbError> {
        let mut filters = Filters::default();
        filters.push_in("region_id", region_ids);

        let sql = format!(
            "SELECT MAX(assessment_year) AS max_year FROM groundwater_assessments{}",
            filters.where_clause()
        );

        let rows = self.db.query_raw_params(&sql, &filters.params).await?;
        // MAX over no rows is a single NULL row.
        rows.first().map_or(Ok(None), |row| optional_int(row, "max_year"))
    }

    async fn historical_points(
        &self,
        query: &HistoricalQuery,
    ) -> Result<Vec<HistoricalPoint>, DbError> {
        let mut filters = Filters::default();
        filters.push_in("region_id", &query.region_ids);
        filters.push_year_range("year", query.start_year, query.end_year);

        if let Some(parameter_type) = query.parameter_type {
            let p = filters.bind(DatabaseValue::String(parameter_type.to_string()));
            filters.push(format!("parameter_type = {p}"));
        }

        // `month IS NULL` sorts false before true on both backends, which
        // places annual rows after the monthly ones of the same year.
        let mut sql = format!(
            "SELECT id, region_id, year, month, parameter_type, value, unit
             FROM historical_data{}
             ORDER BY year DESC, month IS NULL, month DESC, id ASC",
            filters.where_clause()
        );
        let skip = filters.paginate(&mut sql, query.limit, query.offset);

        let rows = self.db.query_raw_params(&sql, &filters.params).await?;
        collect(&rows, skip, historical_from_row)
    }
}

#[cfg(test)]
mod tests {
    use ingres_groundwater_models::{ParameterType, RegionType, StageOfExtraction};

    use super::*;
    use crate::memory::{MemoryStore, fixtures};

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Tamil Nadu"), "%tamil nadu%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn filters_number_placeholders_in_order() {
        let mut filters = Filters::default();
        filters.push_in("region_id", &[4, 5]);
        filters.push_year_range("year", Some(2019), None);
        assert_eq!(
            filters.where_clause(),
            " WHERE region_id IN ($1, $2) AND year >= $3"
        );
        assert_eq!(filters.params.len(), 3);
    }

    #[test]
    fn empty_id_list_adds_no_filter() {
        let mut filters = Filters::default();
        filters.push_in("region_id", &[]);
        assert_eq!(filters.where_clause(), "");
    }

    #[test]
    fn paginate_defers_offset_without_limit() {
        let mut filters = Filters::default();
        let mut sql = String::from("SELECT 1");
        assert_eq!(filters.paginate(&mut sql, None, 7), 7);
        assert_eq!(sql, "SELECT 1");

        let skip = filters.paginate(&mut sql, Some(10), 7);
        assert_eq!(skip, 0);
        assert_eq!(sql, "SELECT 1 LIMIT $1 OFFSET $2");
    }

    const STAMP: &str = "2024-01-01T00:00:00Z";

    fn real(value: Option<f64>) -> DatabaseValue {
        value.map_or(DatabaseValue::Null, DatabaseValue::Real64)
    }

    async fn seed(db: &dyn Database, source: &MemoryStore) {
        for r in source.regions(&RegionQuery::default()).await.unwrap() {
            db.exec_raw_params(
                "INSERT INTO regions
                 (id, name, type, parent_id, code, latitude, longitude, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
                &[
                    DatabaseValue::Int64(r.id),
                    DatabaseValue::String(r.name.clone()),
                    DatabaseValue::String(r.region_type.to_string()),
                    r.parent_id.map_or(DatabaseValue::Null, DatabaseValue::Int64),
                    DatabaseValue::String(r.code.clone()),
                    real(r.latitude),
                    real(r.longitude),
                    DatabaseValue::String(STAMP.to_string()),
                ],
            )
            .await
            .unwrap();
        }

        for a in source
            .assessments(&AssessmentQuery::default())
            .await
            .unwrap()
        {
            db.exec_raw_params(
                "INSERT INTO groundwater_assessments
                 (id, region_id, assessment_year, annual_recharge, extractable_resources,
                  total_extraction, stage_of_extraction, extraction_ratio, trend,
                  assessment_date, data_source, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)",
                &[
                    DatabaseValue::Int64(a.id),
                    DatabaseValue::Int64(a.region_id),
                    DatabaseValue::Int32(a.assessment_year),
                    DatabaseValue::Real64(a.annual_recharge),
                    DatabaseValue::Real64(a.extractable_resources),
                    DatabaseValue::Real64(a.total_extraction),
                    DatabaseValue::String(a.stage_of_extraction.to_string()),
                    DatabaseValue::Real64(a.extraction_ratio),
                    DatabaseValue::String(a.trend.to_string()),
                    DatabaseValue::String(a.assessment_date.clone()),
                    DatabaseValue::String(a.data_source.clone()),
                    DatabaseValue::String(STAMP.to_string()),
                ],
            )
            .await
            .unwrap();
        }

        for h in source
            .historical_points(&HistoricalQuery::default())
            .await
            .unwrap()
        {
            db.exec_raw_params(
                "INSERT INTO historical_data
                 (id, region_id, year, month, parameter_type, value, unit, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
                &[
                    DatabaseValue::Int64(h.id),
                    DatabaseValue::Int64(h.region_id),
                    DatabaseValue::Int32(h.year),
                    h.month.map_or(DatabaseValue::Null, |m| DatabaseValue::Int32(i32::from(m))),
                    DatabaseValue::String(h.parameter_type.to_string()),
                    DatabaseValue::Real64(h.value),
                    DatabaseValue::String(h.unit.clone()),
                    DatabaseValue::String(STAMP.to_string()),
                ],
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn sqlite_store_matches_memory_store() {
        let tmp = std::env::temp_dir().join("ingres_sql_store_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();

        let db = switchy_database_connection::init_sqlite_rusqlite(Some(&tmp.join("store.db")))
            .unwrap();
        crate::run_migrations(db.as_ref()).await.unwrap();

        let memory = fixtures::sample();
        seed(db.as_ref(), &memory).await;
        let sql = SqlStore::new(Arc::from(db));

        let region_queries = [
            RegionQuery::default(),
            RegionQuery {
                region_type: Some(RegionType::District),
                order: RegionOrder::Name,
                ..RegionQuery::default()
            },
            RegionQuery {
                name_contains: Some("KAR".to_string()),
                limit: Some(1),
                ..RegionQuery::default()
            },
            RegionQuery {
                name_contains: Some("50%".to_string()),
                ..RegionQuery::default()
            },
            RegionQuery {
                ids: vec![30, 2, 404],
                ..RegionQuery::default()
            },
        ];
        for query in &region_queries {
            assert_eq!(
                sql.regions(query).await.unwrap(),
                memory.regions(query).await.unwrap(),
                "{query:?}"
            );
        }

        for id in [30, 404] {
            assert_eq!(
                sql.region_by_id(id).await.unwrap(),
                memory.region_by_id(id).await.unwrap()
            );
        }

        let assessment_queries = [
            AssessmentQuery::default(),
            AssessmentQuery {
                region_ids: vec![1, 11, 12],
                year: Some(2023),
                ..AssessmentQuery::default()
            },
            AssessmentQuery {
                start_year: Some(2023),
                stages: vec![StageOfExtraction::Critical, StageOfExtraction::OverExploited],
                order: AssessmentOrder::ExtractionRatioDesc,
                ..AssessmentQuery::default()
            },
            AssessmentQuery {
                limit: Some(3),
                offset: 2,
                ..AssessmentQuery::default()
            },
            AssessmentQuery {
                offset: 9,
                ..AssessmentQuery::default()
            },
        ];
        for query in &assessment_queries {
            assert_eq!(
                sql.assessments(query).await.unwrap(),
                memory.assessments(query).await.unwrap(),
                "{query:?}"
            );
        }

        let latest_queries = [
            LatestAssessmentQuery::default(),
            LatestAssessmentQuery {
                within_state: Some(1),
                ..LatestAssessmentQuery::default()
            },
            LatestAssessmentQuery {
                region_type: Some(RegionType::District),
                region_ids: vec![12, 20, 30],
                ..LatestAssessmentQuery::default()
            },
        ];
        for query in &latest_queries {
            assert_eq!(
                sql.latest_assessments(query).await.unwrap(),
                memory.latest_assessments(query).await.unwrap(),
                "{query:?}"
            );
        }

        let id_sets: [&[i64]; 3] = [&[3, 11], &[404, 405], &[]];
        for ids in id_sets {
            assert_eq!(
                sql.max_assessment_year(ids).await.unwrap(),
                memory.max_assessment_year(ids).await.unwrap(),
                "{ids:?}"
            );
        }
        assert_eq!(sql.max_assessment_year(&[3, 11]).await.unwrap(), Some(2023));
        assert_eq!(sql.max_assessment_year(&[404, 405]).await.unwrap(), None);

        let historical_queries = [
            HistoricalQuery::default(),
            HistoricalQuery {
                region_ids: vec![1],
                ..HistoricalQuery::default()
            },
            HistoricalQuery {
                region_ids: vec![1],
                parameter_type: Some(ParameterType::Recharge),
                start_year: Some(2023),
                ..HistoricalQuery::default()
            },
            HistoricalQuery {
                limit: Some(2),
                offset: 1,
                ..HistoricalQuery::default()
            },
        ];
        for query in &historical_queries {
            assert_eq!(
                sql.historical_points(query).await.unwrap(),
                memory.historical_points(query).await.unwrap(),
                "{query:?}"
            );
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
