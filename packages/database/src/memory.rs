//! In-memory implementation of [`GroundwaterStore`].
//!
//! Applies the same filters and orderings as [`crate::queries::SqlStore`]
//! over plain vectors. Used by tests across the workspace and for running
//! the server against a fixed dataset.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ingres_database_models::{
    AssessmentOrder, AssessmentQuery, HistoricalQuery, LatestAssessmentQuery, RegionOrder,
    RegionQuery,
};
use ingres_groundwater_models::{Assessment, HistoricalPoint, Region};

use crate::{DbError, GroundwaterStore};

/// A [`GroundwaterStore`] holding its records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    regions: Vec<Region>,
    assessments: Vec<Assessment>,
    historical: Vec<HistoricalPoint>,
}

impl MemoryStore {
    /// Creates a store from the given records. Insertion order is
    /// irrelevant; every read applies its own ordering.
    #[must_use]
    pub const fn new(
        regions: Vec<Region>,
        assessments: Vec<Assessment>,
        historical: Vec<HistoricalPoint>,
    ) -> Self {
        Self {
            regions,
            assessments,
            historical,
        }
    }

    /// Adds a region.
    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.regions.push(region);
        self
    }

    /// Adds an assessment.
    #[must_use]
    pub fn with_assessment(mut self, assessment: Assessment) -> Self {
        self.assessments.push(assessment);
        self
    }

    /// Adds a historical point.
    #[must_use]
    pub fn with_historical(mut self, point: HistoricalPoint) -> Self {
        self.historical.push(point);
        self
    }

    fn region(&self, id: i64) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }
}

fn paginate<T>(rows: Vec<T>, limit: Option<u32>, offset: u32) -> Vec<T> {
    let rows = rows.into_iter().skip(offset as usize);
    match limit {
        Some(limit) => rows.take(limit as usize).collect(),
        None => rows.collect(),
    }
}

fn id_filter(ids: &[i64], id: i64) -> bool {
    ids.is_empty() || ids.contains(&id)
}

fn in_range(value: i32, start: Option<i32>, end: Option<i32>) -> bool {
    start.is_none_or(|s| value >= s) && end.is_none_or(|e| value <= e)
}

#[async_trait::async_trait]
impl GroundwaterStore for MemoryStore {
    async fn regions(&self, query: &RegionQuery) -> Result<Vec<Region>, DbError> {
        let needle = query.name_contains.as_deref().map(str::to_lowercase);

        let mut rows: Vec<Region> = self
            .regions
            .iter()
            .filter(|r| id_filter(&query.ids, r.id))
            .filter(|r| query.region_type.is_none_or(|t| r.region_type == t))
            .filter(|r| {
                needle
                    .as_deref()
                    .is_none_or(|n| r.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();

        match query.order {
            RegionOrder::Id => rows.sort_by_key(|r| r.id),
            RegionOrder::Name => rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id))),
        }

        Ok(paginate(rows, query.limit, 0))
    }

    async fn assessments(&self, query: &AssessmentQuery) -> Result<Vec<Assessment>, DbError> {
        let mut rows: Vec<Assessment> = self
            .assessments
            .iter()
            .filter(|a| id_filter(&query.region_ids, a.region_id))
            .filter(|a| query.year.is_none_or(|y| a.assessment_year == y))
            .filter(|a| in_range(a.assessment_year, query.start_year, query.end_year))
            .filter(|a| query.stages.is_empty() || query.stages.contains(&a.stage_of_extraction))
            .cloned()
            .collect();

        match query.order {
            AssessmentOrder::YearDesc => rows.sort_by(|a, b| {
                b.assessment_year
                    .cmp(&a.assessment_year)
                    .then(a.id.cmp(&b.id))
            }),
            AssessmentOrder::ExtractionRatioDesc => rows.sort_by(|a, b| {
                b.extraction_ratio
                    .partial_cmp(&a.extraction_ratio)
                    .unwrap_or(Ordering::Equal)
                    .then(a.id.cmp(&b.id))
            }),
        }

        Ok(paginate(rows, query.limit, query.offset))
    }

    async fn latest_assessments(
        &self,
        query: &LatestAssessmentQuery,
    ) -> Result<Vec<Assessment>, DbError> {
        let mut max_years: BTreeMap<i64, i32> = BTreeMap::new();
        for a in &self.assessments {
            let entry = max_years.entry(a.region_id).or_insert(a.assessment_year);
            *entry = (*entry).max(a.assessment_year);
        }

        let mut rows: Vec<Assessment> = self
            .assessments
            .iter()
            .filter(|a| max_years.get(&a.region_id) == Some(&a.assessment_year))
            .filter(|a| id_filter(&query.region_ids, a.region_id))
            .filter(|a| {
                // Inner join semantics: rows whose region is missing drop out.
                self.region(a.region_id).is_some_and(|r| {
                    query.region_type.is_none_or(|t| r.region_type == t)
                        && query
                            .within_state
                            .is_none_or(|s| r.id == s || r.parent_id == Some(s))
                })
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| a.region_id.cmp(&b.region_id).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn max_assessment_year(&self, region_ids: &[i64]) -> Result<Option<i32>, DbError> {
        Ok(self
            .assessments
            .iter()
            .filter(|a| id_filter(region_ids, a.region_id))
            .map(|a| a.assessment_year)
            .max())
    }

    async fn historical_points(
        &self,
        query: &HistoricalQuery,
    ) -> Result<Vec<HistoricalPoint>, DbError> {
        let mut rows: Vec<HistoricalPoint> = self
            .historical
            .iter()
            .filter(|p| id_filter(&query.region_ids, p.region_id))
            .filter(|p| in_range(p.year, query.start_year, query.end_year))
            .filter(|p| query.parameter_type.is_none_or(|t| p.parameter_type == t))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then_with(|| match (a.month, b.month) {
                    (Some(x), Some(y)) => y.cmp(&x),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                })
                .then(a.id.cmp(&b.id))
        });

        Ok(paginate(rows, query.limit, query.offset))
    }
}

/// A small, realistic dataset shared by tests across the workspace.
pub mod fixtures {
    use ingres_groundwater_models::{
        Assessment, HistoricalPoint, ParameterType, Region, RegionType, StageOfExtraction, Trend,
    };

    use super::MemoryStore;

    /// Builds a region record.
    #[must_use]
    pub fn region(id: i64, name: &str, region_type: RegionType, parent_id: Option<i64>) -> Region {
        Region {
            id,
            name: name.to_string(),
            region_type,
            parent_id,
            code: format!("R{id:03}"),
            latitude: None,
            longitude: None,
        }
    }

    /// Builds an assessment record with volumes consistent with `ratio`.
    #[must_use]
    pub fn assessment(
        id: i64,
        region_id: i64,
        year: i32,
        stage: StageOfExtraction,
        ratio: f64,
    ) -> Assessment {
        Assessment {
            id,
            region_id,
            assessment_year: year,
            annual_recharge: 1200.0,
            extractable_resources: 1000.0,
            total_extraction: ratio * 10.0,
            stage_of_extraction: stage,
            extraction_ratio: ratio,
            trend: Trend::Stable,
            assessment_date: format!("{year}-03-31"),
            data_source: "CGWB".to_string(),
        }
    }

    /// Builds a historical point record.
    #[must_use]
    pub fn point(
        id: i64,
        region_id: i64,
        year: i32,
        month: Option<u8>,
        parameter_type: ParameterType,
        value: f64,
    ) -> HistoricalPoint {
        HistoricalPoint {
            id,
            region_id,
            year,
            month,
            parameter_type,
            value,
            unit: match parameter_type {
                ParameterType::WaterLevel => "meters",
                ParameterType::Quality => "mg/L",
                ParameterType::Recharge | ParameterType::Extraction => "MCM",
            }
            .to_string(),
        }
    }

    /// Three states with a handful of districts and five years of data.
    ///
    /// - 1 Karnataka (state): Safe 65% in 2022, Semi-Critical 78% in 2023.
    /// - 2 Punjab (state): Over-Exploited 165% in 2023.
    /// - 3 Rajasthan (state): Critical 95% in 2022 only.
    /// - 10 Bangalore Urban (district of 1): Over-Exploited 120% in 2023.
    /// - 11 Kolar (district of 1): Critical 98% in 2022, Semi-Critical 85%
    ///   in 2023.
    /// - 12 Mysuru (district of 1): two Critical 2023 rows (ids 21 and 20).
    /// - 20 Ludhiana (district of 2): Critical 99% in 2023.
    /// - 30 Jaipur (district of 99, a missing parent): Critical 101% in 2023.
    #[must_use]
    pub fn sample() -> MemoryStore {
        use RegionType::{District, State};
        use StageOfExtraction::{Critical, OverExploited, Safe, SemiCritical};

        MemoryStore::default()
            .with_region(region(1, "Karnataka", State, None))
            .with_region(region(2, "Punjab", State, None))
            .with_region(region(3, "Rajasthan", State, None))
            .with_region(region(10, "Bangalore Urban", District, Some(1)))
            .with_region(region(11, "Kolar", District, Some(1)))
            .with_region(region(12, "Mysuru", District, Some(1)))
            .with_region(region(20, "Ludhiana", District, Some(2)))
            .with_region(region(30, "Jaipur", District, Some(99)))
            .with_assessment(assessment(1, 1, 2022, Safe, 65.0))
            .with_assessment(assessment(2, 1, 2023, SemiCritical, 78.0))
            .with_assessment(assessment(3, 2, 2023, OverExploited, 165.0))
            .with_assessment(assessment(4, 3, 2022, Critical, 95.0))
            .with_assessment(assessment(5, 10, 2023, OverExploited, 120.0))
            .with_assessment(assessment(6, 11, 2022, Critical, 98.0))
            .with_assessment(assessment(7, 11, 2023, SemiCritical, 85.0))
            .with_assessment(assessment(21, 12, 2023, Critical, 92.0))
            .with_assessment(assessment(20, 12, 2023, Critical, 91.0))
            .with_assessment(assessment(8, 20, 2023, Critical, 99.0))
            .with_assessment(assessment(9, 30, 2023, Critical, 101.0))
            .with_historical(point(1, 1, 2022, Some(6), ParameterType::Recharge, 40.0))
            .with_historical(point(2, 1, 2023, Some(1), ParameterType::Recharge, 12.0))
            .with_historical(point(3, 1, 2023, Some(7), ParameterType::Recharge, 55.0))
            .with_historical(point(4, 1, 2023, None, ParameterType::Quality, 480.0))
            .with_historical(point(5, 1, 2021, Some(3), ParameterType::WaterLevel, 8.5))
            .with_historical(point(6, 1, 2023, Some(7), ParameterType::WaterLevel, 6.1))
            .with_historical(point(7, 2, 2023, Some(5), ParameterType::Extraction, 300.0))
    }
}
