use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use thiserror::Error;

use crate::config::BoardConfig;
use crate::store::{NewPlan, PlanStore, StoreError, WeeklyPlan};

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("no such board cell: {subject} / {grade}")]
    UnknownCell { subject: String, grade: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BoardError {
    pub fn code(&self) -> &'static str {
        match self {
            BoardError::UnknownCell { .. } => "bad_params",
            BoardError::Store(e) => e.code(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Progress {
    pub uploaded: i64,
    pub required: i64,
    pub percent: i64,
}

/// In-memory board state: the week cursor, a mirror of the persisted
/// plan collection, and which cells have an upload in flight. The
/// mirror is only ever updated from completed store operations.
pub struct Board {
    config: BoardConfig,
    current_week: i64,
    plans: Vec<WeeklyPlan>,
    uploading: HashSet<(String, String)>,
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            config,
            current_week: 1,
            plans: Vec::new(),
            uploading: HashSet::new(),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn current_week(&self) -> i64 {
        self.current_week
    }

    /// Replace the mirror with the store's contents (startup fetch).
    pub fn seed(&mut self, plans: Vec<WeeklyPlan>) {
        self.plans = plans;
    }

    /// Out-of-range requests are ignored; the UI disables navigation at
    /// the bounds, this is the defensive contract behind it.
    pub fn set_week(&mut self, week: i64) -> i64 {
        if (1..=self.config.total_weeks).contains(&week) {
            self.current_week = week;
        }
        self.current_week
    }

    pub fn previous_week(&mut self) -> i64 {
        self.set_week(self.current_week - 1)
    }

    pub fn next_week(&mut self) -> i64 {
        self.set_week(self.current_week + 1)
    }

    pub fn plan_for(&self, subject: &str, grade: &str) -> Option<&WeeklyPlan> {
        self.plans.iter().find(|p| {
            p.subject == subject && p.grade == grade && p.week_number == self.current_week
        })
    }

    pub fn plans_for_week(&self, week: i64) -> Vec<&WeeklyPlan> {
        self.plans
            .iter()
            .filter(|p| p.week_number == week)
            .collect()
    }

    pub fn plans_for_current_week(&self) -> Vec<&WeeklyPlan> {
        self.plans_for_week(self.current_week)
    }

    pub fn uploading(&self) -> &HashSet<(String, String)> {
        &self.uploading
    }

    pub fn progress(&self) -> Progress {
        let uploaded = self.plans_for_current_week().len() as i64;
        let required = self.config.required_cells();
        let percent = if required > 0 {
            ((uploaded * 100) as f64 / required as f64).round() as i64
        } else {
            0
        };
        Progress {
            uploaded,
            required,
            percent,
        }
    }

    /// Upload-then-upsert for the cell at the current week cursor.
    /// The two store steps are one logical transaction from the
    /// caller's side: if the metadata write fails, the just-written
    /// blob is removed again and a single failure is surfaced. The
    /// mirror is untouched on any failure.
    pub fn upload(
        &mut self,
        store: &PlanStore,
        subject: &str,
        grade: &str,
        file_name: &str,
        source: &Path,
        mime_type: &str,
    ) -> Result<WeeklyPlan, BoardError> {
        if !self.config.offered(subject, grade) {
            return Err(BoardError::UnknownCell {
                subject: subject.to_string(),
                grade: grade.to_string(),
            });
        }

        let cell = (subject.to_string(), grade.to_string());
        self.uploading.insert(cell.clone());
        let result = self.upload_inner(store, subject, grade, file_name, source, mime_type);
        self.uploading.remove(&cell);
        result
    }

    fn upload_inner(
        &mut self,
        store: &PlanStore,
        subject: &str,
        grade: &str,
        file_name: &str,
        source: &Path,
        mime_type: &str,
    ) -> Result<WeeklyPlan, BoardError> {
        let week = self.current_week;
        let blob = store.upload_blob(source, file_name, mime_type, subject, grade, week)?;

        let upserted = store.upsert(&NewPlan {
            subject: subject.to_string(),
            grade: grade.to_string(),
            week_number: week,
            file_name: file_name.to_string(),
            file_kind: blob.kind,
            file_url: blob.location.clone(),
            checksum: Some(blob.checksum),
            upload_date: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        });

        let plan = match upserted {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(
                    subject,
                    grade,
                    week,
                    error = %e,
                    "metadata write failed after blob upload, removing blob"
                );
                store.delete_blob_at(&blob.location);
                return Err(e.into());
            }
        };

        self.plans.retain(|p| {
            !(p.subject == plan.subject
                && p.grade == plan.grade
                && p.week_number == plan.week_number)
        });
        self.plans.push(plan.clone());
        Ok(plan)
    }

    /// Delete the current week's plan for the cell. Absent is a no-op
    /// reported as `Ok(false)`.
    pub fn delete(
        &mut self,
        store: &PlanStore,
        subject: &str,
        grade: &str,
    ) -> Result<bool, BoardError> {
        let Some(id) = self.plan_for(subject, grade).map(|p| p.id.clone()) else {
            return Ok(false);
        };
        store.delete(&id)?;
        self.plans.retain(|p| p.id != id);
        Ok(true)
    }
}
