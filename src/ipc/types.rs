use std::path::PathBuf;

use serde::Deserialize;

use crate::board::Board;
use crate::store::PlanStore;
use crate::weekdates::WeekDates;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything that exists once a workspace has been selected.
pub struct OpenBoard {
    pub store: PlanStore,
    pub board: Board,
    pub week_dates: WeekDates,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub board: Option<OpenBoard>,
}
