use std::path::PathBuf;

use serde_json::json;

use crate::board::Board;
use crate::config::BoardConfig;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, OpenBoard, Request};
use crate::store::PlanStore;
use crate::weekdates::WeekDates;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };

    let store = match PlanStore::new(conn, &path) {
        Ok(store) => store,
        Err(e) => return err(&req.id, "db_open_failed", e.to_string(), None),
    };
    let config = BoardConfig::load(store.conn());

    let mut board = Board::new(config);

    // Startup fetch. A failure is not fatal: the board opens empty and
    // the frontend shows the warning.
    let (plans_loaded, warning) = match store.fetch_all() {
        Ok(plans) => {
            board.seed(plans);
            (true, None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not load plans at workspace open");
            (false, Some(e.to_string()))
        }
    };
    let week_dates = WeekDates::load(&path);

    state.workspace = Some(path.clone());
    state.board = Some(OpenBoard {
        store,
        board,
        week_dates,
    });

    let mut result = json!({
        "workspacePath": path.to_string_lossy(),
        "plansLoaded": plans_loaded,
    });
    if let Some(w) = warning {
        result["warning"] = json!(w);
    }
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
