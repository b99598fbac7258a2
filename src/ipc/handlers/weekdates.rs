use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{board_guard, optional_i64, require_password, required_i64, required_str};
use crate::ipc::types::{AppState, OpenBoard, Request};
use crate::weekdates::Resolved;

fn resolved_json(week: i64, resolved: &Resolved) -> serde_json::Value {
    json!({
        "week": week,
        "start": resolved.range.start,
        "end": resolved.range.end,
        "overridden": resolved.overridden,
    })
}

fn week_in_bounds(ob: &OpenBoard, req: &Request, week: i64) -> Option<serde_json::Value> {
    let total = ob.board.config().total_weeks;
    if (1..=total).contains(&week) {
        None
    } else {
        Some(err(
            &req.id,
            "bad_params",
            format!("week must be in 1..={}", total),
            None,
        ))
    }
}

fn handle_resolve(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    let week = optional_i64(req, "week").unwrap_or_else(|| ob.board.current_week());
    if let Some(resp) = week_in_bounds(ob, req, week) {
        return resp;
    }
    let resolved = ob
        .week_dates
        .resolve(week, ob.board.config().school_year_start);
    ok(&req.id, resolved_json(week, &resolved))
}

fn handle_set_override(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_password(req, &ob.board.config().date_edit_password) {
        return resp;
    }
    let week = match required_i64(req, "week") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(resp) = week_in_bounds(ob, req, week) {
        return resp;
    }
    let start = match required_str(req, "start") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let end = match required_str(req, "end") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match ob.week_dates.set_override(week, &start, &end) {
        Ok(range) => ok(
            &req.id,
            json!({ "week": week, "start": range.start, "end": range.end, "overridden": true }),
        ),
        Err(e) => err(&req.id, "write_failed", e.to_string(), None),
    }
}

fn handle_reset_override(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_password(req, &ob.board.config().date_edit_password) {
        return resp;
    }
    let week = match required_i64(req, "week") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(resp) = week_in_bounds(ob, req, week) {
        return resp;
    }

    if let Err(e) = ob.week_dates.reset_override(week) {
        return err(&req.id, "write_failed", e.to_string(), None);
    }
    let resolved = ob
        .week_dates
        .resolve(week, ob.board.config().school_year_start);
    ok(&req.id, resolved_json(week, &resolved))
}

fn handle_set_to_today(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_password(req, &ob.board.config().date_edit_password) {
        return resp;
    }
    let week = match required_i64(req, "week") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(resp) = week_in_bounds(ob, req, week) {
        return resp;
    }

    match ob.week_dates.set_to_today(week) {
        Ok(range) => ok(
            &req.id,
            json!({ "week": week, "start": range.start, "end": range.end, "overridden": true }),
        ),
        Err(e) => err(&req.id, "write_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "weekDates.resolve" => Some(handle_resolve(state, req)),
        "weekDates.setOverride" => Some(handle_set_override(state, req)),
        "weekDates.resetOverride" => Some(handle_reset_override(state, req)),
        "weekDates.setToToday" => Some(handle_set_to_today(state, req)),
        _ => None,
    }
}
