use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::helpers::{board_guard, plan_json, required_i64};
use crate::ipc::types::{AppState, Request};

fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    let board = &ob.board;
    let config = board.config();
    let week = board.current_week();
    let dates = ob.week_dates.resolve(week, config.school_year_start);

    let grades: Vec<serde_json::Value> = config
        .grades
        .iter()
        .map(|grade| {
            let cells: Vec<serde_json::Value> = config
                .subjects
                .iter()
                .filter(|s| config.offered(s.name, grade))
                .map(|s| {
                    json!({
                        "subject": s.name,
                        "color": s.color,
                        "plan": board.plan_for(s.name, grade).map(plan_json),
                    })
                })
                .collect();
            json!({ "grade": grade, "cells": cells })
        })
        .collect();

    let progress = board.progress();
    let uploading: Vec<serde_json::Value> = board
        .uploading()
        .iter()
        .map(|(s, g)| json!({ "subject": s, "grade": g }))
        .collect();

    ok(
        &req.id,
        json!({
            "currentWeek": week,
            "totalWeeks": config.total_weeks,
            "weekDates": {
                "start": dates.range.start,
                "end": dates.range.end,
                "overridden": dates.overridden,
            },
            "grades": grades,
            "progress": {
                "uploaded": progress.uploaded,
                "required": progress.required,
                "percent": progress.percent,
            },
            "uploading": uploading,
        }),
    )
}

fn handle_set_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    let week = match required_i64(req, "week") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let current = ob.board.set_week(week);
    ok(&req.id, json!({ "currentWeek": current }))
}

fn handle_previous_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    ok(&req.id, json!({ "currentWeek": ob.board.previous_week() }))
}

fn handle_next_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    ok(&req.id, json!({ "currentWeek": ob.board.next_week() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "board.open" => Some(handle_open(state, req)),
        "board.setWeek" => Some(handle_set_week(state, req)),
        "board.previousWeek" => Some(handle_previous_week(state, req)),
        "board.nextWeek" => Some(handle_next_week(state, req)),
        _ => None,
    }
}
