use std::path::PathBuf;

use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    board_guard, optional_i64, plan_json, require_password, required_str,
};
use crate::ipc::types::{AppState, OpenBoard, Request};

fn handle_upload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };

    // Gate first: a wrong password must leave no trace in the store.
    if let Err(resp) = require_password(req, &ob.board.config().upload_password) {
        return resp;
    }

    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let grade = match required_str(req, "grade") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let file_name = match required_str(req, "fileName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let source_path = match required_str(req, "sourcePath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let mime_type = match required_str(req, "mimeType") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let OpenBoard { store, board, .. } = ob;
    match board.upload(store, &subject, &grade, &file_name, &source_path, &mime_type) {
        Ok(plan) => ok(&req.id, json!({ "plan": plan_json(&plan) })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_password(req, &ob.board.config().upload_password) {
        return resp;
    }
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let grade = match required_str(req, "grade") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let OpenBoard { store, board, .. } = ob;
    match board.delete(store, &subject, &grade) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let grade = match required_str(req, "grade") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let plan = ob.board.plan_for(&subject, &grade).map(plan_json);
    ok(&req.id, json!({ "plan": plan }))
}

fn handle_list_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ob = match board_guard(&mut state.board, req) {
        Ok(ob) => ob,
        Err(resp) => return resp,
    };
    let week = optional_i64(req, "week").unwrap_or_else(|| ob.board.current_week());
    let plans: Vec<serde_json::Value> = ob
        .board
        .plans_for_week(week)
        .into_iter()
        .map(plan_json)
        .collect();
    ok(&req.id, json!({ "week": week, "plans": plans }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "plans.upload" => Some(handle_upload(state, req)),
        "plans.delete" => Some(handle_delete(state, req)),
        "plans.get" => Some(handle_get(state, req)),
        "plans.listWeek" => Some(handle_list_week(state, req)),
        _ => None,
    }
}
