use serde_json::json;

use crate::ipc::error::err;
use crate::ipc::types::{OpenBoard, Request};
use crate::store::WeeklyPlan;

pub fn board_guard<'a>(
    board: &'a mut Option<OpenBoard>,
    req: &Request,
) -> Result<&'a mut OpenBoard, serde_json::Value> {
    board
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_i64(req: &Request, key: &str) -> Option<i64> {
    req.params.get(key).and_then(|v| v.as_i64())
}

/// The shared-secret gate. A mismatch never reaches the store layer;
/// the frontend clears its input and re-prompts.
pub fn require_password(
    req: &Request,
    expected: &str,
) -> Result<(), serde_json::Value> {
    let supplied = req.params.get("password").and_then(|v| v.as_str());
    if supplied == Some(expected) {
        Ok(())
    } else {
        Err(err(&req.id, "wrong_password", "incorrect password", None))
    }
}

pub fn plan_json(plan: &WeeklyPlan) -> serde_json::Value {
    json!({
        "id": plan.id,
        "subject": plan.subject,
        "grade": plan.grade,
        "weekNumber": plan.week_number,
        "fileName": plan.file_name,
        "fileKind": plan.file_kind.as_str(),
        "fileUrl": plan.file_url,
        "checksum": plan.checksum,
        "uploadDate": plan.upload_date,
        "createdAt": plan.created_at,
        "updatedAt": plan.updated_at
    })
}
