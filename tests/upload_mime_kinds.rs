use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_planboardd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn planboardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn upload_params(subject: &str, source: &str, file_name: &str, mime: &str) -> serde_json::Value {
    json!({
        "subject": subject,
        "grade": "First Intermediate",
        "fileName": file_name,
        "sourcePath": source,
        "mimeType": mime,
        "password": "teacher2024"
    })
}

#[test]
fn kind_follows_the_declared_mime_type() {
    let workspace = temp_dir("planboard-mime");
    let sources = temp_dir("planboard-mime-src");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let png = sources.join("plan.png");
    std::fs::write(&png, b"\x89PNG fake").expect("write png");
    let image = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "plans.upload",
        upload_params("Science", &png.to_string_lossy(), "plan.png", "image/png"),
    );
    assert_eq!(
        image
            .get("plan")
            .and_then(|p| p.get("fileKind"))
            .and_then(|v| v.as_str()),
        Some("image")
    );

    let pdf = sources.join("plan.pdf");
    std::fs::write(&pdf, b"%PDF-1.4").expect("write pdf");
    let document = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "plans.upload",
        upload_params(
            "Mathematics",
            &pdf.to_string_lossy(),
            "plan.pdf",
            "application/pdf",
        ),
    );
    assert_eq!(
        document
            .get("plan")
            .and_then(|p| p.get("fileKind"))
            .and_then(|v| v.as_str()),
        Some("document")
    );
}

#[test]
fn undeclared_types_are_rejected_before_any_write() {
    let workspace = temp_dir("planboard-mime-reject");
    let sources = temp_dir("planboard-mime-reject-src");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let txt = sources.join("notes.txt");
    std::fs::write(&txt, b"plain notes").expect("write txt");
    let rejected = request(
        &mut stdin,
        &mut reader,
        "2",
        "plans.upload",
        upload_params("Science", &txt.to_string_lossy(), "notes.txt", "text/plain"),
    );
    assert_eq!(rejected.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        rejected
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("upload_failed")
    );

    let blob_count = std::fs::read_dir(workspace.join("plans"))
        .map(|it| it.count())
        .unwrap_or(0);
    assert_eq!(blob_count, 0);
}

#[test]
fn stored_blob_names_are_charset_safe() {
    let workspace = temp_dir("planboard-mime-names");
    let sources = temp_dir("planboard-mime-names-src");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Original names never reach the filesystem, whatever their charset.
    let src = sources.join("الخطة الأسبوعية.pdf");
    std::fs::write(&src, b"%PDF-1.4").expect("write source");
    let uploaded = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "plans.upload",
        upload_params(
            "Islamic Studies",
            &src.to_string_lossy(),
            "الخطة الأسبوعية.pdf",
            "application/pdf",
        ),
    );
    let plan = uploaded.get("plan").expect("plan");

    // Display name stays as uploaded...
    assert_eq!(
        plan.get("fileName").and_then(|v| v.as_str()),
        Some("الخطة الأسبوعية.pdf")
    );

    // ...while the stored file is ASCII, tagged with cell and week.
    let url = plan.get("fileUrl").and_then(|v| v.as_str()).expect("fileUrl");
    let stored = PathBuf::from(url);
    let name = stored.file_name().and_then(|n| n.to_str()).expect("name");
    assert!(name.is_ascii(), "blob name not ascii: {}", name);
    assert!(name.starts_with("plan-"));
    assert!(name.contains("-week1-"));
    assert!(name.ends_with(".pdf"));
    assert!(stored.exists());
}
