//! A full request chain: availability, permission check, role guard, handler.

use std::io::Write;
use std::sync::Arc;

use tollgate::{
    AccessConfig, AccessError, BasicEvaluator, FileGrantStore, Guard, GuardConfig,
    IntoResponse, MemoryGrantStore, Pipeline, RequestContext, ResolverPermissionFactory,
};

const CONFIG: &str = r#"{
    "permission_check": { "ignore_request_ids": ["LOGIN"] },
    "availability": { "closed_request_ids": ["R90001"] }
}"#;

fn grant_file(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

struct Fixture {
    pipeline: Pipeline<String, String, AccessError>,
    _grants: tempfile::NamedTempFile,
}

fn fixture() -> Fixture {
    let config = AccessConfig::from_json_str(CONFIG).unwrap();
    let grants = grant_file(
        r#"{"version":1,"users":{
            "alice":["R10001","R10002","R90001"],
            "bob":["R10001"]
        }}"#,
    );
    let request_ids = FileGrantStore::new(grants.path()).unwrap();

    let roles = MemoryGrantStore::with_grants([("alice", vec!["ADMIN"]), ("bob", vec!["STAFF"])]);
    let admin_only = Guard::new(
        GuardConfig::roles(["ADMIN"]),
        Arc::new(BasicEvaluator::role(roles)),
    )
    .unwrap();

    let pipeline = Pipeline::new(|body: String, ctx: &mut RequestContext| {
        let permitted = ctx.permission().map_or(0, |p| {
            p.request_ids().map_or(0, |ids| ids.len())
        });
        Ok::<_, AccessError>(format!("{} ({} request ids)", body, permitted))
    })
    .stage(config.availability_stage().unwrap())
    .stage(
        config
            .permission_check_stage(ResolverPermissionFactory::new(request_ids))
            .unwrap(),
    )
    .stage(admin_only);

    Fixture {
        pipeline,
        _grants: grants,
    }
}

fn request(fixture: &Fixture, user: &str, request_id: &str) -> Result<String, AccessError> {
    let mut ctx = RequestContext::new()
        .with_user_id(user)
        .with_request_id(request_id);
    fixture.pipeline.handle("ok".to_string(), &mut ctx)
}

#[test]
fn test_all_stages_pass() {
    let fixture = fixture();
    assert_eq!(request(&fixture, "alice", "R10002").unwrap(), "ok (3 request ids)");
}

#[test]
fn test_permission_denied_before_guard() {
    let fixture = fixture();
    let err = request(&fixture, "bob", "R10002").unwrap_err();
    assert_eq!(
        err.to_string(),
        "permission denied. userId = [bob], requestId = [R10002]"
    );
    assert_eq!(err.status_code(), 403);
}

#[test]
fn test_guard_denied_after_permission() {
    let fixture = fixture();
    let err = request(&fixture, "bob", "R10001").unwrap_err();
    assert_eq!(err.to_string(), "User has no role. userId=[bob], roles=[ADMIN]");
}

#[test]
fn test_closed_request_id_wins() {
    let fixture = fixture();
    let err = request(&fixture, "alice", "R90001").unwrap_err();
    assert!(matches!(err, AccessError::ServiceUnavailable { .. }));

    let response = Err::<String, _>(err).into_response();
    assert_eq!(response.status, 503);
    assert_eq!(response.output.to_string(), "Service Unavailable");
}

#[test]
fn test_ignored_request_id_skips_permission() {
    let fixture = fixture();
    // No permission record is published for ignored ids
    assert_eq!(request(&fixture, "alice", "LOGIN").unwrap(), "ok (0 request ids)");
}

#[test]
fn test_context_cleared_between_requests() {
    let fixture = fixture();
    let mut ctx = RequestContext::new()
        .with_user_id("alice")
        .with_request_id("R10001");
    fixture.pipeline.handle("first".to_string(), &mut ctx).unwrap();
    assert!(ctx.permission().is_some());

    ctx.clear();
    assert!(ctx.permission().is_none());
    assert!(ctx.user_id().is_none());
}
