//! `#[derive(GuardedRouter)]` end to end.

use serde::Serialize;
use tollgate::{
    AccessResult, BasicEvaluator, ConfigError, Evaluators, Facet, GuardReport, GuardedRouter, Json,
    MemoryGrantStore, ReportConfig, RequestContext, State,
};

pub struct AppState {
    pub prefix: String,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: u64,
    pub name: String,
}

#[allow(dead_code)]
#[derive(GuardedRouter)]
#[tollgate(state = AppState)]
enum UserAction {
    #[tollgate(handler = handlers::list)]
    List,

    #[tollgate(handler = handlers::show, authorities = ["USER_READ"])]
    Show(u64),

    #[tollgate(handler = handlers::rename, roles = ["ADMIN", "OWNER"], any_of)]
    Rename(u64, String),

    #[tollgate(handler = handlers::purge, roles = ["ADMIN", "AUDITOR"])]
    Purge,
}

mod handlers {
    use super::*;

    pub fn list(state: State<AppState>, _ctx: &mut RequestContext) -> AccessResult<String> {
        Ok(format!("{}: all users", state.get().prefix))
    }

    pub fn show(
        _state: State<AppState>,
        _ctx: &mut RequestContext,
        id: u64,
    ) -> AccessResult<Json<UserView>> {
        Ok(Json(UserView {
            id,
            name: "alice".to_string(),
        }))
    }

    pub fn rename(
        _state: State<AppState>,
        ctx: &mut RequestContext,
        id: u64,
        name: String,
    ) -> AccessResult<String> {
        Ok(format!(
            "{} renamed {} to {}",
            ctx.user_id().unwrap_or("-"),
            id,
            name
        ))
    }

    pub fn purge(_state: State<AppState>, _ctx: &mut RequestContext) {}
}

fn evaluators() -> Evaluators {
    let roles = MemoryGrantStore::with_grants([
        ("admin", vec!["ADMIN"]),
        ("owner", vec!["OWNER"]),
        ("auditor", vec!["AUDITOR"]),
        ("root", vec!["ADMIN", "AUDITOR"]),
    ]);
    let authorities = MemoryGrantStore::with_grants([("admin", vec!["USER_READ"])]);
    Evaluators::new()
        .role(BasicEvaluator::role(roles))
        .authority(BasicEvaluator::authority(authorities))
}

fn state() -> State<AppState> {
    State::new(AppState {
        prefix: "users".to_string(),
    })
}

fn run(action: UserAction, user: Option<&str>) -> tollgate::Response {
    let mut ctx = RequestContext::new();
    if let Some(user) = user {
        ctx = ctx.with_user_id(user);
    }
    action.execute(state(), &mut ctx, &evaluators())
}

#[test]
fn test_unguarded_route_runs_for_anyone() {
    let response = run(UserAction::List, None);
    assert_eq!(response.status, 200);
    assert_eq!(response.output.to_string(), "users: all users");
}

#[test]
fn test_authority_guard() {
    let response = run(UserAction::Show(7), Some("admin"));
    assert_eq!(response.status, 200);
    assert_eq!(response.output.to_string(), r#"{"id":7,"name":"alice"}"#);

    let response = run(UserAction::Show(7), Some("owner"));
    assert_eq!(response.status, 403);
    assert_eq!(response.output.to_string(), "Forbidden");
}

#[test]
fn test_any_of_guard() {
    for user in ["admin", "owner"] {
        let response = run(UserAction::Rename(7, "bob".to_string()), Some(user));
        assert_eq!(response.status, 200, "user {user}");
    }
    let response = run(UserAction::Rename(7, "bob".to_string()), Some("owner"));
    assert_eq!(response.output.to_string(), "owner renamed 7 to bob");

    assert_eq!(run(UserAction::Rename(7, "x".into()), Some("auditor")).status, 403);
}

#[test]
fn test_all_of_guard() {
    assert_eq!(run(UserAction::Purge, Some("root")).status, 200);
    assert_eq!(run(UserAction::Purge, Some("admin")).status, 403);
    assert_eq!(run(UserAction::Purge, None).status, 403);
}

#[test]
fn test_missing_evaluator_is_internal_error() {
    let evaluators = Evaluators::new().role(BasicEvaluator::role(MemoryGrantStore::new()));
    assert!(matches!(
        evaluators.validate(UserAction::required_facets()),
        Err(ConfigError::MissingEvaluator {
            facet: Facet::Authority
        })
    ));

    let mut ctx = RequestContext::new().with_user_id("admin");
    let response = UserAction::Show(1).execute(state(), &mut ctx, &evaluators);
    assert_eq!(response.status, 500);
}

#[test]
fn test_guard_config_per_variant() {
    assert!(UserAction::List.guard_config().is_none());

    let config = UserAction::Rename(1, String::new()).guard_config().unwrap();
    assert_eq!(config.facet, Facet::Role);
    assert_eq!(config.tokens, vec!["ADMIN", "OWNER"]);
    assert!(config.any_of);

    assert_eq!(
        UserAction::required_facets(),
        vec![Facet::Authority, Facet::Role]
    );
}

#[test]
fn test_registrations_feed_report() {
    let registrations = UserAction::guard_registrations();
    assert_eq!(registrations.len(), 4);
    assert_eq!(registrations[0].type_name, "router::UserAction");
    assert_eq!(registrations[2].signature, "rename(u64, String)");

    let mut report = GuardReport::new(Facet::Role, ReportConfig::default()).unwrap();
    report.register_all(registrations);

    assert_eq!(
        report.rows(),
        vec![
            "router::UserAction\tlist()\t\t",
            "router::UserAction\tpurge()\tADMIN\tfalse",
            "router::UserAction\tpurge()\tAUDITOR\tfalse",
            "router::UserAction\trename(u64, String)\tADMIN\ttrue",
            "router::UserAction\trename(u64, String)\tOWNER\ttrue",
            "router::UserAction\tshow(u64)\t\t",
        ]
    );
}
