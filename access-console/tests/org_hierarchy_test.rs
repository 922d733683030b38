mod common;

use access_console::authz::{
    HierarchyError, Membership, OrgHierarchy, OrgScope, is_descendant_of, visible_scope,
};
use access_console::error::AccessError;
use access_console::models::{Organization, OrganizationDraft, RoleLevel};
use access_console::services::NoticeLevel;
use common::{TestConsole, sample_organizations};
use serde_json::json;

fn fixture() -> Vec<Organization> {
    vec![
        Organization::new("01", "North", None),
        Organization::new("0101", "North A", Some("01")),
        Organization::new("010101", "North A1", Some("0101")),
        Organization::new("010102", "North A2", Some("0101")).disabled(),
        Organization::new("0102", "North B", Some("01")),
        Organization::new("02", "South", None),
        Organization::new("0201", "South A", Some("02")),
        // Legacy row whose code does not follow its parent.
        Organization::new("09", "Legacy", Some("0201")),
    ]
}

fn scopes() -> Vec<OrgScope> {
    vec![
        OrgScope::All,
        visible_scope(RoleLevel::OrgAdmin, "01"),
        visible_scope(RoleLevel::OrgAdmin, "0101").excluding_home(),
        visible_scope(RoleLevel::NormalUser, ""),
    ]
}

#[test]
fn candidate_exclusion_implies_rejection() {
    let orgs = fixture();
    let hierarchy = OrgHierarchy::new(orgs.clone());

    for scope in scopes() {
        for target in &orgs {
            let candidates: Vec<&str> = hierarchy
                .candidate_parents(&scope, Some(&target.code))
                .iter()
                .map(|org| org.code.as_str())
                .collect();

            for parent in &orgs {
                let accepted = hierarchy
                    .check_parent(&scope, Some(&target.code), &parent.code)
                    .is_ok();
                assert_eq!(
                    candidates.contains(&parent.code.as_str()),
                    accepted,
                    "target {} parent {} scope {:?}",
                    target.code,
                    parent.code,
                    scope
                );
            }
        }
    }
}

#[test]
fn candidates_never_include_self_or_descendants() {
    let orgs = fixture();
    let hierarchy = OrgHierarchy::new(orgs.clone());

    for target in &orgs {
        for candidate in hierarchy.candidate_parents(&OrgScope::All, Some(&target.code)) {
            assert_ne!(candidate.code, target.code);
            assert!(!is_descendant_of(&candidate.code, &target.code));
        }
    }

    // "09" hangs under "02" through its parent reference only.
    let codes: Vec<&str> = hierarchy
        .candidate_parents(&OrgScope::All, Some("02"))
        .iter()
        .map(|org| org.code.as_str())
        .collect();
    assert!(!codes.contains(&"09"));
}

#[test]
fn descendant_relation_is_irreflexive_and_antisymmetric() {
    let codes = ["", "0", "01", "0101", "010101", "02", "0201", "1", "10", "101"];

    for a in codes {
        assert!(!is_descendant_of(a, a), "{} is its own descendant", a);
        for b in codes {
            if a != b {
                assert!(
                    !(is_descendant_of(a, b) && is_descendant_of(b, a)),
                    "{} and {} form a cycle",
                    a,
                    b
                );
            }
        }
    }
}

#[test]
fn org_admin_scope_scenario() {
    let hierarchy = OrgHierarchy::new(vec![
        Organization::new("0501", "City A", None),
        Organization::new("050101", "District A1", Some("0501")),
        Organization::new("0502", "City B", None),
    ]);
    let scope = visible_scope(RoleLevel::OrgAdmin, "0501");

    let visible: Vec<&str> = hierarchy
        .visible(&scope)
        .iter()
        .map(|org| org.code.as_str())
        .collect();
    assert!(visible.contains(&"0501"));
    assert!(visible.contains(&"050101"));
    assert!(!visible.contains(&"0502"));
}

#[test]
fn disabled_parents_are_never_offered() {
    let hierarchy = OrgHierarchy::new(fixture());
    let result = hierarchy.check_parent(&OrgScope::All, None, "010102");
    assert_eq!(result, Err(HierarchyError::ParentDisabled("010102".to_string())));
}

#[test]
fn reparenting_under_descendant_fails_validation() {
    let hierarchy = OrgHierarchy::new(fixture());
    let mut draft = OrganizationDraft::from(hierarchy.get("01").unwrap());
    draft.parent_code = Some("0101".to_string());

    let result = hierarchy.validate_draft(&OrgScope::All, &draft, Some("01"));
    assert!(matches!(
        result,
        Err(AccessError::Hierarchy(HierarchyError::DescendantParent { .. }))
    ));
}

#[test]
fn effective_tree_drops_disabled_branches() {
    let forest = OrgHierarchy::new(fixture()).build_tree(Membership::Effective);
    assert!(forest.find("010102").is_none());
    assert!(forest.find("010101").is_some());
    assert_eq!(forest.len(), 7);
}

#[tokio::test]
async fn lookup_failure_degrades_to_cached_scope() {
    let app = TestConsole::spawn_signed_in().await;
    app.mount_profile(2, "0501", &[]).await;
    let context = app.console.bootstrapper.bootstrap().await.unwrap();

    app.mount_organizations(&sample_organizations()).await;
    let listing = app.console.organizations.load(&context.identity).await.unwrap();
    assert!(!listing.is_degraded());
    assert_eq!(listing.visible().len(), 2);

    app.server.reset().await;
    app.mount("GET", "/api/organizations", 502, json!({})).await;

    let listing = app.console.organizations.load(&context.identity).await.unwrap();
    assert!(listing.is_degraded());
    let codes: Vec<&str> = listing.visible().iter().map(|org| org.code.as_str()).collect();
    assert_eq!(codes, vec!["0501", "050101"]);
    assert_eq!(app.notifier.messages(NoticeLevel::Warning).len(), 1);
    assert!(app.notifier.messages(NoticeLevel::Error).is_empty());
}

#[tokio::test]
async fn lookup_failure_without_cache_is_empty() {
    let app = TestConsole::spawn_signed_in().await;
    app.mount_profile(1, "05", &[]).await;
    let context = app.console.bootstrapper.bootstrap().await.unwrap();
    app.mount("GET", "/api/organizations", 502, json!({})).await;

    let choices = app
        .console
        .organizations
        .candidate_parents(&context.identity, None)
        .await
        .unwrap();

    assert!(choices.candidates.is_empty());
    assert!(choices.warning.is_some());
    assert_eq!(
        choices.hint.as_deref(),
        Some(app.console.client.messages().root_org_hint.as_str())
    );
}

#[tokio::test]
async fn invalid_draft_never_reaches_backend() {
    let app = TestConsole::spawn_signed_in().await;
    app.mount_profile(2, "0501", &[]).await;
    let context = app.console.bootstrapper.bootstrap().await.unwrap();
    app.mount_organizations(&sample_organizations()).await;

    let draft = OrganizationDraft::new("050201", "Elsewhere", Some("0502"));
    let result = app.console.organizations.create(&context.identity, &draft).await;
    assert!(matches!(result, Err(AccessError::Hierarchy(_))));

    let posts = app
        .server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.to_string() == "POST")
        .count();
    assert_eq!(posts, 0);
}

#[tokio::test]
async fn valid_draft_is_created() {
    let app = TestConsole::spawn_signed_in().await;
    app.mount_profile(2, "0501", &[]).await;
    let context = app.console.bootstrapper.bootstrap().await.unwrap();
    app.mount_organizations(&sample_organizations()).await;

    let created = Organization::new("050102", "District A2", Some("0501"));
    app.mount(
        "POST",
        "/api/organizations",
        200,
        json!({ "code": 200, "data": created }),
    )
    .await;

    let draft = OrganizationDraft::new("050102", "District A2", Some("0501"));
    let org = app
        .console
        .organizations
        .create(&context.identity, &draft)
        .await
        .unwrap();
    assert_eq!(org.code, "050102");
}

#[tokio::test]
async fn delete_with_children_is_refused() {
    let app = TestConsole::spawn_signed_in().await;
    app.mount_profile(1, "05", &[]).await;
    let context = app.console.bootstrapper.bootstrap().await.unwrap();
    app.mount_organizations(&sample_organizations()).await;

    let result = app.console.organizations.delete(&context.identity, "0501").await;
    assert!(matches!(
        result,
        Err(AccessError::Hierarchy(HierarchyError::HasChildren { .. }))
    ));
}

async fn delete_paths(app: &TestConsole) -> Vec<String> {
    app.server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.to_string() == "DELETE")
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn org_admin_updates_own_home() {
    let app = TestConsole::spawn_signed_in().await;
    app.mount_profile(2, "0501", &[]).await;
    let context = app.console.bootstrapper.bootstrap().await.unwrap();
    app.mount_organizations(&sample_organizations()).await;

    let renamed = Organization::new("0501", "City A (renamed)", Some("05"));
    app.mount(
        "PUT",
        "/api/organizations/0501",
        200,
        json!({ "code": 200, "data": renamed }),
    )
    .await;

    let mut draft = OrganizationDraft::new("0501", "City A (renamed)", Some("05"));
    let org = app
        .console
        .organizations
        .update(&context.identity, "0501", &draft)
        .await
        .unwrap();
    assert_eq!(org.name, "City A (renamed)");

    draft.parent_code = Some("0502".to_string());
    let result = app
        .console
        .organizations
        .update(&context.identity, "0501", &draft)
        .await;
    assert!(matches!(
        result,
        Err(AccessError::Hierarchy(HierarchyError::ParentOutOfScope(_)))
    ));
}

#[tokio::test]
async fn renumbering_a_parent_never_reaches_backend() {
    let app = TestConsole::spawn_signed_in().await;
    app.mount_profile(1, "05", &[]).await;
    let context = app.console.bootstrapper.bootstrap().await.unwrap();
    app.mount_organizations(&sample_organizations()).await;

    let draft = OrganizationDraft::new("0503", "City A", Some("05"));
    let result = app
        .console
        .organizations
        .update(&context.identity, "0501", &draft)
        .await;
    assert!(matches!(
        result,
        Err(AccessError::Hierarchy(HierarchyError::RecodeWithChildren { .. }))
    ));

    let puts = app
        .server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.to_string() == "PUT")
        .count();
    assert_eq!(puts, 0);
}

#[tokio::test]
async fn cascade_deletes_deepest_first() {
    let app = TestConsole::spawn_signed_in().await;
    app.mount_profile(1, "05", &[]).await;
    let context = app.console.bootstrapper.bootstrap().await.unwrap();
    app.mount_organizations(&sample_organizations()).await;
    for org in sample_organizations() {
        app.mount(
            "DELETE",
            &format!("/api/organizations/{}", org.code),
            200,
            json!({ "code": 200, "data": null }),
        )
        .await;
    }

    let deleted = app
        .console
        .organizations
        .delete_cascade(&context.identity, "05")
        .await
        .unwrap();

    assert_eq!(deleted, 4);
    assert_eq!(
        delete_paths(&app).await,
        vec![
            "/api/organizations/050101",
            "/api/organizations/0501",
            "/api/organizations/0502",
            "/api/organizations/05",
        ]
    );
}

#[tokio::test]
async fn cascade_stops_at_first_rejection() {
    let app = TestConsole::spawn_signed_in().await;
    app.mount_profile(1, "05", &[]).await;
    let context = app.console.bootstrapper.bootstrap().await.unwrap();
    app.mount_organizations(&sample_organizations()).await;
    app.mount(
        "DELETE",
        "/api/organizations/050101",
        200,
        json!({ "code": 200, "data": null }),
    )
    .await;
    app.mount(
        "DELETE",
        "/api/organizations/0501",
        409,
        json!({ "code": 409, "message": "organization still has users" }),
    )
    .await;

    let result = app
        .console
        .organizations
        .delete_cascade(&context.identity, "05")
        .await;

    assert!(matches!(result, Err(AccessError::Business { .. })));
    assert_eq!(
        delete_paths(&app).await,
        vec!["/api/organizations/050101", "/api/organizations/0501"]
    );
    assert_eq!(
        app.notifier.messages(NoticeLevel::Error),
        vec!["organization still has users".to_string()]
    );
}
