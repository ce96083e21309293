//! End-to-end reconciliation scenarios against scripted collaborators

use grantdesk_core::{Activation, Banner, Collaborators, Location, MemoryLocation, Stage, Workspace, WorkspaceConfig};
use grantdesk_generation::{Analysis, GenerationError};
use grantdesk_model::{ApplicationStatus, GrantId, ManualClock, Project, ProjectId, ProjectPatch, PLACEHOLDER_LINK};
use grantdesk_remote::RemoteError;
use grantdesk_store::{FileStorage, LocalCache};
use grantdesk_test_utils::{
    awarded_grant, eventually, sample_analysis, sample_discovery, sample_project, within, ScriptedGenerator,
    ScriptedRemote, TestWorkspace, TEST_NOW,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn generating() -> ScriptedGenerator {
    ScriptedGenerator::new(sample_analysis(), sample_discovery(2))
}

#[tokio::test]
async fn empty_first_run_has_no_selection() {
    let harness = TestWorkspace::builder().build();

    let active = harness.workspace.startup().await;

    assert_eq!(active, None);
    let snapshot = harness.workspace.snapshot();
    assert!(snapshot.projects.is_empty());
    assert_eq!(snapshot.activation, Activation::None);
    assert_eq!(snapshot.banner, None);
    assert_eq!(snapshot.stage, Stage::Idle);
    assert_eq!(harness.location.replacements(), 0);
    assert_eq!(harness.remote.fetch_count(), 0);
    assert_eq!(harness.workspace.totals().potential, 0.0);
}

#[tokio::test]
async fn last_active_project_is_restored_without_remote_lookup() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin"), sample_project("boise-x9y8z", "Boise")])
        .last_active("boise-x9y8z")
        .build();

    let active = harness.workspace.startup().await;

    assert_eq!(active, Some(ProjectId::from("boise-x9y8z")));
    assert_eq!(harness.remote.fetch_count(), 0);
    assert_eq!(harness.location.fragment().as_deref(), Some("id=boise-x9y8z"));
}

#[tokio::test]
async fn stale_last_active_pointer_is_ignored() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin")])
        .last_active("deleted-00000")
        .build();

    assert_eq!(harness.workspace.startup().await, None);
    assert_eq!(harness.workspace.banner(), None);
}

#[tokio::test]
async fn local_only_link_keeps_local_copy_and_warns() {
    let local = sample_project("austin-ab12c", "Austin");
    let harness = TestWorkspace::builder()
        .cached(vec![local.clone()])
        .fragment("#id=austin-ab12c")
        .build();

    let active = harness.workspace.startup().await;

    assert_eq!(active, Some(local.id.clone()));
    assert_eq!(harness.workspace.active_project(), Some(local));
    assert_eq!(
        harness.workspace.banner(),
        Some(Banner::OrphanedWorkspace {
            id: ProjectId::from("austin-ab12c")
        })
    );
    assert!(harness.workspace.connectivity().reachable);
    // fragment already addressed the project
    assert_eq!(harness.location.replacements(), 0);
}

#[tokio::test]
async fn link_missing_everywhere_reports_not_found() {
    let harness = TestWorkspace::builder().fragment("id=ghost-00000").build();

    assert_eq!(harness.workspace.startup().await, None);
    assert_eq!(
        harness.workspace.banner(),
        Some(Banner::WorkspaceNotFound {
            id: ProjectId::from("ghost-00000")
        })
    );
}

#[tokio::test]
async fn remote_copy_replaces_local_wholesale() {
    let local = sample_project("austin-ab12c", "Austin");
    let mut remote_copy = Project::new("austin-ab12c", "Austin, TX")
        .with_budget(400_000.0)
        .with_grants(vec![awarded_grant("grant-9-1700000000000", 90_000.0, Some(60_000.0))]);
    remote_copy.last_updated = TEST_NOW - 1;

    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("boise-x9y8z", "Boise"), local])
        .fragment("id=austin-ab12c")
        .remote(ScriptedRemote::new().with_document(remote_copy.clone()))
        .build();

    harness.workspace.startup().await;

    let snapshot = harness.workspace.snapshot();
    assert_eq!(snapshot.projects.len(), 2);
    assert_eq!(snapshot.projects[0], remote_copy);
    assert_eq!(snapshot.activation, Activation::Confirmed(remote_copy.id.clone()));
    assert_eq!(snapshot.banner, None);
    assert_eq!(harness.persisted_projects()[0], remote_copy);
    assert_eq!(harness.workspace.totals().secured_from_grants, 60_000.0);
}

#[tokio::test]
async fn remote_only_link_is_adopted() {
    let remote_copy = sample_project("denver-q1w2e", "Denver");
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin")])
        .fragment("id=denver-q1w2e")
        .remote(ScriptedRemote::new().with_document(remote_copy.clone()))
        .build();

    assert_eq!(harness.workspace.startup().await, Some(remote_copy.id.clone()));
    let ids: Vec<String> = harness.persisted_projects().iter().map(|p| p.id.to_string()).collect();
    assert_eq!(ids, vec!["denver-q1w2e", "austin-ab12c"]);
    assert_eq!(harness.persisted_active_id().as_deref(), Some("denver-q1w2e"));
}

#[tokio::test]
async fn linked_local_copy_is_visible_before_remote_answers() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin")])
        .fragment("id=austin-ab12c")
        .remote(ScriptedRemote::new().with_document(sample_project("austin-ab12c", "Austin, TX")))
        .build();
    let gate = harness.remote.gate_fetches();

    let startup = tokio::spawn({
        let workspace = harness.workspace.clone();
        async move { workspace.startup().await }
    });
    eventually(|| harness.remote.fetch_count() == 1).await;

    let snapshot = harness.workspace.snapshot();
    assert_eq!(snapshot.activation, Activation::Tentative(ProjectId::from("austin-ab12c")));
    assert_eq!(snapshot.active().map(|p| p.city_name.as_str()), Some("Austin"));
    assert_eq!(snapshot.stage, Stage::LocatingWorkspace);

    gate.notify_one();
    within(startup).await.unwrap();

    let snapshot = harness.workspace.snapshot();
    assert_eq!(snapshot.activation, Activation::Confirmed(ProjectId::from("austin-ab12c")));
    assert_eq!(snapshot.active().map(|p| p.city_name.as_str()), Some("Austin, TX"));
    assert_eq!(snapshot.stage, Stage::Idle);
}

#[tokio::test]
async fn denied_lookup_flags_connectivity_without_banner() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin")])
        .fragment("id=austin-ab12c")
        .build();
    harness.remote.fail_fetches(RemoteError::Denied("missing or insufficient permissions".into()));
    harness.remote.fail_probes(RemoteError::Denied("missing or insufficient permissions".into()));

    harness.workspace.startup().await;

    assert_eq!(harness.workspace.active_id(), Some(ProjectId::from("austin-ab12c")));
    assert_eq!(harness.workspace.banner(), None);
    let status = harness.workspace.connectivity();
    assert!(status.permission_denied);
    assert!(!status.reachable);

    harness.remote.heal();
    harness.workspace.recover_access().await;

    let status = harness.workspace.connectivity();
    assert!(!status.permission_denied);
    assert!(status.reachable);
    assert_eq!(
        harness.workspace.banner(),
        Some(Banner::OrphanedWorkspace {
            id: ProjectId::from("austin-ab12c")
        })
    );
}

#[tokio::test]
async fn transport_failure_during_lookup_raises_retry_banner() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin")])
        .fragment("id=austin-ab12c")
        .build();
    harness.remote.fail_fetches(RemoteError::Transport("connection refused".into()));

    harness.workspace.startup().await;

    let banner = harness.workspace.banner().unwrap();
    assert!(matches!(banner, Banner::RemoteUnavailable { .. }));
    assert!(banner.is_retry_oriented());
    assert_eq!(harness.workspace.active_id(), Some(ProjectId::from("austin-ab12c")));
}

#[tokio::test]
async fn created_project_gets_url_safe_id_at_front() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("boise-x9y8z", "Boise")])
        .generator(generating())
        .build();
    harness.workspace.startup().await;

    let id = harness.workspace.create_project(" Austin ").await.unwrap();

    let suffix = id.as_str().strip_prefix("austin-").unwrap();
    assert_eq!(suffix.len(), 5);
    assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    assert_eq!(harness.generator.analyzed_cities(), vec!["Austin".to_string()]);

    let snapshot = harness.workspace.snapshot();
    assert_eq!(snapshot.projects[0].id, id);
    assert_eq!(snapshot.activation, Activation::Confirmed(id.clone()));
    let project = snapshot.active().unwrap();
    assert_eq!(project.city_name, "Austin");
    assert_eq!(project.budget_estimate, 250_000.0);
    assert!(project.is_processed);
    assert_eq!(project.last_updated, TEST_NOW);
    assert_eq!(project.potential_grants.len(), 2);
    assert_eq!(project.potential_grants[0].id, GrantId::from("grant-0-1700000000000"));
    assert_eq!(project.potential_grants[1].source_link, "https://grants.example.gov/search");
    assert!(project
        .potential_grants
        .iter()
        .all(|g| g.status == ApplicationStatus::NotStarted));

    assert_eq!(harness.location.fragment(), Some(format!("id={id}")));
    assert_eq!(harness.persisted_active_id(), Some(id.to_string()));
    assert_eq!(harness.remote.document(id.as_str()).map(|p| p.city_name), Some("Austin".to_string()));
    assert!(harness.workspace.connectivity().reachable);
}

#[tokio::test]
async fn same_city_twice_gets_distinct_ids() {
    let harness = TestWorkspace::builder().generator(generating()).build();

    let first = harness.workspace.create_project("Austin").await.unwrap();
    let second = harness.workspace.create_project("Austin").await.unwrap();

    assert_ne!(first, second);
    assert_eq!(harness.workspace.snapshot().projects.len(), 2);
    assert_eq!(harness.workspace.active_id(), Some(second));
}

#[tokio::test]
async fn zero_suffix_length_still_keeps_every_project() {
    let mut config = WorkspaceConfig::default().with_rng_seed(7);
    config.id_suffix_len = 0;
    let harness = TestWorkspace::builder().config(config).generator(generating()).build();

    let mut ids = Vec::new();
    for _ in 0..40 {
        ids.push(harness.workspace.create_project("Austin").await.unwrap());
    }

    assert!(ids.iter().all(|id| !id.as_str().ends_with('-')));
    let projects = harness.workspace.snapshot().projects;
    assert_eq!(projects.len(), 40);
    assert_eq!(harness.persisted_projects().len(), 40);
}

#[tokio::test]
async fn discovery_without_sources_uses_placeholder_links() {
    let mut discovery = sample_discovery(1);
    discovery.grounding_urls.clear();
    let harness = TestWorkspace::builder()
        .generator(ScriptedGenerator::new(Analysis::default(), discovery))
        .build();

    harness.workspace.create_project("Reno").await.unwrap();

    let project = harness.workspace.active_project().unwrap();
    assert_eq!(project.potential_grants[0].source_link, PLACEHOLDER_LINK);
    assert!(!project.potential_grants[0].has_source_link());
}

#[tokio::test]
async fn failed_generation_leaves_collection_untouched() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("boise-x9y8z", "Boise")])
        .last_active("boise-x9y8z")
        .generator(ScriptedGenerator::failing(GenerationError::Timeout("analysis".into())))
        .build();
    harness.workspace.startup().await;
    let before = harness.persisted_raw();

    let result = harness.workspace.create_project("Austin").await;

    assert!(result.is_err());
    assert_eq!(harness.workspace.snapshot().projects.len(), 1);
    assert_eq!(harness.workspace.active_id(), Some(ProjectId::from("boise-x9y8z")));
    assert!(matches!(harness.workspace.banner(), Some(Banner::Generation { .. })));
    assert_eq!(harness.persisted_raw(), before);
    assert_eq!(harness.remote.save_count(), 0);
    assert_eq!(harness.workspace.stage(), Stage::Idle);
}

#[tokio::test]
async fn failed_initial_save_keeps_local_project() {
    let harness = TestWorkspace::builder().generator(generating()).build();
    harness.remote.fail_saves(RemoteError::Denied("permission denied".into()));

    let id = harness.workspace.create_project("Austin").await.unwrap();

    assert_eq!(harness.workspace.active_id(), Some(id.clone()));
    assert_eq!(harness.persisted_projects()[0].id, id);
    assert!(harness.workspace.connectivity().permission_denied);
    assert_eq!(harness.workspace.banner(), None);
}

#[tokio::test]
async fn own_unsaved_project_is_not_reported_missing() {
    let harness = TestWorkspace::builder().generator(generating()).build();
    let gate = harness.remote.gate_saves();

    let creation = tokio::spawn({
        let workspace = harness.workspace.clone();
        async move { workspace.create_project("Austin").await }
    });
    eventually(|| harness.remote.save_count() == 1).await;
    let id = harness.workspace.active_id().unwrap();

    // the link now points at a project the remote store has not seen yet
    harness.workspace.startup().await;
    assert_eq!(harness.workspace.banner(), None);
    assert_eq!(harness.workspace.active_id(), Some(id.clone()));

    gate.notify_one();
    assert_eq!(within(creation).await.unwrap().unwrap(), id);
    assert!(harness.remote.document(id.as_str()).is_some());
}

#[tokio::test]
async fn zero_budget_reports_zero_progress() {
    let mut project = sample_project("austin-ab12c", "Austin");
    project.potential_grants.push(awarded_grant("grant-2-1700000000000", 10_000.0, None));
    let harness = TestWorkspace::builder()
        .cached(vec![project])
        .last_active("austin-ab12c")
        .build();
    harness.workspace.startup().await;

    let id = ProjectId::from("austin-ab12c");
    assert!(harness
        .workspace
        .update_project(&id, &ProjectPatch::default().with_budget_estimate("0"))
        .await
        .unwrap());

    let summary = harness.workspace.summary().unwrap();
    assert_eq!(summary.estimated_need, 0.0);
    assert_eq!(summary.progress_percent, 0.0);
    assert_eq!(summary.potential_coverage_percent, 0.0);
    assert_eq!(summary.gap, 0.0);
}

#[tokio::test]
async fn awarded_without_confirmation_counts_maximum() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin")])
        .last_active("austin-ab12c")
        .build();
    harness.workspace.startup().await;
    harness.clock.advance(5_000);

    let project = ProjectId::from("austin-ab12c");
    let grant = GrantId::from("grant-1-1700000000000");
    assert!(harness
        .workspace
        .update_grant_status(&project, &grant, ApplicationStatus::Awarded)
        .await
        .unwrap());

    assert_eq!(harness.workspace.totals().secured_from_grants, 200_000.0);
    let summary = harness.workspace.summary().unwrap();
    assert_eq!(summary.secured, 200_000.0);
    assert_eq!(summary.gap, 50_000.0);
    assert_eq!(summary.progress_percent, 80.0);

    let persisted = &harness.persisted_projects()[0];
    assert_eq!(persisted.last_updated, TEST_NOW + 5_000);
    assert_eq!(persisted.grant(&grant).unwrap().status, ApplicationStatus::Awarded);
}

#[tokio::test]
async fn edits_to_inactive_project_are_ignored() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin"), sample_project("boise-x9y8z", "Boise")])
        .last_active("austin-ab12c")
        .build();
    harness.workspace.startup().await;
    let before = harness.persisted_raw();

    let edited = harness
        .workspace
        .update_grant_status(
            &ProjectId::from("boise-x9y8z"),
            &GrantId::from("grant-0-1700000000000"),
            ApplicationStatus::Denied,
        )
        .await
        .unwrap();

    assert!(!edited);
    assert_eq!(harness.persisted_raw(), before);
}

#[tokio::test]
async fn repeated_sync_is_idempotent() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin")])
        .last_active("austin-ab12c")
        .build();
    harness.workspace.startup().await;
    let replacements = harness.location.replacements();
    let raw = harness.persisted_raw();

    assert!(harness.workspace.sync_selection().await.unwrap());
    assert!(harness.workspace.sync_selection().await.unwrap());

    assert_eq!(harness.location.replacements(), replacements);
    assert_eq!(harness.persisted_raw(), raw);
}

#[tokio::test]
async fn sync_without_selection_writes_nothing() {
    let harness = TestWorkspace::builder().build();
    assert!(!harness.workspace.sync_selection().await.unwrap());
    assert!(harness.storage.is_empty());
}

#[tokio::test]
async fn start_new_then_select_switches_projects() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin"), sample_project("boise-x9y8z", "Boise")])
        .last_active("austin-ab12c")
        .build();
    harness.workspace.startup().await;

    harness.workspace.start_new();
    assert_eq!(harness.workspace.active_id(), None);
    assert_eq!(harness.location.fragment(), None);

    assert!(harness.workspace.select(&ProjectId::from("boise-x9y8z")).await.unwrap());
    assert!(!harness.workspace.select(&ProjectId::from("nope-00000")).await.unwrap());
    assert_eq!(harness.workspace.active_id(), Some(ProjectId::from("boise-x9y8z")));
    assert_eq!(harness.location.fragment().as_deref(), Some("id=boise-x9y8z"));
    assert_eq!(
        harness.workspace.share_link("https://grants.example.org/app").unwrap().as_deref(),
        Some("https://grants.example.org/app#id=boise-x9y8z")
    );
}

#[tokio::test]
async fn push_reports_failure_then_success() {
    let harness = TestWorkspace::builder()
        .cached(vec![sample_project("austin-ab12c", "Austin")])
        .last_active("austin-ab12c")
        .build();
    harness.workspace.startup().await;
    harness.remote.fail_saves(RemoteError::Transport("status 503: unavailable".into()));

    assert!(!harness.workspace.push_active().await);
    assert!(matches!(harness.workspace.banner(), Some(Banner::PushFailed { .. })));
    assert!(!harness.workspace.connectivity().reachable);

    harness.remote.heal();
    assert!(harness.workspace.push_active().await);
    assert_eq!(harness.workspace.banner(), None);
    assert!(harness.workspace.connectivity().is_connected());
    assert_eq!(harness.remote.document("austin-ab12c").map(|p| p.city_name), Some("Austin".to_string()));
}

#[tokio::test]
async fn file_backed_workspace_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let open = |location: MemoryLocation| {
        Workspace::new(
            WorkspaceConfig::default().with_rng_seed(11),
            Collaborators {
                cache: LocalCache::new(Arc::new(FileStorage::new(dir.path()))),
                remote: Arc::new(ScriptedRemote::new()),
                generator: Arc::new(generating()),
                location: Arc::new(location),
            },
        )
        .with_clock(Arc::new(ManualClock::new(TEST_NOW)))
    };

    let first = open(MemoryLocation::new());
    first.startup().await;
    let id = first.create_project("Austin").await.unwrap();
    let grant = first.active_project().unwrap().potential_grants[1].id.clone();
    first
        .update_grant_status(&id, &grant, ApplicationStatus::Submitted)
        .await
        .unwrap();
    let expected = first.active_project().unwrap();
    drop(first);

    let second = open(MemoryLocation::new());
    assert_eq!(second.startup().await, Some(id));
    assert_eq!(second.active_project(), Some(expected));
}
