//! Repository secret end-to-end tests

use chrono::Utc;
use ghseal::{SaveOutcome, SecretsError};
use ghseal_api::{Method, Route, SecretScope};
use ghseal_e2e::{manager, MockGitHub};

const ORG: &str = "acme";

/// Initialize tracing for tests
fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ghseal=debug,ghseal_e2e=debug")
        .with_test_writer()
        .try_init();
}

fn github() -> std::sync::Arc<MockGitHub> {
    let github = MockGitHub::new();
    github.add_organization(ORG);
    github.add_repository(ORG, "widgets");
    github
}

fn is_public_key_call(route: &Route) -> bool {
    matches!(route, Route::PublicKey(_))
}

#[tokio::test]
async fn test_create_update_delete() {
    init_test();

    let github = github();
    let secrets = manager(&github, ORG);
    let name = format!("repo_secret_test_{}", Utc::now().timestamp_millis());

    let created = secrets
        .save_or_update_repository_secret("widgets", &name, "testing", true)
        .await
        .unwrap();
    assert_eq!(created, SaveOutcome::Created);

    let updated = secrets
        .save_or_update_repository_secret("widgets", &name, "testing", true)
        .await
        .unwrap();
    assert_eq!(updated, SaveOutcome::Updated);

    let stored = github.repository_secret(ORG, "widgets", &name).unwrap();
    assert_eq!(stored.value.as_deref(), Some("testing"));

    assert!(secrets.delete_repository_secret("widgets", &name).await.unwrap());
    assert!(github.repository_secret(ORG, "widgets", &name).is_none());
}

#[tokio::test]
async fn test_get_repository_secret() {
    init_test();

    let github = github();
    github.seed_repository_secret(ORG, "widgets", "API_TOKEN", "s3cr3t");
    let secrets = manager(&github, ORG);

    let secret = secrets
        .get_repository_secret("widgets", "API_TOKEN")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(secret.name, "API_TOKEN");
    assert_eq!(secret.organization, ORG);
    assert_eq!(secret.repository, "widgets");

    assert!(secrets
        .get_repository_secret("widgets", "MISSING")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_lookups_of_missing_resources_are_none() {
    init_test();

    let github = github();
    let secrets = manager(&github, ORG);

    assert!(secrets.get_repository("ghost").await.unwrap().is_none());
    assert!(secrets
        .get_repository_public_key("ghost")
        .await
        .unwrap()
        .is_none());

    let repo = secrets.get_repository("widgets").await.unwrap().unwrap();
    assert_eq!(repo.full_name, "acme/widgets");
    assert_eq!(repo.owner, ORG);
    assert_eq!(Some(repo.id), github.repository_id(ORG, "widgets"));

    let key = secrets
        .get_repository_public_key("widgets")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        Some(key.id),
        github.current_key_id(&SecretScope::repository(ORG, "widgets"))
    );
}

#[tokio::test]
async fn test_no_overwrite_returns_exists() {
    init_test();

    let github = github();
    github.seed_repository_secret(ORG, "widgets", "API_TOKEN", "original");
    let secrets = manager(&github, ORG);

    let outcome = secrets
        .save_or_update_repository_secret("widgets", "API_TOKEN", "replacement", false)
        .await
        .unwrap();

    assert_eq!(outcome, SaveOutcome::Exists);
    assert_eq!(github.count(Method::Put), 0);
    assert_eq!(github.count_matching(|call| is_public_key_call(&call.route)), 0);
    assert_eq!(
        github
            .repository_secret(ORG, "widgets", "API_TOKEN")
            .unwrap()
            .value
            .as_deref(),
        Some("original")
    );
}

#[tokio::test]
async fn test_no_overwrite_creates_missing_secret() {
    init_test();

    let github = github();
    let outcome = manager(&github, ORG)
        .save_or_update_repository_secret("widgets", "FRESH", "value", false)
        .await
        .unwrap();

    assert_eq!(outcome, SaveOutcome::Created);
    assert_eq!(github.count(Method::Put), 1);
}

#[tokio::test]
async fn test_write_to_missing_repository() {
    init_test();

    let github = github();
    let err = manager(&github, ORG)
        .save_or_update_repository_secret("ghost", "API_TOKEN", "value", true)
        .await
        .unwrap_err();

    assert!(matches!(err, SecretsError::MissingPublicKey { .. }));
    assert!(err.to_string().contains("acme/ghost"), "{}", err);
    assert_eq!(github.count(Method::Put), 0);
}

#[tokio::test]
async fn test_delete_in_missing_repository() {
    init_test();

    let github = github();
    let deleted = manager(&github, ORG)
        .delete_repository_secret("ghost", "API_TOKEN")
        .await
        .unwrap();

    assert!(!deleted);
    assert_eq!(github.count(Method::Delete), 0);
}

#[tokio::test]
async fn test_delete_absent_secret_counts_as_deleted() {
    init_test();

    let github = github();
    let deleted = manager(&github, ORG)
        .delete_repository_secret("widgets", "NEVER_EXISTED")
        .await
        .unwrap();

    assert!(deleted);
    assert_eq!(github.count(Method::Delete), 1);
}

#[tokio::test]
async fn test_delete_failure_propagates() {
    init_test();

    let github = github();
    github.seed_repository_secret(ORG, "widgets", "LOCKED", "value");
    github.respond_with(
        Method::Delete,
        Route::Secret {
            scope: SecretScope::repository(ORG, "widgets"),
            name: "LOCKED".into(),
        },
        403,
    );

    let err = manager(&github, ORG)
        .delete_repository_secret("widgets", "LOCKED")
        .await
        .unwrap_err();

    match err {
        SecretsError::Api(api) => assert_eq!(api.status_code(), Some(403)),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(github.repository_secret(ORG, "widgets", "LOCKED").is_some());
}

#[tokio::test]
async fn test_cross_organization_repository() {
    init_test();

    // Owner parsed from `<owner>/<repo>` becomes the manager's organization
    let github = github();
    github.add_repository("someone-else", "tools");

    let outcome = manager(&github, "someone-else")
        .save_or_update_repository_secret("tools", "TOKEN", "value", true)
        .await
        .unwrap();

    assert_eq!(outcome, SaveOutcome::Created);
    assert!(github.repository_secret("someone-else", "tools", "TOKEN").is_some());
    assert!(github.repository_secret(ORG, "tools", "TOKEN").is_none());
}
