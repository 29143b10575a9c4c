//! Environment secret end-to-end tests

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
    github.add_environment(ORG, "widgets", "production");
    github
}

#[tokio::test]
async fn test_get_environment() {
    init_test();

    let github = github();
    let secrets = manager(&github, ORG);

    let env = secrets
        .get_environment("widgets", "production")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(env.name, "production");
    assert_eq!(Some(env.repository_id), github.repository_id(ORG, "widgets"));
    assert!(env.url.unwrap().contains("environments_filter=production"));

    assert!(secrets
        .get_environment("widgets", "staging")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_missing_repository_short_circuits() {
    init_test();

    let github = github();
    let env = manager(&github, ORG)
        .get_environment("ghost", "production")
        .await
        .unwrap();

    assert!(env.is_none());
    // Only the repository lookup was made
    assert_eq!(github.calls().len(), 1);
    assert!(matches!(
        github.calls()[0].route,
        Route::Repository { .. }
    ));
}

#[tokio::test]
async fn test_create_then_update() {
    init_test();

    let github = github();
    let secrets = manager(&github, ORG);

    let created = secrets
        .save_or_update_environment_secret("widgets", "production", "DB_PASSWORD", "hunter2", true)
        .await
        .unwrap();
    let updated = secrets
        .save_or_update_environment_secret("widgets", "production", "DB_PASSWORD", "hunter3", true)
        .await
        .unwrap();

    assert_eq!(created, SaveOutcome::Created);
    assert_eq!(updated, SaveOutcome::Updated);

    let stored = github
        .environment_secret(ORG, "widgets", "production", "DB_PASSWORD")
        .unwrap();
    assert_eq!(stored.value.as_deref(), Some("hunter3"));

    let repository_id = github.repository_id(ORG, "widgets").unwrap();
    assert_eq!(
        Some(stored.key_id),
        github.current_key_id(&SecretScope::environment(repository_id, "production"))
    );

    let secret = secrets
        .get_environment_secret("widgets", "production", "DB_PASSWORD")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(secret.repository_id, repository_id);
    assert_eq!(secret.environment, "production");
}

#[tokio::test]
async fn test_environment_public_key() {
    init_test();

    let github = github();
    let secrets = manager(&github, ORG);
    let repository_id = github.repository_id(ORG, "widgets").unwrap();

    let key = secrets
        .get_environment_public_key("widgets", "production")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(key.repository_id, repository_id);
    assert_eq!(
        Some(key.key.id),
        github.current_key_id(&SecretScope::environment(repository_id, "production"))
    );

    assert!(secrets
        .get_environment_public_key("widgets", "staging")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_no_overwrite_returns_exists() {
    init_test();

    let github = github();
    github.seed_environment_secret(ORG, "widgets", "production", "DB_PASSWORD", "original");

    let outcome = manager(&github, ORG)
        .save_or_update_environment_secret("widgets", "production", "DB_PASSWORD", "new", false)
        .await
        .unwrap();

    assert_eq!(outcome, SaveOutcome::Exists);
    assert_eq!(github.count(Method::Put), 0);
    assert_eq!(
        github.count_matching(|call| matches!(call.route, Route::PublicKey(_))),
        0
    );
}

#[tokio::test]
async fn test_write_to_missing_environment() {
    init_test();

    let github = github();
    let err = manager(&github, ORG)
        .save_or_update_environment_secret("widgets", "staging", "DB_PASSWORD", "value", true)
        .await
        .unwrap_err();

    assert!(matches!(err, SecretsError::MissingPublicKey { .. }));
    let message = err.to_string();
    assert!(message.contains("staging"), "{}", message);
    assert!(message.contains("acme/widgets"), "{}", message);
    assert_eq!(github.count(Method::Put), 0);
}

#[tokio::test]
async fn test_delete_absent_secret_makes_no_delete_call() {
    init_test();

    let github = github();
    let deleted = manager(&github, ORG)
        .delete_environment_secret("widgets", "production", "NEVER_EXISTED")
        .await
        .unwrap();

    assert!(deleted);
    assert_eq!(github.count(Method::Delete), 0);
}

#[tokio::test]
async fn test_delete_in_missing_environment() {
    init_test();

    let github = github();
    let deleted = manager(&github, ORG)
        .delete_environment_secret("widgets", "staging", "DB_PASSWORD")
        .await
        .unwrap();

    assert!(deleted);
    assert_eq!(github.count(Method::Delete), 0);
}

#[tokio::test]
async fn test_delete_existing_secret() {
    init_test();

    let github = github();
    github.seed_environment_secret(ORG, "widgets", "production", "DB_PASSWORD", "value");

    let deleted = manager(&github, ORG)
        .delete_environment_secret("widgets", "production", "DB_PASSWORD")
        .await
        .unwrap();

    assert!(deleted);
    assert_eq!(github.count(Method::Delete), 1);
    assert!(github
        .environment_secret(ORG, "widgets", "production", "DB_PASSWORD")
        .is_none());
}

#[tokio::test]
async fn test_environment_names_are_distinct_scopes() {
    init_test();

    let github = github();
    github.add_environment(ORG, "widgets", "staging");
    let secrets = manager(&github, ORG);

    secrets
        .save_or_update_environment_secret("widgets", "production", "URL", "prod", true)
        .await
        .unwrap();
    let outcome = secrets
        .save_or_update_environment_secret("widgets", "staging", "URL", "stage", true)
        .await
        .unwrap();

    assert_eq!(outcome, SaveOutcome::Created);
    assert_eq!(
        github
            .environment_secret(ORG, "widgets", "staging", "URL")
            .unwrap()
            .value
            .as_deref(),
        Some("stage")
    );
}
