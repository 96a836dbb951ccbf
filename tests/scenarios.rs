use anyhow::Result;
use async_trait::async_trait;
use extdb_auth::auth::{
    AuthError, AuthenticationRequest, CredentialStore, ExternalRecord, LocalIdentity,
    PasswordRequest,
};
use extdb_auth::config::FieldMapping;
use extdb_auth::{
    AuthResponse, AuthenticationChain, Config, ExternalDatabaseProvider, HashAlgorithm,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

struct UserTable(HashMap<String, ExternalRecord>);

#[async_trait]
impl CredentialStore for UserTable {
    async fn find_by_login(&self, login: &str) -> Result<Option<ExternalRecord>> {
        Ok(self.0.get(login).cloned())
    }
}

fn fields() -> FieldMapping {
    FieldMapping {
        table: "users".to_string(),
        user_login: "login".to_string(),
        user_password: "digest".to_string(),
        user_real_name: "name".to_string(),
        user_email: "email".to_string(),
    }
}

fn chain_for(algorithm: &str) -> AuthenticationChain {
    let hash: HashAlgorithm = algorithm.parse().unwrap();
    let alice = ExternalRecord::new()
        .with("login", "alice")
        .with("digest", "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b")
        .with("name", "Alice A")
        .with("email", "a@x.com");
    let table = UserTable(HashMap::from([("alice".to_string(), alice)]));
    let provider = ExternalDatabaseProvider::new(Arc::new(table), fields(), hash).unwrap();

    AuthenticationChain::new().with_provider(Arc::new(provider))
}

fn login(username: &str, password: &str) -> Vec<AuthenticationRequest> {
    vec![AuthenticationRequest::Password(PasswordRequest::new(username, password))]
}

#[tokio::test]
async fn scenario_a_correct_password_passes_and_reconciles() {
    let chain = chain_for("sha256");

    let outcome = assert_ok!(chain.begin(&login("alice", "secret")).await);
    assert!(matches!(
        &outcome.response,
        AuthResponse::Pass { username, .. } if username == "alice"
    ));

    let mut identity = LocalIdentity::new("alice");
    assert_ok!(chain.finish(&mut identity, &outcome));

    assert_eq!(identity.real_name, "Alice A");
    assert_eq!(identity.email, "a@x.com");
    assert!(identity.email_authenticated.is_some());
}

#[tokio::test]
async fn scenario_b_wrong_password_leaves_identity_alone() {
    let chain = chain_for("sha256");

    let outcome = assert_ok!(chain.begin(&login("alice", "wrong")).await);
    assert!(matches!(outcome.response, AuthResponse::Fail { .. }));

    let mut identity = LocalIdentity::new("alice");
    assert_ok!(chain.finish(&mut identity, &outcome));
    assert_eq!(identity, LocalIdentity::new("alice"));
}

#[tokio::test]
async fn scenario_c_unknown_user_is_not_reconciled() {
    let chain = chain_for("sha256");

    let outcome = assert_ok!(chain.begin(&login("bob", "secret")).await);
    assert_eq!(outcome.provider, None);

    let mut identity = LocalIdentity::new("bob");
    assert_ok!(chain.finish(&mut identity, &outcome));
    assert_eq!(identity.saves, 0);
}

#[test]
fn scenario_d_unsupported_algorithm_is_rejected() {
    assert_eq!(
        "rot13".parse::<HashAlgorithm>(),
        Err(AuthError::UnsupportedAlgorithm("rot13".to_string()))
    );

    let yaml = r#"
database:
  backend: mysql
  host: localhost
  user: wiki
  password: ""
  database: users
fields:
  table: users
  user_login: login
  user_password: digest
  user_real_name: name
  user_email: email
hash: rot13
"#;
    let err = assert_err!(Config::from_yaml_str(yaml));
    assert!(err.to_string().contains("rot13"));
}

#[tokio::test]
async fn direct_provider_call_abstains_where_chain_fails() {
    use extdb_auth::auth::PrimaryAuthenticationProvider;

    let table = UserTable(HashMap::new());
    let provider = assert_ok!(ExternalDatabaseProvider::new(
        Arc::new(table),
        fields(),
        HashAlgorithm::default()
    ));

    let response = assert_ok!(provider.begin_primary_authentication(&login("bob", "x")).await);
    assert_eq!(response, AuthResponse::Abstain);
}
