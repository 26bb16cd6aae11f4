//! Common test utilities: in-memory database, mock identity provider and
//! a handful of seeded users

#![allow(dead_code)]

use async_trait::async_trait;
use konsultn_service::config::Config;
use konsultn_service::{IdentityProvider, KonsultnApi, KonsultnModule, NewUser, User};
use parking_lot::RwLock;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::Arc;

/// Identity provider keeping identities and issued tokens in memory
#[derive(Default)]
pub struct MockIdentityProvider {
    /// email -> uid
    identities: RwLock<HashMap<String, String>>,
    /// token -> uid
    tokens: RwLock<HashMap<String, String>>,
}

impl MockIdentityProvider {
    pub fn issue_token(&self, uid: &str) -> String {
        let token = format!("token-{uid}");
        self.tokens.write().insert(token.clone(), uid.to_string());
        token
    }

    pub fn identity_count(&self) -> usize {
        self.identities.read().len()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn create_identity(&self, email: &str, _password: &str) -> anyhow::Result<String> {
        let mut identities = self.identities.write();
        if identities.contains_key(email) {
            anyhow::bail!("identity for {email} already exists");
        }
        let uid = format!("uid-{}", identities.len() + 1);
        identities.insert(email.to_string(), uid.clone());
        Ok(uid)
    }

    async fn verify_token(&self, token: &str) -> anyhow::Result<String> {
        self.tokens
            .read()
            .get(token)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown token"))
    }
}

/// Initialized module over a fresh database, with four users
pub struct TestWorld {
    pub db: Arc<DatabaseConnection>,
    pub module: KonsultnModule,
    pub client: Arc<dyn KonsultnApi>,
    pub identity: Arc<MockIdentityProvider>,
    pub ana: User,
    pub ben: User,
    pub cleo: User,
    pub dan: User,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub async fn setup_db() -> Arc<DatabaseConnection> {
    init_tracing();

    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Arc::new(Database::connect(opts).await.expect("connect to sqlite"))
}

pub async fn setup() -> TestWorld {
    setup_with(Config::default()).await
}

pub async fn setup_with(config: Config) -> TestWorld {
    let db = setup_db().await;
    let identity = Arc::new(MockIdentityProvider::default());

    let module = KonsultnModule::default();
    module.migrate(&db).await.expect("create schema");
    module
        .init(config, db.clone(), identity.clone())
        .expect("init module");
    let client = module.client().expect("client");

    let ana = client.create_user(new_user("Ana", "ana@example.com")).await.unwrap();
    let ben = client.create_user(new_user("Ben", "ben@example.com")).await.unwrap();
    let cleo = client.create_user(new_user("Cleo", "cleo@example.com")).await.unwrap();
    let dan = client.create_user(new_user("Dan", "dan@example.com")).await.unwrap();

    TestWorld {
        db,
        module,
        client,
        identity,
        ana,
        ben,
        cleo,
        dan,
    }
}

pub fn new_user(first_name: &str, email: &str) -> NewUser {
    NewUser {
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        email: email.to_string(),
        phone_number: None,
    }
}

pub fn print_test_header(test_name: &str, purpose: &[&str]) {
    println!("\n🧪 TEST: {}", test_name);
    if let Some(first) = purpose.first() {
        println!("📋 PURPOSE: {}", first);
    }
    for line in purpose.iter().skip(1) {
        println!("   {}", line);
    }
}
