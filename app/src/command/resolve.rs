use std::sync::Arc;

use ghcore_config::Config;
use ghcore_core::{ChainedIdentity, EventStore, IdentityResolver, Lookups, Record};
use ghcore_providers::{GitHubClient, TokenPool};
use ghcore_search::{BoundedCache, EntitySearch, LinkCategory, SearchConfig};
use ghcore_store::EventLogStore;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ResolveInput {
    pub category: LinkCategory,
    pub texts: Vec<String>,
    /// Event-log record fields the texts were found in.
    pub repo_name: Option<String>,
    pub repo_id: Option<i64>,
    pub actor_login: Option<String>,
    /// Resolve from the texts alone, without GitHub or the event log.
    pub offline: bool,
}

impl ResolveInput {
    fn record(&self) -> Record {
        let mut record = Record::new();
        if let Some(repo_name) = &self.repo_name {
            record.insert("repo_name".to_string(), Value::from(repo_name.as_str()));
        }
        if let Some(repo_id) = self.repo_id {
            record.insert("repo_id".to_string(), Value::from(repo_id));
        }
        if let Some(actor_login) = &self.actor_login {
            record.insert("actor_login".to_string(), Value::from(actor_login.as_str()));
        }
        record
    }
}

/// Resolves reference texts and prints one JSON row per text.
#[derive(Debug, Clone, Copy)]
pub struct ResolveStrategy;

async fn online_lookups(config: &Config) -> anyhow::Result<Lookups> {
    let tokens = Arc::new(TokenPool::new(config.github.tokens.clone()));
    let github = Arc::new(
        GitHubClient::new(tokens, &config.github.user_agent, config.github.timeout())?
            .with_base_url(&config.github.api_url, &config.github.graphql_url),
    );

    let Some(url) = &config.database.url else {
        info!("No event-log database configured, using the GitHub API only");
        return Ok(Lookups::offline()
            .with_identity(github.clone())
            .with_commits(github.clone())
            .with_api(github));
    };

    let store = Arc::new(EventLogStore::connect(url, &config.database.table).await?);
    let identity: Arc<dyn IdentityResolver> =
        Arc::new(ChainedIdentity::new(store.clone(), github.clone()));
    let events: Arc<dyn EventStore> = store;
    Ok(Lookups::new(identity, events, github.clone(), github))
}

impl super::CommandStrategy for ResolveStrategy {
    type Input = ResolveInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let (lookups, search_config, cache_capacity) = if input.offline {
            (Lookups::offline(), SearchConfig::default(), 0)
        } else {
            let config = Config::load().unwrap_or_else(|e| {
                warn!("{e:#}; using default configuration");
                Config::default()
            });
            (
                online_lookups(&config).await?,
                config.search.search_config(),
                config.search.cache_capacity,
            )
        };

        let mut search = EntitySearch::new(lookups, search_config)?;
        if cache_capacity > 0 {
            search = search.with_cache(Arc::new(BoundedCache::new(cache_capacity)));
        }

        let record = input.record();
        for text in &input.texts {
            let row = search
                .resolve(input.category, text, &record)
                .await
                .map_or(Value::Null, |entity| {
                    let mut row = Record::new();
                    row.insert("node_type".to_string(), Value::from(entity.entity_type()));
                    row.extend(entity.get_dict());
                    Value::Object(row)
                });
            println!("{row}");
        }
        Ok(())
    }
}
