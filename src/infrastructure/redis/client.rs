use super::{CompletionGuard, GuardError};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use std::time::Duration;
use tracing::info;

const CLAIM_PREFIX: &str = "artifact_claim";

#[derive(Clone)]
pub struct RedisService {
    client: Client,
    claim_ttl: Duration,
}

impl RedisService {
    pub async fn new(connection_string: &str, claim_ttl: Duration) -> Result<Self, redis::RedisError> {
        let client = Client::open(connection_string)?;

        // Test connection
        let _conn = client.get_multiplexed_async_connection().await?;

        info!("✅ Connected to Redis");
        Ok(Self { client, claim_ttl })
    }

    pub async fn get_conn(&self) -> Result<MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn claim_key(job_id: &str) -> String {
        format!("{}:{}", CLAIM_PREFIX, job_id)
    }
}

#[async_trait]
impl CompletionGuard for RedisService {
    async fn try_claim(&self, job_id: &str) -> Result<bool, GuardError> {
        let mut conn = self
            .get_conn()
            .await
            .map_err(|e| GuardError(e.to_string()))?;

        // SET NX EX replies OK when the key was created and nil when someone else holds it.
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::claim_key(job_id))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(self.claim_ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| GuardError(e.to_string()))?;

        Ok(reply.is_some())
    }

    async fn release(&self, job_id: &str) -> Result<(), GuardError> {
        let mut conn = self
            .get_conn()
            .await
            .map_err(|e| GuardError(e.to_string()))?;

        let _: () = conn
            .del(Self::claim_key(job_id))
            .await
            .map_err(|e| GuardError(e.to_string()))?;

        Ok(())
    }
}
