use jsonwebtoken::{Algorithm, DecodingKey};
use rag_domain::error::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    alg: Option<String>,
    // RSA
    n: Option<String>,
    e: Option<String>,
    // EC
    x: Option<String>,
    y: Option<String>,
    crv: Option<String>,
}

/// Fetches a JWKS document and turns each entry into a ready-to-use
/// `DecodingKey`, rejecting key types or algorithms this workspace does
/// not support rather than silently skipping them.
pub struct JwksFetcher {
    client: reqwest::Client,
    url: String,
}

impl JwksFetcher {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    pub async fn fetch(&self) -> Result<Vec<(String, DecodingKey, Algorithm)>, Error> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ServiceUnavailable {
                message: format!("jwks fetch failed: {e}"),
                details: serde_json::Value::Null,
            })?;

        if !resp.status().is_success() {
            return Err(Error::ServiceUnavailable {
                message: format!("jwks endpoint returned {}", resp.status()),
                details: serde_json::Value::Null,
            });
        }

        let body: JwksResponse = resp.json().await.map_err(|e| Error::ServiceUnavailable {
            message: format!("jwks response was not valid JSON: {e}"),
            details: serde_json::Value::Null,
        })?;

        let mut keys = Vec::with_capacity(body.keys.len());
        for entry in body.keys {
            let Some(kid) = entry.kid else {
                continue;
            };
            match entry.kty.as_str() {
                "RSA" => {
                    let (Some(n), Some(e)) = (entry.n.as_deref(), entry.e.as_deref()) else {
                        continue;
                    };
                    let key = DecodingKey::from_rsa_components(n, e).map_err(|err| Error::Authentication {
                        message: format!("malformed RSA JWK: {err}"),
                        details: serde_json::Value::Null,
                        recovery_suggestions: vec![],
                    })?;
                    let alg = match entry.alg.as_deref() {
                        Some("RS384") => Algorithm::RS384,
                        Some("RS512") => Algorithm::RS512,
                        _ => Algorithm::RS256,
                    };
                    keys.push((kid, key, alg));
                }
                "EC" => {
                    let (Some(x), Some(y)) = (entry.x.as_deref(), entry.y.as_deref()) else {
                        continue;
                    };
                    if entry.crv.as_deref() != Some("P-256") {
                        continue;
                    }
                    let key = DecodingKey::from_ec_components(x, y).map_err(|err| Error::Authentication {
                        message: format!("malformed EC JWK: {err}"),
                        details: serde_json::Value::Null,
                        recovery_suggestions: vec![],
                    })?;
                    keys.push((kid, key, Algorithm::ES256));
                }
                _ => continue,
            }
        }
        Ok(keys)
    }
}

struct CacheEntry {
    keys: HashMap<String, (DecodingKey, Algorithm)>,
    fetched_at: Instant,
}

/// TTL-bounded JWKS cache with a single-flight refresh: concurrent misses
/// wait on the same in-flight fetch instead of each issuing their own
/// request to the identity provider.
pub struct JwksCache {
    fetcher: JwksFetcher,
    ttl: Duration,
    state: Mutex<Option<CacheEntry>>,
}

impl JwksCache {
    pub fn new(fetcher: JwksFetcher, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Resolve a signing key by `kid`, refreshing the cache at most once
    /// per call even if the key is still missing afterward.
    pub async fn resolve(&self, kid: &str) -> Result<(DecodingKey, Algorithm), Error> {
        let mut guard = self.state.lock().await;

        let stale = match guard.as_ref() {
            Some(entry) => entry.fetched_at.elapsed() > self.ttl || !entry.keys.contains_key(kid),
            None => true,
        };

        if stale {
            let started = Instant::now();
            let fetched = self.fetcher.fetch().await?;
            let keys: HashMap<String, (DecodingKey, Algorithm)> = fetched
                .into_iter()
                .map(|(kid, key, alg)| (kid, (key, alg)))
                .collect();
            rag_domain::trace::TraceEvent::JwksRefreshed {
                issuer: self.fetcher.url.clone(),
                key_count: keys.len(),
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();
            *guard = Some(CacheEntry {
                keys,
                fetched_at: Instant::now(),
            });
        }

        guard
            .as_ref()
            .and_then(|entry| entry.keys.get(kid))
            .cloned()
            .ok_or_else(|| Error::Authentication {
                message: format!("unknown key id \"{kid}\""),
                details: serde_json::json!({ "kid": kid }),
                recovery_suggestions: vec!["the token may have been signed by a retired key".into()],
            })
    }
}
