use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    dao::{
        buzzer_store::{BuzzerSnapshot, BuzzerStore, CasOutcome, Revision, ensure_state_exists},
        storage::StorageResult,
    },
    state::buzzer::BuzzerState,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
};

/// CouchDB rendering of the buzzer document: the lock state flattened next
/// to the CouchDB bookkeeping fields.
#[derive(Debug, Serialize, Deserialize)]
struct BuzzerDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(flatten)]
    state: BuzzerState,
}

fn buzzer_doc_id(room: &str) -> String {
    format!("buzzer:{room}")
}

/// Buzzer store backed by one CouchDB document per room.
#[derive(Clone)]
pub struct CouchBuzzerStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    doc_id: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchBuzzerStore {
    /// Establish a connection, ensure the database exists, and create the
    /// open lock document when the room has never been used.
    pub async fn connect(config: CouchConfig, room: &str) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            doc_id: Arc::<str>::from(buzzer_doc_id(room)),
            auth,
        };

        store.ensure_database().await?;
        ensure_state_exists(&store)
            .await
            .map_err(|_| CouchDaoError::DatabaseStatus {
                database: store.database.to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            })?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);
        let mut builder = self.client.get(&url);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
        }

        let response = builder
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let mut builder = self.client.put(&url);
                if let Some((ref user, ref pass)) = self.auth {
                    builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
                }
                let create =
                    builder
                        .send()
                        .await
                        .map_err(|source| CouchDaoError::DatabaseCreate {
                            database: database.clone(),
                            source,
                        })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document(&self) -> CouchResult<Option<BuzzerDocument>> {
        let path = self.doc_id.to_string();
        let response =
            self.request(Method::GET, &path)
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: path.clone(),
                    source,
                })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<BuzzerDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse { path, source }),
            other => Err(CouchDaoError::RequestStatus {
                path,
                status: other,
            }),
        }
    }

    /// Conditional put: CouchDB rejects a write whose `_rev` is stale (or
    /// whose document already exists when no `_rev` is given) with 409.
    async fn put_document(
        &self,
        expected: Option<Revision>,
        state: BuzzerState,
    ) -> CouchResult<CasOutcome> {
        let path = self.doc_id.to_string();
        let document = BuzzerDocument {
            id: path.clone(),
            rev: expected,
            state,
        };

        let response = self
            .request(Method::PUT, &path)
            .json(&document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(CasOutcome::Conflict),
            status if status.is_success() => Ok(CasOutcome::Committed),
            other => Err(CouchDaoError::RequestStatus {
                path,
                status: other,
            }),
        }
    }
}

impl BuzzerStore for CouchBuzzerStore {
    fn fetch(&self) -> BoxFuture<'static, StorageResult<BuzzerSnapshot>> {
        let store = self.clone();
        Box::pin(async move {
            let maybe_doc = store.get_document().await?;
            Ok(match maybe_doc {
                Some(doc) => BuzzerSnapshot {
                    state: doc.state,
                    revision: doc.rev,
                },
                None => BuzzerSnapshot::absent(),
            })
        })
    }

    fn compare_and_swap(
        &self,
        expected: Option<Revision>,
        next: BuzzerState,
    ) -> BoxFuture<'static, StorageResult<CasOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.put_document(expected, next).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let mut builder = store.client.get(&url);
            if let Some((ref user, ref pass)) = store.auth {
                builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
            }

            let response = builder
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
