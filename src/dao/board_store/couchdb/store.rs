use std::{sync::Arc, time::Duration};

use async_stream::stream;
use futures::{StreamExt, future::BoxFuture};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::dao::{
    board_store::{BoardStore, Collection, SnapshotStream},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{ChangesResponse, CollectionDocument, DocIdsFilter, RevisionOnly, seq_param},
};

const CHANGES: &str = "_changes";
/// A revision conflict is retried this many times before giving up.
const CONFLICT_RETRIES: usize = 1;

/// Stores each collection as a single CouchDB document wrapping `{ "value": ... }`.
#[derive(Clone)]
pub struct CouchBoardStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
    longpoll: Duration,
}

impl CouchBoardStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
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
            auth,
            longpoll: config.longpoll,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
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

    async fn current_rev(&self, doc_id: &str) -> CouchResult<Option<String>> {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<RevisionOnly>()
                .await
                .map(|doc| Some(doc.rev))
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Overwrite the collection document, last writer wins.
    async fn put_collection(&self, collection: Collection, value: Value) -> CouchResult<()> {
        let doc_id = collection.as_str();
        let mut document = CollectionDocument {
            id: doc_id.to_string(),
            rev: None,
            value: Some(value),
        };

        for attempt in 0..=CONFLICT_RETRIES {
            document.rev = self.current_rev(doc_id).await?;
            let response = self
                .request(Method::PUT, doc_id)
                .json(&document)
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: doc_id.to_string(),
                    source,
                })?;

            match response.status() {
                status if status.is_success() => return Ok(()),
                StatusCode::CONFLICT => {
                    debug!(collection = %collection, attempt, "CouchDB revision conflict, retrying");
                }
                other => {
                    return Err(CouchDaoError::RequestStatus {
                        path: doc_id.to_string(),
                        status: other,
                    });
                }
            }
        }

        Err(CouchDaoError::Conflict {
            path: doc_id.to_string(),
        })
    }

    /// One round of the `_changes` feed restricted to a single collection document.
    ///
    /// Without `since` the feed answers immediately with the latest revision, which
    /// gives the initial snapshot and the sequence to long-poll from.
    async fn changes(
        &self,
        collection: Collection,
        since: Option<&str>,
    ) -> CouchResult<ChangesResponse> {
        let mut query = vec![
            ("filter", "_doc_ids".to_string()),
            ("include_docs", "true".to_string()),
        ];
        if let Some(since) = since {
            query.push(("feed", "longpoll".to_string()));
            query.push(("since", since.to_string()));
            query.push(("timeout", self.longpoll.as_millis().to_string()));
        }

        let response = self
            .request(Method::POST, CHANGES)
            .query(&query)
            .json(&DocIdsFilter {
                doc_ids: [collection.as_str()],
            })
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: CHANGES.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: CHANGES.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<ChangesResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: CHANGES.to_string(),
                source,
            })
    }

    fn follow(&self, collection: Collection) -> SnapshotStream {
        let store = self.clone();
        stream! {
            let initial = match store.changes(collection, None).await {
                Ok(initial) => initial,
                Err(err) => {
                    yield Err(StorageError::from(err));
                    return;
                }
            };
            let mut since = seq_param(&initial.last_seq);
            yield Ok(initial.results.into_iter().last().and_then(|row| row.into_value()));

            loop {
                match store.changes(collection, Some(&since)).await {
                    Ok(batch) => {
                        since = seq_param(&batch.last_seq);
                        for row in batch.results {
                            yield Ok(row.into_value());
                        }
                    }
                    Err(err) => {
                        yield Err(StorageError::from(err));
                        return;
                    }
                }
            }
        }
        .boxed()
    }
}

impl BoardStore for CouchBoardStore {
    fn write(&self, collection: Collection, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .put_collection(collection, value)
                .await
                .map_err(Into::into)
        })
    }

    fn subscribe(&self, collection: Collection) -> BoxFuture<'static, StorageResult<SnapshotStream>> {
        let stream = self.follow(collection);
        Box::pin(async move { Ok(stream) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let response = store
                .authorize(store.client.get(&url))
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
