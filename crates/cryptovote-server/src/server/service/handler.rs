//! gRPC service implementation for crypto vote records.
//!
//! This module defines [`CryptoService`], the implementation of the
//! [`UpvoteSystem`] service. Record CRUD is delegated to a [`CryptoStore`];
//! vote mutations additionally publish the updated record to every live
//! `StreamVoteSum` call.
//!
//! ## Responsibilities
//!
//! - Validate identifiers and payloads before touching the store.
//! - Publish a record only after its vote mutation succeeded.
//! - Start vote-sum streams bound to the call's cancellation and deadline.
//! - Refuse new calls and end live streams on shutdown.

use crate::server::{
    broadcast::{Broadcaster, SubscriberRegistry},
    config::ServerConfig,
    store::CryptoStore,
    streaming::{CallContext, StreamBuffers, spawn_vote_sum_stream},
    telemetry::{increment_requests, increment_votes_cast},
};
use core::{pin::Pin, time::Duration};
use cryptovote_core::{
    Error,
    proto::{
        CreateCryptoRequest, CreateCryptoResponse, DeleteCryptoRequest, DeleteCryptoResponse,
        DownvoteCryptoRequest, DownvoteCryptoResponse, GetVoteSumRequest, GetVoteSumResponse,
        ReadAllCryptoRequest, ReadAllCryptoResponse, ReadCryptoByIdRequest,
        ReadCryptoByIdResponse, StreamVoteSumRequest, StreamVoteSumResponse, UpdateCryptoRequest,
        UpdateCryptoResponse, UpvoteCryptoRequest, UpvoteCryptoResponse,
        upvote_system_server::{UpvoteSystem, UpvoteSystemServer},
    },
    types::{Crypto, CryptoDraft, CryptoId, VoteCounter},
};
use std::sync::Arc;
use tokio::{
    sync::Mutex,
    time::{sleep, timeout},
};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, codec::CompressionEncoding};

/// The `UpvoteSystem` gRPC service.
///
/// Cloning is cheap; all clones share the store, the subscriber registry and
/// the shutdown token.
#[derive(Clone)]
pub struct CryptoService {
    config: ServerConfig,
    store: Arc<dyn CryptoStore>,
    broadcaster: Broadcaster,
    /// Held across a counter update and its publish, so subscribers see
    /// updates in the order the store applied them.
    vote_lock: Arc<Mutex<()>>,
    shutdown_token: CancellationToken,
}

impl CryptoService {
    /// Creates a service over `store` with a fresh subscriber registry.
    pub fn new(config: ServerConfig, store: Arc<dyn CryptoStore>) -> Self {
        Self::with_registry(config, store, SubscriberRegistry::new())
    }

    /// Creates a service that publishes to an existing registry.
    pub fn with_registry(
        config: ServerConfig,
        store: Arc<dyn CryptoStore>,
        registry: SubscriberRegistry,
    ) -> Self {
        Self {
            config,
            store,
            broadcaster: Broadcaster::new(registry),
            vote_lock: Arc::new(Mutex::new(())),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub const fn registry(&self) -> &SubscriberRegistry {
        self.broadcaster.registry()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Stops the service.
    ///
    /// New calls are refused with `UNAVAILABLE` and every live vote-sum
    /// stream is cancelled. Waits up to the configured shutdown timeout for
    /// the streams to unregister.
    pub async fn shutdown(&self) -> Result<(), Error> {
        // === Phase 0: Refuse new calls and cancel live streams ===
        tracing::info!("Refusing new requests");
        self.shutdown_token.cancel();

        // === Phase 1: Wait for subscriptions to drain ===
        let registry = self.registry();
        tracing::info!("Draining vote-sum streams ({} active)", registry.len());
        let drain_result = timeout(self.config.shutdown_timeout, async {
            while !registry.is_empty() {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => tracing::debug!("All vote-sum streams drained"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} streams still registered)",
                registry.len()
            ),
        }

        tracing::info!("Service shutdown complete");
        Ok(())
    }

    fn ensure_serving(&self) -> Result<(), Error> {
        if self.is_shutting_down() {
            return Err(Error::ServiceShutdown);
        }
        increment_requests();
        Ok(())
    }

    /// Applies one vote and publishes the updated record.
    ///
    /// Votes are applied and published one at a time. `publish` never
    /// blocks, so the critical section is the store update plus one
    /// `try_send` per subscriber.
    async fn vote(&self, id: &str, counter: VoteCounter) -> Result<Crypto, Error> {
        self.ensure_serving()?;
        let id: CryptoId = id.parse()?;

        let crypto = {
            let _ordered = self.vote_lock.lock().await;
            let crypto = self.store.update_counter(&id, counter, 1).await?;
            self.broadcaster.publish(&crypto);
            crypto
        };
        increment_votes_cast();

        tracing::debug!(%id, %counter, votes = crypto.vote_sum(), "Vote recorded");
        Ok(crypto)
    }
}

/// Wraps `service` in the generated server with every supported compression.
pub fn build_crypto_service(service: CryptoService) -> UpvoteSystemServer<CryptoService> {
    UpvoteSystemServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}

#[tonic::async_trait]
impl UpvoteSystem for CryptoService {
    type ReadAllCryptoStream =
        Pin<Box<dyn Stream<Item = Result<ReadAllCryptoResponse, Status>> + Send>>;
    type StreamVoteSumStream =
        Pin<Box<dyn Stream<Item = Result<StreamVoteSumResponse, Status>> + Send>>;

    #[tracing::instrument(skip_all)]
    async fn create_crypto(
        &self,
        req: Request<CreateCryptoRequest>,
    ) -> Result<Response<CreateCryptoResponse>, Status> {
        self.ensure_serving()?;
        let draft = CryptoDraft::from(req.into_inner().crypto.ok_or(Error::MissingPayload)?);
        draft.validate()?;

        let crypto = self.store.insert(draft).await?;
        tracing::info!(id = %crypto.id, name = %crypto.name, "Cryptocurrency created");
        Ok(Response::new(CreateCryptoResponse {
            crypto: Some(crypto.into()),
        }))
    }

    #[tracing::instrument(skip_all, fields(id = %req.get_ref().id))]
    async fn read_crypto_by_id(
        &self,
        req: Request<ReadCryptoByIdRequest>,
    ) -> Result<Response<ReadCryptoByIdResponse>, Status> {
        self.ensure_serving()?;
        let id: CryptoId = req.into_inner().id.parse()?;

        let crypto = self.store.find_by_id(&id).await?;
        Ok(Response::new(ReadCryptoByIdResponse {
            crypto: Some(crypto.into()),
        }))
    }

    #[tracing::instrument(skip_all)]
    async fn read_all_crypto(
        &self,
        _req: Request<ReadAllCryptoRequest>,
    ) -> Result<Response<Self::ReadAllCryptoStream>, Status> {
        self.ensure_serving()?;

        let records = self.store.find_all().await?;
        tracing::debug!(count = records.len(), "Streaming all records");
        let stream = tokio_stream::iter(records.into_iter().map(|crypto| {
            Ok(ReadAllCryptoResponse {
                crypto: Some(crypto.into()),
            })
        }));
        Ok(Response::new(Box::pin(stream)))
    }

    #[tracing::instrument(skip_all)]
    async fn update_crypto(
        &self,
        req: Request<UpdateCryptoRequest>,
    ) -> Result<Response<UpdateCryptoResponse>, Status> {
        self.ensure_serving()?;
        let payload = req.into_inner().crypto.ok_or(Error::MissingPayload)?;
        let id: CryptoId = payload.id.parse()?;
        let draft = CryptoDraft::from(payload);
        draft.validate()?;

        let crypto = self.store.update_details(&id, draft).await?;
        tracing::info!(%id, "Cryptocurrency updated");
        Ok(Response::new(UpdateCryptoResponse {
            crypto: Some(crypto.into()),
        }))
    }

    #[tracing::instrument(skip_all, fields(id = %req.get_ref().id))]
    async fn delete_crypto(
        &self,
        req: Request<DeleteCryptoRequest>,
    ) -> Result<Response<DeleteCryptoResponse>, Status> {
        self.ensure_serving()?;
        let id: CryptoId = req.into_inner().id.parse()?;

        self.store.delete(&id).await?;
        tracing::info!(%id, "Cryptocurrency deleted");
        Ok(Response::new(DeleteCryptoResponse { success: true }))
    }

    #[tracing::instrument(skip_all, fields(id = %req.get_ref().id))]
    async fn upvote_crypto(
        &self,
        req: Request<UpvoteCryptoRequest>,
    ) -> Result<Response<UpvoteCryptoResponse>, Status> {
        let crypto = self.vote(&req.get_ref().id, VoteCounter::Upvotes).await?;
        Ok(Response::new(UpvoteCryptoResponse {
            crypto: Some(crypto.into()),
        }))
    }

    #[tracing::instrument(skip_all, fields(id = %req.get_ref().id))]
    async fn downvote_crypto(
        &self,
        req: Request<DownvoteCryptoRequest>,
    ) -> Result<Response<DownvoteCryptoResponse>, Status> {
        let crypto = self.vote(&req.get_ref().id, VoteCounter::Downvotes).await?;
        Ok(Response::new(DownvoteCryptoResponse {
            crypto: Some(crypto.into()),
        }))
    }

    #[tracing::instrument(skip_all, fields(id = %req.get_ref().id))]
    async fn get_vote_sum(
        &self,
        req: Request<GetVoteSumRequest>,
    ) -> Result<Response<GetVoteSumResponse>, Status> {
        self.ensure_serving()?;
        let id: CryptoId = req.into_inner().id.parse()?;

        let crypto = self.store.find_by_id(&id).await?;
        Ok(Response::new(GetVoteSumResponse {
            votes: crypto.vote_sum(),
        }))
    }

    /// Starts a live vote-sum stream for one record.
    ///
    /// Unknown or malformed ids are refused before anything is registered.
    /// Once started the stream never fails: it ends cleanly when the caller
    /// cancels, its deadline passes, or the service shuts down.
    #[tracing::instrument(skip_all, fields(id = %req.get_ref().id))]
    async fn stream_vote_sum(
        &self,
        req: Request<StreamVoteSumRequest>,
    ) -> Result<Response<Self::StreamVoteSumStream>, Status> {
        self.ensure_serving()?;
        let call = CallContext::from_metadata(req.metadata(), &self.shutdown_token);
        let id: CryptoId = req.into_inner().id.parse()?;

        self.store.find_by_id(&id).await?;

        let buffers = StreamBuffers {
            subscriber: self.config.subscriber_buffer_size,
            response: self.config.stream_buffer_size,
        };
        let stream = spawn_vote_sum_stream(self.registry(), id, call, buffers);
        Ok(Response::new(Box::pin(stream)))
    }
}
