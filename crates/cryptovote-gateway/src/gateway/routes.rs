//! HTTP routes and their gRPC counterparts.
//!
//! | Route                         | RPC            |
//! |-------------------------------|----------------|
//! | `POST /crypto`                | CreateCrypto   |
//! | `GET /crypto`                 | ReadAllCrypto  |
//! | `GET /crypto/{id}`            | ReadCryptoById |
//! | `PUT /crypto`                 | UpdateCrypto   |
//! | `DELETE /crypto/{id}`         | DeleteCrypto   |
//! | `POST /crypto/upvote/{id}`    | UpvoteCrypto   |
//! | `POST /crypto/downvote/{id}`  | DownvoteCrypto |
//! | `GET /cryptoSum/{id}`         | GetVoteSum     |
//! | `GET /cryptoSumStream/{id}`   | StreamVoteSum  |
//!
//! `GET /cryptoSumStream/{id}` answers with `text/event-stream`: one `votes`
//! event per update, until the upstream stream ends or the HTTP client goes
//! away. Dropping the HTTP response cancels the upstream call.

use super::{
    dto::{CryptoBody, Deleted, Envelope, VoteSum},
    error::GatewayError,
};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use core::convert::Infallible;
use cryptovote_core::proto::{
    CreateCryptoRequest, Cryptocurrency, DeleteCryptoRequest, DownvoteCryptoRequest,
    GetVoteSumRequest, ReadAllCryptoRequest, ReadCryptoByIdRequest, StreamVoteSumRequest,
    UpdateCryptoRequest, UpvoteCryptoRequest, upvote_system_client::UpvoteSystemClient,
};
use tokio_stream::{Stream, StreamExt};
use tonic::transport::Channel;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub type Client = UpvoteSystemClient<Channel>;

type JsonResult<T> = Result<Json<Envelope<T>>, GatewayError>;

/// Builds the gateway router over an upstream client.
pub fn router(client: Client) -> Router {
    Router::new()
        .route("/crypto", post(create_crypto).get(read_all_crypto).put(update_crypto))
        .route("/crypto/{id}", get(read_crypto_by_id).delete(delete_crypto))
        .route("/crypto/upvote/{id}", post(upvote_crypto))
        .route("/crypto/downvote/{id}", post(downvote_crypto))
        .route("/cryptoSum/{id}", get(get_vote_sum))
        .route("/cryptoSumStream/{id}", get(stream_vote_sum))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(client)
}

fn record(crypto: Option<Cryptocurrency>) -> JsonResult<CryptoBody> {
    let crypto = crypto.ok_or(GatewayError::EmptyResponse)?;
    Ok(Json(Envelope::new(crypto.into())))
}

async fn create_crypto(
    State(mut client): State<Client>,
    payload: Result<Json<CryptoBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<CryptoBody>>), GatewayError> {
    let Json(body) = payload?;
    let resp = client
        .create_crypto(CreateCryptoRequest {
            crypto: Some(body.into()),
        })
        .await?
        .into_inner();
    Ok((StatusCode::CREATED, record(resp.crypto)?))
}

async fn read_all_crypto(State(mut client): State<Client>) -> JsonResult<Vec<CryptoBody>> {
    let mut stream = client
        .read_all_crypto(ReadAllCryptoRequest {})
        .await?
        .into_inner();

    let mut records = Vec::new();
    while let Some(resp) = stream.next().await {
        if let Some(crypto) = resp?.crypto {
            records.push(crypto.into());
        }
    }
    Ok(Json(Envelope::new(records)))
}

async fn read_crypto_by_id(
    State(mut client): State<Client>,
    Path(id): Path<String>,
) -> JsonResult<CryptoBody> {
    let resp = client
        .read_crypto_by_id(ReadCryptoByIdRequest { id })
        .await?
        .into_inner();
    record(resp.crypto)
}

async fn update_crypto(
    State(mut client): State<Client>,
    payload: Result<Json<CryptoBody>, JsonRejection>,
) -> JsonResult<CryptoBody> {
    let Json(body) = payload?;
    let resp = client
        .update_crypto(UpdateCryptoRequest {
            crypto: Some(body.into()),
        })
        .await?
        .into_inner();
    record(resp.crypto)
}

async fn delete_crypto(
    State(mut client): State<Client>,
    Path(id): Path<String>,
) -> JsonResult<Deleted> {
    let resp = client
        .delete_crypto(DeleteCryptoRequest { id })
        .await?
        .into_inner();
    Ok(Json(Envelope::new(Deleted {
        success: resp.success,
    })))
}

async fn upvote_crypto(
    State(mut client): State<Client>,
    Path(id): Path<String>,
) -> JsonResult<CryptoBody> {
    let resp = client
        .upvote_crypto(UpvoteCryptoRequest { id })
        .await?
        .into_inner();
    record(resp.crypto)
}

async fn downvote_crypto(
    State(mut client): State<Client>,
    Path(id): Path<String>,
) -> JsonResult<CryptoBody> {
    let resp = client
        .downvote_crypto(DownvoteCryptoRequest { id })
        .await?
        .into_inner();
    record(resp.crypto)
}

async fn get_vote_sum(
    State(mut client): State<Client>,
    Path(id): Path<String>,
) -> JsonResult<VoteSum> {
    let resp = client
        .get_vote_sum(GetVoteSumRequest { id })
        .await?
        .into_inner();
    Ok(Json(Envelope::new(VoteSum { votes: resp.votes })))
}

async fn stream_vote_sum(
    State(mut client): State<Client>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, GatewayError> {
    let upstream = client
        .stream_vote_sum(StreamVoteSumRequest { id: id.clone() })
        .await?
        .into_inner();
    tracing::debug!(%id, "Relaying vote-sum stream");

    let events = upstream.map_while(move |resp| match resp {
        Ok(resp) => Some(Ok(Event::default()
            .event("votes")
            .data(resp.votes.to_string()))),
        Err(status) => {
            tracing::debug!(%id, "Vote-sum stream ended: {status}");
            None
        }
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, Response},
    };
    use cryptovote_server::server::{
        config::ServerConfig,
        service::{CryptoService, build_crypto_service},
        store::MemoryStore,
    };
    use serde_json::{Value, json};
    use std::{net::SocketAddr, sync::Arc, time::Duration};
    use tokio::{net::TcpListener, time::timeout};
    use tokio_stream::wrappers::TcpListenerStream;
    use tokio_util::sync::CancellationToken;
    use tonic::transport::{Endpoint, Server};
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        service: CryptoService,
        stop: CancellationToken,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.stop.cancel();
        }
    }

    async fn upstream(service: CryptoService, stop: CancellationToken) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(
            Server::builder()
                .add_service(build_crypto_service(service))
                .serve_with_incoming_shutdown(
                    TcpListenerStream::new(listener),
                    stop.cancelled_owned(),
                ),
        );
        addr
    }

    async fn harness() -> Harness {
        let service = CryptoService::new(ServerConfig::default(), Arc::new(MemoryStore::new()));
        let stop = CancellationToken::new();
        let addr = upstream(service.clone(), stop.clone()).await;
        let channel = Endpoint::from_shared(format!("http://{addr}"))
            .unwrap()
            .connect()
            .await
            .unwrap();
        Harness {
            app: router(UpvoteSystemClient::new(channel)),
            service,
            stop,
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(resp: Response<Body>) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router, name: &str) -> String {
        let resp = send(
            app,
            "POST",
            "/crypto",
            Some(json!({ "name": name, "description": "test coin" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        json_body(resp).await["result"]["id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn crud_round_trip() {
        let h = harness().await;
        let id = create(&h.app, "Bitcoin").await;

        let resp = send(&h.app, "GET", &format!("/crypto/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["result"]["name"], "Bitcoin");
        assert_eq!(body["result"]["upvote"], 0);

        let resp = send(
            &h.app,
            "PUT",
            "/crypto",
            Some(json!({ "id": id, "name": "BTC", "description": "digital gold" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["result"]["name"], "BTC");

        let resp = send(&h.app, "DELETE", &format!("/crypto/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, json!({ "result": { "success": true } }));

        let resp = send(&h.app, "GET", &format!("/crypto/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(json_body(resp).await["error"].is_string());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn list_keeps_creation_order() {
        let h = harness().await;
        for name in ["Bitcoin", "Ethereum", "Litecoin"] {
            create(&h.app, name).await;
        }

        let resp = send(&h.app, "GET", "/crypto", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        let names: Vec<_> = body["result"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["Bitcoin", "Ethereum", "Litecoin"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn votes_and_sum() {
        let h = harness().await;
        let id = create(&h.app, "Dogecoin").await;

        for _ in 0..3 {
            let resp = send(&h.app, "POST", &format!("/crypto/upvote/{id}"), None).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = send(&h.app, "POST", &format!("/crypto/downvote/{id}"), None).await;
        let body = json_body(resp).await;
        assert_eq!(body["result"]["upvote"], 3);
        assert_eq!(body["result"]["downvote"], 1);

        let resp = send(&h.app, "GET", &format!("/cryptoSum/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, json!({ "result": { "votes": 2 } }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn upstream_errors_map_to_http_statuses() {
        let h = harness().await;
        create(&h.app, "Monero").await;

        let resp = send(&h.app, "GET", "/crypto/not-hex", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(
            &h.app,
            "POST",
            "/crypto",
            Some(json!({ "name": "Monero", "description": "again" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = send(
            &h.app,
            "POST",
            "/crypto",
            Some(json!({ "name": "", "description": "" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await, json!({ "error": "Empty fields" }));

        let missing = "6037662306086867038f7b1d";
        let resp = send(&h.app, "POST", &format!("/crypto/upvote/{missing}"), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn malformed_json_is_a_bad_request() {
        let h = harness().await;
        let req = Request::builder()
            .method("POST")
            .uri("/crypto")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let resp = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid request body")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stream_relays_votes_as_events() {
        let h = harness().await;
        let id = create(&h.app, "Cardano").await;

        let resp = send(&h.app, "GET", &format!("/cryptoSumStream/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "text/event-stream");

        timeout(Duration::from_secs(2), async {
            while h.service.registry().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        send(&h.app, "POST", &format!("/crypto/upvote/{id}"), None).await;

        let mut body = resp.into_body().into_data_stream();
        let mut text = String::new();
        timeout(Duration::from_secs(2), async {
            while !text.contains("data: 1") {
                let chunk = body.next().await.unwrap().unwrap();
                text.push_str(&String::from_utf8_lossy(&chunk));
            }
        })
        .await
        .unwrap();
        assert!(text.contains("event: votes"));

        drop(body);
        timeout(Duration::from_secs(2), async {
            while !h.service.registry().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("upstream stream was not cancelled");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stream_for_unknown_id_is_not_found() {
        let h = harness().await;
        let uri = "/cryptoSumStream/6037662306086867038f7b1d";
        let resp = send(&h.app, "GET", uri, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_unavailable() {
        let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
        let app = router(UpvoteSystemClient::new(channel));

        let resp = send(&app, "GET", "/crypto", None).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
