//! SDP offer companion: turns a browser offer into an answer.
//!
//! Each answered peer connection is handed to a background task that closes
//! it once the connection fails, the lifetime cap passes or the server shuts
//! down. Remote tracks are logged and never read.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use bytes::Bytes;
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::error::ApiError;
use crate::metrics as names;
use crate::rest::parse_body;
use crate::server::AppState;

/// Offer companion failures.
#[derive(Debug, Error)]
pub enum OfferError {
    /// The submitted SDP could not be parsed or applied.
    #[error("invalid offer: {0}")]
    InvalidOffer(webrtc::Error),
    /// Building the peer connection or the answer failed.
    #[error("peer connection failed: {0}")]
    PeerConnection(webrtc::Error),
    /// ICE gathering ended without a local description.
    #[error("no local description after ICE gathering")]
    MissingLocalDescription,
}

impl OfferError {
    /// Whether the caller sent something unusable.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidOffer(_))
    }
}

/// Body of `POST /webrtc/offer`, and of its response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDescriptionBody {
    /// SDP text.
    pub sdp: String,
}

/// Answers SDP offers with fresh peer connections.
pub struct OfferResponder {
    api: API,
    ice_servers: Vec<String>,
    max_lifetime: Duration,
    shutdown: CancellationToken,
}

impl OfferResponder {
    /// Build the WebRTC stack with the default codec set.
    pub fn new(
        ice_servers: Vec<String>,
        max_lifetime: Duration,
        shutdown: CancellationToken,
    ) -> Result<Self, webrtc::Error> {
        let mut media = MediaEngine::default();
        media.register_default_codecs()?;
        let api = APIBuilder::new().with_media_engine(media).build();
        Ok(Self {
            api,
            ice_servers,
            max_lifetime,
            shutdown,
        })
    }

    fn configuration(&self) -> RTCConfiguration {
        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };
        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }

    /// Apply `offer_sdp`, gather candidates and return the answer SDP.
    pub async fn answer(&self, offer_sdp: String) -> Result<String, OfferError> {
        let offer = RTCSessionDescription::offer(offer_sdp).map_err(OfferError::InvalidOffer)?;

        let peer = Arc::new(
            self.api
                .new_peer_connection(self.configuration())
                .await
                .map_err(OfferError::PeerConnection)?,
        );

        match negotiate(&peer, offer).await {
            Ok(sdp) => {
                self.supervise(peer);
                Ok(sdp)
            }
            Err(err) => {
                if let Err(close_err) = peer.close().await {
                    debug!(error = %close_err, "closing failed peer");
                }
                Err(err)
            }
        }
    }

    /// Own `peer` until it fails, outlives its cap or the server stops.
    fn supervise(&self, peer: Arc<RTCPeerConnection>) {
        let done = self.shutdown.child_token();

        let on_state = done.clone();
        peer.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            debug!(?state, "peer connection state changed");
            if matches!(
                state,
                RTCPeerConnectionState::Failed
                    | RTCPeerConnectionState::Closed
                    | RTCPeerConnectionState::Disconnected
            ) {
                on_state.cancel();
            }
            Box::pin(async {})
        }));

        peer.on_track(Box::new(|track, _receiver, _transceiver| {
            info!(kind = ?track.kind(), ssrc = track.ssrc(), "remote track received, not consumed");
            Box::pin(async {})
        }));

        let lifetime = self.max_lifetime;
        drop(tokio::spawn(
            async move {
                tokio::select! {
                    () = done.cancelled() => {}
                    () = tokio::time::sleep(lifetime) => {
                        debug!(?lifetime, "peer lifetime reached");
                    }
                }
                if let Err(err) = peer.close().await {
                    warn!(error = %err, "closing peer connection failed");
                }
                debug!("peer connection closed");
            }
            .in_current_span(),
        ));
    }
}

async fn negotiate(
    peer: &RTCPeerConnection,
    offer: RTCSessionDescription,
) -> Result<String, OfferError> {
    peer.set_remote_description(offer)
        .await
        .map_err(OfferError::InvalidOffer)?;
    let answer = peer
        .create_answer(None)
        .await
        .map_err(OfferError::PeerConnection)?;
    let mut gathered = peer.gathering_complete_promise().await;
    peer.set_local_description(answer)
        .await
        .map_err(OfferError::PeerConnection)?;
    let _ = gathered.recv().await;

    peer.local_description()
        .await
        .map(|desc| desc.sdp)
        .ok_or(OfferError::MissingLocalDescription)
}

/// POST `/webrtc/offer`
pub async fn offer_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SessionDescriptionBody>, ApiError> {
    let req: SessionDescriptionBody = parse_body(&body)?;
    counter!(names::WEBRTC_OFFERS_TOTAL).increment(1);
    match state.offer.answer(req.sdp).await {
        Ok(sdp) => Ok(Json(SessionDescriptionBody { sdp })),
        Err(err) => {
            warn!(error = %err, "offer failed");
            counter!(names::WEBRTC_OFFER_FAILURES_TOTAL).increment(1);
            Err(err.into())
        }
    }
}
