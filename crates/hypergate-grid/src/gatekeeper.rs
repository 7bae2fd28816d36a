//! Gatekeeper-connector seam for the remote link handshake.
//!
//! The gatekeeper is the service role on the destination grid that
//! accepts or refuses an incoming region link. The linker only needs the
//! canonical answer from that handshake, so the connector is a trait the
//! composition root wires with either the HTTP client or a test double.

use hypergate_types::GridRegion;
use std::collections::HashMap;
use url::form_urlencoded;
use uuid::Uuid;

/// Canonical answer from a successful link handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReply {
    /// The remote region's authoritative id.
    pub region_id: Uuid,
    /// Packed 64-bit coordinate handle on the remote grid's map.
    pub handle: u64,
    /// The remote side's authoritative external name, usually a URI.
    pub external_name: String,
    /// Map-image reference, when the remote side offers one.
    pub image_url: Option<String>,
}

/// Remote handshake against a destination grid's gatekeeper.
pub trait GatekeeperConnector: Send + Sync {
    /// Performs the link handshake for the provisional region. Transport
    /// failures and refusals both come back as `Err(reason)`.
    fn link_region(&self, region: &GridRegion) -> Result<LinkReply, String>;
}

/// HTTP gatekeeper connector over the keyed-parameter transport.
///
/// Blocking by design: the linker runs on blocking tasks alongside its
/// directory writes, one attempt per call with the standard bounded
/// timeout.
pub struct GatekeeperHttpClient {
    http: reqwest::blocking::Client,
}

impl Default for GatekeeperHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GatekeeperHttpClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
        }
    }
}

impl GatekeeperConnector for GatekeeperHttpClient {
    fn link_region(&self, region: &GridRegion) -> Result<LinkReply, String> {
        let uri = format!("{}/rpc/link_region", region.server_uri());
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("region_name", &region.name)
            .finish();

        tracing::debug!(uri = %uri, region = %region.name, "linking to remote gatekeeper");

        let response = self
            .http
            .post(&uri)
            .timeout(crate::linker::LINK_TIMEOUT)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .map_err(|e| format!("unable to contact gatekeeper: {e}"))?;

        let text = response
            .text()
            .map_err(|e| format!("gatekeeper reply unreadable: {e}"))?;
        let hash: HashMap<String, String> = form_urlencoded::parse(text.as_bytes())
            .into_owned()
            .collect();

        let accepted = hash
            .get("result")
            .is_some_and(|r| r.eq_ignore_ascii_case("true"));
        if !accepted {
            return Err(hash
                .get("message")
                .cloned()
                .unwrap_or_else(|| "remote region could not be found".into()));
        }

        let region_id = hash
            .get("uuid")
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| "gatekeeper reply missing region uuid".to_string())?;
        let handle = hash
            .get("handle")
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| "gatekeeper reply missing region handle".to_string())?;
        let external_name = hash
            .get("region_name")
            .cloned()
            .unwrap_or_else(|| region.server_uri());

        Ok(LinkReply {
            region_id,
            handle,
            external_name,
            image_url: hash.get("region_image").cloned(),
        })
    }
}
