//! Hyperlink establishment and teardown.
//!
//! Drives the link handshake against a remote gatekeeper, persists the
//! resulting hyperlink row, and enforces the distance invariant: client
//! map addressing wraps beyond 4096 region-widths from the grid's
//! default region, so links past that bound are rejected outright.

use crate::directory::{DirectoryError, RegionDirectory};
use crate::gatekeeper::GatekeeperConnector;
use hypergate_types::region::unpack_handle;
use hypergate_types::{region_flags, GridRegion, REGION_SIZE};
use rand::Rng;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Bounded timeout for the gatekeeper handshake.
pub const LINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Map addressing in client software breaks beyond this many region-widths
/// from the default region.
const MAX_LINK_DISTANCE_REGIONS: i64 = 4096;

/// Map tile shown for hyperlink regions; no image is fetched from the
/// remote side.
const HG_MAP_IMAGE: Uuid = Uuid::from_u128(0x00000000_0000_1111_9999_000000000013);

/// Errors establishing or removing a hyperlink. The display form is the
/// operator-visible reason string.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Malformed hostname")]
    MalformedHostname,
    #[error("{0}")]
    RemoteHandshake(String),
    #[error("Region is too far ({x}, {y})")]
    TooFar { x: u32, y: u32 },
    #[error("database error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Establishes, persists, and tears down hyperlinks to remote regions.
pub struct HypergridLinker {
    directory: RegionDirectory,
    gatekeeper: Arc<dyn GatekeeperConnector>,
    scope_id: Uuid,
}

impl HypergridLinker {
    pub fn new(
        directory: RegionDirectory,
        gatekeeper: Arc<dyn GatekeeperConnector>,
        scope_id: Uuid,
    ) -> Self {
        Self {
            directory,
            gatekeeper,
            scope_id,
        }
    }

    /// Links a region described by `host[:port[:name]]` at a random map
    /// slot: X uniform over the positive coordinate range, Y = 0.
    pub fn link_region(&self, scope_id: Uuid, descriptor: &str) -> Result<GridRegion, LinkError> {
        let xloc = rand::thread_rng().gen_range(0..i16::MAX as i32) * REGION_SIZE as i32;
        self.try_link_to_coords(scope_id, descriptor, xloc, 0)
    }

    /// Links a region described by `host[:port[:name]]` at the given
    /// coordinates (meters). The host is DNS-resolved before anything
    /// touches the network; an unresolvable host fails fast.
    pub fn try_link_to_coords(
        &self,
        scope_id: Uuid,
        descriptor: &str,
        xloc: i32,
        yloc: i32,
    ) -> Result<GridRegion, LinkError> {
        let (host, port, name) = parse_descriptor(descriptor);

        if (host.as_str(), port)
            .to_socket_addrs()
            .map(|mut addrs| addrs.next().is_none())
            .unwrap_or(true)
        {
            return Err(LinkError::MalformedHostname);
        }

        self.try_create_link(scope_id, xloc, yloc, &name, port, &host)
    }

    /// Core link path: remote handshake, idempotency check, persistence,
    /// distance invariant.
    pub fn try_create_link(
        &self,
        scope_id: Uuid,
        xloc: i32,
        yloc: i32,
        external_region_name: &str,
        external_port: u16,
        external_host: &str,
    ) -> Result<GridRegion, LinkError> {
        tracing::debug!(
            host = external_host,
            port = external_port,
            x = xloc,
            y = yloc,
            "linking remote region"
        );

        let mut region = GridRegion {
            scope_id,
            name: external_region_name.to_string(),
            external_host: external_host.to_string(),
            http_port: external_port,
            loc_x: xloc,
            loc_y: yloc,
            ..Default::default()
        };

        let reply = self
            .gatekeeper
            .link_region(&region)
            .map_err(LinkError::RemoteHandshake)?;

        if reply.region_id.is_nil() {
            return Err(LinkError::RemoteHandshake(
                "remote region could not be found".into(),
            ));
        }

        // A link to an already-known region is idempotent, not an error.
        if let Some(existing) = self.directory.get_by_uuid(scope_id, reply.region_id)? {
            tracing::debug!(
                region_id = %existing.region_id,
                x = existing.loc_x / REGION_SIZE as i32,
                y = existing.loc_y / REGION_SIZE as i32,
                "region already linked"
            );
            return Ok(existing);
        }

        region.region_id = reply.region_id;

        // The authoritative external name corrects host and port when it
        // parses as a URI.
        match url::Url::parse(&reply.external_name) {
            Ok(uri) => {
                if let Some(host) = uri.host_str() {
                    region.external_host = host.to_string();
                }
                if let Some(port) = uri.port_or_known_default() {
                    region.http_port = port;
                }
            }
            Err(_) => tracing::warn!(
                host = %region.external_host,
                external_name = %reply.external_name,
                "remote gatekeeper provided malformed external name"
            ),
        }
        region.name = format!(
            "{}:{}:{}",
            region.external_host, region.http_port, external_region_name
        );
        region.map_image = HG_MAP_IMAGE;

        self.directory
            .store(&region, region_flags::HYPERLINK_DEFAULTS)?;
        tracing::info!(region_id = %region.region_id, "successfully linked remote region");

        if let Err((x, y)) = self.check_4096(reply.handle)? {
            self.directory.delete(region.region_id)?;
            tracing::info!(x, y, "unable to link, region is too far");
            return Err(LinkError::TooFar { x, y });
        }

        tracing::debug!("link region succeeded");
        Ok(region)
    }

    /// Removes a hyperlink found by `host:port` or by local display name.
    /// Returns `false` when no linked region matches the descriptor.
    pub fn try_unlink_region(&self, descriptor: &str) -> Result<bool, LinkError> {
        let region = if descriptor.contains(':') {
            let (host, port, _) = parse_descriptor(descriptor);
            self.directory
                .hyperlink_by_host_port(self.scope_id, &host, port)?
        } else {
            self.directory.hyperlink_by_name(self.scope_id, descriptor)?
        };

        match region {
            Some(region) => {
                self.directory.delete(region.region_id)?;
                Ok(true)
            }
            None => {
                tracing::info!(descriptor, "region not found, nothing to unlink");
                Ok(false)
            }
        }
    }

    /// All currently linked regions.
    pub fn hyperlinks(&self) -> Result<Vec<GridRegion>, LinkError> {
        Ok(self.directory.hyperlinks(self.scope_id)?)
    }

    /// Distance invariant. `Ok(Err((x, y)))` names the offending
    /// coordinates in region units.
    fn check_4096(&self, handle: u64) -> Result<Result<(), (u32, u32)>, DirectoryError> {
        let default = self.default_region()?;
        let (ux, uy) = unpack_handle(handle);

        let limit = MAX_LINK_DISTANCE_REGIONS * REGION_SIZE as i64;
        let too_far = (default.loc_x as i64 - ux as i64).abs() >= limit
            || (default.loc_y as i64 - uy as i64).abs() >= limit;

        if too_far {
            Ok(Err((ux / REGION_SIZE, uy / REGION_SIZE)))
        } else {
            Ok(Ok(()))
        }
    }

    /// The grid's authoritative default region; a grid with none gets a
    /// best-guess assumption.
    fn default_region(&self) -> Result<GridRegion, DirectoryError> {
        if let Some(region) = self.directory.default_region(self.scope_id)? {
            return Ok(region);
        }
        tracing::warn!("this grid has no default region, assuming coordinates 1000, 1000");
        Ok(GridRegion::at(
            1000 * REGION_SIZE as i32,
            1000 * REGION_SIZE as i32,
        ))
    }
}

/// Splits a `host[:port[:name]]` descriptor. A second segment that does
/// not parse as a port is taken as the region name instead.
fn parse_descriptor(descriptor: &str) -> (String, u16, String) {
    let mut host = "127.0.0.1".to_string();
    let mut port = 9000u16;
    let mut name = String::new();

    let parts: Vec<&str> = descriptor.split(':').collect();
    if let Some(first) = parts.first() {
        if !first.is_empty() {
            host = first.to_string();
        }
    }
    if let Some(second) = parts.get(1) {
        match second.parse::<u16>() {
            Ok(parsed) => port = parsed,
            Err(_) => name = second.to_string(),
        }
    }
    // Always take the last one.
    if let Some(third) = parts.get(2) {
        name = third.to_string();
    }

    (host, port, name)
}
