//! Adapter registry
//!
//! Maps the backend, frontend and remote type identifiers stored on a station to
//! the implementation that serves them. The table is built once at startup from
//! the bootstrap configuration and shared by reference afterwards.

use crate::error::{Error, Result};
use crate::liquidsoap::Liquidsoap;
use radio_common::config::TomlConfig;
use radio_common::models::{Remote, Station, DEFAULT_BACKEND_TYPE, DEFAULT_FRONTEND_TYPE};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Closed set of adapter identifiers of one kind
pub trait AdapterKind: Copy + Eq + FromStr<Err = Error> + 'static {
    const ALL: &'static [Self];

    fn id(self) -> &'static str;

    /// Human-readable label for selection lists
    fn name(self) -> &'static str;
}

macro_rules! adapter_kind {
    ($kind:ident, $label:literal, { $($variant:ident => ($id:literal, $name:literal)),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $kind {
            $($variant),+
        }

        impl AdapterKind for $kind {
            const ALL: &'static [Self] = &[$($kind::$variant),+];

            fn id(self) -> &'static str {
                match self {
                    $($kind::$variant => $id),+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $($kind::$variant => $name),+
                }
            }
        }

        impl FromStr for $kind {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|kind| kind.id() == s)
                    .ok_or_else(|| Error::NotFound(format!("{} adapter not found: {}", $label, s)))
            }
        }
    };
}

adapter_kind!(BackendKind, "Backend", {
    Liquidsoap => ("liquidsoap", "Use Liquidsoap on this server"),
    None => ("none", "Do not use an AutoDJ service"),
});

adapter_kind!(FrontendKind, "Frontend", {
    Icecast => ("icecast", "Use Icecast 2.4 on this server"),
    Shoutcast2 => ("shoutcast2", "Use SHOUTcast DNAS 2 on this server"),
    Remote => ("remote", "Connect to a remote radio server"),
});

adapter_kind!(RemoteKind, "Remote", {
    Shoutcast1 => ("shoutcast1", "SHOUTcast 1"),
    Shoutcast2 => ("shoutcast2", "SHOUTcast 2"),
    Icecast => ("icecast", "Icecast"),
});

impl RemoteKind {
    /// SHOUTcast relays only accept the legacy ICY source protocol
    pub fn uses_icy_protocol(self) -> bool {
        matches!(self, RemoteKind::Shoutcast1 | RemoteKind::Shoutcast2)
    }
}

/// Listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterInfo<K> {
    pub kind: K,
    pub id: &'static str,
    pub name: &'static str,
}

impl<K: AdapterKind> AdapterInfo<K> {
    fn of(kind: K) -> Self {
        Self {
            kind,
            id: kind.id(),
            name: kind.name(),
        }
    }
}

fn first_existing(candidates: &[PathBuf]) -> Option<&Path> {
    candidates.iter().map(PathBuf::as_path).find(|p| p.exists())
}

// ========================================
// Implementations
// ========================================

/// Backend implementation selected by a station's backend type
#[derive(Debug, Clone)]
pub enum Backend {
    Liquidsoap(Liquidsoap),
    /// Stations without an AutoDJ: nothing to compile or control
    None,
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Liquidsoap(_) => BackendKind::Liquidsoap,
            Backend::None => BackendKind::None,
        }
    }

    pub fn is_installed(&self) -> bool {
        match self {
            Backend::Liquidsoap(liquidsoap) => liquidsoap.binary().is_some(),
            Backend::None => true,
        }
    }

    pub fn as_liquidsoap(&self) -> Result<&Liquidsoap> {
        match self {
            Backend::Liquidsoap(liquidsoap) => Ok(liquidsoap),
            Backend::None => Err(Error::Unsupported(
                "station has no AutoDJ backend".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frontend {
    kind: FrontendKind,
    binaries: Vec<PathBuf>,
}

impl Frontend {
    pub fn kind(&self) -> FrontendKind {
        self.kind
    }

    pub fn binary(&self) -> Option<&Path> {
        first_existing(&self.binaries)
    }

    pub fn is_installed(&self) -> bool {
        match self.kind {
            FrontendKind::Remote => true,
            _ => self.binary().is_some(),
        }
    }
}

// ========================================
// Registry
// ========================================

#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    backends: Vec<Backend>,
    frontends: Vec<Frontend>,
    remotes: Vec<RemoteKind>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            frontends: Vec::new(),
            remotes: Vec::new(),
        }
    }

    /// Every known adapter, configured from the bootstrap file
    pub fn from_config(config: &TomlConfig) -> Self {
        let mut registry = Self::new();
        registry.register_backend(Backend::Liquidsoap(Liquidsoap::from_config(config)));
        registry.register_backend(Backend::None);
        registry.register_frontend(FrontendKind::Icecast, config.icecast_binaries.clone());
        registry.register_frontend(FrontendKind::Shoutcast2, config.shoutcast_binaries.clone());
        registry.register_frontend(FrontendKind::Remote, Vec::new());
        for kind in RemoteKind::ALL {
            registry.register_remote(*kind);
        }
        registry
    }

    pub fn register_backend(&mut self, backend: Backend) {
        self.backends.retain(|b| b.kind() != backend.kind());
        self.backends.push(backend);
    }

    pub fn register_frontend(&mut self, kind: FrontendKind, binaries: Vec<PathBuf>) {
        self.frontends.retain(|f| f.kind != kind);
        self.frontends.push(Frontend { kind, binaries });
    }

    pub fn register_remote(&mut self, kind: RemoteKind) {
        if !self.remotes.contains(&kind) {
            self.remotes.push(kind);
        }
    }

    pub fn backend(&self, backend_type: &str) -> Result<&Backend> {
        let kind: BackendKind = backend_type.parse()?;
        self.backends
            .iter()
            .find(|b| b.kind() == kind)
            .ok_or_else(|| Error::NotFound(format!("Backend adapter not registered: {}", backend_type)))
    }

    /// Backend for a station; an empty type means the default backend
    pub fn backend_for(&self, station: &Station) -> Result<&Backend> {
        let backend_type = non_empty_or(&station.backend_type, DEFAULT_BACKEND_TYPE);
        debug!(station_id = station.id, backend_type, "Resolving backend adapter");
        self.backend(backend_type)
    }

    pub fn frontend(&self, frontend_type: &str) -> Result<&Frontend> {
        let kind: FrontendKind = frontend_type.parse()?;
        self.frontends
            .iter()
            .find(|f| f.kind == kind)
            .ok_or_else(|| Error::NotFound(format!("Frontend adapter not registered: {}", frontend_type)))
    }

    pub fn frontend_for(&self, station: &Station) -> Result<&Frontend> {
        self.frontend(non_empty_or(&station.frontend_type, DEFAULT_FRONTEND_TYPE))
    }

    pub fn remote_adapter(&self, remote: &Remote) -> Result<RemoteKind> {
        let kind: RemoteKind = remote.remote_type.parse()?;
        if self.remotes.contains(&kind) {
            Ok(kind)
        } else {
            Err(Error::NotFound(format!("Remote adapter not registered: {}", remote.remote_type)))
        }
    }

    /// One adapter per station remote, in the station's order
    pub fn remote_adapters(&self, station: &Station) -> Result<Vec<RemoteKind>> {
        station.remotes.iter().map(|r| self.remote_adapter(r)).collect()
    }

    /// Registered backends, optionally only those whose runtime is present
    pub fn list_backends(&self, check_installed: bool) -> Vec<AdapterInfo<BackendKind>> {
        self.backends
            .iter()
            .filter(|b| !check_installed || b.is_installed())
            .map(|b| AdapterInfo::of(b.kind()))
            .collect()
    }

    pub fn list_frontends(&self, check_installed: bool) -> Vec<AdapterInfo<FrontendKind>> {
        self.frontends
            .iter()
            .filter(|f| !check_installed || f.is_installed())
            .map(|f| AdapterInfo::of(f.kind))
            .collect()
    }

    pub fn list_remotes(&self) -> Vec<AdapterInfo<RemoteKind>> {
        self.remotes.iter().map(|k| AdapterInfo::of(*k)).collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}
