//! # Fallback Executor
//!
//! "Try the remote, otherwise use local data" for reads.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  offline_first && offline ─────────────────────────► fallback (Local)   │
//! │                                                                         │
//! │  resolve_provider() ── Local ──────────────────────► fallback (Local)   │
//! │          │                                                              │
//! │        Remote ──► primary ── Ok ───────────────────► data (Remote)      │
//! │                      │                                                  │
//! │                     Err ──► mark remote unavailable                     │
//! │                             on_fallback(&err) ─────► fallback (Local)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The fallback returns `T`, not `Result`, so the composed call cannot fail.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use beli_core::Provider;

use crate::resolver::ProviderResolver;

/// Callback invoked with the primary's error before falling back.
pub type FallbackHook<'a> = &'a (dyn Fn(&(dyn std::error::Error + 'static)) + Send + Sync);

/// Data plus the provider that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub provider: Provider,
}

impl<T> Fetched<T> {
    pub fn is_remote(&self) -> bool {
        self.provider.is_remote()
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// Per-call options.
#[derive(Clone, Copy)]
pub struct FallbackOptions<'a> {
    /// Skip resolution entirely while offline.
    pub offline_first: bool,

    /// Operation name for logs.
    pub name: Option<&'a str>,

    pub on_fallback: Option<FallbackHook<'a>>,
}

impl Default for FallbackOptions<'_> {
    fn default() -> Self {
        FallbackOptions {
            offline_first: true,
            name: None,
            on_fallback: None,
        }
    }
}

impl<'a> FallbackOptions<'a> {
    pub fn named(name: &'a str) -> Self {
        FallbackOptions {
            name: Some(name),
            ..Default::default()
        }
    }

    pub fn offline_first(mut self, enabled: bool) -> Self {
        self.offline_first = enabled;
        self
    }

    pub fn on_fallback(mut self, hook: FallbackHook<'a>) -> Self {
        self.on_fallback = Some(hook);
        self
    }
}

impl std::fmt::Debug for FallbackOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOptions")
            .field("offline_first", &self.offline_first)
            .field("name", &self.name)
            .field("on_fallback", &self.on_fallback.is_some())
            .finish()
    }
}

/// Runs reads against the provider the resolver picks.
#[derive(Debug, Clone)]
pub struct FallbackExecutor {
    resolver: Arc<ProviderResolver>,
}

impl FallbackExecutor {
    pub fn new(resolver: Arc<ProviderResolver>) -> Self {
        FallbackExecutor { resolver }
    }

    pub fn resolver(&self) -> &Arc<ProviderResolver> {
        &self.resolver
    }

    /// Runs `primary` when the remote is selected, `fallback` otherwise or
    /// when `primary` fails. A primary failure marks the remote unavailable
    /// for the rest of the TTL window.
    pub async fn with_fallback<T, E, P, PFut, F, FFut>(
        &self,
        primary: P,
        fallback: F,
        options: FallbackOptions<'_>,
    ) -> Fetched<T>
    where
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
        F: FnOnce() -> FFut,
        FFut: Future<Output = T>,
    {
        let name = options.name.unwrap_or("request");

        if options.offline_first && !self.resolver.monitor().is_online() {
            debug!(operation = name, "Offline, serving local data");
            return Fetched {
                data: fallback().await,
                provider: Provider::Local,
            };
        }

        if self.resolver.resolve_provider().await == Provider::Local {
            return Fetched {
                data: fallback().await,
                provider: Provider::Local,
            };
        }

        match primary().await {
            Ok(data) => Fetched {
                data,
                provider: Provider::Remote,
            },
            Err(error) => {
                self.resolver.invalidate();
                self.resolver.mark_unavailable();
                warn!(operation = name, error = %error, "Remote failed, falling back to local data");

                if let Some(hook) = options.on_fallback {
                    hook(&error);
                }

                Fetched {
                    data: fallback().await,
                    provider: Provider::Local,
                }
            }
        }
    }
}
