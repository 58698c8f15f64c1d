//! Target URL resolution and path handling for proxy requests

use crate::proxy::headers::paths;
use crate::proxy::types::*;
use http::uri::{Authority, PathAndQuery, Scheme};
use hyper::Uri;

/// A configured target that parsed as an absolute backend URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTarget {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
    query: Option<String>,
}

impl ResolvedTarget {
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Path component of the target, without a trailing slash
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

/// Strategy for resolving target URLs and handling path composition
pub struct UrlResolver;

impl UrlResolver {
    /// Parse a configured target into its absolute parts
    ///
    /// Only `http` targets are accepted; the gateway does not originate TLS.
    pub fn parse_target(target: &TargetUrl) -> ProxyResult<ResolvedTarget> {
        let raw = target.as_ref();
        let uri: Uri = raw
            .parse()
            .map_err(|e| ProxyError::invalid_target(raw.to_string(), format!("{e}")))?;

        let scheme = uri
            .scheme()
            .cloned()
            .ok_or_else(|| ProxyError::invalid_target(raw.to_string(), "missing scheme"))?;
        if scheme != Scheme::HTTP {
            return Err(ProxyError::invalid_target(
                raw.to_string(),
                format!("unsupported scheme '{scheme}'"),
            ));
        }

        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| ProxyError::invalid_target(raw.to_string(), "missing host"))?;
        if authority.host().is_empty() {
            return Err(ProxyError::invalid_target(raw.to_string(), "missing host"));
        }

        Ok(ResolvedTarget {
            scheme,
            authority,
            base_path: uri.path().trim_end_matches('/').to_string(),
            query: uri.query().filter(|q| !q.is_empty()).map(str::to_string),
        })
    }

    /// Resolve the final URI for the outgoing request
    ///
    /// - The matched prefix is stripped from the incoming path
    /// - The remainder is appended to the target's own path, which is kept
    /// - The incoming query string is forwarded verbatim, after the target's
    ///   query if it has one
    pub fn resolve_target_uri(
        target: &ResolvedTarget,
        prefix: &RoutePrefix,
        original_uri: &Uri,
    ) -> ProxyResult<Uri> {
        let original_path = original_uri.path();
        let remainder = original_path
            .strip_prefix(prefix.as_ref())
            .unwrap_or(original_path);

        let path = join_paths(&target.base_path, remainder);
        let path_and_query = match (target.query.as_deref(), original_uri.query()) {
            (Some(base), Some(query)) => format!("{path}?{base}&{query}"),
            (Some(base), None) => format!("{path}?{base}"),
            (None, Some(query)) => format!("{path}?{query}"),
            (None, None) => path,
        };

        let path_and_query: PathAndQuery = path_and_query.parse().map_err(|e| {
            ProxyError::invalid_target(format!("{}{path_and_query}", target.authority), format!("{e}"))
        })?;

        Ok(Uri::builder()
            .scheme(target.scheme.clone())
            .authority(target.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }
}

/// Join a base path and a remainder, dropping only the remainder's first slash
fn join_paths(base: &str, remainder: &str) -> String {
    let remainder = remainder.strip_prefix('/').unwrap_or(remainder);
    match (base.is_empty(), remainder.is_empty()) {
        (true, true) => paths::DEFAULT.to_string(),
        (false, true) => base.to_string(),
        _ => format!("{base}/{remainder}"),
    }
}
