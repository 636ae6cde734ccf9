//! # Validación de Seguridad
//! src/security/mod.rs
//!
//! Funciones puras que deciden si un request puede llegar a los stores:
//!
//! - `validate_path`: bloquea path traversal (`..`, `./`, paths absolutos del
//!   filesystem, separadores mixtos y variantes percent-encoded).
//! - `validate_host`: exige que el header `Host` coincida con la identidad
//!   del servidor (`host:port`).
//!
//! Ninguna toca el socket, por lo que se prueban de forma aislada.

use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Motivo de rechazo de una validación
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("path traversal attempt")]
    PathTraversal,

    #[error("missing Host header")]
    MissingHost,

    #[error("Host header does not match server: {0}")]
    HostMismatch(String),
}

/// Path relativo y normalizado, garantizado dentro de cualquier raíz a la que
/// se una: solo contiene componentes normales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafePath {
    relative: PathBuf,
}

impl SafePath {
    /// Path relativo a la raíz servida (vacío para `/`)
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Une el path a una raíz
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.relative)
    }

    /// Si el path empieza con el segmento `prefix`, retorna el resto
    ///
    /// ```
    /// use thread_pool_http::security::validate_path;
    ///
    /// let safe = validate_path("/uploads/a.json").unwrap();
    /// let rest = safe.strip_segment("uploads").unwrap();
    /// assert_eq!(rest.relative().to_str(), Some("a.json"));
    /// ```
    pub fn strip_segment(&self, prefix: &str) -> Option<SafePath> {
        self.relative
            .strip_prefix(prefix)
            .ok()
            .map(|rest| SafePath {
                relative: rest.to_path_buf(),
            })
    }

    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }
}

/// Valida un path de URL y lo convierte en un `SafePath`.
///
/// Rechaza con `PathTraversal` si, tras decodificar:
/// - no es un path relativo a la raíz (no empieza con `/`, o empieza con `//`)
/// - es un path absoluto del filesystem (`C:\...`, `\\server\...`)
/// - contiene `..` o la secuencia `./` (con cualquier separador)
/// - contiene bytes nulos o no es UTF-8
/// - algún componente, resuelto léxicamente, no es un nombre normal
///
/// # Ejemplo
/// ```
/// use thread_pool_http::security::{validate_path, SecurityError};
///
/// assert!(validate_path("/about.html").is_ok());
/// assert_eq!(validate_path("/../etc/passwd"), Err(SecurityError::PathTraversal));
/// assert_eq!(validate_path("/%2e%2e/etc/passwd"), Err(SecurityError::PathTraversal));
/// ```
pub fn validate_path(raw_path: &str) -> Result<SafePath, SecurityError> {
    let decoded = percent_decode_str(raw_path)
        .decode_utf8()
        .map_err(|_| SecurityError::PathTraversal)?;

    // Separadores estilo Windows se tratan como '/'
    let normalized = decoded.replace('\\', "/");

    if !normalized.starts_with('/') || normalized.starts_with("//") {
        return Err(SecurityError::PathTraversal);
    }
    if normalized.contains('\0') || normalized.contains("..") || normalized.contains("./") {
        return Err(SecurityError::PathTraversal);
    }

    let mut relative = PathBuf::new();
    for segment in normalized.split('/').filter(|s| !s.is_empty()) {
        // "C:" u otros prefijos de unidad
        if segment.contains(':') || segment == "." {
            return Err(SecurityError::PathTraversal);
        }
        relative.push(segment);
    }

    let lexically_contained = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !lexically_contained {
        return Err(SecurityError::PathTraversal);
    }

    Ok(SafePath { relative })
}

/// Forma `host:port` de una dirección; los literales IPv6 van entre corchetes
///
/// ```
/// use thread_pool_http::security::authority;
///
/// assert_eq!(authority("localhost", 8080), "localhost:8080");
/// assert_eq!(authority("::1", 8080), "[::1]:8080");
/// ```
pub fn authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Authorities (`host:port`) aceptadas en el header Host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPolicy {
    accepted: Vec<String>,
}

impl HostPolicy {
    /// Política para un servidor ligado a `host:port`.
    ///
    /// Si el servidor escucha en loopback o en todas las interfaces, también
    /// se aceptan `localhost:port` y `127.0.0.1:port`.
    pub fn for_server(host: &str, port: u16) -> Self {
        let host = host.trim().to_ascii_lowercase();
        let mut accepted = vec![authority(&host, port)];
        if matches!(host.as_str(), "127.0.0.1" | "localhost" | "0.0.0.0" | "::1" | "::") {
            for alias in ["localhost", "127.0.0.1"] {
                let authority = authority(alias, port);
                if !accepted.contains(&authority) {
                    accepted.push(authority);
                }
            }
        }
        Self { accepted }
    }

    /// Política que acepta exactamente las authorities indicadas
    pub fn exact<I, S>(authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            accepted: authorities
                .into_iter()
                .map(|a| a.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }
}

/// Valida el header Host contra la política del servidor.
///
/// - ausente o vacío → `MissingHost` (400)
/// - distinto (sin distinguir mayúsculas) → `HostMismatch` (403)
///
/// ```
/// use thread_pool_http::security::{validate_host, HostPolicy, SecurityError};
///
/// let policy = HostPolicy::for_server("127.0.0.1", 8080);
/// assert!(validate_host(Some("LOCALHOST:8080"), &policy).is_ok());
/// assert_eq!(validate_host(None, &policy), Err(SecurityError::MissingHost));
/// assert!(matches!(
///     validate_host(Some("evil.com:8080"), &policy),
///     Err(SecurityError::HostMismatch(_))
/// ));
/// ```
pub fn validate_host(host: Option<&str>, policy: &HostPolicy) -> Result<(), SecurityError> {
    let value = host.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(SecurityError::MissingHost);
    }

    let candidate = value.to_ascii_lowercase();
    if policy.accepted.iter().any(|a| *a == candidate) {
        Ok(())
    } else {
        Err(SecurityError::HostMismatch(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        let safe = validate_path("/about.html").unwrap();
        assert_eq!(safe.relative(), Path::new("about.html"));

        let nested = validate_path("/docs/guide/intro.html").unwrap();
        assert_eq!(nested.relative(), Path::new("docs/guide/intro.html"));

        let root = validate_path("/").unwrap();
        assert!(root.is_root());

        let spaced = validate_path("/my%20file.txt").unwrap();
        assert_eq!(spaced.relative(), Path::new("my file.txt"));
    }

    #[test]
    fn test_repeated_slashes_collapse() {
        let safe = validate_path("/docs///a.html").unwrap();
        assert_eq!(safe.relative(), Path::new("docs/a.html"));
    }

    #[test]
    fn test_traversal_variants_rejected() {
        let attacks = [
            "/../etc/passwd",
            "/..",
            "/docs/../../secret",
            "/./index.html",
            "/docs/./a.html",
            "/docs/.",
            "/%2e%2e/etc/passwd",
            "/%2E%2E/%2E%2E/etc/passwd",
            "/%2e%2e%2fetc%2fpasswd",
            "/..%2fetc/passwd",
            "/..\\..\\windows\\win.ini",
            "/%5c..%5csecret",
            "/docs\\..\\..\\secret",
            "/a..b",
            "/file%00.html",
        ];
        for attack in attacks {
            assert_eq!(
                validate_path(attack),
                Err(SecurityError::PathTraversal),
                "should reject {attack}"
            );
        }
    }

    #[test]
    fn test_absolute_filesystem_paths_rejected() {
        for attack in [
            "etc/passwd",
            "//etc/passwd",
            "/C:/Windows/system.ini",
            "\\\\server\\share",
            "C:\\boot.ini",
            "",
        ] {
            assert_eq!(
                validate_path(attack),
                Err(SecurityError::PathTraversal),
                "should reject {attack}"
            );
        }
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert_eq!(validate_path("/%ff%fe.html"), Err(SecurityError::PathTraversal));
    }

    #[test]
    fn test_resolved_path_stays_under_root() {
        let root = Path::new("/srv/www");
        let safe = validate_path("/img/logo.png").unwrap();
        let resolved = safe.resolve(root);
        assert!(resolved.starts_with(root));
        assert_eq!(resolved, PathBuf::from("/srv/www/img/logo.png"));
    }

    #[test]
    fn test_strip_segment() {
        let safe = validate_path("/uploads/upload_1.json").unwrap();
        assert_eq!(
            safe.strip_segment("uploads").unwrap().relative(),
            Path::new("upload_1.json")
        );
        assert!(validate_path("/uploadsx/a").unwrap().strip_segment("uploads").is_none());
    }

    #[test]
    fn test_host_exact_match() {
        let policy = HostPolicy::exact(["example.com:8080"]);
        assert!(validate_host(Some("example.com:8080"), &policy).is_ok());
        assert!(validate_host(Some("EXAMPLE.com:8080"), &policy).is_ok());
        assert!(validate_host(Some("  example.com:8080 "), &policy).is_ok());
    }

    #[test]
    fn test_host_missing() {
        let policy = HostPolicy::for_server("127.0.0.1", 8080);
        assert_eq!(validate_host(None, &policy), Err(SecurityError::MissingHost));
        assert_eq!(validate_host(Some(""), &policy), Err(SecurityError::MissingHost));
        assert_eq!(validate_host(Some("   "), &policy), Err(SecurityError::MissingHost));
    }

    #[test]
    fn test_host_mismatch() {
        let policy = HostPolicy::for_server("127.0.0.1", 8080);
        for bad in [
            "127.0.0.1:9090",
            "127.0.0.1",
            "evil.com",
            "evil.com:8080",
            "127.0.0.1:8080.evil.com",
            "127.0.0.1:abc",
        ] {
            assert!(
                matches!(validate_host(Some(bad), &policy), Err(SecurityError::HostMismatch(_))),
                "should reject {bad}"
            );
        }
    }

    #[test]
    fn test_loopback_aliases() {
        let policy = HostPolicy::for_server("127.0.0.1", 8080);
        assert!(validate_host(Some("127.0.0.1:8080"), &policy).is_ok());
        assert!(validate_host(Some("localhost:8080"), &policy).is_ok());

        let mixed_case = HostPolicy::for_server("LocalHost", 8080);
        assert!(validate_host(Some("127.0.0.1:8080"), &mixed_case).is_ok());
        assert!(validate_host(Some("localhost:8080"), &mixed_case).is_ok());

        let public = HostPolicy::for_server("10.0.0.5", 80);
        assert_eq!(public.accepted(), &["10.0.0.5:80".to_string()]);
        assert!(validate_host(Some("localhost:80"), &public).is_err());
    }

    #[test]
    fn test_ipv6_authority() {
        let policy = HostPolicy::for_server("::1", 8080);
        assert!(validate_host(Some("[::1]:8080"), &policy).is_ok());
        assert!(validate_host(Some("localhost:8080"), &policy).is_ok());
        assert!(matches!(
            validate_host(Some("::1:8080"), &policy),
            Err(SecurityError::HostMismatch(_))
        ));
        assert_eq!(authority("[::1]", 80), "[::1]:80");
    }
}
