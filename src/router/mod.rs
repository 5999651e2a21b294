//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, patrón de path) a handlers.
//!
//! ```text
//! Request → Router → Handler(request, params) → Response
//! ```
//!
//! Los patrones son paths con segmentos `{nombre}` que capturan un segmento
//! no vacío, p. ej. `/jobs/{id}/purge`. Un path sin patrón que coincida
//! responde 404; un path que coincide con otro método responde 405.

use crate::http::{Method, Request, Response, StatusCode};
use std::collections::HashMap;

/// Segmentos capturados por un patrón
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: HashMap<String, String>,
}

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Un handler recibe el request y los parámetros del path
pub type Handler = Box<dyn Fn(&Request, &PathParams) -> Response + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route {
    method: Method,
    pattern: Vec<Segment>,
    handler: Handler,
}

impl Route {
    fn matches(&self, path: &[&str]) -> Option<PathParams> {
        if self.pattern.len() != path.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, actual) in self.pattern.iter().zip(path) {
            match segment {
                Segment::Literal(expected) if expected == actual => {}
                Segment::Param(name) if !actual.is_empty() => {
                    params.insert(name.clone(), (*actual).to_string());
                }
                _ => return None,
            }
        }

        Some(PathParams { params })
    }
}

/// Router de (método, patrón) a handler
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una ruta
    ///
    /// ```
    /// use job_server::router::Router;
    /// use job_server::http::{Method, Request, Response, StatusCode};
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/jobs/{id}", |_req, params| {
    ///     let id = params.get("id").unwrap_or_default();
    ///     Response::new(StatusCode::Ok).with_body(id)
    /// });
    ///
    /// let request = Request::parse(b"GET /jobs/42 HTTP/1.1\r\n\r\n").unwrap();
    /// assert_eq!(router.route(&request).body(), b"42");
    /// ```
    pub fn register<F>(&mut self, method: Method, pattern: &str, handler: F)
    where
        F: Fn(&Request, &PathParams) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: parse_pattern(pattern),
            handler: Box::new(handler),
        });
    }

    /// Ejecuta el handler que corresponde al request
    pub fn route(&self, request: &Request) -> Response {
        let path: Vec<&str> = split_path(request.path());
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.matches(&path) else {
                continue;
            };
            if route.method == request.method() {
                let mut response = (route.handler)(request, &params);
                add_common_headers(&mut response);
                return response;
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method);
            }
        }

        let mut response = if allowed.is_empty() {
            Response::error(
                StatusCode::NotFound,
                "not_found",
                &format!("route not found: {}", request.path()),
            )
        } else {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            Response::error(
                StatusCode::MethodNotAllowed,
                "method_not_allowed",
                &format!("{} not allowed on {}", request.method(), request.path()),
            )
            .with_header("Allow", &allow)
        };
        add_common_headers(&mut response);
        response
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn add_common_headers(response: &mut Response) {
    response.add_header("Server", concat!("job_server/", env!("CARGO_PKG_VERSION")));
}

fn split_path(path: &str) -> Vec<&str> {
    path.trim_start_matches('/').split('/').collect()
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    split_path(pattern)
        .into_iter()
        .map(|segment| {
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap()
    }

    fn echo_router() -> Router {
        let mut router = Router::new();
        router.register(Method::GET, "/jobs/{id}", |_, params| {
            Response::new(StatusCode::Ok).with_body(params.get("id").unwrap_or_default())
        });
        router.register(Method::DELETE, "/jobs/{id}", |_, _| {
            Response::new(StatusCode::Ok).with_body("deleted")
        });
        router.register(Method::POST, "/jobs/{id}/purge", |_, params| {
            Response::new(StatusCode::NoContent).with_body(params.get("id").unwrap_or_default())
        });
        router.register(Method::GET, "/jobs", |_, _| Response::new(StatusCode::Ok));
        router
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert!(router.is_empty());
        assert_eq!(echo_router().len(), 4);
    }

    #[test]
    fn test_parse_pattern() {
        assert_eq!(
            parse_pattern("/jobs/{id}/purge"),
            vec![
                Segment::Literal("jobs".to_string()),
                Segment::Param("id".to_string()),
                Segment::Literal("purge".to_string()),
            ]
        );
    }

    #[test]
    fn test_route_with_param() {
        let response = echo_router().route(&request("GET /jobs/abc HTTP/1.1\r\n\r\n"));

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body(), b"abc");
        assert!(response.header("Server").is_some());
    }

    #[test]
    fn test_route_selects_by_method() {
        let response = echo_router().route(&request("DELETE /jobs/abc HTTP/1.1\r\n\r\n"));
        assert_eq!(response.body(), b"deleted");
    }

    #[test]
    fn test_route_nested_param() {
        let response = echo_router().route(&request("POST /jobs/xyz/purge HTTP/1.1\r\n\r\n"));

        assert_eq!(response.status(), StatusCode::NoContent);
        assert_eq!(response.body(), b"xyz");
    }

    #[test]
    fn test_route_not_found() {
        let router = echo_router();

        for raw in [
            "GET /nonexistent HTTP/1.1\r\n\r\n",
            "GET /jobs/a/b/c HTTP/1.1\r\n\r\n",
            "GET /jobs/ HTTP/1.1\r\n\r\n",
        ] {
            assert_eq!(router.route(&request(raw)).status(), StatusCode::NotFound);
        }
    }

    #[test]
    fn test_route_method_not_allowed() {
        let response = echo_router().route(&request("PUT /jobs/abc HTTP/1.1\r\n\r\n"));

        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
        assert_eq!(response.header("Allow"), Some("GET, DELETE"));
    }
}
