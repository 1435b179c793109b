//! End-to-end calls against an in-process stub HTTP server.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde::{Deserialize, Serialize};
use soapclient::{
    ContainerRegistry, Endpoint, FaultDetail, InterfaceSpec, MethodSpec, RequestShape,
    ResponseShape, ServiceError, ServiceProxy, ServiceRegistry, arg, take,
};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Wire containers and adapter for a small inventory service
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
struct Reserve {
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ReserveResponse {
    #[serde(rename = "return")]
    confirmation: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct Clear {}

#[derive(Debug, Deserialize)]
struct ClearResponse {}

#[derive(Debug, Error)]
#[error("out of stock: {0}")]
struct OutOfStockError(String);

impl FaultDetail for OutOfStockError {
    fn from_message(message: String) -> Self {
        Self(message)
    }
}

struct InventoryClient {
    endpoint: Arc<Endpoint>,
}

impl ServiceProxy for InventoryClient {
    fn interface() -> InterfaceSpec {
        let mut containers = ContainerRegistry::new();
        containers.request(
            "Reserve",
            RequestShape::<Reserve>::new()
                .setter(|c, v| {
                    c.item = Some(take(v)?);
                    Ok(())
                })
                .setter(|c, v| {
                    c.count = Some(take(v)?);
                    Ok(())
                }),
        );
        containers.response(
            "ReserveResponse",
            ResponseShape::<ReserveResponse>::new().returns(|c| c.confirmation),
        );
        containers.request("Clear", RequestShape::<Clear>::new());
        containers.response("ClearResponse", ResponseShape::<ClearResponse>::new());

        InterfaceSpec::new("InventoryService", containers)
            .method(MethodSpec::new("reserve").fault::<OutOfStockError>())
            .method(MethodSpec::new("clear"))
    }

    fn bind(endpoint: Arc<Endpoint>) -> Self {
        Self { endpoint }
    }
}

impl InventoryClient {
    fn reserve(&self, item: &str, count: i32) -> Result<String, ServiceError> {
        let value = self
            .endpoint
            .invoke("reserve", vec![arg(item.to_string()), arg(count)])?;
        let value = value.expect("reserve returns a confirmation");
        Ok(take(value)?)
    }

    fn clear(&self) -> Result<(), ServiceError> {
        self.endpoint.invoke("clear", vec![])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stub HTTP server
// ---------------------------------------------------------------------------

struct StubServer {
    url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

fn envelope(body: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">",
            "<soap:Body>{}</soap:Body></soap:Envelope>"
        ),
        body
    )
}

/// Serves the same canned response to every request, one connection at a
/// time, until the test process exits.
fn spawn_stub(status: u16, reason: &'static str, body: String) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/Inventory", listener.local_addr().unwrap());

    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let worker_hits = Arc::clone(&hits);
    let worker_requests = Arc::clone(&requests);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };

            match read_request_body(&mut stream) {
                Ok(request_body) => {
                    worker_hits.fetch_add(1, Ordering::SeqCst);
                    worker_requests.lock().unwrap().push(request_body);
                }
                Err(_) => continue,
            }

            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    StubServer { url, hits, requests }
}

fn read_request_body(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        let len = reader.read_line(&mut line)?;
        if len == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(&['\r', '\n'][..]);
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    Ok(String::from_utf8_lossy(&body).into_owned())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn a_call_round_trips_value_and_envelope() {
    let server = spawn_stub(
        200,
        "OK",
        envelope(
            "<ns2:reserveResponse xmlns:ns2=\"urn:example:inventory\">\
             <return>R-42</return></ns2:reserveResponse>",
        ),
    );

    let registry = ServiceRegistry::new();
    let client = registry
        .get_or_create::<InventoryClient>(&server.url, "urn:example:inventory")
        .unwrap();

    let confirmation = client.reserve("widget", 3).unwrap();
    assert_eq!(confirmation, "R-42");
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);

    let requests = server.requests.lock().unwrap();
    assert!(requests[0].contains("<ns2:reserve xmlns:ns2=\"urn:example:inventory\">"));
    assert!(requests[0].contains("<item>widget</item>"));
    assert!(requests[0].contains("<count>3</count>"));
}

#[test]
fn a_void_call_returns_unit() {
    let server = spawn_stub(
        200,
        "OK",
        envelope("<ns2:clearResponse xmlns:ns2=\"urn:example:inventory\"/>"),
    );

    let registry = ServiceRegistry::new();
    let client = registry
        .get_or_create::<InventoryClient>(&server.url, "urn:example:inventory")
        .unwrap();

    client.clear().unwrap();
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[test]
fn a_non_200_status_with_a_declared_fault_raises_the_typed_error() {
    let server = spawn_stub(
        500,
        "Internal Server Error",
        envelope(
            "<soap:Fault><faultcode>soap:Server</faultcode>\
             <faultstring>boom</faultstring>\
             <detail><OutOfStockError/></detail></soap:Fault>",
        ),
    );

    let registry = ServiceRegistry::new();
    let client = registry
        .get_or_create::<InventoryClient>(&server.url, "urn:example:inventory")
        .unwrap();

    let error = client.reserve("widget", 3).unwrap_err();
    let typed = error
        .declared::<OutOfStockError>()
        .expect("expected an OutOfStockError");
    assert_eq!(typed.0, "boom");
}

#[test]
fn a_non_200_status_with_an_unknown_fault_raises_a_generic_error() {
    let server = spawn_stub(
        500,
        "Internal Server Error",
        envelope("<soap:Fault><faultstring>  oops  </faultstring></soap:Fault>"),
    );

    let registry = ServiceRegistry::new();
    let client = registry
        .get_or_create::<InventoryClient>(&server.url, "urn:example:inventory")
        .unwrap();

    match client.reserve("widget", 3) {
        Err(ServiceError::Fault(message)) => assert_eq!(message, "oops"),
        other => panic!("expected a generic fault, got {:?}", other.err()),
    }
}

#[test]
fn a_200_status_is_never_parsed_as_a_fault() {
    let server = spawn_stub(
        200,
        "OK",
        envelope(
            "<soap:Fault><faultstring>boom</faultstring>\
             <detail><OutOfStockError/></detail></soap:Fault>",
        ),
    );

    let registry = ServiceRegistry::new();
    let client = registry
        .get_or_create::<InventoryClient>(&server.url, "urn:example:inventory")
        .unwrap();

    // The body looks like a fault but the status says success: the
    // non-fault path runs and finds no return value.
    let value = client
        .endpoint
        .invoke("reserve", vec![arg("widget".to_string()), arg(3_i32)])
        .unwrap();
    assert!(value.is_none());
}

#[test]
fn a_refused_connection_is_a_transport_error() {
    let registry = ServiceRegistry::new();
    let client = registry
        .get_or_create::<InventoryClient>("http://127.0.0.1:1/Inventory", "urn:example:inventory")
        .unwrap();

    assert!(matches!(
        client.reserve("widget", 3),
        Err(ServiceError::Transport { .. })
    ));
}

#[test]
fn the_proxy_is_cached_per_url_and_never_touches_the_network_on_reuse() {
    let server = spawn_stub(200, "OK", envelope(""));

    let registry = ServiceRegistry::new();
    let first = registry
        .get_or_create::<InventoryClient>(&server.url, "urn:example:inventory")
        .unwrap();
    let wsdl_url = format!("{}?wsdl", server.url);
    let second = registry
        .get_or_create::<InventoryClient>(&wsdl_url, "urn:example:inventory")
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(server.hits.load(Ordering::SeqCst), 0);
}

#[test]
fn describe_self_reports_the_url_without_any_request() {
    let server = spawn_stub(200, "OK", envelope(""));

    let registry = ServiceRegistry::new();
    let client = registry
        .get_or_create::<InventoryClient>(&server.url, "urn:example:inventory")
        .unwrap();

    let value = client.endpoint.invoke("to_string", vec![]).unwrap().unwrap();
    assert_eq!(take::<String>(value).unwrap(), server.url);
    assert_eq!(client.endpoint.to_string(), server.url);
    assert_eq!(server.hits.load(Ordering::SeqCst), 0);
}

#[test]
fn create_default_memoizes_in_the_global_registry() {
    let server = spawn_stub(200, "OK", envelope(""));

    let first =
        soapclient::create_default::<InventoryClient>(&server.url, "urn:example:inventory")
            .unwrap();
    let second =
        soapclient::create_default::<InventoryClient>(&server.url, "urn:example:inventory")
            .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn reconfiguring_the_timeout_does_not_disturb_cached_endpoints() {
    let server = spawn_stub(
        200,
        "OK",
        envelope(
            "<ns2:reserveResponse xmlns:ns2=\"urn:example:inventory\">\
             <return>R-1</return></ns2:reserveResponse>",
        ),
    );

    let registry = ServiceRegistry::new();
    let client = registry
        .get_or_create::<InventoryClient>(&server.url, "urn:example:inventory")
        .unwrap();

    assert_eq!(client.reserve("widget", 1).unwrap(), "R-1");
    registry.set_connect_timeout(std::time::Duration::from_secs(5));
    assert_eq!(client.reserve("widget", 1).unwrap(), "R-1");
}

#[test]
fn verbose_tracing_never_disturbs_the_call() {
    // Ignored if another test already installed a subscriber.
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let server = spawn_stub(
        200,
        "OK",
        envelope(
            "<ns2:reserveResponse xmlns:ns2=\"urn:example:inventory\">\
             <return>R-7</return></ns2:reserveResponse>",
        ),
    );

    let registry = ServiceRegistry::new();
    let client = registry
        .get_or_create::<InventoryClient>(&server.url, "urn:example:inventory")
        .unwrap();

    for _ in 0..5 {
        assert_eq!(client.reserve("widget", 1).unwrap(), "R-7");
    }
}
