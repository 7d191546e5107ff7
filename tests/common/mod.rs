//! Shared utilities for integration testing: a raw-TCP mock panel.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use subscription_composer::config::AppConfig;
use subscription_composer::http::HttpServer;
use subscription_composer::lifecycle::{load_assets, Shutdown};
use subscription_composer::links::ShareLinkConverter;
use subscription_composer::panel::PanelClient;
use subscription_composer::subscription::SubscriptionService;

/// A request as seen by the mock panel. Header names are lowercase.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A canned panel response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: body.into(),
            delay: None,
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "text/plain".into())],
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
            delay: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub type RequestLog = Arc<Mutex<Vec<RecordedRequest>>>;

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        403 => "403 Forbidden",
        404 => "404 Not Found",
        418 => "418 I'm a teapot",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    // Drain any body so the client sees a clean close.
    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body_read = buf.len() - (head_end + 4);
    while body_read < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body_read += n;
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
    })
}

/// Start a mock panel on an ephemeral port. `handler` maps each request to a
/// response; every request is appended to the returned log.
pub async fn start_mock_panel<F>(handler: F) -> (SocketAddr, RequestLog)
where
    F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let requests = log.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let response = handler(&request);
                        requests.lock().unwrap().push(request);

                        if let Some(delay) = response.delay {
                            tokio::time::sleep(delay).await;
                        }

                        let mut head = format!("HTTP/1.1 {}\r\n", status_text(response.status));
                        for (name, value) in &response.headers {
                            head.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        head.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n",
                            response.body.len()
                        ));

                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(response.body.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log)
}

/// HTTP client for talking to the service under test.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

// Service fixture

pub const SHORT_UUID: &str = "abc123";

pub const TEMPLATE: &str = r#"{
  "remarks": "",
  "log": {"loglevel": "warning", "access": ""},
  "outbounds": [
    {"tag": "direct", "protocol": "freedom", "settings": {}},
    {
      "tag": "ru-out",
      "protocol": "vless",
      "settings": {"vnext": [{"address": "ru.example.com", "port": 443,
        "users": [{"id": "placeholder", "encryption": "none"}]}]},
      "streamSettings": {"network": "tcp", "security": "reality",
        "realitySettings": {"serverName": "ya.ru", "publicKey": "placeholder", "shortId": "placeholder"}}
    }
  ],
  "routing": {"rules": [
    {"type": "field", "domain": ["geosite:category-ru"], "outboundTag": "RU"},
    {"type": "field", "ip": ["geoip:private"], "outboundTag": "direct"}
  ]}
}"#;

pub const MUX_TEMPLATE: &str = r#"{"enabled": true, "concurrency": 8}"#;

pub const PAGE: &str =
    "<html><head><title>{{.MetaTitle}}</title></head><script>const data = \"{{.PanelData}}\";</script></html>";

pub const INFO: &str = r#"{"response": {
  "isFound": true,
  "user": {"shortUuid": "abc123", "username": "alice", "daysLeft": 10, "isActive": true},
  "links": [
    "vless://0b6f3a4e-1111-2222-3333-444455556666@nl.example.com:443?type=tcp&security=reality&sni=www.microsoft.com&fp=chrome&pbk=PUBKEY&sid=ab12&flow=xtls-rprx-vision#NL",
    "vmess://eyJhZGQiOiIxLjIuMy40In0=",
    "ss://YWVzLTI1Ni1nY206cHc=@de.example.com:8388#DE"
  ],
  "ssConfLinks": {},
  "subscriptionUrl": "https://sub.example.com/abc123"
}}"#;

pub const RAW: &str = r#"{"response": {
  "user": {"shortUuid": "abc123", "username": "alice"},
  "rawHosts": [
    {"protocol": "vless", "network": "tcp", "tls": "reality", "address": "nl.example.com", "port": 443,
     "remark": "NL", "sni": "www.microsoft.com", "password": {"vlessPassword": "uuid-nl"},
     "publicKey": "pbk-nl", "shortId": "sid-nl", "flow": "xtls-rprx-vision"},
    {"protocol": "vless", "network": "tcp", "tls": "reality", "address": "de.example.com", "port": 443,
     "remark": "DE", "sni": "www.microsoft.com", "password": {"vlessPassword": "uuid-de"},
     "publicKey": "pbk-de", "shortId": "sid-de", "fingerprint": "firefox"},
    {"protocol": "vless", "network": "tcp", "tls": "reality", "address": "ru.example.com", "port": 443,
     "remark": "RU host", "password": {"vlessPassword": "uuid-ru"},
     "publicKey": "pbk-ru", "shortId": "sid-ru"}
  ]
}}"#;

pub const V2RAY_JSON: &str = r#"[{
  "remarks": "NL",
  "outbounds": [
    {"tag": "proxy", "protocol": "vless"},
    {"tag": "ru-out", "settings": {"vnext": [{"users": [{"id": "old"}]}]},
     "streamSettings": {"realitySettings": {"publicKey": "old", "shortId": "old"}}}
  ],
  "routing": {"rules": [{"outboundTag": "RU"}, {"outboundTag": "proxy"}]}
}]"#;

pub const RAW_FEED: &str = "dmxlc3M6Ly9mZWVk";

/// The happy-path panel for [`SHORT_UUID`].
pub fn panel_fixture(request: &RecordedRequest) -> MockResponse {
    match request.path.as_str() {
        "/api/sub/abc123/info" => MockResponse::json(INFO),
        "/api/sub/abc123/raw" => MockResponse::json(RAW),
        "/api/sub/abc123/v2ray-json" => {
            MockResponse::json(V2RAY_JSON).with_header("X-Panel", "v2ray-json")
        }
        "/api/sub/abc123" => MockResponse::text(RAW_FEED)
            .with_header("Profile-Title", "base64:VGVzdA==")
            .with_header("Profile-Update-Interval", "12")
            .with_header("Subscription-Userinfo", "upload=0; download=10; total=100; expire=0")
            .with_header("X-Internal", "secret"),
        _ => MockResponse::status(404),
    }
}

/// Start the service against `panel`, with `tweak` applied to the config.
pub async fn spawn_service(
    panel: SocketAddr,
    tweak: impl FnOnce(&mut AppConfig),
) -> (SocketAddr, Shutdown) {
    let dir = std::env::temp_dir().join(format!(
        "subscription-composer-it-{}",
        uuid::Uuid::new_v4()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let template = dir.join("default.json");
    let mux = dir.join("mux.json");
    let page = dir.join("index.html");
    std::fs::write(&template, TEMPLATE).unwrap();
    std::fs::write(&mux, MUX_TEMPLATE).unwrap();
    std::fs::write(&page, PAGE).unwrap();

    let mut config = AppConfig::default();
    config.panel.url = format!("http://{}", panel);
    config.panel.timeout_secs = 2;
    config.templates.v2ray_template_path = template.display().to_string();
    config.templates.mux_template_path = mux.display().to_string();
    config.templates.web_page_template_path = page.display().to_string();
    tweak(&mut config);

    let assets = load_assets(&config).unwrap();
    let panel_client = PanelClient::new(&config.panel).unwrap();
    let service = SubscriptionService::new(
        panel_client,
        Arc::new(ShareLinkConverter::new()),
        assets,
        &config,
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(&config, service);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}
