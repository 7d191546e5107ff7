//! End-to-end subscription flows against a mock panel.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use subscription_composer::config::CompositionStrategy;

mod common;

use common::{client, panel_fixture, spawn_service, start_mock_panel, RAW_FEED, SHORT_UUID};

async fn get(addr: std::net::SocketAddr, path: &str, user_agent: &str) -> reqwest::Response {
    client()
        .get(format!("http://{}{}", addr, path))
        .header("User-Agent", user_agent)
        .send()
        .await
        .expect("service unreachable")
}

#[tokio::test]
async fn test_structured_template_composition() {
    let (panel, log) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |_| {}).await;

    let res = get(addr, &format!("/{}", SHORT_UUID), "v2rayNG/1.9.0").await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.headers()["profile-title"], "base64:VGVzdA==");
    assert_eq!(res.headers()["profile-update-interval"], "12");
    assert!(res.headers().get("x-internal").is_none());

    let docs: Vec<Value> = res.json().await.unwrap();
    // vmess link is skipped
    assert_eq!(docs.len(), 2);

    let nl = &docs[0];
    assert_eq!(nl["remarks"], "NL");
    assert_eq!(nl["outbounds"][0]["tag"], "proxy");
    assert_eq!(nl["outbounds"][0]["protocol"], "vless");
    assert!(nl["outbounds"][0].get("sendThrough").is_none());
    assert_eq!(nl["outbounds"][1]["tag"], "direct");
    assert!(nl["outbounds"][1].get("settings").is_none());
    assert!(nl["log"].get("access").is_none());
    assert_eq!(
        nl["outbounds"][0]["streamSettings"]["realitySettings"]["publicKey"],
        "PUBKEY"
    );
    // not an excepted user: regional rules stay
    assert_eq!(nl["routing"]["rules"].as_array().unwrap().len(), 2);

    let de = &docs[1];
    assert_eq!(de["remarks"], "DE");
    assert_eq!(de["outbounds"][0]["protocol"], "shadowsocks");
    assert_eq!(de["outbounds"][0]["tag"], "proxy");

    // no region patch configured, so no raw lookup
    let paths: Vec<String> = log.lock().unwrap().iter().map(|r| r.path.clone()).collect();
    assert!(!paths.iter().any(|p| p.ends_with("/raw")));

    shutdown.trigger();
}

#[tokio::test]
async fn test_mux_injected_into_vless_only() {
    let (panel, _) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |c| c.mux.enabled = true).await;

    let docs: Vec<Value> = get(addr, "/abc123", "Streisand 1.5")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(docs[0]["outbounds"][0]["mux"]["concurrency"], 8);
    assert!(docs[1]["outbounds"][0].get("mux").is_none());

    shutdown.trigger();
}

#[tokio::test]
async fn test_region_walkers_on_template_path() {
    let (panel, log) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |c| {
        c.region.outbound_name = Some("ru-out".into());
        c.region.host_remark = Some("RU host".into());
        c.region.except_rules_users.insert(SHORT_UUID.into());
    })
    .await;

    let docs: Vec<Value> = get(addr, "/abc123", "v2rayN/6.45")
        .await
        .json()
        .await
        .unwrap();

    for doc in &docs {
        let rules = doc["routing"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0]["outboundTag"], "direct");

        let ru = doc["outbounds"]
            .as_array()
            .unwrap()
            .iter()
            .find(|o| o["tag"] == "ru-out")
            .unwrap();
        assert_eq!(ru["settings"]["vnext"][0]["users"][0]["id"], "uuid-ru");
        assert_eq!(ru["streamSettings"]["realitySettings"]["publicKey"], "pbk-ru");
        assert_eq!(ru["streamSettings"]["realitySettings"]["shortId"], "sid-ru");
    }

    let raw_calls = log
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.path.ends_with("/raw"))
        .count();
    assert_eq!(raw_calls, 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_old_client_gets_raw_feed() {
    let (panel, _) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |_| {}).await;

    for agent in ["v2rayNG/1.8.0", "v2rayN/6.39", "clash-verge/1.0"] {
        let res = get(addr, "/abc123", agent).await;
        assert_eq!(res.status(), 200, "agent {agent}");
        assert_eq!(res.headers()["x-internal"], "secret");
        assert_eq!(res.text().await.unwrap(), RAW_FEED);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_browser_gets_status_page() {
    let (panel, _) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |c| c.page.meta_title = "My VPN".into()).await;

    let res = get(addr, "/abc123", "Mozilla/5.0 (X11; Linux x86_64)").await;
    assert_eq!(res.status(), 200);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = res.text().await.unwrap();
    assert!(html.contains("<title>My VPN</title>"));

    let data = html
        .split("const data = \"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap();
    let doc: Value = serde_json::from_slice(&STANDARD.decode(data).unwrap()).unwrap();
    assert_eq!(doc["response"]["user"]["username"], "alice");

    shutdown.trigger();
}

#[tokio::test]
async fn test_happ_headers() {
    let (panel, _) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |c| {
        c.happ.announcements = Some("Hi".into());
        c.happ.routing = Some("happ://routing/add/xyz".into());
    })
    .await;

    let res = get(addr, "/abc123", "Happ/1.2.0").await;
    assert_eq!(res.headers()["announce"], "base64:SGk=");
    assert_eq!(res.headers()["routing"], "happ://routing/add/xyz");
    assert_eq!(res.text().await.unwrap(), RAW_FEED);

    // other clients never see them
    let res = get(addr, "/abc123", "v2rayNG/1.9.0").await;
    assert!(res.headers().get("announce").is_none());

    shutdown.trigger();
}

#[tokio::test]
async fn test_happ_structured_when_enabled() {
    let (panel, _) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |c| c.happ.json_enabled = true).await;

    let docs: Vec<Value> = get(addr, "/abc123", "Happ/1.2.0")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(docs.len(), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_full_config_strategy() {
    let (panel, _) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |c| {
        c.composition.strategy = CompositionStrategy::FullConfig;
    })
    .await;

    let res = get(addr, "/abc123", "V2Box 1.0").await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["profile-title"], "base64:VGVzdA==");

    let text = res.text().await.unwrap();
    assert!(text.starts_with("{\n  \"log\""));

    let doc: Value = serde_json::from_str(&text).unwrap();
    let tags: Vec<&str> = doc["outbounds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["tag"].as_str().unwrap())
        .collect();
    // third raw host is beyond the balancer limit
    assert_eq!(tags, ["proxy1", "proxy2", "direct", "block", "torrent"]);
    assert_eq!(
        doc["outbounds"][1]["streamSettings"]["realitySettings"]["fingerprint"],
        "firefox"
    );
    assert_eq!(doc["routing"]["balancers"].as_array().unwrap().len(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_balancer_endpoint() {
    let (panel, _) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |_| {}).await;

    let res = get(addr, "/abc123/balancer", "anything").await;
    assert_eq!(res.status(), 200);

    let doc: Value = res.json().await.unwrap();
    assert_eq!(doc["routing"]["balancers"][0]["selector"][0], "proxy1");
    assert_eq!(doc["outbounds"][0]["settings"]["vnext"][0]["users"][0]["id"], "uuid-nl");

    shutdown.trigger();
}

#[tokio::test]
async fn test_v2ray_json_region_walkers() {
    let (panel, log) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |c| {
        c.region.outbound_name = Some("ru-out".into());
        c.region.host_remark = Some("RU host".into());
        c.region.except_rules_users.insert(SHORT_UUID.into());
    })
    .await;

    let res = get(addr, "/abc123/v2ray-json", "Happ/1.2.0").await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-panel"], "v2ray-json");

    let docs: Vec<Value> = res.json().await.unwrap();
    assert_eq!(docs[0]["routing"]["rules"].as_array().unwrap().len(), 1);
    assert_eq!(
        docs[0]["outbounds"][1]["settings"]["vnext"][0]["users"][0]["id"],
        "uuid-ru"
    );

    let forwarded_agent = log
        .lock()
        .unwrap()
        .iter()
        .find(|r| r.path.ends_with("/v2ray-json"))
        .and_then(|r| r.header("user-agent").map(str::to_string));
    assert_eq!(forwarded_agent.as_deref(), Some("Happ/1.2.0"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_panel_auth_and_local_mode_headers() {
    let (panel, log) = start_mock_panel(panel_fixture).await;
    let (addr, shutdown) = spawn_service(panel, |c| {
        c.panel.token = Some("secret-token".into());
        c.panel.local_mode = true;
    })
    .await;

    let res = get(addr, "/abc123", "v2rayNG/1.9.0").await;
    assert_eq!(res.status(), 200);

    let requests = log.lock().unwrap().clone();
    let info = requests
        .iter()
        .find(|r| r.path == "/api/sub/abc123/info")
        .unwrap();
    assert_eq!(info.header("authorization"), Some("Bearer secret-token"));
    assert_eq!(info.header("x-forwarded-for"), Some("127.0.0.1"));
    assert_eq!(info.header("x-forwarded-proto"), Some("https"));
    assert_eq!(info.header("user-agent"), Some("v2rayNG/1.9.0"));

    shutdown.trigger();
}
