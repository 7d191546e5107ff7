//! Build a complete, balancer-based client config from raw hosts.

use crate::convert::model::{
    strings, Balancer, BalancerStrategy, ConditionalDns, DnsConfig, DnsServer, Inbound,
    InboundSettings, LogConfig, Observatory, Outbound, OutboundSettings, RealitySettings,
    RoutingConfig, RoutingRule, Sniffing, StreamSettings, VlessUser, VnextServer, XrayConfig,
};
use crate::convert::{ConvertError, HostConstraint};
use crate::panel::RawHost;

/// Hosts beyond this count are ignored.
pub const MAX_BALANCED_HOSTS: usize = 2;

pub const BALANCER_TAG: &str = "balancer";
pub const DIRECT_TAG: &str = "direct";
pub const BLOCK_TAG: &str = "block";
pub const TORRENT_TAG: &str = "torrent";

const ACCEPTED_PROTOCOL: &str = "vless";
const ACCEPTED_TLS: &str = "reality";
const ACCEPTED_NETWORK: &str = "tcp";
const DEFAULT_FINGERPRINT: &str = "chrome";

const SOCKS_PORT: u16 = 10808;
const HTTP_PORT: u16 = 10809;

const REGIONAL_DOMAINS: &[&str] = &[
    "geosite:private",
    "geosite:category-ru",
    "geosite:category-gov-ru",
    "domain:ru",
    "domain:su",
    "domain:xn--p1ai",
];

const SERVICE_DOMAINS: &[&str] = &[
    "geosite:yandex",
    "geosite:vk",
    "geosite:mailru",
    "geosite:apple",
    "geosite:microsoft",
];

const DIRECT_IPS: &[&str] = &["geoip:private", "geoip:ru"];

const BALANCED_DOMAINS: &[&str] = &[
    "geosite:google",
    "geosite:youtube",
    "geosite:telegram",
    "geosite:instagram",
    "geosite:facebook",
    "geosite:twitter",
    "geosite:discord",
    "geosite:openai",
    "geosite:netflix",
    "geosite:spotify",
];

/// Telegram's published address ranges.
const TELEGRAM_IPS: &[&str] = &[
    "91.105.192.0/23",
    "91.108.4.0/22",
    "91.108.8.0/22",
    "91.108.12.0/22",
    "91.108.16.0/22",
    "91.108.20.0/22",
    "91.108.56.0/22",
    "149.154.160.0/20",
    "185.76.151.0/24",
    "2001:67c:4e8::/48",
    "2001:b28:f23c::/48",
    "2001:b28:f23d::/48",
    "2001:b28:f23f::/48",
    "2a0a:f280::/32",
];

fn check(
    index: usize,
    constraint: HostConstraint,
    expected: &'static str,
    found: &str,
) -> Result<(), ConvertError> {
    if found == expected {
        Ok(())
    } else {
        Err(ConvertError::UnsupportedHost {
            index,
            constraint,
            expected,
            found: found.to_string(),
        })
    }
}

fn validate(index: usize, host: &RawHost) -> Result<(), ConvertError> {
    check(index, HostConstraint::Protocol, ACCEPTED_PROTOCOL, &host.protocol)?;
    check(index, HostConstraint::Tls, ACCEPTED_TLS, &host.tls)?;
    check(index, HostConstraint::Network, ACCEPTED_NETWORK, &host.network)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

fn proxy_outbound(tag: String, host: &RawHost) -> Outbound {
    Outbound {
        tag,
        protocol: ACCEPTED_PROTOCOL.to_string(),
        settings: OutboundSettings::Vless {
            vnext: vec![VnextServer {
                address: host.address.clone(),
                port: host.port,
                users: vec![VlessUser {
                    id: host.password.vless_password.clone(),
                    encryption: "none".to_string(),
                    flow: non_empty(&host.flow),
                }],
            }],
        },
        stream_settings: Some(StreamSettings {
            network: ACCEPTED_NETWORK.to_string(),
            security: ACCEPTED_TLS.to_string(),
            reality_settings: RealitySettings {
                server_name: host.sni.clone().unwrap_or_default(),
                fingerprint: non_empty(&host.fingerprint)
                    .unwrap_or_else(|| DEFAULT_FINGERPRINT.to_string()),
                public_key: host.public_key.clone().unwrap_or_default(),
                short_id: host.short_id.clone().unwrap_or_default(),
                spider_x: non_empty(&host.spider_x),
            },
        }),
    }
}

fn terminal_outbounds() -> [Outbound; 3] {
    let outbound = |tag: &str, protocol: &str, settings| Outbound {
        tag: tag.to_string(),
        protocol: protocol.to_string(),
        settings,
        stream_settings: None,
    };
    [
        outbound(
            DIRECT_TAG,
            "freedom",
            OutboundSettings::Freedom {
                domain_strategy: "UseIP".to_string(),
            },
        ),
        outbound(BLOCK_TAG, "blackhole", OutboundSettings::Empty {}),
        outbound(TORRENT_TAG, "blackhole", OutboundSettings::Empty {}),
    ]
}

fn dns() -> DnsConfig {
    DnsConfig {
        servers: vec![
            DnsServer::Conditional(ConditionalDns {
                address: "77.88.8.8".to_string(),
                domains: strings(REGIONAL_DOMAINS),
                skip_fallback: true,
            }),
            DnsServer::Conditional(ConditionalDns {
                address: "https://1.1.1.1/dns-query".to_string(),
                domains: strings(BALANCED_DOMAINS),
                skip_fallback: false,
            }),
            DnsServer::Default("https://dns.google/dns-query".to_string()),
        ],
        query_strategy: "UseIPv4".to_string(),
    }
}

fn inbounds() -> Vec<Inbound> {
    let sniffing = || Sniffing {
        enabled: true,
        dest_override: strings(&["http", "tls", "quic"]),
    };
    vec![
        Inbound {
            tag: "socks".to_string(),
            listen: "127.0.0.1".to_string(),
            port: SOCKS_PORT,
            protocol: "socks".to_string(),
            settings: InboundSettings {
                auth: Some("noauth".to_string()),
                udp: Some(true),
            },
            sniffing: sniffing(),
        },
        Inbound {
            tag: "http".to_string(),
            listen: "127.0.0.1".to_string(),
            port: HTTP_PORT,
            protocol: "http".to_string(),
            settings: InboundSettings {
                auth: None,
                udp: None,
            },
            sniffing: sniffing(),
        },
    ]
}

fn routing(proxy_tags: Vec<String>) -> RoutingConfig {
    RoutingConfig {
        domain_strategy: "IPIfNonMatch".to_string(),
        rules: vec![
            RoutingRule::to_outbound(DIRECT_TAG).domains(REGIONAL_DOMAINS),
            RoutingRule::to_outbound(DIRECT_TAG).domains(SERVICE_DOMAINS),
            RoutingRule::to_outbound(DIRECT_TAG).ips(DIRECT_IPS),
            // NTP
            RoutingRule::to_outbound(DIRECT_TAG).port("123"),
            RoutingRule::to_outbound(BLOCK_TAG).domains(&["geosite:category-ads-all"]),
            RoutingRule::to_outbound(TORRENT_TAG).protocols(&["bittorrent"]),
            RoutingRule::to_balancer(BALANCER_TAG).domains(BALANCED_DOMAINS),
            RoutingRule::to_balancer(BALANCER_TAG).ips(TELEGRAM_IPS),
            RoutingRule::to_balancer(BALANCER_TAG).inbound_tags(&["socks"]),
            RoutingRule::to_balancer(BALANCER_TAG).inbound_tags(&["http"]),
        ],
        balancers: vec![Balancer {
            tag: BALANCER_TAG.to_string(),
            selector: proxy_tags,
            strategy: BalancerStrategy::round_robin(),
        }],
    }
}

fn observatory(proxy_tags: Vec<String>) -> Observatory {
    Observatory {
        subject_selector: proxy_tags,
        probe_url: "https://www.gstatic.com/generate_204".to_string(),
        probe_interval: "30s".to_string(),
        enable_concurrency: true,
    }
}

/// Validate the first [`MAX_BALANCED_HOSTS`] hosts and assemble the config.
pub fn build_full_config(hosts: &[RawHost]) -> Result<XrayConfig, ConvertError> {
    if hosts.is_empty() {
        return Err(ConvertError::NoHosts);
    }

    let mut outbounds = Vec::with_capacity(MAX_BALANCED_HOSTS + 3);
    for (i, host) in hosts.iter().take(MAX_BALANCED_HOSTS).enumerate() {
        let index = i + 1;
        validate(index, host)?;
        outbounds.push(proxy_outbound(format!("proxy{}", index), host));
    }
    let proxy_tags: Vec<String> = outbounds.iter().map(|o| o.tag.clone()).collect();
    outbounds.extend(terminal_outbounds());

    Ok(XrayConfig {
        log: LogConfig {
            loglevel: "warning".to_string(),
        },
        dns: dns(),
        inbounds: inbounds(),
        outbounds,
        routing: routing(proxy_tags.clone()),
        observatory: observatory(proxy_tags),
    })
}

/// Build the config and serialize it with 2-space indentation.
pub fn render_full_config(hosts: &[RawHost]) -> Result<String, ConvertError> {
    let config = build_full_config(hosts)?;
    Ok(serde_json::to_string_pretty(&config)?)
}
