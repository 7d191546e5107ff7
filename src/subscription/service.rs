//! Per-request subscription workflows.

use std::sync::Arc;

use axum::body::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};

use crate::compose::{
    decode_outbounds, find_host_by_remark, patch_region_outbound, prune, strip_region_rules,
    MuxInjector, TemplateComposer,
};
use crate::config::{AppConfig, CompositionStrategy, RegionConfig};
use crate::convert::render_full_config;
use crate::http::response::relayable_response_headers;
use crate::lifecycle::Assets;
use crate::links::{LinkConverter, LinkError};
use crate::panel::{PanelClient, RawSubscription, UpstreamResponse};
use crate::subscription::{ServiceError, StatusPage};

/// A JSON response ready to be written.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Everything a request needs, shared behind an `Arc`.
pub struct SubscriptionService {
    panel: PanelClient,
    links: Arc<dyn LinkConverter>,
    composer: TemplateComposer,
    strategy: CompositionStrategy,
    region: RegionConfig,
    page: StatusPage,
}

impl SubscriptionService {
    pub fn new(
        panel: PanelClient,
        links: Arc<dyn LinkConverter>,
        assets: Assets,
        config: &AppConfig,
    ) -> Self {
        let composer = TemplateComposer::new(assets.template, assets.mux.map(MuxInjector::new));
        Self {
            panel,
            links,
            composer,
            strategy: config.composition.strategy,
            region: config.region.clone(),
            page: StatusPage::new(assets.web_page, &config.page),
        }
    }

    pub fn strategy(&self) -> CompositionStrategy {
        self.strategy
    }

    /// Structured documents for a capable client, per the configured strategy.
    pub async fn structured(
        &self,
        short_uuid: &str,
        user_agent: Option<&str>,
    ) -> Result<Rendered, ServiceError> {
        match self.strategy {
            CompositionStrategy::Template => self.composed(short_uuid, user_agent).await,
            CompositionStrategy::FullConfig => self.full_config(short_uuid, user_agent).await,
        }
    }

    /// One template-based document per upstream outbound, as a JSON array.
    pub async fn composed(
        &self,
        short_uuid: &str,
        user_agent: Option<&str>,
    ) -> Result<Rendered, ServiceError> {
        let (info, headers, raw) = tokio::try_join!(
            self.panel.subscription_info(short_uuid, user_agent),
            self.panel.subscription_headers(short_uuid, user_agent),
            self.region_hosts(short_uuid, user_agent),
        )?;

        let outbounds = self.link_outbounds(&info.links)?;
        let mut documents = self.composer.compose(outbounds);
        self.finish_composed(short_uuid, &mut documents, raw.as_ref());

        tracing::debug!(
            short_uuid,
            links = info.links.len(),
            documents = documents.len(),
            "Composed subscription"
        );

        Ok(Rendered {
            status: StatusCode::OK,
            headers,
            body: serde_json::to_string(&documents)?,
        })
    }

    /// Self-contained balancer config built from the raw hosts.
    pub async fn full_config(
        &self,
        short_uuid: &str,
        user_agent: Option<&str>,
    ) -> Result<Rendered, ServiceError> {
        let (raw, headers) = tokio::try_join!(
            self.panel.raw_subscription(short_uuid, user_agent),
            self.panel.subscription_headers(short_uuid, user_agent),
        )?;

        let body = render_full_config(&raw.raw_hosts)?;

        Ok(Rendered {
            status: StatusCode::OK,
            headers,
            body,
        })
    }

    /// The panel's own v2ray-json document with the region walkers applied.
    pub async fn upstream_v2ray_json(
        &self,
        short_uuid: &str,
        request_headers: &HeaderMap,
    ) -> Result<Rendered, ServiceError> {
        let user_agent = request_headers
            .get(reqwest::header::USER_AGENT)
            .and_then(|v| v.to_str().ok());

        let (upstream, raw) = tokio::try_join!(
            self.panel.v2ray_json(short_uuid, request_headers),
            self.region_hosts(short_uuid, user_agent),
        )?;

        let UpstreamResponse {
            status,
            headers,
            mut body,
        } = upstream;
        self.apply_region(short_uuid, &mut body, raw.as_ref());

        Ok(Rendered {
            status,
            headers: relayable_response_headers(&headers),
            body: serde_json::to_string(&body)?,
        })
    }

    /// HTML status page for browsers.
    pub async fn status_page(
        &self,
        short_uuid: &str,
        user_agent: Option<&str>,
    ) -> Result<String, ServiceError> {
        let info = self.panel.subscription_info(short_uuid, user_agent).await?;
        Ok(self.page.render(&info)?)
    }

    /// Relay the request to the panel untouched.
    pub async fn passthrough(
        &self,
        short_uuid: &str,
        method: Method,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse<Bytes>, ServiceError> {
        Ok(self.panel.forward(short_uuid, method, headers, body).await?)
    }

    /// Convert share links into outbounds, in link order.
    fn link_outbounds(&self, links: &[String]) -> Result<Vec<Map<String, Value>>, ServiceError> {
        let mut outbounds = Vec::with_capacity(links.len());
        for link in links {
            let document = match self.links.convert(link) {
                Ok(document) => document,
                Err(LinkError::UnsupportedScheme(scheme)) => {
                    tracing::warn!(scheme = %scheme, "Skipping share link with unsupported scheme");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            outbounds.extend(decode_outbounds(document)?);
        }
        Ok(outbounds)
    }

    /// Raw hosts, fetched only when the region patch is configured.
    async fn region_hosts(
        &self,
        short_uuid: &str,
        user_agent: Option<&str>,
    ) -> Result<Option<RawSubscription>, crate::panel::PanelError> {
        if self.region.patch_target().is_none() {
            return Ok(None);
        }
        self.panel
            .raw_subscription(short_uuid, user_agent)
            .await
            .map(Some)
    }

    /// Region walkers, then a second prune: stripping rules or patching from
    /// a sparse host can leave empty structure behind.
    fn finish_composed(
        &self,
        short_uuid: &str,
        documents: &mut [Value],
        raw: Option<&RawSubscription>,
    ) {
        for document in documents {
            self.apply_region(short_uuid, document, raw);
            prune(document);
        }
    }

    fn apply_region(&self, short_uuid: &str, document: &mut Value, raw: Option<&RawSubscription>) {
        if self.region.except_rules_users.contains(short_uuid) {
            strip_region_rules(document);
        }

        let (Some((outbound_name, remark)), Some(raw)) = (self.region.patch_target(), raw) else {
            return;
        };
        match find_host_by_remark(&raw.raw_hosts, remark) {
            Some(host) => patch_region_outbound(document, outbound_name, host),
            None => tracing::debug!(remark, "No raw host for regional outbound"),
        }
    }
}
