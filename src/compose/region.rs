//! Regional document walkers.
//!
//! - [`strip_region_rules`] drops routing rules aimed at the regional outbound.
//! - [`patch_region_outbound`] copies credentials from a raw host into the
//!   outbound with a configured tag.
//!
//! Both are no-ops when nothing matches.

use serde_json::{Map, Value};

use crate::compose::walk::{walk_mut, Visitor};
use crate::compose::REGION_OUTBOUND_TAG;
use crate::panel::RawHost;

/// Remove every `routing.rules` entry whose `outboundTag` is the regional marker.
pub fn strip_region_rules(document: &mut Value) {
    walk_mut(document, &mut RuleFilter);
}

struct RuleFilter;

impl Visitor for RuleFilter {
    fn visit_map(&mut self, map: &mut Map<String, Value>) {
        let Some(Value::Array(rules)) = map
            .get_mut("routing")
            .and_then(Value::as_object_mut)
            .and_then(|routing| routing.get_mut("rules"))
        else {
            return;
        };

        rules.retain(|rule| {
            rule.get("outboundTag").and_then(Value::as_str) != Some(REGION_OUTBOUND_TAG)
        });
    }
}

/// Find the raw host with the given remark.
pub fn find_host_by_remark<'a>(hosts: &'a [RawHost], remark: &str) -> Option<&'a RawHost> {
    hosts.iter().find(|host| host.remark == remark)
}

/// Overwrite the first user id and the reality key pair of the outbound
/// tagged `outbound_name`, wherever an `outbounds` list appears.
pub fn patch_region_outbound(document: &mut Value, outbound_name: &str, host: &RawHost) {
    walk_mut(document, &mut OutboundPatch { outbound_name, host });
}

struct OutboundPatch<'a> {
    outbound_name: &'a str,
    host: &'a RawHost,
}

impl Visitor for OutboundPatch<'_> {
    fn visit_map(&mut self, map: &mut Map<String, Value>) {
        let Some(Value::Array(outbounds)) = map.get_mut("outbounds") else {
            return;
        };

        for outbound in outbounds.iter_mut().filter_map(Value::as_object_mut) {
            if outbound.get("tag").and_then(Value::as_str) != Some(self.outbound_name) {
                continue;
            }

            if let Some(user) = outbound
                .get_mut("settings")
                .and_then(|s| s.get_mut("vnext"))
                .and_then(|v| v.get_mut(0))
                .and_then(|v| v.get_mut("users"))
                .and_then(|u| u.get_mut(0))
                .and_then(Value::as_object_mut)
            {
                user.insert(
                    "id".to_string(),
                    Value::String(self.host.password.vless_password.clone()),
                );
            }

            if let Some(reality) = outbound
                .get_mut("streamSettings")
                .and_then(|s| s.get_mut("realitySettings"))
                .and_then(Value::as_object_mut)
            {
                reality.insert(
                    "publicKey".to_string(),
                    Value::String(self.host.public_key.clone().unwrap_or_default()),
                );
                reality.insert(
                    "shortId".to_string(),
                    Value::String(self.host.short_id.clone().unwrap_or_default()),
                );
            }
        }
    }
}
