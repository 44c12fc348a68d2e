use serde_json::Value;

/// Where a Messenger event can carry an ad referral, in precedence order
const REFERRAL_PATHS: [&[&str]; 3] = [
    &["referral", "ref"],
    &["postback", "referral", "ref"],
    &["message", "referral", "ref"],
];

/// Quick-reply payload locations, checked after referrals
const QUICK_REPLY_PATHS: [&[&str]; 2] = [&["quick_reply", "payload"], &["message", "quick_reply", "payload"]];

const REFERRAL_PREFIXES: [&str; 2] = ["ad_", "adset_"];
const QUICK_REPLY_PREFIX: &str = "adgroup:";

/// Extract the ad-group id a messaging event is attributed to.
///
/// Accepts `referral.ref` values of the form `ad_<id>` / `adset_<id>` and
/// quick-reply payloads of the form `adgroup:<id>`. Anything else yields
/// `None`, and the message is stored without attribution.
pub fn extract_ad_group_id(event: &Value) -> Option<String> {
    REFERRAL_PATHS
        .iter()
        .filter_map(|path| lookup_str(event, path))
        .find_map(parse_referral)
        .or_else(|| {
            QUICK_REPLY_PATHS
                .iter()
                .filter_map(|path| lookup_str(event, path))
                .find_map(parse_quick_reply)
        })
}

fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))?
        .as_str()
}

fn parse_referral(raw: &str) -> Option<String> {
    let raw = raw.trim();
    REFERRAL_PREFIXES
        .iter()
        .find_map(|prefix| raw.strip_prefix(prefix))
        .filter(|id| is_valid_id(id))
        .map(str::to_string)
}

fn parse_quick_reply(raw: &str) -> Option<String> {
    raw.trim()
        .strip_prefix(QUICK_REPLY_PREFIX)
        .map(str::trim)
        .filter(|id| is_valid_id(id))
        .map(str::to_string)
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
