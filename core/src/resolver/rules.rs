// mise/src/resolver/rules.rs

//! Pure, total resolution of chef identity from order/connection payloads.

use crate::model::record::{first_text, FieldRule, JsonMap, Record};
use crate::model::ChefDetail;
use url::Url;

pub const PROFILE_PATH_PREFIX: &str = "/chefs";
pub const PROFILE_CHEF_QUERY_PARAM: &str = "chef_id";

/// Base used only to resolve relative profile links; its origin is never emitted.
const RESOLUTION_BASE: &str = "https://mise.invalid/";

pub const CHEF_ID_RULES: &[FieldRule] = &[
  FieldRule::new("chef_id", &["chef_id"]),
  FieldRule::new("chefId", &["chefId"]),
  FieldRule::new("chef.id", &["chef", "id"]),
  FieldRule::new("chef.chef_id", &["chef", "chef_id"]),
  FieldRule::new("chef_profile.id", &["chef_profile", "id"]),
  FieldRule::new("chef.user.id", &["chef", "user", "id"]),
  FieldRule::new("chef.user_id", &["chef", "user_id"]),
  FieldRule::new("chef_user_id", &["chef_user_id"]),
  FieldRule::new("chef_user.id", &["chef_user", "id"]),
];

const DETAIL_ID_RULES: &[FieldRule] = &[
  FieldRule::new("id", &["id"]),
  FieldRule::new("chef_id", &["chef_id"]),
  FieldRule::new("user.id", &["user", "id"]),
];

const USERNAME_RULES: &[FieldRule] = &[
  FieldRule::new("chef_username", &["chef_username"]),
  FieldRule::new("chef.username", &["chef", "username"]),
  FieldRule::new("chef.user.username", &["chef", "user", "username"]),
  FieldRule::new("chef_user.username", &["chef_user", "username"]),
];

const DETAIL_USERNAME_RULES: &[FieldRule] = &[
  FieldRule::new("username", &["username"]),
  FieldRule::new("user.username", &["user", "username"]),
];

const SLUG_RULES: &[FieldRule] = &[
  FieldRule::new("chef_slug", &["chef_slug"]),
  FieldRule::new("chef.slug", &["chef", "slug"]),
];

const DETAIL_SLUG_RULES: &[FieldRule] = &[
  FieldRule::new("slug", &["slug"]),
  FieldRule::new("profile_slug", &["profile_slug"]),
];

const PROFILE_URL_RULES: &[FieldRule] = &[
  FieldRule::new("chef_profile_url", &["chef_profile_url"]),
  FieldRule::new("chef.profile_url", &["chef", "profile_url"]),
  FieldRule::new("chef.public_url", &["chef", "public_url"]),
];

const DETAIL_PROFILE_URL_RULES: &[FieldRule] = &[
  FieldRule::new("profile_url", &["profile_url"]),
  FieldRule::new("public_url", &["public_url"]),
  FieldRule::new("url", &["url"]),
];

const DISPLAY_NAME_RULES: &[FieldRule] = &[
  FieldRule::new("chef_name", &["chef_name"]),
  FieldRule::new("chef_display_name", &["chef_display_name"]),
  FieldRule::new("chef.display_name", &["chef", "display_name"]),
  FieldRule::new("chef.full_name", &["chef", "full_name"]),
  FieldRule::new("chef.name", &["chef", "name"]),
  FieldRule::new("chef.user.full_name", &["chef", "user", "full_name"]),
  FieldRule::new("chef.user.name", &["chef", "user", "name"]),
  FieldRule::new("chef_user.full_name", &["chef_user", "full_name"]),
];

const DETAIL_DISPLAY_NAME_RULES: &[FieldRule] = &[
  FieldRule::new("display_name", &["display_name"]),
  FieldRule::new("full_name", &["full_name"]),
  FieldRule::new("name", &["name"]),
  FieldRule::new("user.full_name", &["user", "full_name"]),
];

/// Separate first/last name fields that together make a display name.
#[derive(Debug, Clone, Copy)]
pub struct NamePartsRule {
  pub first: FieldRule,
  pub last: FieldRule,
}

impl NamePartsRule {
  const fn new(first: FieldRule, last: FieldRule) -> Self {
    Self { first, last }
  }

  fn join(&self, fields: &JsonMap) -> Option<String> {
    let parts: Vec<String> = [self.first.text(fields), self.last.text(fields)].into_iter().flatten().collect();
    (!parts.is_empty()).then(|| parts.join(" "))
  }
}

const NAME_PARTS_RULES: &[NamePartsRule] = &[
  NamePartsRule::new(
    FieldRule::new("chef.first_name", &["chef", "first_name"]),
    FieldRule::new("chef.last_name", &["chef", "last_name"]),
  ),
  NamePartsRule::new(
    FieldRule::new("chef.user.first_name", &["chef", "user", "first_name"]),
    FieldRule::new("chef.user.last_name", &["chef", "user", "last_name"]),
  ),
  NamePartsRule::new(
    FieldRule::new("chef_first_name", &["chef_first_name"]),
    FieldRule::new("chef_last_name", &["chef_last_name"]),
  ),
];

const DETAIL_NAME_PARTS_RULES: &[NamePartsRule] = &[
  NamePartsRule::new(
    FieldRule::new("first_name", &["first_name"]),
    FieldRule::new("last_name", &["last_name"]),
  ),
  NamePartsRule::new(
    FieldRule::new("user.first_name", &["user", "first_name"]),
    FieldRule::new("user.last_name", &["user", "last_name"]),
  ),
];

pub fn resolve_chef_id(record: &dyn Record) -> Option<String> {
  first_text(CHEF_ID_RULES, record.fields())
}

/// Public profile path for the chef behind `record`.
///
/// Priority: username, slug, numeric id, then a sanitized direct profile URL.
/// When `fallback_id` is given it is appended as `?chef_id=` to disambiguate.
pub fn resolve_profile_path(
  record: &dyn Record,
  detail: Option<&ChefDetail>,
  fallback_id: Option<&str>,
) -> Option<String> {
  let fields = record.fields();
  let detail_fields = detail.map(|d| d.fields());
  let from_detail = |rules: &[FieldRule]| detail_fields.and_then(|f| first_text(rules, f));

  let username = first_text(USERNAME_RULES, fields)
    .filter(|u| is_safe_segment(u))
    .or_else(|| from_detail(DETAIL_USERNAME_RULES).filter(|u| is_safe_segment(u)));
  let slug = || {
    first_text(SLUG_RULES, fields)
      .filter(|s| is_safe_segment(s))
      .or_else(|| from_detail(DETAIL_SLUG_RULES).filter(|s| is_safe_segment(s)))
  };
  let numeric_id = || {
    [resolve_chef_id(record), from_detail(DETAIL_ID_RULES), fallback_id.map(str::to_string)]
      .into_iter()
      .flatten()
      .find(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
  };
  let direct = || {
    first_text(PROFILE_URL_RULES, fields)
      .and_then(|u| sanitize_profile_url(&u))
      .or_else(|| from_detail(DETAIL_PROFILE_URL_RULES).and_then(|u| sanitize_profile_url(&u)))
  };

  let path = username
    .or_else(slug)
    .or_else(numeric_id)
    .map(|segment| format!("{PROFILE_PATH_PREFIX}/{segment}"))
    .or_else(direct)?;

  Some(match fallback_id.map(str::trim).filter(|id| !id.is_empty()) {
    Some(id) => {
      let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
      format!("{path}?{PROFILE_CHEF_QUERY_PARAM}={encoded}")
    }
    None => path,
  })
}

pub fn resolve_display_name(record: &dyn Record, detail: Option<&ChefDetail>) -> Option<String> {
  let fields = record.fields();
  let detail_fields = detail.map(|d| d.fields());

  first_text(DISPLAY_NAME_RULES, fields)
    .or_else(|| detail_fields.and_then(|f| first_text(DETAIL_DISPLAY_NAME_RULES, f)))
    .or_else(|| NAME_PARTS_RULES.iter().find_map(|rule| rule.join(fields)))
    .or_else(|| detail_fields.and_then(|f| DETAIL_NAME_PARTS_RULES.iter().find_map(|rule| rule.join(f))))
}

/// Reduces a profile link to a same-origin path.
///
/// Relative links are resolved against a placeholder base; absolute http(s)
/// links keep only their path. Other schemes, and links whose path is empty
/// or just `/`, yield `None`.
pub fn sanitize_profile_url(raw: &str) -> Option<String> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  let base = Url::parse(RESOLUTION_BASE).ok()?;
  let resolved = base.join(raw).ok()?;
  if !matches!(resolved.scheme(), "http" | "https") {
    return None;
  }
  let path = resolved.path().trim_end_matches('/');
  (path.starts_with('/') && path.len() > 1).then(|| path.to_string())
}

fn is_safe_segment(segment: &str) -> bool {
  !segment.is_empty()
    && segment
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
    && segment != "."
    && segment != ".."
}
