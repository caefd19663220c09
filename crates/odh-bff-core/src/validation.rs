use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DNS1123_LABEL: Regex = Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap();
}

const DNS1123_LABEL_MAX_LEN: usize = 63;

/// Whether `name` is a valid Kubernetes namespace name (RFC 1123 label).
pub fn is_dns1123_label(name: &str) -> bool {
    !name.is_empty() && name.len() <= DNS1123_LABEL_MAX_LEN && DNS1123_LABEL.is_match(name)
}
