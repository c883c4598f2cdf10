//! Structured results smuggled through an Apex debug log.
//!
//! Snippets emit `OUTPUTVALUE=<json-array>END_OUTPUTVALUE` via `system.debug`.
//! Salesforce echoes the anonymous source into the log ahead of the
//! `USER_DEBUG` line, so the marker text usually appears more than once and
//! the earlier hits are Apex source, not JSON. The payload is therefore taken
//! from the last complete marker pair in the log.
use crate::error::OrgUserError;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

pub const OUTPUT_PREFIX: &str = "OUTPUTVALUE=";
pub const OUTPUT_SUFFIX: &str = "END_OUTPUTVALUE";

/// A user whose login matched the filter, as reported by the org.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Option<String>,
    pub name: String,
    pub profile_name: String,
}

/// Records in the order the org returned them.
pub type ExtractedRecordSet = Vec<UserRecord>;

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(rename = "Id", default)]
    id: Option<String>,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Profile", default)]
    profile: Option<RawProfile>,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    #[serde(rename = "Name")]
    name: String,
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        let pattern = format!(
            "(?s){}(.*?){}",
            regex::escape(OUTPUT_PREFIX),
            regex::escape(OUTPUT_SUFFIX)
        );
        Regex::new(&pattern).expect("marker pattern compiles")
    })
}

/// Return the text between the last `OUTPUTVALUE=` / `END_OUTPUTVALUE` pair.
pub fn payload(raw_log: &str) -> Result<&str, OrgUserError> {
    marker_regex()
        .captures_iter(raw_log)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            OrgUserError::MalformedLog(format!(
                "no {OUTPUT_PREFIX}...{OUTPUT_SUFFIX} block in {} bytes of log",
                raw_log.len()
            ))
        })
}

/// Extract the user records embedded in an Apex debug log.
pub fn extract(raw_log: &str) -> Result<ExtractedRecordSet, OrgUserError> {
    let json = payload(raw_log)?;
    let users: Vec<RawUser> = serde_json::from_str(json).map_err(|err| {
        OrgUserError::MalformedLog(format!(
            "payload is not a user array: {err} (payload starts with {:?})",
            &json[..floor_char_boundary(json, 200)]
        ))
    })?;

    users
        .into_iter()
        .enumerate()
        .map(|(index, user)| {
            let profile = user.profile.ok_or_else(|| {
                OrgUserError::MalformedLog(format!(
                    "record {index} ({}) has no Profile reference",
                    user.name
                ))
            })?;
            Ok(UserRecord {
                id: user.id,
                name: user.name,
                profile_name: profile.name,
            })
        })
        .collect()
}

fn floor_char_boundary(text: &str, max: usize) -> usize {
    let mut end = text.len().min(max);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}
