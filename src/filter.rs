//! Filter criteria and the SOQL predicate shared by both workflow phases.
//!
//! The same `FilterCriteria` value feeds the preview snippet and the mutation
//! snippet, so both select the same logical set of login records.
use crate::error::OrgUserError;

/// Comma-separated profile list excluded when `--except` is not given.
pub const DEFAULT_EXCEPT: &str = "system administrator,Administrateur système";

/// Profile excluded when `--except` is given but empty.
const EMPTY_EXCEPT_FALLBACK: &str = "System Administrator";

/// Direction of the lock-state change applied to `UserLogin.IsFrozen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    Freeze,
    Unfreeze,
}

impl LockAction {
    /// `IsFrozen` value a login must currently have to be a candidate.
    pub fn current_state(self) -> bool {
        match self {
            LockAction::Freeze => false,
            LockAction::Unfreeze => true,
        }
    }

    /// `IsFrozen` value written by the mutation phase.
    pub fn target_state(self) -> bool {
        !self.current_state()
    }

    pub fn verb(self) -> &'static str {
        match self {
            LockAction::Freeze => "freeze",
            LockAction::Unfreeze => "unfreeze",
        }
    }

    pub fn past_participle(self) -> &'static str {
        match self {
            LockAction::Freeze => "frozen",
            LockAction::Unfreeze => "unfrozen",
        }
    }
}

/// Operator-supplied selection criteria, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    name_substring: Option<String>,
    excluded_profiles: Vec<String>,
}

impl FilterCriteria {
    /// Build criteria from an optional name substring and an exclusion list.
    ///
    /// The substring is inserted verbatim into a `LIKE` clause; callers must not
    /// pass untrusted text containing quotes.
    pub fn new(
        name_substring: Option<String>,
        excluded_profiles: Vec<String>,
    ) -> Result<Self, OrgUserError> {
        if excluded_profiles.is_empty() {
            return Err(OrgUserError::FilterConstruction(
                "at least one excluded profile is required".to_string(),
            ));
        }
        let name_substring = name_substring.filter(|name| !name.is_empty());
        Ok(Self {
            name_substring,
            excluded_profiles,
        })
    }

    /// Build criteria from raw `--name` / `--except` flag values.
    pub fn from_flags(name: Option<&str>, except: &str) -> Result<Self, OrgUserError> {
        Self::new(name.map(str::to_string), parse_except(except))
    }

    pub fn name_substring(&self) -> Option<&str> {
        self.name_substring.as_deref()
    }

    pub fn excluded_profiles(&self) -> &[String] {
        &self.excluded_profiles
    }

    /// SOQL selecting the candidate `UserLogin` rows for `action`.
    pub fn user_login_query(&self, action: LockAction) -> String {
        let mut query = format!(
            "select id, isFrozen, UserId from UserLogin where userid in \
             (select id from user where profile.name NOT IN ('{}') and isactive=true",
            self.excluded_profiles.join("','")
        );
        if let Some(name) = self.name_substring() {
            query.push_str(&format!(" AND Name LIKE '%{name}%'"));
        }
        query.push_str(&format!(") AND isfrozen={}", action.current_state()));
        query
    }
}

/// Split an `--except` value on commas. Entries are kept verbatim.
pub fn parse_except(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return vec![EMPTY_EXCEPT_FALLBACK.to_string()];
    }
    raw.split(',').map(str::to_string).collect()
}
