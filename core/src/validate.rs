//! Pre-flight parameter validation.
//!
//! Rules are declared as data per operation (`RULES`) and evaluated against
//! resolved `Params` before any request is sent. Evaluation never stops at
//! the first failure: every violated rule is reported.
//!
//! Validation is opt-out per client (`ClientConfig::validate_requests`).
//! When disabled the engine forwards parameters verbatim.

use chrono::NaiveDate;

use crate::error::{ValidationError, Violation};
use crate::query::{Param, Params};

/// Largest page the API serves.
pub const MAX_PAGE_SIZE: u32 = 250;

const MAX_ID: i64 = i64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Value must be exactly `YYYY-MM-DD` and a real calendar date.
    DateFormat(Param),
    /// Either both parameters are present or neither is.
    BothOrNeither(Param, Param),
    /// `param` may only be sent alongside `requires`.
    Requires { param: Param, requires: Param },
    /// `start` must not be after `end`. Skipped unless both parse.
    DateOrder { start: Param, end: Param },
    /// Value must be an integer within `min..=max`.
    IntRange { param: Param, min: i64, max: i64 },
    /// Value must be a two-letter code.
    RegionCode(Param),
    /// The two values must differ.
    Distinct(Param, Param),
    /// Value, when present, must not be blank.
    NonEmpty(Param),
}

impl Rule {
    pub const fn name(&self) -> &'static str {
        match self {
            Rule::DateFormat(_) => "date_format",
            Rule::BothOrNeither(..) => "both_or_neither",
            Rule::Requires { .. } => "requires",
            Rule::DateOrder { .. } => "date_order",
            Rule::IntRange { .. } => "int_range",
            Rule::RegionCode(_) => "region_code",
            Rule::Distinct(..) => "distinct",
            Rule::NonEmpty(_) => "non_empty",
        }
    }

    pub fn params(&self) -> Vec<Param> {
        match *self {
            Rule::DateFormat(p) | Rule::RegionCode(p) | Rule::NonEmpty(p) => vec![p],
            Rule::IntRange { param, .. } => vec![param],
            Rule::BothOrNeither(a, b) | Rule::Distinct(a, b) => vec![a, b],
            Rule::Requires { param, requires } => vec![param, requires],
            Rule::DateOrder { start, end } => vec![start, end],
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            Rule::RegionCode(_) => Some("two-letter region code expected"),
            Rule::DateFormat(_) => Some("dates are zero-padded, e.g. 2024-03-09"),
            Rule::BothOrNeither(..) => Some("date ranges need both bounds"),
            _ => None,
        }
    }

    /// Check this rule, returning a message when it is violated.
    fn check(&self, params: &Params) -> Option<String> {
        match *self {
            Rule::DateFormat(p) => {
                let value = params.get(&p)?;
                match parse_strict_date(value) {
                    Some(_) => None,
                    None => Some(format!("{} must be YYYY-MM-DD, got {value:?}", p.wire_name())),
                }
            }
            Rule::BothOrNeither(a, b) => match (params.contains_key(&a), params.contains_key(&b)) {
                (true, false) => Some(format!(
                    "{} was given without {}",
                    a.wire_name(),
                    b.wire_name()
                )),
                (false, true) => Some(format!(
                    "{} was given without {}",
                    b.wire_name(),
                    a.wire_name()
                )),
                _ => None,
            },
            Rule::Requires { param, requires } => {
                if params.contains_key(&param) && !params.contains_key(&requires) {
                    Some(format!(
                        "{} requires {}",
                        param.wire_name(),
                        requires.wire_name()
                    ))
                } else {
                    None
                }
            }
            Rule::DateOrder { start, end } => {
                let from = parse_strict_date(params.get(&start)?)?;
                let to = parse_strict_date(params.get(&end)?)?;
                if from > to {
                    Some(format!(
                        "{} ({from}) is after {} ({to})",
                        start.wire_name(),
                        end.wire_name()
                    ))
                } else {
                    None
                }
            }
            Rule::IntRange { param, min, max } => {
                let value = params.get(&param)?;
                match value.parse::<i128>() {
                    Ok(n) if (i128::from(min)..=i128::from(max)).contains(&n) => None,
                    Ok(n) if max == MAX_ID && n < i128::from(min) => Some(format!(
                        "{} must be at least {min}, got {n}",
                        param.wire_name()
                    )),
                    Ok(n) => Some(format!(
                        "{} must be between {min} and {max}, got {n}",
                        param.wire_name()
                    )),
                    Err(_) => Some(format!(
                        "{} must be an integer, got {value:?}",
                        param.wire_name()
                    )),
                }
            }
            Rule::RegionCode(p) => {
                let value = params.get(&p)?;
                if value.len() == 2 && value.bytes().all(|b| b.is_ascii_alphabetic()) {
                    None
                } else {
                    Some(format!("{} must be two letters, got {value:?}", p.wire_name()))
                }
            }
            Rule::Distinct(a, b) => {
                let (x, y) = (params.get(&a)?, params.get(&b)?);
                if x == y {
                    Some(format!(
                        "{} and {} must differ, both are {x}",
                        a.wire_name(),
                        b.wire_name()
                    ))
                } else {
                    None
                }
            }
            Rule::NonEmpty(p) => {
                let value = params.get(&p)?;
                if value.trim().is_empty() {
                    Some(format!("{} must not be blank", p.wire_name()))
                } else {
                    None
                }
            }
        }
    }
}

/// Rules attached to one operation.
#[derive(Debug)]
pub struct OperationRules {
    pub operation: &'static str,
    pub rules: &'static [Rule],
}

const PAGE_START: Rule = Rule::IntRange {
    param: Param::StartPos,
    min: 0,
    max: u32::MAX as i64,
};

const PAGE_COUNT: Rule = Rule::IntRange {
    param: Param::Count,
    min: 1,
    max: MAX_PAGE_SIZE as i64,
};

pub static RULES: &[OperationRules] = &[
    OperationRules {
        operation: "player.search",
        rules: &[
            Rule::NonEmpty(Param::Name),
            Rule::RegionCode(Param::Country),
            Rule::Requires {
                param: Param::TournamentPosition,
                requires: Param::Tournament,
            },
            Rule::IntRange {
                param: Param::TournamentPosition,
                min: 1,
                max: MAX_ID,
            },
            PAGE_START,
            PAGE_COUNT,
        ],
    },
    OperationRules {
        operation: "tournament.search",
        rules: &[
            Rule::NonEmpty(Param::Name),
            Rule::RegionCode(Param::Country),
            Rule::DateFormat(Param::StartDate),
            Rule::DateFormat(Param::EndDate),
            Rule::BothOrNeither(Param::StartDate, Param::EndDate),
            Rule::DateOrder {
                start: Param::StartDate,
                end: Param::EndDate,
            },
            PAGE_START,
            PAGE_COUNT,
        ],
    },
    OperationRules {
        operation: "director.search",
        rules: &[
            Rule::NonEmpty(Param::Name),
            Rule::RegionCode(Param::Country),
            PAGE_START,
            PAGE_COUNT,
        ],
    },
    OperationRules {
        operation: "rankings",
        rules: &[Rule::RegionCode(Param::Country), PAGE_START, PAGE_COUNT],
    },
    OperationRules {
        operation: "player.get",
        rules: &[Rule::IntRange {
            param: Param::PlayerId,
            min: 1,
            max: MAX_ID,
        }],
    },
    OperationRules {
        operation: "player.pvp",
        rules: &[
            Rule::IntRange {
                param: Param::PlayerId,
                min: 1,
                max: MAX_ID,
            },
            Rule::IntRange {
                param: Param::OpponentId,
                min: 1,
                max: MAX_ID,
            },
            Rule::Distinct(Param::PlayerId, Param::OpponentId),
        ],
    },
    OperationRules {
        operation: "tournament.get",
        rules: &[Rule::IntRange {
            param: Param::TournamentId,
            min: 1,
            max: MAX_ID,
        }],
    },
    OperationRules {
        operation: "tournament.results",
        rules: &[Rule::IntRange {
            param: Param::TournamentId,
            min: 1,
            max: MAX_ID,
        }],
    },
];

/// Rules declared for `operation`; empty for unknown operations.
pub fn rules_for(operation: &str) -> &'static [Rule] {
    RULES
        .iter()
        .find(|entry| entry.operation == operation)
        .map(|entry| entry.rules)
        .unwrap_or(&[])
}

/// Evaluate every rule for `operation` against `params`.
pub fn validate(operation: &'static str, params: &Params) -> Result<(), ValidationError> {
    let violations: Vec<Violation> = rules_for(operation)
        .iter()
        .filter_map(|rule| {
            rule.check(params).map(|message| Violation {
                rule: rule.name(),
                params: rule.params().into_iter().map(Param::wire_name).collect(),
                message,
                hint: rule.hint(),
            })
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            operation,
            violations,
        })
    }
}

/// Parse a date only when it is exactly `YYYY-MM-DD`.
fn parse_strict_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_only = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_only {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
